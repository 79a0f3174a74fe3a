//! Terraform failures known to be transient

use regex::Regex;

use super::options::RetryableError;

const DEFAULT_RETRYABLE_ERRORS: &[(&str, &str)] = &[
    (
        r".*read: connection reset by peer.*",
        "Failed to reach remote endpoint.",
    ),
    (
        r".*unable to verify signature.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        r".*unable to verify checksum.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        r".*no provider exists with the given name.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        r".*registry service is unreachable.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        r".*Error installing provider.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        r".*Failed to query available provider packages.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        r".*timeout while waiting for plugin to start.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        r".*timed out waiting for server handshake.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        r"could not query provider registry for",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        r".*Failed to install provider.*",
        "Failed to retrieve plugin due to transient network error.",
    ),
    (
        r".*TLS handshake timeout.*",
        "Failed to reach remote endpoint.",
    ),
    (
        r".*Client\.Timeout exceeded while awaiting headers.*",
        "Failed to reach remote endpoint.",
    ),
    (
        r".*Could not download module.*",
        "Failed to download module due to transient network error.",
    ),
];

pub(crate) fn default_retryable_errors() -> Vec<RetryableError> {
    DEFAULT_RETRYABLE_ERRORS
        .iter()
        .filter_map(|(pattern, reason)| {
            Regex::new(pattern).ok().map(|pattern| RetryableError {
                pattern,
                reason: reason.to_string(),
            })
        })
        .collect()
}
