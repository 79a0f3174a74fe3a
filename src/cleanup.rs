//! Deferred teardown
//!
//! Cleanup steps are registered as soon as the resource they undo might
//! exist, and run in reverse registration order once the scenario body is
//! done, whether it passed or not. Futures are lazy, so a registered step
//! does nothing until `run` awaits it.
//!
//! Setting `TT_SKIP_DESTROY=1` produces a disabled teardown: registrations
//! are logged and dropped, and the infrastructure is left in place for
//! inspection.

use crate::error::{EcsTestError, Result};
use std::future::Future;
use std::pin::Pin;
use tracing::{info, warn};

type CleanupFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Whether a failing step fails the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    /// Failure is logged and otherwise ignored
    BestEffort,
    /// Failure is reported in `CleanupReport::errors`
    Required,
}

struct CleanupStep<'a> {
    name: String,
    mode: CleanupMode,
    action: CleanupFuture<'a>,
}

/// LIFO stack of deferred cleanup steps
pub struct Teardown<'a> {
    steps: Vec<CleanupStep<'a>>,
    enabled: bool,
}

impl<'a> Teardown<'a> {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            enabled: true,
        }
    }

    /// A teardown that drops every registration
    pub fn disabled() -> Self {
        Self {
            steps: Vec::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Register a cleanup step to run after everything registered later
    pub fn defer<F>(&mut self, name: impl Into<String>, mode: CleanupMode, action: F)
    where
        F: Future<Output = Result<()>> + Send + 'a,
    {
        let name = name.into();
        if !self.enabled {
            info!("Skipping cleanup step {:?} (TT_SKIP_DESTROY=1)", name);
            return;
        }
        self.steps.push(CleanupStep {
            name,
            mode,
            action: Box::pin(action),
        });
    }

    /// Run every step, newest first, regardless of individual failures
    pub async fn run(mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        while let Some(step) = self.steps.pop() {
            info!("Cleanup: {}", step.name);
            match step.action.await {
                Ok(()) => report.completed.push(step.name),
                Err(e) => match step.mode {
                    CleanupMode::BestEffort => {
                        warn!("Ignoring cleanup failure in {}: {}", step.name, e);
                        report.ignored.push((step.name, e.to_string()));
                    }
                    CleanupMode::Required => {
                        warn!("Cleanup step {} failed: {}", step.name, e);
                        report.errors.push((step.name, e.to_string()));
                    }
                },
            }
        }

        report
    }
}

impl Default for Teardown<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened during teardown
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub completed: Vec<String>,
    pub ignored: Vec<(String, String)>, // (step, error)
    pub errors: Vec<(String, String)>,  // (step, error)
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Err(Cleanup)` when any required step failed
    pub fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(EcsTestError::Cleanup(
            self.errors
                .into_iter()
                .map(|(step, err)| format!("{}: {}", step, err))
                .collect(),
        ))
    }
}
