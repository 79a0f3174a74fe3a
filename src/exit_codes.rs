//! Exit code standardization for ecs-terratest
//!
//! - `0` = Success
//! - `1` = Verification failure (assertion mismatch, poll timeout)
//! - `2` = System error (terraform, AWS API, I/O, cleanup)
//! - `3` = Configuration error (missing region, bad config file, no terraform)

use crate::error::EcsTestError;

/// Standard exit codes for ecs-terratest
pub mod codes {
    pub const SUCCESS: i32 = 0;
    pub const VERIFICATION_FAILED: i32 = 1;
    pub const SYSTEM_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
}

/// Map an EcsTestError to an appropriate exit code
pub fn exit_code_for_error(error: &EcsTestError) -> i32 {
    use EcsTestError::*;
    match error {
        Config(_) => codes::CONFIG_ERROR,

        Assertion { .. } | Timeout(_) | MissingOutput { .. } => codes::VERIFICATION_FAILED,

        Terraform { .. }
        | Ecs(_)
        | Logs(_)
        | AutoScaling(_)
        | Retryable { .. }
        | Cleanup(_)
        | Io(_)
        | Json(_) => codes::SYSTEM_ERROR,
    }
}

/// Exit code for an error surfaced through `anyhow` at the CLI boundary
pub fn exit_code_for_anyhow(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<EcsTestError>()
        .map(exit_code_for_error)
        .unwrap_or(codes::SYSTEM_ERROR)
}
