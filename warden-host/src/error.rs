//! Error taxonomy for the trust core
//!
//! Every variant is locally recoverable. The host decides whether a failure
//! denies the operation, terminates the plugin or is surfaced to the user.

use std::time::Duration;
use thiserror::Error;
use warden_api::Permission;

/// Errors raised by permission checks, quota accounting and verification
#[derive(Debug, Error)]
pub enum TrustError {
    /// Token not granted and the set lacks `unrestricted`
    #[error("Plugin '{plugin_id}' is not permitted to use '{permission}'")]
    PermissionDenied {
        plugin_id: String,
        permission: Permission,
    },

    #[error("Memory limit exceeded: {used} + {requested} bytes exceeds limit of {limit}")]
    MemoryLimitExceeded { used: u64, requested: u64, limit: u64 },

    #[error("File handle limit reached ({limit})")]
    FileHandleLimitExceeded { limit: u32 },

    #[error("Network connection limit reached ({limit})")]
    NetworkConnectionLimitExceeded { limit: u32 },

    #[error("Recursion depth {depth} exceeds limit of {limit}")]
    RecursionLimitExceeded { depth: u32, limit: u32 },

    /// Open execution window ran longer than configured
    #[error("Execution timed out after {elapsed:?} (limit {limit:?})")]
    ExecutionTimeout { elapsed: Duration, limit: Duration },

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// Verification requested on a plugin that was never signed
    #[error("Plugin '{0}' has no signature")]
    NoSignature(String),

    #[error("Signature verification failed for plugin '{0}'")]
    SignatureVerificationFailed(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
}

impl TrustError {
    /// Whether this error reflects a trust decision rather than a quota
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. }
                | Self::NoSignature(_)
                | Self::SignatureVerificationFailed(_)
        )
    }

    /// Whether this error is a resource quota rejection
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(
            self,
            Self::MemoryLimitExceeded { .. }
                | Self::FileHandleLimitExceeded { .. }
                | Self::NetworkConnectionLimitExceeded { .. }
                | Self::RecursionLimitExceeded { .. }
                | Self::ExecutionTimeout { .. }
        )
    }
}

pub type TrustResult<T> = Result<T, TrustError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let denied = TrustError::PermissionDenied {
            plugin_id: "p".into(),
            permission: Permission::DeleteFiles,
        };
        assert!(denied.is_security_violation());
        assert!(!denied.is_quota_exceeded());

        let memory = TrustError::MemoryLimitExceeded {
            used: 900,
            requested: 200,
            limit: 1000,
        };
        assert!(memory.is_quota_exceeded());
        assert!(!memory.is_security_violation());
    }

    #[test]
    fn test_display_names_permission_token() {
        let denied = TrustError::PermissionDenied {
            plugin_id: "notes".into(),
            permission: Permission::ExecuteCommands,
        };
        assert_eq!(
            denied.to_string(),
            "Plugin 'notes' is not permitted to use 'execute-commands'"
        );
    }
}
