//! Security policy presets
//!
//! Each [`SecurityPolicy`] expands to a fixed [`PermissionSet`]. The table is
//! part of the trust contract and must not drift:
//!
//! | Policy       | Granted                                                  |
//! |--------------|----------------------------------------------------------|
//! | minimal      | read-files, system-info                                  |
//! | standard     | minimal + write-files, http-client, clipboard,           |
//! |              | notifications, modify-ui                                 |
//! | elevated     | standard + delete-files, network-access, websocket,      |
//! |              | execute-commands, create-windows, ipc-send, ipc-receive  |
//! | unrestricted | unrestricted                                             |

use crate::permission::{Permission, PermissionSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named permission preset applied at plugin creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicy {
    #[default]
    Minimal,
    Standard,
    Elevated,
    Unrestricted,
}

const MINIMAL: &[Permission] = &[Permission::ReadFiles, Permission::SystemInfo];

const STANDARD: &[Permission] = &[
    Permission::ReadFiles,
    Permission::WriteFiles,
    Permission::HttpClient,
    Permission::SystemInfo,
    Permission::Clipboard,
    Permission::Notifications,
    Permission::ModifyUi,
];

const ELEVATED: &[Permission] = &[
    Permission::ReadFiles,
    Permission::WriteFiles,
    Permission::DeleteFiles,
    Permission::NetworkAccess,
    Permission::HttpClient,
    Permission::Websocket,
    Permission::ExecuteCommands,
    Permission::SystemInfo,
    Permission::Clipboard,
    Permission::CreateWindows,
    Permission::ModifyUi,
    Permission::Notifications,
    Permission::IpcSend,
    Permission::IpcReceive,
];

const UNRESTRICTED: &[Permission] = &[Permission::Unrestricted];

impl SecurityPolicy {
    pub const ALL: [SecurityPolicy; 4] = [
        SecurityPolicy::Minimal,
        SecurityPolicy::Standard,
        SecurityPolicy::Elevated,
        SecurityPolicy::Unrestricted,
    ];

    /// Tokens granted by this policy
    pub fn tokens(&self) -> &'static [Permission] {
        match self {
            Self::Minimal => MINIMAL,
            Self::Standard => STANDARD,
            Self::Elevated => ELEVATED,
            Self::Unrestricted => UNRESTRICTED,
        }
    }

    /// Expand the policy into a fresh permission set
    pub fn permissions(&self) -> PermissionSet {
        PermissionSet::from(self.tokens())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
            Self::Elevated => "elevated",
            Self::Unrestricted => "unrestricted",
        }
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a policy name is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePolicyError(pub String);

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown security policy '{}' (expected minimal, standard, elevated or unrestricted)",
            self.0
        )
    }
}

impl std::error::Error for ParsePolicyError {}

impl FromStr for SecurityPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        SecurityPolicy::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ParsePolicyError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use Permission::*;

    fn granted(policy: SecurityPolicy) -> Vec<Permission> {
        policy.permissions().iter().collect()
    }

    #[test]
    fn test_minimal_policy() {
        assert_eq!(granted(SecurityPolicy::Minimal), vec![ReadFiles, SystemInfo]);
        assert!(!SecurityPolicy::Minimal.permissions().has(WriteFiles));
    }

    #[test]
    fn test_standard_has_write_but_not_delete() {
        assert_eq!(
            granted(SecurityPolicy::Standard),
            vec![
                ReadFiles,
                WriteFiles,
                HttpClient,
                SystemInfo,
                Clipboard,
                ModifyUi,
                Notifications,
            ]
        );
        let set = SecurityPolicy::Standard.permissions();
        assert!(!set.has(DeleteFiles));
        assert!(!set.has(NetworkAccess));
    }

    #[test]
    fn test_elevated_has_write_and_delete() {
        assert_eq!(
            granted(SecurityPolicy::Elevated),
            vec![
                ReadFiles,
                WriteFiles,
                DeleteFiles,
                NetworkAccess,
                HttpClient,
                Websocket,
                ExecuteCommands,
                SystemInfo,
                Clipboard,
                CreateWindows,
                ModifyUi,
                Notifications,
                IpcSend,
                IpcReceive,
            ]
        );
        assert!(!SecurityPolicy::Elevated
            .permissions()
            .contains_exact(Unrestricted));
    }

    #[test]
    fn test_unrestricted_is_single_token() {
        assert_eq!(granted(SecurityPolicy::Unrestricted), vec![Unrestricted]);
        assert!(SecurityPolicy::Unrestricted.permissions().has(ExecuteCommands));
    }

    #[test]
    fn test_token_tables_match_expansion() {
        for policy in SecurityPolicy::ALL {
            let mut tokens = policy.tokens().to_vec();
            tokens.sort_by_key(|p| Permission::ALL.iter().position(|q| q == p));
            assert_eq!(tokens, granted(policy), "{policy}");
        }
    }

    #[test]
    fn test_policies_are_nested() {
        let minimal = SecurityPolicy::Minimal.permissions();
        let standard = SecurityPolicy::Standard.permissions();
        let elevated = SecurityPolicy::Elevated.permissions();

        assert!(minimal.is_subset_of(&standard));
        assert!(standard.is_subset_of(&elevated));
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!(
            "Elevated".parse::<SecurityPolicy>().unwrap(),
            SecurityPolicy::Elevated
        );
        assert!("root".parse::<SecurityPolicy>().is_err());
        assert_eq!(SecurityPolicy::default(), SecurityPolicy::Minimal);
    }
}
