//! Capability tokens and permission sets
//!
//! A [`Permission`] names one category of privileged operation. A
//! [`PermissionSet`] is the collection granted to a single plugin. Holding
//! [`Permission::Unrestricted`] makes every membership test succeed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capability token for a privileged operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    // File system
    ReadFiles,
    WriteFiles,
    DeleteFiles,
    // Network
    NetworkAccess,
    HttpClient,
    Websocket,
    // System
    ExecuteCommands,
    SystemInfo,
    Clipboard,
    // UI
    CreateWindows,
    ModifyUi,
    Notifications,
    // IPC
    IpcSend,
    IpcReceive,
    /// Bypasses every other check
    Unrestricted,
}

/// Conceptual grouping of permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    FileSystem,
    Network,
    System,
    Ui,
    Ipc,
    Unrestricted,
}

impl Permission {
    /// Every token, in declaration order
    pub const ALL: [Permission; 15] = [
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
        Permission::Unrestricted,
    ];

    /// Stable token name (e.g. `read-files`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadFiles => "read-files",
            Self::WriteFiles => "write-files",
            Self::DeleteFiles => "delete-files",
            Self::NetworkAccess => "network-access",
            Self::HttpClient => "http-client",
            Self::Websocket => "websocket",
            Self::ExecuteCommands => "execute-commands",
            Self::SystemInfo => "system-info",
            Self::Clipboard => "clipboard",
            Self::CreateWindows => "create-windows",
            Self::ModifyUi => "modify-ui",
            Self::Notifications => "notifications",
            Self::IpcSend => "ipc-send",
            Self::IpcReceive => "ipc-receive",
            Self::Unrestricted => "unrestricted",
        }
    }

    /// Category this token belongs to
    pub fn category(&self) -> PermissionCategory {
        match self {
            Self::ReadFiles | Self::WriteFiles | Self::DeleteFiles => {
                PermissionCategory::FileSystem
            }
            Self::NetworkAccess | Self::HttpClient | Self::Websocket => PermissionCategory::Network,
            Self::ExecuteCommands | Self::SystemInfo | Self::Clipboard => {
                PermissionCategory::System
            }
            Self::CreateWindows | Self::ModifyUi | Self::Notifications => PermissionCategory::Ui,
            Self::IpcSend | Self::IpcReceive => PermissionCategory::Ipc,
            Self::Unrestricted => PermissionCategory::Unrestricted,
        }
    }

    #[inline]
    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a permission name is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePermissionError(pub String);

impl fmt::Display for ParsePermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown permission: {}", self.0)
    }
}

impl std::error::Error for ParsePermissionError {}

impl FromStr for Permission {
    type Err = ParsePermissionError;

    /// Accepts both `read-files` and `read_files`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ParsePermissionError(s.to_string()))
    }
}

/// Set of granted permissions
///
/// Stored as a bitset keyed by the [`Permission`] discriminant, so
/// membership is O(1) and insertion order is irrelevant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Permission>", into = "Vec<Permission>")]
pub struct PermissionSet {
    bits: u32,
}

impl PermissionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `permission` is allowed by this set
    ///
    /// Always true when the set contains [`Permission::Unrestricted`].
    pub fn has(&self, permission: Permission) -> bool {
        self.contains_exact(Permission::Unrestricted) || self.contains_exact(permission)
    }

    /// Membership test without the `unrestricted` override
    pub fn contains_exact(&self, permission: Permission) -> bool {
        self.bits & permission.bit() != 0
    }

    /// Add a permission (idempotent)
    pub fn grant(&mut self, permission: Permission) {
        self.bits |= permission.bit();
    }

    /// Remove a permission (idempotent)
    pub fn revoke(&mut self, permission: Permission) {
        self.bits &= !permission.bit();
    }

    /// Whether no token is stored (a set holding only `unrestricted` is not empty)
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of tokens actually stored
    pub fn count(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Whether every permission in `self` is allowed by `other`
    pub fn is_subset_of(&self, other: &PermissionSet) -> bool {
        self.iter().all(|p| other.has(p))
    }

    /// Iterate stored tokens in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL
            .into_iter()
            .filter(move |p| self.contains_exact(*p))
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = PermissionSet::new();
        for permission in iter {
            set.grant(permission);
        }
        set
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(permissions: Vec<Permission>) -> Self {
        permissions.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(set: PermissionSet) -> Self {
        set.iter().collect()
    }
}

impl From<&[Permission]> for PermissionSet {
    fn from(permissions: &[Permission]) -> Self {
        permissions.iter().copied().collect()
    }
}
