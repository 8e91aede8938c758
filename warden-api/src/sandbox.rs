//! Numeric sandbox quotas attached to a plugin instance

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default memory ceiling (64 MiB)
pub const DEFAULT_MAX_MEMORY: u64 = 64 * 1024 * 1024;
/// Default execution window (5 seconds)
pub const DEFAULT_MAX_EXECUTION_TIME_MS: u64 = 5000;
/// Default ceiling on concurrently open file handles
pub const DEFAULT_MAX_FILE_HANDLES: u32 = 100;
/// Default ceiling on concurrently open network connections
pub const DEFAULT_MAX_NETWORK_CONNECTIONS: u32 = 10;
/// Default ceiling on nested plugin call depth
pub const DEFAULT_MAX_RECURSION_DEPTH: u32 = 100;

/// Resource ceilings for one plugin
///
/// `stack_protection` and `memory_bounds_checking` are carried for the
/// execution engine; nothing in the trust core enforces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Bytes
    pub max_memory: u64,
    /// Milliseconds
    pub max_execution_time_ms: u64,
    pub max_file_handles: u32,
    pub max_network_connections: u32,
    pub max_recursion_depth: u32,
    pub stack_protection: bool,
    pub memory_bounds_checking: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_memory: DEFAULT_MAX_MEMORY,
            max_execution_time_ms: DEFAULT_MAX_EXECUTION_TIME_MS,
            max_file_handles: DEFAULT_MAX_FILE_HANDLES,
            max_network_connections: DEFAULT_MAX_NETWORK_CONNECTIONS,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            stack_protection: true,
            memory_bounds_checking: true,
        }
    }
}

impl SandboxConfig {
    /// Config with every quota at its default
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the memory ceiling in bytes
    pub fn with_max_memory(mut self, bytes: u64) -> Self {
        self.max_memory = bytes;
        self
    }

    /// Set the execution window, saturating at `u64::MAX` milliseconds
    pub fn with_max_execution_time(mut self, limit: Duration) -> Self {
        self.max_execution_time_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the open file handle ceiling
    pub fn with_max_file_handles(mut self, handles: u32) -> Self {
        self.max_file_handles = handles;
        self
    }

    /// Set the open network connection ceiling
    pub fn with_max_network_connections(mut self, connections: u32) -> Self {
        self.max_network_connections = connections;
        self
    }

    /// Set the nested call depth ceiling
    pub fn with_max_recursion_depth(mut self, depth: u32) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    /// Toggle the stack protection flag handed to the execution engine
    pub fn with_stack_protection(mut self, enabled: bool) -> Self {
        self.stack_protection = enabled;
        self
    }

    /// Toggle the memory bounds checking flag handed to the execution engine
    pub fn with_memory_bounds_checking(mut self, enabled: bool) -> Self {
        self.memory_bounds_checking = enabled;
        self
    }

    /// Execution time ceiling as a [`Duration`]
    pub fn max_execution_time(&self) -> Duration {
        Duration::from_millis(self.max_execution_time_ms)
    }
}
