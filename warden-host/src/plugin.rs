//! Runtime plugin state: permissions, quotas, execution timing and trust
//!
//! A [`Plugin`] answers two questions for the host execution engine: "is this
//! operation allowed right now" and "how much has already been consumed".
//! It never performs the operation itself and never logs to the audit trail;
//! auditing happens in [`crate::manager::PluginManager`].
//!
//! # Acquire/release accounting
//!
//! ```text
//! check_memory_limit(n) ──► used + n <= max ? used += n : MemoryLimitExceeded
//! release_memory(n)     ──► used = used.saturating_sub(n)
//! ```
//!
//! A rejected acquire leaves the counter untouched. Releasing more than was
//! acquired clamps at zero.
//!
//! # Trust states
//!
//! ```text
//! unsigned ──sign──► signed ──verify(ok)──► verified
//! ```
//!
//! A failed verification does not reset `verified`.

use std::time::{Duration, Instant};

use warden_api::{Permission, PermissionSet, PluginIdentity, SandboxConfig, SecurityPolicy};

use crate::error::{TrustError, TrustResult};
use crate::signing::{self, SecretKey};

/// Point-in-time snapshot of a plugin's resource consumption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceUsage {
    pub memory_used: u64,
    pub file_handles: u32,
    pub network_connections: u32,
    /// Time spent in the currently open execution window
    pub elapsed: Option<Duration>,
}

/// A plugin instance known to the host
#[derive(Debug)]
pub struct Plugin {
    identity: PluginIdentity,
    permissions: PermissionSet,
    sandbox: SandboxConfig,
    memory_used: u64,
    file_handles: u32,
    network_connections: u32,
    execution_start: Option<Instant>,
    verified: bool,
    signature: Option<String>,
}

impl Plugin {
    /// Create a plugin with the default sandbox quotas
    ///
    /// The policy is expanded immediately; later changes to the policy table
    /// do not affect existing plugins.
    pub fn new(identity: PluginIdentity, policy: SecurityPolicy) -> Self {
        Self::with_sandbox(identity, policy, SandboxConfig::default())
    }

    /// Create a plugin with explicit sandbox quotas
    pub fn with_sandbox(
        identity: PluginIdentity,
        policy: SecurityPolicy,
        sandbox: SandboxConfig,
    ) -> Self {
        Self {
            identity,
            permissions: policy.permissions(),
            sandbox,
            memory_used: 0,
            file_handles: 0,
            network_connections: 0,
            execution_start: None,
            verified: false,
            signature: None,
        }
    }

    /// Registry key; unique within a manager
    pub fn id(&self) -> &str {
        &self.identity.id
    }

    /// Human-readable plugin name
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Plugin version string
    pub fn version(&self) -> &str {
        &self.identity.version
    }

    /// Publisher name
    pub fn author(&self) -> &str {
        &self.identity.author
    }

    /// Full identity record
    pub fn identity(&self) -> &PluginIdentity {
        &self.identity
    }

    /// Permissions currently granted
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Resource ceilings this plugin runs under
    pub fn sandbox(&self) -> &SandboxConfig {
        &self.sandbox
    }

    /// Whether a signature has been verified successfully
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Encoded signature, if the plugin has been signed
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Attach a signature produced elsewhere (e.g. shipped with the package)
    pub fn set_signature(&mut self, signature: impl Into<String>) {
        self.signature = Some(signature.into());
    }

    /// Snapshot of current resource consumption
    pub fn usage(&self) -> ResourceUsage {
        ResourceUsage {
            memory_used: self.memory_used,
            file_handles: self.file_handles,
            network_connections: self.network_connections,
            elapsed: self.execution_start.map(|start| start.elapsed()),
        }
    }

    // ========================================================================
    // Permissions
    // ========================================================================

    /// Succeeds iff the permission is granted or the plugin is unrestricted
    pub fn check_permission(&self, permission: Permission) -> TrustResult<()> {
        if self.permissions.has(permission) {
            Ok(())
        } else {
            Err(TrustError::PermissionDenied {
                plugin_id: self.identity.id.clone(),
                permission,
            })
        }
    }

    pub(crate) fn grant(&mut self, permission: Permission) {
        self.permissions.grant(permission);
    }

    pub(crate) fn revoke(&mut self, permission: Permission) {
        self.permissions.revoke(permission);
    }

    // ========================================================================
    // Resource quotas
    // ========================================================================

    /// Bytes currently charged against the memory quota
    pub fn memory_used(&self) -> u64 {
        self.memory_used
    }

    /// Charge `bytes` against the memory quota
    pub fn check_memory_limit(&mut self, bytes: u64) -> TrustResult<()> {
        let limit = self.sandbox.max_memory;
        match self.memory_used.checked_add(bytes) {
            Some(total) if total <= limit => {
                self.memory_used = total;
                tracing::debug!(
                    plugin = %self.identity.id,
                    requested = bytes,
                    used = total,
                    limit,
                    "memory charged"
                );
                Ok(())
            }
            _ => {
                tracing::warn!(
                    plugin = %self.identity.id,
                    used = self.memory_used,
                    requested = bytes,
                    limit,
                    "memory limit exceeded"
                );
                Err(TrustError::MemoryLimitExceeded {
                    used: self.memory_used,
                    requested: bytes,
                    limit,
                })
            }
        }
    }

    /// Return `bytes` to the memory quota, flooring at zero
    pub fn release_memory(&mut self, bytes: u64) {
        if bytes > self.memory_used {
            tracing::debug!(
                plugin = %self.identity.id,
                used = self.memory_used,
                released = bytes,
                "over-release clamped to zero"
            );
        }
        self.memory_used = self.memory_used.saturating_sub(bytes);
    }

    /// File handles currently held
    pub fn file_handles(&self) -> u32 {
        self.file_handles
    }

    /// Acquire one file handle
    pub fn check_file_handle_limit(&mut self) -> TrustResult<()> {
        let limit = self.sandbox.max_file_handles;
        if self.file_handles >= limit {
            tracing::warn!(plugin = %self.identity.id, limit, "file handle limit reached");
            return Err(TrustError::FileHandleLimitExceeded { limit });
        }
        self.file_handles += 1;
        tracing::debug!(
            plugin = %self.identity.id,
            held = self.file_handles,
            limit,
            "file handle acquired"
        );
        Ok(())
    }

    /// Return one file handle, never going below zero
    pub fn release_file_handle(&mut self) {
        self.file_handles = self.file_handles.saturating_sub(1);
    }

    /// Network connections currently open
    pub fn network_connections(&self) -> u32 {
        self.network_connections
    }

    /// Acquire one network connection
    pub fn check_network_connection_limit(&mut self) -> TrustResult<()> {
        let limit = self.sandbox.max_network_connections;
        if self.network_connections >= limit {
            tracing::warn!(
                plugin = %self.identity.id,
                limit,
                "network connection limit reached"
            );
            return Err(TrustError::NetworkConnectionLimitExceeded { limit });
        }
        self.network_connections += 1;
        tracing::debug!(
            plugin = %self.identity.id,
            open = self.network_connections,
            limit,
            "network connection acquired"
        );
        Ok(())
    }

    /// Return one network connection, never going below zero
    pub fn release_network_connection(&mut self) {
        self.network_connections = self.network_connections.saturating_sub(1);
    }

    /// Reject call stacks deeper than `max_recursion_depth`
    pub fn check_recursion_depth(&self, depth: u32) -> TrustResult<()> {
        let limit = self.sandbox.max_recursion_depth;
        if depth > limit {
            tracing::warn!(plugin = %self.identity.id, depth, limit, "recursion limit exceeded");
            return Err(TrustError::RecursionLimitExceeded { depth, limit });
        }
        Ok(())
    }

    // ========================================================================
    // Execution window
    // ========================================================================

    /// Open the execution window, overwriting any window already open
    pub fn start_execution(&mut self) {
        self.execution_start = Some(Instant::now());
    }

    /// Cooperative timeout check; the host must poll this while the plugin runs
    pub fn check_execution_timeout(&self) -> TrustResult<()> {
        let Some(start) = self.execution_start else {
            return Ok(());
        };
        let elapsed = start.elapsed();
        let limit = self.sandbox.max_execution_time();
        if elapsed > limit {
            tracing::warn!(
                plugin = %self.identity.id,
                elapsed_ms = elapsed.as_millis() as u64,
                limit_ms = self.sandbox.max_execution_time_ms,
                "execution timed out"
            );
            return Err(TrustError::ExecutionTimeout { elapsed, limit });
        }
        Ok(())
    }

    /// Close the execution window
    pub fn end_execution(&mut self) {
        self.execution_start = None;
    }

    /// Whether an execution window is open
    pub fn is_executing(&self) -> bool {
        self.execution_start.is_some()
    }

    // ========================================================================
    // Signatures
    // ========================================================================

    /// Sign `data` with the publisher key and store the signature
    ///
    /// Returns the encoded signature.
    pub fn sign(&mut self, secret_key: &SecretKey, data: &[u8]) -> String {
        let signature = secret_key.sign(data);
        self.signature = Some(signature.clone());
        signature
    }

    /// Verify the stored signature over `data`
    ///
    /// The identity fingerprint is computed and traced but not part of the
    /// signed payload; use [`Plugin::verify_bound`] to bind identity.
    pub fn verify(&mut self, public_key: &str, data: &[u8]) -> TrustResult<()> {
        let fingerprint = self.identity.fingerprint_hex();
        tracing::debug!(plugin = %self.identity.id, %fingerprint, "verifying plugin signature");
        self.verify_payload(public_key, data)
    }

    /// Sign `binding_digest || data`, tying the signature to this `id:name:version`
    pub fn sign_bound(&mut self, secret_key: &SecretKey, data: &[u8]) -> String {
        let payload = self.bound_payload(data);
        self.sign(secret_key, &payload)
    }

    /// Verify a signature produced by [`Plugin::sign_bound`]
    pub fn verify_bound(&mut self, public_key: &str, data: &[u8]) -> TrustResult<()> {
        let payload = self.bound_payload(data);
        self.verify_payload(public_key, &payload)
    }

    fn bound_payload(&self, data: &[u8]) -> Vec<u8> {
        let digest = self.identity.binding_digest();
        let mut payload = Vec::with_capacity(digest.len() + data.len());
        payload.extend_from_slice(&digest);
        payload.extend_from_slice(data);
        payload
    }

    fn verify_payload(&mut self, public_key: &str, payload: &[u8]) -> TrustResult<()> {
        let signature = self
            .signature
            .as_deref()
            .ok_or_else(|| TrustError::NoSignature(self.identity.id.clone()))?;

        match signing::verify_encoded(&self.identity.id, public_key, signature, payload) {
            Ok(()) => {
                self.verified = true;
                tracing::debug!(plugin = %self.identity.id, "signature verified");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(plugin = %self.identity.id, error = %e, "signature rejected");
                Err(e)
            }
        }
    }
}
