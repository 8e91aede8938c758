//! Plugin registry and audited authorization entry point
//!
//! The manager exclusively owns every registered [`Plugin`]. Permission
//! checks made through [`PluginManager::check_permission`] are always
//! recorded in the audit log, whether allowed or denied. Calls made directly
//! on a [`Plugin`] are not audited and are outside the trust boundary.
//!
//! The manager is not internally synchronized. Hosts sharing one across
//! threads wrap it in their own lock.

use std::collections::HashMap;

use warden_api::{Permission, PluginIdentity, SecurityPolicy};

use crate::audit::{AuditAction, AuditEntry, AuditError, AuditSink};
use crate::config::HostConfig;
use crate::error::{TrustError, TrustResult};
use crate::plugin::Plugin;

/// Registry of live plugins plus the audit log
#[derive(Debug, Default)]
pub struct PluginManager {
    plugins: HashMap<String, Plugin>,
    audit_log: Vec<AuditEntry>,
    config: HostConfig,
}

impl PluginManager {
    /// Empty manager with the default host config
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty manager whose new plugins use `config` defaults
    pub fn with_config(config: HostConfig) -> Self {
        Self {
            plugins: HashMap::new(),
            audit_log: Vec::new(),
            config,
        }
    }

    /// Host config this manager was built with
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Build a plugin with this manager's default sandbox quotas
    ///
    /// The plugin is not registered.
    pub fn create_plugin(&self, identity: PluginIdentity, policy: SecurityPolicy) -> Plugin {
        Plugin::with_sandbox(identity, policy, self.config.sandbox)
    }

    /// Build a plugin with the configured default policy
    pub fn create_default_plugin(&self, identity: PluginIdentity) -> Plugin {
        self.create_plugin(identity, self.config.default_policy)
    }

    /// Insert a plugin; an existing plugin with the same id is replaced
    pub fn register(&mut self, plugin: Plugin) {
        let id = plugin.id().to_string();
        if self.plugins.insert(id.clone(), plugin).is_some() {
            tracing::warn!(plugin = %id, "replaced previously registered plugin");
        } else {
            tracing::info!(plugin = %id, "plugin registered");
        }
        self.record(AuditEntry::new(id, AuditAction::Registered, true));
    }

    /// Remove and drop a plugin; absent ids are ignored
    pub fn unregister(&mut self, plugin_id: &str) {
        let removed = self.plugins.remove(plugin_id).is_some();
        if removed {
            tracing::info!(plugin = %plugin_id, "plugin unregistered");
        }
        self.record(AuditEntry::new(
            plugin_id,
            AuditAction::Unregistered,
            removed,
        ));
    }

    /// Look up a registered plugin
    pub fn get(&self, plugin_id: &str) -> Option<&Plugin> {
        self.plugins.get(plugin_id)
    }

    /// Mutable lookup, used by the host for quota and execution calls
    pub fn get_mut(&mut self, plugin_id: &str) -> Option<&mut Plugin> {
        self.plugins.get_mut(plugin_id)
    }

    /// Whether `plugin_id` is registered
    pub fn contains(&self, plugin_id: &str) -> bool {
        self.plugins.contains_key(plugin_id)
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Registered ids, sorted
    pub fn plugin_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Audited permission check
    ///
    /// An unknown id fails with [`TrustError::PluginNotFound`] and leaves the
    /// audit log untouched.
    pub fn check_permission(
        &mut self,
        plugin_id: &str,
        permission: Permission,
    ) -> TrustResult<()> {
        let Some(plugin) = self.plugins.get(plugin_id) else {
            tracing::warn!(plugin = %plugin_id, %permission, "permission check for unknown plugin");
            return Err(TrustError::PluginNotFound(plugin_id.to_string()));
        };

        let result = plugin.check_permission(permission);
        match &result {
            Ok(()) => tracing::debug!(plugin = %plugin_id, %permission, "permission allowed"),
            Err(_) => tracing::warn!(plugin = %plugin_id, %permission, "permission denied"),
        }

        self.record(
            AuditEntry::new(plugin_id, AuditAction::PermissionCheck, result.is_ok())
                .with_permission(permission),
        );
        result
    }

    /// Add a permission to a registered plugin
    pub fn grant_permission(
        &mut self,
        plugin_id: &str,
        permission: Permission,
    ) -> TrustResult<()> {
        self.plugin_mut(plugin_id)?.grant(permission);
        tracing::info!(plugin = %plugin_id, %permission, "permission granted");
        self.record(
            AuditEntry::new(plugin_id, AuditAction::PermissionGranted, true)
                .with_permission(permission),
        );
        Ok(())
    }

    /// Remove a permission from a registered plugin
    pub fn revoke_permission(
        &mut self,
        plugin_id: &str,
        permission: Permission,
    ) -> TrustResult<()> {
        self.plugin_mut(plugin_id)?.revoke(permission);
        tracing::info!(plugin = %plugin_id, %permission, "permission revoked");
        self.record(
            AuditEntry::new(plugin_id, AuditAction::PermissionRevoked, true)
                .with_permission(permission),
        );
        Ok(())
    }

    /// Verify a registered plugin's signature and audit the outcome
    pub fn verify_plugin(
        &mut self,
        plugin_id: &str,
        public_key: &str,
        data: &[u8],
    ) -> TrustResult<()> {
        let result = self.plugin_mut(plugin_id)?.verify(public_key, data);
        self.record(AuditEntry::new(
            plugin_id,
            AuditAction::Verified,
            result.is_ok(),
        ));
        result
    }

    /// Entries recorded since the last clear or flush, oldest first
    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit_log
    }

    /// Wipe the audit log; plugin state is untouched
    pub fn clear_audit_log(&mut self) {
        self.audit_log.clear();
    }

    /// Drain the audit log into `sink`
    ///
    /// Every entry the sink accepts is removed from the log, even when a later
    /// record or the final flush fails, so a retry never hands the sink the
    /// same entry twice. Entries after the first rejected one stay queued.
    /// Returns the number of entries written.
    pub fn flush_audit_log(&mut self, sink: &dyn AuditSink) -> Result<usize, AuditError> {
        let mut accepted = 0;
        let mut failure = None;
        for entry in &self.audit_log {
            if let Err(e) = sink.record(entry) {
                failure = Some(e);
                break;
            }
            accepted += 1;
        }
        self.audit_log.drain(..accepted);

        if let Some(e) = failure {
            tracing::warn!(
                accepted,
                pending = self.audit_log.len(),
                error = %e,
                "audit sink rejected entry"
            );
            return Err(e);
        }

        sink.flush()?;
        tracing::debug!(count = accepted, "audit log flushed");
        Ok(accepted)
    }

    fn plugin_mut(&mut self, plugin_id: &str) -> TrustResult<&mut Plugin> {
        self.plugins
            .get_mut(plugin_id)
            .ok_or_else(|| TrustError::PluginNotFound(plugin_id.to_string()))
    }

    fn record(&mut self, entry: AuditEntry) {
        self.audit_log.push(entry);
    }
}
