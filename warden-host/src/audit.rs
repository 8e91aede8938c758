//! Audit trail for authorization decisions and plugin lifecycle
//!
//! [`crate::manager::PluginManager`] keeps an in-memory, append-only list of
//! [`AuditEntry`] records. Draining that list to durable storage is done
//! through an [`AuditSink`], which host applications implement to route
//! entries to their preferred destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use thiserror::Error;
use warden_api::Permission;

/// Kind of event an audit entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Registered,
    Unregistered,
    PermissionCheck,
    PermissionGranted,
    PermissionRevoked,
    Verified,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Unregistered => "unregistered",
            Self::PermissionCheck => "permission_check",
            Self::PermissionGranted => "permission_granted",
            Self::PermissionRevoked => "permission_revoked",
            Self::Verified => "verified",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One authorization decision or lifecycle event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub plugin_id: String,
    pub action: AuditAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<Permission>,
    /// Whether the action was allowed / succeeded
    pub allowed: bool,
}

impl AuditEntry {
    pub fn new(plugin_id: impl Into<String>, action: AuditAction, allowed: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            plugin_id: plugin_id.into(),
            action,
            permission: None,
            allowed,
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }
}

/// Error type for audit sinks
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Failed to write audit log: {0}")]
    WriteError(#[from] std::io::Error),

    #[error("Failed to serialize audit entry: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Audit sink not available: {0}")]
    Unavailable(String),
}

/// Destination for drained audit entries
///
/// # Example
///
/// ```rust
/// use warden_host::audit::{AuditEntry, AuditError, AuditSink};
///
/// struct StderrSink;
///
/// impl AuditSink for StderrSink {
///     fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
///         eprintln!("{} {} {}", entry.plugin_id, entry.action, entry.allowed);
///         Ok(())
///     }
///
///     fn flush(&self) -> Result<(), AuditError> {
///         Ok(())
///     }
/// }
/// ```
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Flush any buffered entries
    fn flush(&self) -> Result<(), AuditError>;

    fn is_healthy(&self) -> bool {
        true
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Appends entries to a file, one JSON object per line
pub struct FileAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileAuditSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let json = serde_json::to_string(entry)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| AuditError::Unavailable("audit writer lock poisoned".into()))?;
        writeln!(writer, "{}", json)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| AuditError::Unavailable("audit writer lock poisoned".into()))?;
        writer.flush()?;
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.path.parent().map(|p| p.exists()).unwrap_or(true)
    }
}

impl fmt::Debug for FileAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAuditSink")
            .field("path", &self.path)
            .finish()
    }
}

/// Bounded in-memory sink; the oldest entry is evicted when full
pub struct MemoryAuditSink {
    entries: RwLock<VecDeque<AuditEntry>>,
    max_entries: usize,
}

impl MemoryAuditSink {
    /// Capacity of 1000 entries
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries.min(1000))),
            max_entries,
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        match self.entries.read() {
            Ok(entries) => entries.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn find_by_action(&self, action: AuditAction) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.action == action)
            .collect()
    }

    pub fn find_by_plugin(&self, plugin_id: &str) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.plugin_id == plugin_id)
            .collect()
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        if self.max_entries == 0 {
            return Ok(());
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuditError::Unavailable("memory sink lock poisoned".into()))?;
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

impl fmt::Debug for MemoryAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAuditSink")
            .field("count", &self.count())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

/// Discards every entry
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl NullAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for NullAuditSink {
    fn record(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Fans entries out to several sinks
#[derive(Default)]
pub struct CompositeAuditSink {
    sinks: Vec<Box<dyn AuditSink>>,
}

impl CompositeAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl AuditSink for CompositeAuditSink {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        for sink in &self.sinks {
            sink.record(entry)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        for sink in &self.sinks {
            sink.flush()?;
        }
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.sinks.iter().all(|s| s.is_healthy())
    }
}

impl fmt::Debug for CompositeAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeAuditSink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl<S: AuditSink + ?Sized> AuditSink for std::sync::Arc<S> {
    fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        (**self).record(entry)
    }

    fn flush(&self) -> Result<(), AuditError> {
        (**self).flush()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn check(plugin: &str, allowed: bool) -> AuditEntry {
        AuditEntry::new(plugin, AuditAction::PermissionCheck, allowed)
            .with_permission(Permission::ReadFiles)
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemoryAuditSink::new();
        sink.record(&check("test-plugin", true)).unwrap();
        sink.record(&AuditEntry::new("other", AuditAction::Registered, true))
            .unwrap();

        assert_eq!(sink.count(), 2);
        let checks = sink.find_by_action(AuditAction::PermissionCheck);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].plugin_id, "test-plugin");
        assert_eq!(sink.find_by_plugin("other").len(), 1);

        sink.clear();
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_memory_sink_eviction() {
        let sink = MemoryAuditSink::with_capacity(2);
        for i in 0..3 {
            sink.record(&check(&format!("plugin-{}", i), true)).unwrap();
        }

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].plugin_id, "plugin-1");
        assert_eq!(entries[1].plugin_id, "plugin-2");
    }

    #[test]
    fn test_null_sink() {
        let sink = NullAuditSink::new();
        assert!(sink.record(&check("test", false)).is_ok());
        assert!(sink.flush().is_ok());
    }

    #[test]
    fn test_composite_sink() {
        let first = Arc::new(MemoryAuditSink::new());
        let second = Arc::new(MemoryAuditSink::new());
        let composite = CompositeAuditSink::new()
            .with_sink(Arc::clone(&first))
            .with_sink(Arc::clone(&second))
            .with_sink(NullAuditSink);

        composite.record(&check("test", true)).unwrap();
        composite.flush().unwrap();

        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 1);
        assert!(composite.is_healthy());
    }

    #[test]
    fn test_entry_serialization() {
        let entry = check("notes", false);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""action":"permission_check""#));
        assert!(json.contains(r#""permission":"read-files""#));
        assert!(json.contains(r#""allowed":false"#));

        let lifecycle = AuditEntry::new("notes", AuditAction::Unregistered, true);
        let json = serde_json::to_string(&lifecycle).unwrap();
        assert!(!json.contains("permission"));
    }

    #[test]
    fn test_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("audit.jsonl");

        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(&check("a", true)).unwrap();
        sink.record(&check("b", false)).unwrap();
        sink.flush().unwrap();
        assert!(sink.is_healthy());

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let decoded: AuditEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(decoded.plugin_id, "b");
        assert!(!decoded.allowed);
    }
}
