//! warden-host: Plugin trust core
//!
//! This crate decides whether untrusted plugin code may perform privileged
//! operations. It provides capability checks, per-plugin resource quotas,
//! Ed25519 signature verification and an audit trail of every decision made
//! through the [`PluginManager`]. Enforcement (process isolation, Wasm
//! execution, syscall filtering) belongs to the host execution engine, which
//! consults this crate before acting.

pub mod audit;
pub mod config;
pub mod error;
pub mod manager;
pub mod plugin;
pub mod signing;

pub use audit::{
    AuditAction, AuditEntry, AuditError, AuditSink, CompositeAuditSink, FileAuditSink,
    MemoryAuditSink, NullAuditSink,
};
pub use config::{ConfigError, HostConfig};
pub use error::{TrustError, TrustResult};
pub use manager::PluginManager;
pub use plugin::{Plugin, ResourceUsage};
pub use signing::{generate_key_pair, KeyPair, SecretKey};
pub use warden_api::{
    Permission, PermissionCategory, PermissionSet, PluginIdentity, SandboxConfig, SecurityPolicy,
};
