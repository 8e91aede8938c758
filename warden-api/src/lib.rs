//! warden-api: Shared types for the warden plugin trust core
//!
//! This crate defines the vocabulary shared between a plugin host and the
//! tooling that packages plugins: capability tokens, the fixed security
//! policy presets, numeric sandbox quotas and plugin identity.

pub mod identity;
pub mod permission;
pub mod policy;
pub mod sandbox;

pub use identity::PluginIdentity;
pub use permission::{ParsePermissionError, Permission, PermissionCategory, PermissionSet};
pub use policy::{ParsePolicyError, SecurityPolicy};
pub use sandbox::SandboxConfig;
