//! warden: command line front-end for the plugin trust core
//!
//! Publisher-side operations (key generation, package signing) and
//! operator-side checks (signature verification, policy inspection, audited
//! permission checks) on top of `warden-host`.

pub mod commands;
pub mod tracing_support;
