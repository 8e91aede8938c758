//! Subcommand implementations
//!
//! Each command returns the text to print on stdout so it can be tested
//! without spawning the binary.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use warden_host::signing::{self, SecretKey};
use warden_host::{
    generate_key_pair, HostConfig, Permission, PluginIdentity, PluginManager, SecurityPolicy,
};

/// Generate a key pair, writing the secret key to `out` when given
pub fn keygen(out: Option<&Path>) -> Result<String> {
    let pair = generate_key_pair();
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, pair.secret_key.to_base64())
                .with_context(|| format!("failed to write secret key to {}", path.display()))?;
            tracing::info!(path = %path.display(), "secret key written");
            Ok(format!("public key: {}", pair.public_key))
        }
        None => Ok(format!(
            "public key: {}\nsecret key: {}",
            pair.public_key,
            pair.secret_key.to_base64()
        )),
    }
}

/// Sign a package file with a secret key file
pub fn sign(key_file: &Path, package: &Path) -> Result<String> {
    let encoded = fs::read_to_string(key_file)
        .with_context(|| format!("failed to read secret key {}", key_file.display()))?;
    let secret_key = SecretKey::from_base64(&encoded)?;
    let data = read_package(package)?;
    Ok(secret_key.sign(&data))
}

/// Verify a detached signature over a package file
pub fn verify(public_key: &str, signature: &str, package: &Path) -> Result<String> {
    let data = read_package(package)?;
    let subject = package.display().to_string();
    signing::verify_encoded(&subject, public_key, signature, &data)?;
    Ok(format!("OK: {} is signed by {}", subject, public_key))
}

/// List the permissions a policy grants
pub fn policy(policy: SecurityPolicy) -> String {
    policy
        .tokens()
        .iter()
        .map(|p| format!("{:<18} {:?}", p.as_str(), p.category()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Options for [`check`]
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub plugin_id: String,
    pub policy: Option<SecurityPolicy>,
    pub permission: Permission,
    pub config: Option<PathBuf>,
}

/// Run one audited permission check and flush the audit log
///
/// Returns whether the permission was allowed along with the report text.
pub fn check(options: &CheckOptions) -> Result<(bool, String)> {
    let config = match &options.config {
        Some(path) => HostConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => HostConfig::default(),
    };

    let mut manager = PluginManager::with_config(config);
    let identity = PluginIdentity::new(
        options.plugin_id.as_str(),
        options.plugin_id.as_str(),
        "0.0.0",
        "cli",
    );
    let policy = options.policy.unwrap_or(manager.config().default_policy);
    let plugin = manager.create_plugin(identity, policy);
    manager.register(plugin);

    let allowed = manager
        .check_permission(&options.plugin_id, options.permission)
        .is_ok();

    let sink = manager.config().audit_sink()?;
    let flushed = manager.flush_audit_log(sink.as_ref())?;
    tracing::debug!(flushed, "audit entries written");

    let verdict = if allowed { "allowed" } else { "denied" };
    Ok((
        allowed,
        format!(
            "{} under policy '{}': {} {}",
            options.plugin_id, policy, options.permission, verdict
        ),
    ))
}

fn read_package(package: &Path) -> Result<Vec<u8>> {
    fs::read(package).with_context(|| format!("failed to read package {}", package.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keygen_sign_verify() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("keys").join("publisher.key");
        let package = dir.path().join("plugin.wasm");
        fs::write(&package, b"\0asm plugin body").unwrap();

        let output = keygen(Some(&key_path)).unwrap();
        let public_key = output.strip_prefix("public key: ").unwrap().to_string();

        let signature = sign(&key_path, &package).unwrap();
        assert!(verify(&public_key, &signature, &package).is_ok());

        fs::write(&package, b"\0asm tampered body").unwrap();
        assert!(verify(&public_key, &signature, &package).is_err());
    }

    #[test]
    fn test_policy_listing() {
        let listing = policy(SecurityPolicy::Minimal);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("read-files"));
        assert!(lines[1].starts_with("system-info"));
    }

    #[test]
    fn test_check_writes_audit_log() {
        let dir = tempfile::tempdir().unwrap();
        let audit = dir.path().join("audit.jsonl");
        let config_path = dir.path().join("warden.json");
        HostConfig::new()
            .with_default_policy(SecurityPolicy::Standard)
            .with_audit_log(&audit)
            .save(&config_path)
            .unwrap();

        let (allowed, report) = check(&CheckOptions {
            plugin_id: "notes".into(),
            policy: None,
            permission: Permission::DeleteFiles,
            config: Some(config_path),
        })
        .unwrap();

        assert!(!allowed);
        assert!(report.contains("standard"));
        assert!(report.ends_with("denied"));

        let content = fs::read_to_string(&audit).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("delete-files"));
    }

    #[test]
    fn test_check_with_explicit_policy() {
        let (allowed, _) = check(&CheckOptions {
            plugin_id: "notes".into(),
            policy: Some(SecurityPolicy::Unrestricted),
            permission: Permission::ExecuteCommands,
            config: None,
        })
        .unwrap();
        assert!(allowed);
    }
}
