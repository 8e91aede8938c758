//! End-to-end flows through the plugin manager

use warden_host::{
    generate_key_pair, AuditAction, HostConfig, Permission, PluginIdentity,
    PluginManager, SandboxConfig, SecurityPolicy, TrustError,
};

fn identity(id: &str) -> PluginIdentity {
    PluginIdentity::new(id, "Weather Widget", "2.1.0", "Acme")
}

#[test]
fn test_host_invocation_cycle() {
    let config = HostConfig::new().with_sandbox(
        SandboxConfig::new()
            .with_max_memory(4096)
            .with_max_file_handles(1),
    );
    let mut manager = PluginManager::with_config(config);
    let plugin = manager.create_plugin(identity("weather"), SecurityPolicy::Standard);
    manager.register(plugin);

    // Host wraps one plugin invocation
    manager.get_mut("weather").unwrap().start_execution();

    manager
        .check_permission("weather", Permission::HttpClient)
        .unwrap();
    {
        let plugin = manager.get_mut("weather").unwrap();
        plugin.check_memory_limit(2048).unwrap();
        plugin.check_file_handle_limit().unwrap();
        assert!(matches!(
            plugin.check_file_handle_limit(),
            Err(TrustError::FileHandleLimitExceeded { .. })
        ));
        plugin.check_execution_timeout().unwrap();
    }

    let denied = manager.check_permission("weather", Permission::ExecuteCommands);
    assert!(denied.unwrap_err().is_security_violation());

    {
        let plugin = manager.get_mut("weather").unwrap();
        plugin.release_file_handle();
        plugin.release_memory(2048);
        plugin.end_execution();
        let usage = plugin.usage();
        assert_eq!(usage.memory_used, 0);
        assert_eq!(usage.file_handles, 0);
        assert!(usage.elapsed.is_none());
    }

    let checks: Vec<(Option<Permission>, bool)> = manager
        .audit_log()
        .iter()
        .filter(|e| e.action == AuditAction::PermissionCheck)
        .map(|e| (e.permission, e.allowed))
        .collect();
    assert_eq!(
        checks,
        vec![
            (Some(Permission::HttpClient), true),
            (Some(Permission::ExecuteCommands), false),
        ]
    );
}

#[test]
fn test_verify_plugin_through_manager() {
    let publisher = generate_key_pair();
    let package = b"fn main() { render_forecast(); }";

    let mut manager = PluginManager::new();
    let mut plugin = manager.create_plugin(identity("weather"), SecurityPolicy::Minimal);
    plugin.sign(&publisher.secret_key, package);
    manager.register(plugin);

    assert!(matches!(
        manager.verify_plugin("weather", &publisher.public_key, b"tampered"),
        Err(TrustError::SignatureVerificationFailed(_))
    ));
    assert!(!manager.get("weather").unwrap().is_verified());

    manager
        .verify_plugin("weather", &publisher.public_key, package)
        .unwrap();
    assert!(manager.get("weather").unwrap().is_verified());

    assert!(matches!(
        manager.verify_plugin("ghost", &publisher.public_key, package),
        Err(TrustError::PluginNotFound(_))
    ));

    let outcomes: Vec<bool> = manager
        .audit_log()
        .iter()
        .filter(|e| e.action == AuditAction::Verified)
        .map(|e| e.allowed)
        .collect();
    assert_eq!(outcomes, vec![false, true]);
}

#[test]
fn test_unsigned_plugin_cannot_verify() {
    let publisher = generate_key_pair();
    let mut manager = PluginManager::new();
    let plugin = manager.create_plugin(identity("weather"), SecurityPolicy::Minimal);
    manager.register(plugin);

    assert!(matches!(
        manager.verify_plugin("weather", &publisher.public_key, b"code"),
        Err(TrustError::NoSignature(_))
    ));
}

#[test]
fn test_audit_log_drains_to_jsonl_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let config = HostConfig::new().with_audit_log(&path);

    let mut manager = PluginManager::with_config(config);
    let plugin = manager.create_plugin(identity("weather"), SecurityPolicy::Unrestricted);
    manager.register(plugin);
    manager
        .check_permission("weather", Permission::IpcSend)
        .unwrap();
    manager.unregister("weather");

    let sink = manager.config().audit_sink().unwrap();
    assert_eq!(manager.flush_audit_log(sink.as_ref()).unwrap(), 3);

    let content = std::fs::read_to_string(&path).unwrap();
    let actions: Vec<String> = content
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["action"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        actions,
        vec!["registered", "permission_check", "unregistered"]
    );
}
