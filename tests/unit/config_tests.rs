use licensegate::config::DEFAULT_ADMIN_PERMISSION;
use licensegate::models::approval::ApprovalType;
use licensegate::{config::GlobalConfig, AppError};

fn sample_toml() -> &'static str {
    r#"
db_path = "/var/lib/licensegate/state.db"
audit_log_dir = "/var/log/licensegate"
admin_permission = "licenses.transfer.approve"

[timeouts]
source_hours = 24
target_hours = 48
admin_hours = 96
"#
}

#[test]
fn parses_full_config() {
    let config = GlobalConfig::from_toml_str(sample_toml()).expect("valid config");
    assert_eq!(config.db_path.to_str(), Some("/var/lib/licensegate/state.db"));
    assert_eq!(
        config.audit_log_dir.as_deref().and_then(|p| p.to_str()),
        Some("/var/log/licensegate")
    );
    assert_eq!(config.admin_permission, "licenses.transfer.approve");
    assert_eq!(config.timeouts.hours_for(ApprovalType::Source), 24);
    assert_eq!(config.timeouts.hours_for(ApprovalType::Target), 48);
    assert_eq!(config.timeouts.hours_for(ApprovalType::Admin), 96);
}

#[test]
fn empty_config_uses_defaults() {
    let config = GlobalConfig::from_toml_str("").expect("defaults");
    assert_eq!(config, GlobalConfig::default());
    assert_eq!(config.admin_permission, DEFAULT_ADMIN_PERMISSION);
    assert!(config.audit_log_dir.is_none());
    assert_eq!(config.timeouts.source_hours, 72);
    assert_eq!(config.timeouts.target_hours, 72);
    assert_eq!(config.timeouts.admin_hours, 120);
}

#[test]
fn partial_timeouts_keep_other_defaults() {
    let config = GlobalConfig::from_toml_str("[timeouts]\nadmin_hours = 10\n").expect("valid");
    assert_eq!(config.timeouts.source_hours, 72);
    assert_eq!(config.timeouts.admin_hours, 10);
}

#[test]
fn zero_timeout_is_rejected() {
    let result = GlobalConfig::from_toml_str("[timeouts]\ntarget_hours = 0\n");
    assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("target_hours")));
}

#[test]
fn blank_admin_permission_is_rejected() {
    let result = GlobalConfig::from_toml_str("admin_permission = \"  \"\n");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn invalid_toml_is_config_error() {
    let result = GlobalConfig::from_toml_str("timeouts = [");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn load_from_path_reads_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("config.toml");
    std::fs::write(&path, sample_toml()).expect("write config");

    let config = GlobalConfig::load_from_path(&path).expect("load");
    assert_eq!(config.timeouts.source_hours, 24);
}

#[test]
fn load_from_missing_path_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let result = GlobalConfig::load_from_path(temp.path().join("absent.toml"));
    assert!(matches!(result, Err(AppError::Config(_))));
}
