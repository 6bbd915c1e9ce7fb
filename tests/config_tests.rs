use std::time::Duration;

use kiosk_console::config::Configuration;

#[test]
fn parse_empty_config_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg.bind_address, ([127, 0, 0, 1], 8080).into());
    assert_eq!(cfg.poll_interval, Duration::from_secs(30));
    assert_eq!(cfg.advance_fallback, Duration::from_secs(10));
    assert_eq!(cfg.retry_delay, Duration::from_secs(30));
    assert_eq!(cfg.log_capacity, 100);
    assert_eq!(cfg.bootstrap_admin.username, "admin");
}

#[test]
fn parse_kebab_case_overrides() {
    let yaml = r#"
bind-address: "0.0.0.0:9090"
data-file: "/var/lib/kiosk/console.json"
poll-interval: 10s
advance-fallback: 5s
log-capacity: 25
bootstrap-admin:
  username: ops
  password: hunter2
  full-name: Operations
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.bind_address, ([0, 0, 0, 0], 9090).into());
    assert_eq!(cfg.poll_interval, Duration::from_secs(10));
    assert_eq!(cfg.advance_fallback, Duration::from_secs(5));
    assert_eq!(cfg.log_capacity, 25);
    assert_eq!(cfg.bootstrap_admin.username, "ops");
    assert_eq!(cfg.bootstrap_admin.full_name, "Operations");
}

#[test]
fn bootstrap_full_name_defaults() {
    let yaml = r#"
bootstrap-admin:
  username: ops
  password: hunter2
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.bootstrap_admin.full_name, "Administrator");
}

#[test]
fn validation_rejects_zero_poll_interval() {
    let cfg: Configuration = serde_yaml::from_str("poll-interval: 0s").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("poll-interval"));
}

#[test]
fn validation_rejects_empty_bootstrap_password() {
    let yaml = r#"
bootstrap-admin:
  username: ops
  password: ""
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn unknown_keys_are_rejected() {
    let result: Result<Configuration, _> = serde_yaml::from_str("pol-interval: 10s");
    assert!(result.is_err());
}
