#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use leasegate_enforcement::config::{self, AuthHeader};

fn assert_config_error(yaml: &str, needle: &str) {
    let err = config::load_from_str(yaml).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
    assert!(err.to_string().contains(needle), "{err} does not mention {needle}");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert!(cfg.enforcement.enabled_filters.is_empty());
    assert_eq!(cfg.enforcement.hook_timeout_ms, 30_000);
    assert!(cfg.filters.external_service.is_none());
}

#[test]
fn ok_full_config() {
    let ok = r#"
version: 1
enforcement:
  enabled_filters: [MaxReservationLengthFilter, ExternalServiceFilter]
  exempt_projects: ["admin"]
  hook_timeout_ms: 10000
filters:
  max_reservation_length:
    max_reservation_length: 86400
    reservation_extension_window: 3600
    exempt_project_ids: ["ops"]
  external_service:
    endpoint: "http://policy.local/"
    token: "s3cret"
    auth_header: x_auth_token
    timeout_ms: 3000
    connect_timeout_ms: 500
    max_retries: 2
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(
        cfg.enforcement.enabled_filters,
        vec!["MaxReservationLengthFilter", "ExternalServiceFilter"]
    );
    let mrl = cfg.filters.max_reservation_length.as_ref().unwrap();
    assert_eq!(mrl.max_reservation_length, 86_400);
    assert_eq!(mrl.reservation_extension_window, Some(3600));

    let ext = cfg.filters.external_service.as_ref().unwrap();
    assert_eq!(ext.auth_header, AuthHeader::XAuthToken);
    assert_eq!(ext.max_retries, 2);
    assert_eq!(ext.backoff_initial_ms, 100);
    // Token must never leak through Debug.
    assert!(!format!("{ext:?}").contains("s3cret"));
}

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
filters:
  max_reservation_length:
    max_reservation_lenght: 86400 # typo should fail
"#;
    assert_config_error(bad, "invalid yaml");
}

#[test]
fn rejects_unsupported_version() {
    assert_config_error("version: 2\n", "version");
}

#[test]
fn rejects_duplicate_enabled_filters() {
    let bad = r#"
version: 1
enforcement:
  enabled_filters: [MaxReservationLengthFilter, MaxReservationLengthFilter]
filters:
  max_reservation_length:
    max_reservation_length: 60
"#;
    assert_config_error(bad, "more than once");
}

#[test]
fn rejects_zero_threshold() {
    let bad = r#"
version: 1
filters:
  max_reservation_length:
    max_reservation_length: 0
"#;
    assert_config_error(bad, "must be positive");
}

#[test]
fn external_service_needs_a_url() {
    let bad = r#"
version: 1
filters:
  external_service:
    token: "t"
"#;
    assert_config_error(bad, "endpoint");
}

#[test]
fn external_service_needs_exactly_one_token_source() {
    let none = r#"
version: 1
filters:
  external_service:
    endpoint: "http://policy.local"
"#;
    assert_config_error(none, "token");

    let both = r#"
version: 1
filters:
  external_service:
    endpoint: "http://policy.local"
    token: "t"
    token_env: "POLICY_TOKEN"
"#;
    assert_config_error(both, "only one");
}

#[test]
fn external_service_rejects_bad_urls_and_timeouts() {
    let scheme = r#"
version: 1
filters:
  external_service:
    endpoint: "ftp://policy.local"
    token: "t"
"#;
    assert_config_error(scheme, "unsupported scheme");

    let timeouts = r#"
version: 1
filters:
  external_service:
    endpoint: "http://policy.local"
    token: "t"
    timeout_ms: 100
    connect_timeout_ms: 500
"#;
    assert_config_error(timeouts, "connect_timeout_ms");
}

#[test]
fn load_from_missing_file_is_configuration_error() {
    let err = config::load_from_file("/nonexistent/leasegate.yaml").unwrap_err();
    assert_eq!(err.code().as_str(), "CONFIGURATION");
}
