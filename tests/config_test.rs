use oidc_edge_gate::prelude::*;
use std::time::Duration;

fn config() -> Config {
    ConfigBuilder::new()
        .provider_url("https://accounts.example.test")
        .unwrap()
        .redirect_uri("https://app.example.com/_callback")
        .unwrap()
        .client_id("gate-client".to_string())
        .client_secret(ClientSecret::new("gate-secret"))
        .hosted_domain("@Example.com")
        .allow_redirect_host("docs.example.com")
        .build()
        .unwrap()
}

#[test]
fn test_builder_applies_defaults() {
    let config = config();

    assert_eq!(config.hosted_domain, "example.com");
    assert_eq!(config.callback_path, "/_callback");
    assert_eq!(config.cookie_name, "token");
    assert_eq!(config.scopes, "openid email");
    assert_eq!(config.discovery_path, ".well-known/openid-configuration");
    assert_eq!(config.http_timeout, Duration::from_secs(10));
    assert_eq!(config.verification.leeway, Duration::from_secs(60));
    assert!(config.verification.validate_audience);
    assert_eq!(
        config.allowed_redirect_hosts,
        vec!["app.example.com".to_string(), "docs.example.com".to_string()]
    );
    assert_eq!(config.redirect_origin(), "https://app.example.com");
}

#[test]
fn test_builder_reports_missing_fields() {
    let result = ConfigBuilder::new()
        .provider_url("https://accounts.example.test")
        .unwrap()
        .client_id("gate-client".to_string())
        .build();
    assert!(matches!(result, Err(GateError::MissingConfiguration(field)) if field == "client_secret"));

    let result = ConfigBuilder::new()
        .provider_url("https://accounts.example.test")
        .unwrap()
        .client_id("gate-client".to_string())
        .client_secret(ClientSecret::new("s"))
        .redirect_uri("https://app.example.com/_callback")
        .unwrap()
        .build();
    assert!(matches!(result, Err(GateError::MissingConfiguration(field)) if field == "hosted_domain"));

    assert!(matches!(
        ConfigBuilder::new().provider_url("not a url"),
        Err(GateError::InvalidUrl(_))
    ));
}

#[test]
fn test_builder_rejects_relative_callback_path() {
    let result = ConfigBuilder::new()
        .provider_url("https://accounts.example.test")
        .unwrap()
        .redirect_uri("https://app.example.com/_callback")
        .unwrap()
        .client_id("gate-client".to_string())
        .client_secret(ClientSecret::new("gate-secret"))
        .hosted_domain("example.com")
        .callback_path("_callback")
        .build();

    assert!(matches!(result, Err(GateError::InvalidConfiguration(_))));
}

#[test]
fn test_client_secret_is_redacted() {
    let rendered = format!("{:?}", config());
    assert!(!rendered.contains("gate-secret"));
    assert!(rendered.contains("ClientSecret(***)"));
}

#[test]
fn test_settings_load_from_yaml() {
    let yaml = r#"
provider_url: https://accounts.example.test
client_id: gate-client
client_secret: gate-secret
redirect_uri: https://app.example.com/_callback
hosted_domain: example.com
cookie_name: session
http_timeout_seconds: 3
validate_audience: false
allowed_redirect_hosts:
  - docs.example.com
"#;
    let settings: GateSettings = serde_yaml::from_str(yaml).unwrap();
    let config = Config::try_from(settings).unwrap();

    assert_eq!(config.cookie_name, "session");
    assert_eq!(config.http_timeout, Duration::from_secs(3));
    assert!(!config.verification.validate_audience);
    assert_eq!(config.client_secret.expose(), "gate-secret");
    assert!(config.allowed_redirect_hosts.contains(&"docs.example.com".to_string()));
}
