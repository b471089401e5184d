use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<HashMap<_, _>>();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn strips_trailing_slashes_from_base_url() {
    assert_eq!(
        prepare_base_url(" https://api.example.org/v1// ").expect("valid url"),
        "https://api.example.org/v1"
    );
}

#[test]
fn blank_base_url_falls_back_to_default() {
    assert_eq!(
        prepare_base_url("   ").expect("default url"),
        ClientSettings::default().api_base_url
    );
}

#[test]
fn rejects_non_http_base_url() {
    let err = prepare_base_url("ftp://files.example.org").expect_err("must reject");
    assert!(err.to_string().contains("unsupported scheme"), "{err}");
    assert!(prepare_base_url("not a url").is_err());
}

#[test]
fn prefixed_env_overrides_win() {
    let mut settings = ClientSettings::default();
    apply_env(
        &mut settings,
        lookup_from(&[
            ("APPEALS_API_BASE_URL", "http://plain.example"),
            ("APP__API_BASE_URL", "http://prefixed.example"),
            ("APPEALS_AUTH_TOKEN", "token-a"),
            ("APP__REQUEST_TIMEOUT_SECS", "5"),
            ("APP__PAGE_SIZE", "50"),
        ]),
    );

    assert_eq!(settings.api_base_url, "http://prefixed.example");
    assert_eq!(settings.auth_token.as_deref(), Some("token-a"));
    assert_eq!(settings.request_timeout_secs, 5);
    assert_eq!(settings.page_size, 50);
}

#[test]
fn unparsable_numbers_are_ignored() {
    let mut settings = ClientSettings::default();
    apply_env(
        &mut settings,
        lookup_from(&[
            ("APP__REQUEST_TIMEOUT_SECS", "soon"),
            ("APP__PAGE_SIZE", "-3"),
        ]),
    );

    assert_eq!(settings, ClientSettings::default());
}

#[test]
fn zero_limits_fall_back_to_defaults() {
    let mut settings = ClientSettings::default();
    apply_env(
        &mut settings,
        lookup_from(&[
            ("APP__REQUEST_TIMEOUT_SECS", "0"),
            ("APP__PAGE_SIZE", "0"),
        ]),
    );
    enforce_limits(&mut settings);
    assert_eq!(settings, ClientSettings::default());

    let mut settings = ClientSettings::default();
    apply_file(
        &mut settings,
        toml::from_str("page_size = 0\nrequest_timeout_secs = 0\n").expect("file settings"),
    );
    enforce_limits(&mut settings);
    assert_eq!(settings.page_size, 10);
    assert_eq!(settings.request_timeout_secs, 30);
}

#[test]
fn zero_limits_in_file_fall_back() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("appeals_store_zero_page_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("appeals.toml");
    fs::write(&path, "page_size = 0\nrequest_timeout_secs = 0\n").expect("write settings");

    let settings = load_settings_from(&path).expect("load settings");
    assert!(settings.page_size > 0);
    assert!(settings.request_timeout_secs > 0);

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn reads_settings_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("appeals_store_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join("appeals.toml");
    fs::write(
        &path,
        "api_base_url = \"https://crm.example.org/api/\"\npage_size = 25\n",
    )
    .expect("write settings");

    let settings = load_settings_from(&path).expect("load settings");
    // Host env overrides take precedence over the file.
    if env::var("APPEALS_API_BASE_URL").is_err() && env::var("APP__API_BASE_URL").is_err() {
        assert_eq!(settings.api_base_url, "https://crm.example.org/api");
    }
    if env::var("APP__PAGE_SIZE").is_err() {
        assert_eq!(settings.page_size, 25);
    }

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn missing_file_yields_defaults() {
    let settings = load_settings_from(Path::new("/nonexistent/appeals.toml")).expect("defaults");
    if env::var("APP__REQUEST_TIMEOUT_SECS").is_err() {
        assert_eq!(settings.request_timeout_secs, 30);
    }
}
