use super::*;

#[test]
fn file_values_override_defaults() {
    let mut settings = DesktopSettings::default();
    apply_file_overrides(
        &mut settings,
        "server_url = \"https://items.example.com\"\nlog_filter = \"debug\"\n",
    );
    assert_eq!(settings.server_url, "https://items.example.com");
    assert_eq!(settings.log_filter, "debug");
}

#[test]
fn malformed_file_keeps_defaults() {
    let mut settings = DesktopSettings::default();
    apply_file_overrides(&mut settings, "server_url = ");
    assert_eq!(settings, DesktopSettings::default());
}

#[test]
fn environment_wins_over_file() {
    let mut settings = DesktopSettings::default();
    apply_file_overrides(&mut settings, "server_url = \"http://from-file:1\"\n");
    apply_env_overrides(&mut settings, |key| {
        (key == "APP__SERVER_URL").then(|| "http://from-env:2".to_string())
    });
    assert_eq!(settings.server_url, "http://from-env:2");
    assert_eq!(settings.log_filter, DesktopSettings::default().log_filter);
}

#[test]
fn missing_explicit_file_falls_back_to_defaults() {
    let settings = load_settings(Some(Path::new("/nonexistent/cloud_items/desktop.toml")));
    assert!(!settings.server_url.is_empty());
}
