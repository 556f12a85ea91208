use std::{collections::HashMap, fs, path::Path};

const DEFAULT_CONFIG_FILE: &str = "desktop.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopSettings {
    pub server_url: String,
    pub log_filter: String,
}

impl Default for DesktopSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8443".into(),
            log_filter: "warn".into(),
        }
    }
}

/// Defaults, then the config file (`desktop.toml` unless `config_path` is given), then environment.
pub fn load_settings(config_path: Option<&Path>) -> DesktopSettings {
    let mut settings = DesktopSettings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file_overrides(&mut settings, &raw),
        Err(err) if config_path.is_some() => {
            tracing::warn!(path = %path.display(), %err, "config file unreadable; using defaults");
        }
        Err(_) => {}
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_overrides(settings: &mut DesktopSettings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("server_url") {
        settings.server_url = v.clone();
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

fn apply_env_overrides(settings: &mut DesktopSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
