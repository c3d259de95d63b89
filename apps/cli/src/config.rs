use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context};
use client_core::transport::DEFAULT_SERVER_URL;
use serde::Deserialize;
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub token_path: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            token_path: default_token_path(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    token_path: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
}

fn default_token_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("articles")
        .join("session.json")
}

/// Defaults, then `config_path` if it exists, then environment overrides.
pub fn load_settings(config_path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        if let Err(err) = settings.apply_file(&raw) {
            warn!(path = %config_path.display(), error = %err, "config: ignoring unreadable settings file");
        }
    }

    settings.apply_env(|key| std::env::var(key).ok());
    settings
}

impl Settings {
    fn apply_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let file_cfg: FileSettings = toml::from_str(raw)?;
        if let Some(v) = file_cfg.server_url {
            self.server_url = v;
        }
        if let Some(v) = file_cfg.token_path {
            self.token_path = v;
        }
        match file_cfg.request_timeout_secs {
            Some(0) => warn!(
                kept = self.request_timeout_secs,
                "config: request_timeout_secs must be positive"
            ),
            Some(v) => self.request_timeout_secs = v,
            None => {}
        }
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("ARTICLES_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("APP__SERVER_URL") {
            self.server_url = v;
        }

        if let Some(v) = lookup("APP__TOKEN_PATH") {
            self.token_path = PathBuf::from(v);
        }

        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
            match v.parse::<u64>() {
                Ok(0) => warn!(value = %v, "config: APP__REQUEST_TIMEOUT_SECS must be positive"),
                Ok(parsed) => self.request_timeout_secs = parsed,
                Err(_) => warn!(value = %v, "config: APP__REQUEST_TIMEOUT_SECS is not a number"),
            }
        }
    }
}

/// Checks that `raw` is an absolute http(s) URL and strips trailing slashes.
pub fn validated_server_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).with_context(|| format!("invalid server url '{trimmed}'"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => bail!("unsupported server url scheme '{other}' in '{trimmed}'"),
    }
    if url.host_str().is_none() {
        return Err(anyhow!("server url '{trimmed}' has no host"));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut settings = Settings::default();
        settings
            .apply_file(
                r#"
                server_url = "http://articles.test:9000"
                request_timeout_secs = 5
                "#,
            )
            .expect("parse");

        assert_eq!(settings.server_url, "http://articles.test:9000");
        assert_eq!(settings.request_timeout_secs, 5);
        assert_eq!(settings.token_path, Settings::default().token_path);
    }

    #[test]
    fn app_prefixed_env_wins_over_plain_env() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ARTICLES_SERVER_URL", "http://plain.test"),
            ("APP__SERVER_URL", "http://app.test"),
            ("APP__TOKEN_PATH", "/tmp/articles/token.json"),
            ("APP__REQUEST_TIMEOUT_SECS", "not-a-number"),
        ]);
        let mut settings = Settings::default();
        settings.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.server_url, "http://app.test");
        assert_eq!(settings.token_path, PathBuf::from("/tmp/articles/token.json"));
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn zero_timeout_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_file("request_timeout_secs = 0").expect("parse");
        assert_eq!(settings.request_timeout_secs, 30);

        settings.apply_env(|key| (key == "APP__REQUEST_TIMEOUT_SECS").then(|| "0".to_string()));
        assert_eq!(settings.request_timeout_secs, 30);

        settings.apply_env(|key| (key == "APP__REQUEST_TIMEOUT_SECS").then(|| "7".to_string()));
        assert_eq!(settings.request_timeout_secs, 7);
    }

    #[test]
    fn malformed_file_is_rejected() {
        let mut settings = Settings::default();
        assert!(settings.apply_file("server_url = [").is_err());
        assert_eq!(settings.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn server_url_must_be_http_with_host() {
        assert_eq!(
            validated_server_url(" http://localhost:9000/ ").expect("valid"),
            "http://localhost:9000"
        );
        assert!(validated_server_url("ftp://localhost").is_err());
        assert!(validated_server_url("localhost:9000").is_err());
    }
}
