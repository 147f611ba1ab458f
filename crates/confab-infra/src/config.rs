//! Gateway configuration loader.
//!
//! Reads `confab.toml` (path chosen by the binary, `CONFAB_CONFIG` aware)
//! and deserializes it into [`GatewayConfig`]. Falls back to defaults when
//! the file is missing or malformed, then lets environment variables
//! override the secrets so keys never have to live in the file.

use std::path::Path;

use confab_types::config::GatewayConfig;

/// Load gateway configuration from a TOML file, then apply secret
/// overrides from the environment.
///
/// - If the file does not exist, starts from [`GatewayConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and
///   starts from the default.
/// - `CONFAB_API_KEY`, `ANTHROPIC_API_KEY` and `OPENAI_API_KEY` override
///   the gateway key and the primary/secondary provider keys respectively.
pub async fn load_config(path: &Path) -> GatewayConfig {
    let mut config = read_config_file(path).await;
    apply_secret_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

async fn read_config_file(path: &Path) -> GatewayConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return GatewayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return GatewayConfig::default();
        }
    };

    match toml::from_str::<GatewayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            GatewayConfig::default()
        }
    }
}

/// Prefer environment-provided secrets over file values.
///
/// Takes the lookup as a closure so tests can drive it without touching
/// process-global environment state.
fn apply_secret_overrides(config: &mut GatewayConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(key) = env("CONFAB_API_KEY") {
        config.auth.api_key = key;
    }
    if let Some(key) = env("ANTHROPIC_API_KEY") {
        config.providers.primary.api_key = key;
    }
    if let Some(key) = env("OPENAI_API_KEY") {
        config.providers.secondary.api_key = key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = read_config_file(&tmp.path().join("confab.toml")).await;
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.budget.max_prompt_tokens, 150_000);
    }

    #[tokio::test]
    async fn valid_toml_overrides_defaults() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("confab.toml");
        tokio::fs::write(
            &config_path,
            r#"
[server]
port = 9100
public_base_url = "wss://gateway.example.com"

[auth]
api_key = "file-key"

[store]
session_ttl_seconds = 3600
"#,
        )
        .await
        .unwrap();

        let config = read_config_file(&config_path).await;
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.public_base_url, "wss://gateway.example.com");
        assert_eq!(config.auth.api_key, "file-key");
        assert_eq!(config.store.session_ttl_seconds, 3_600);
        // Unset sections still default.
        assert_eq!(config.lock.attempts, 3);
    }

    #[tokio::test]
    async fn invalid_toml_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("confab.toml");
        tokio::fs::write(&config_path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = read_config_file(&config_path).await;
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.api_key, "");
    }

    #[test]
    fn environment_secrets_win_over_file_values() {
        let mut config = GatewayConfig::default();
        config.auth.api_key = "file-key".to_string();
        config.providers.primary.api_key = "file-anthropic".to_string();

        apply_secret_overrides(&mut config, |key| match key {
            "CONFAB_API_KEY" => Some("env-key".to_string()),
            "ANTHROPIC_API_KEY" => Some("env-anthropic".to_string()),
            "OPENAI_API_KEY" => Some("env-openai".to_string()),
            _ => None,
        });

        assert_eq!(config.auth.api_key, "env-key");
        assert_eq!(config.providers.primary.api_key, "env-anthropic");
        assert_eq!(config.providers.secondary.api_key, "env-openai");
    }

    #[test]
    fn absent_environment_leaves_file_values() {
        let mut config = GatewayConfig::default();
        config.auth.api_key = "file-key".to_string();

        apply_secret_overrides(&mut config, |_| None);
        assert_eq!(config.auth.api_key, "file-key");
    }
}
