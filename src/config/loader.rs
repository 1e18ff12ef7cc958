use std::path::Path;

use config::{Config, File, FileFormat};
use eyre::{Context, Result};

use crate::{
    config::models::{AuthConfig, GatewayConfig},
    core::auth::SharedSecret,
};

/// Load configuration from a file using the config crate
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<GatewayConfig> {
    load_config_sync(config_path)
}

/// Load configuration synchronously
pub fn load_config_sync(config_path: &str) -> Result<GatewayConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml, // Default to TOML
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let gateway_config: GatewayConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(gateway_config)
}

/// Resolve the shared signing secret for the auth bridge.
///
/// The environment variable named in the config wins; an inline `secret`
/// value is accepted for development setups. `None` means the deployment
/// runs without gateway-side token validation.
pub fn resolve_shared_secret(auth: &AuthConfig) -> Option<SharedSecret> {
    match SharedSecret::from_env(&auth.secret_env) {
        Ok(secret) => {
            tracing::info!(var = %auth.secret_env, "shared signing secret loaded from environment");
            Some(secret)
        }
        Err(_) => auth.secret.as_ref().map(|inline| {
            tracing::warn!("using inline signing secret from config; intended for development only");
            SharedSecret::new(inline.as_bytes())
        }),
    }
}
