use std::net::SocketAddr;

use crate::{
    config::models::{GatewayConfig, HealthCheckConfig, RouteRule},
    core::upstream::UpstreamUrl,
};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Invalid route '{prefix}': {message}")]
    InvalidRoute { prefix: String, message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Gateway configuration validator
pub struct GatewayConfigValidator;

impl GatewayConfigValidator {
    /// Validate the entire gateway configuration, collecting every problem
    /// rather than stopping at the first one.
    pub fn validate(config: &GatewayConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if config.routes.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "routes".to_string(),
            });
        } else {
            for (prefix, rule) in &config.routes {
                if let Err(mut route_errors) = Self::validate_single_route(prefix, rule) {
                    errors.append(&mut route_errors);
                }
            }
        }

        if config.limits.max_body_bytes == 0 {
            errors.push(ValidationError::InvalidField {
                field: "limits.max_body_bytes".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if config.upstream_client.connect_timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "upstream_client.connect_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if config.upstream_client.read_timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "upstream_client.read_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if let Err(mut health_errors) = Self::validate_health_check_config(&config.health_check) {
            errors.append(&mut health_errors);
        }

        if let Some(base) = &config.public_base_url
            && url::Url::parse(base).is_err()
        {
            errors.push(ValidationError::InvalidField {
                field: "public_base_url".to_string(),
                message: format!("'{base}' is not a valid URL"),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_single_route(prefix: &str, rule: &RouteRule) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !prefix.starts_with('/') {
            errors.push(ValidationError::InvalidRoute {
                prefix: prefix.to_string(),
                message: "path prefix must start with '/'".to_string(),
            });
        }

        if let Err(e) = UpstreamUrl::new(&rule.upstream) {
            errors.push(ValidationError::InvalidRoute {
                prefix: prefix.to_string(),
                message: e.to_string(),
            });
        }

        if rule.service.trim().is_empty() {
            errors.push(ValidationError::InvalidRoute {
                prefix: prefix.to_string(),
                message: "service name must not be empty".to_string(),
            });
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn validate_health_check_config(
        config: &HealthCheckConfig,
    ) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if config.enabled {
            if config.interval_secs == 0 {
                errors.push(ValidationError::InvalidField {
                    field: "health_check.interval_secs".to_string(),
                    message: "must be greater than zero when probing is enabled".to_string(),
                });
            }
            if config.timeout_secs == 0 {
                errors.push(ValidationError::InvalidField {
                    field: "health_check.timeout_secs".to_string(),
                    message: "must be greater than zero when probing is enabled".to_string(),
                });
            }
            if !config.path.starts_with('/') {
                errors.push(ValidationError::InvalidField {
                    field: "health_check.path".to_string(),
                    message: "probe path must start with '/'".to_string(),
                });
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        errors
            .iter()
            .map(|e| format!("  • {e}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::models::{GatewayConfig, RouteRule};

    fn valid_config() -> GatewayConfig {
        let mut routes = HashMap::new();
        routes.insert(
            "/api/auth".to_string(),
            RouteRule {
                upstream: "http://127.0.0.1:8000".to_string(),
                service: "identity".to_string(),
                preserve_trailing_slash: true,
                require_auth: false,
            },
        );
        GatewayConfig {
            listen_addr: "127.0.0.1:3000".to_string(),
            routes,
            ..GatewayConfig::default()
        }
    }

    #[test]
    fn accepts_valid_config() {
        assert!(GatewayConfigValidator::validate(&valid_config()).is_ok());
    }

    #[test]
    fn rejects_empty_routes() {
        let mut config = valid_config();
        config.routes.clear();
        assert!(GatewayConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn rejects_bad_listen_address() {
        let mut config = valid_config();
        config.listen_addr = "not-an-address".to_string();
        assert!(GatewayConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn rejects_invalid_upstream_url() {
        let mut config = valid_config();
        config.routes.insert(
            "/api/media".to_string(),
            RouteRule {
                upstream: "127.0.0.1:8001".to_string(),
                service: "media".to_string(),
                preserve_trailing_slash: false,
                require_auth: false,
            },
        );
        let err = GatewayConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("/api/media"));
    }

    #[test]
    fn rejects_zero_body_limit() {
        let mut config = valid_config();
        config.limits.max_body_bytes = 0;
        assert!(GatewayConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = valid_config();
        config.listen_addr = "bogus".to_string();
        config.limits.max_body_bytes = 0;
        let err = GatewayConfigValidator::validate(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bogus"));
        assert!(message.contains("max_body_bytes"));
    }

    #[test]
    fn disabled_health_check_skips_probe_validation() {
        let mut config = valid_config();
        config.health_check.enabled = false;
        config.health_check.interval_secs = 0;
        assert!(GatewayConfigValidator::validate(&config).is_ok());
    }
}
