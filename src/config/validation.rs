use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("rate_limit.{field} must be positive")]
    InvalidRateLimit { field: &'static str },

    #[error("upstream.{field} must be positive")]
    InvalidTimeout { field: &'static str },

    #[error("upstream.base_url '{url}' must be an absolute http/https URL")]
    InvalidBaseUrl { url: String },

    #[error("upstream.max_body_bytes must be positive")]
    InvalidMaxBodyBytes,

    #[error("proxy.fallback_path '{path}' must start with '/'")]
    InvalidFallbackPath { path: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_rate_limit(config)?;
    validate_upstream(config)?;
    validate_proxy(config)?;
    Ok(())
}

fn validate_rate_limit(config: &Config) -> Result<(), ValidationError> {
    let limits = &config.rate_limit;

    if limits.max_requests == 0 {
        return Err(ValidationError::InvalidRateLimit { field: "max_requests" });
    }
    if limits.window.as_millis() == 0 {
        return Err(ValidationError::InvalidRateLimit { field: "window" });
    }
    if limits.max_tracked_ids == 0 {
        return Err(ValidationError::InvalidRateLimit { field: "max_tracked_ids" });
    }
    if limits.sweep_interval.as_millis() == 0 {
        return Err(ValidationError::InvalidRateLimit { field: "sweep_interval" });
    }

    Ok(())
}

fn validate_upstream(config: &Config) -> Result<(), ValidationError> {
    let upstream = &config.upstream;

    match url::Url::parse(&upstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => {
            return Err(ValidationError::InvalidBaseUrl {
                url: upstream.base_url.clone(),
            });
        }
    }

    if upstream.request_timeout.as_millis() == 0 {
        return Err(ValidationError::InvalidTimeout { field: "request_timeout" });
    }
    if upstream.connect_timeout.as_millis() == 0 {
        return Err(ValidationError::InvalidTimeout { field: "connect_timeout" });
    }
    if upstream.max_body_bytes.as_u64() == 0 {
        return Err(ValidationError::InvalidMaxBodyBytes);
    }

    Ok(())
}

fn validate_proxy(config: &Config) -> Result<(), ValidationError> {
    if !config.proxy.fallback_path.starts_with('/') {
        return Err(ValidationError::InvalidFallbackPath {
            path: config.proxy.fallback_path.clone(),
        });
    }
    Ok(())
}
