//! Transport-level configuration: bind address, CORS, and the per-IP rate
//! limiter guarding `/auth/signup` and `/auth/login`. World-tunable knobs
//! live in `mash_core::WorldConfig` instead, loaded separately.

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_host: String,
    pub bind_port: u16,

    pub cors_origins: Vec<String>,
    pub cors_allow_credentials: bool,

    pub rate_limit_enabled: bool,
    /// Requests per minute per IP against `/auth/signup` and `/auth/login`.
    pub auth_rate_limit_per_minute: u32,
    pub auth_rate_limit_burst: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            bind_port: 8080,
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            rate_limit_enabled: true,
            auth_rate_limit_per_minute: 20,
            auth_rate_limit_burst: 5,
        }
    }
}

impl ApiConfig {
    /// Environment variables:
    /// - `MASH_API_BIND`: bind host (default `0.0.0.0`)
    /// - `PORT` / `MASH_API_PORT`: bind port (default `8080`)
    /// - `MASH_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `MASH_CORS_ALLOW_CREDENTIALS`: "true"/"false" (default false)
    /// - `MASH_AUTH_RATE_LIMIT_ENABLED`: "true"/"false" (default true)
    /// - `MASH_AUTH_RATE_LIMIT_PER_MINUTE`: requests per minute per IP (default 20)
    /// - `MASH_AUTH_RATE_LIMIT_BURST`: burst allowance (default 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_host = std::env::var("MASH_API_BIND").unwrap_or(defaults.bind_host);
        let bind_port = std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("MASH_API_PORT").ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.bind_port);

        let cors_origins = std::env::var("MASH_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("MASH_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let rate_limit_enabled = std::env::var("MASH_AUTH_RATE_LIMIT_ENABLED")
            .ok()
            .map(|s| !s.eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        let auth_rate_limit_per_minute = std::env::var("MASH_AUTH_RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.auth_rate_limit_per_minute);

        let auth_rate_limit_burst = std::env::var("MASH_AUTH_RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.auth_rate_limit_burst);

        Self {
            bind_host,
            bind_port,
            cors_origins,
            cors_allow_credentials,
            rate_limit_enabled,
            auth_rate_limit_per_minute,
            auth_rate_limit_burst,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ApiConfig::default();
        assert!(config.rate_limit_enabled);
        assert_eq!(config.auth_rate_limit_per_minute, 20);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }
}
