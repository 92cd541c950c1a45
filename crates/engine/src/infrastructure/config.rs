//! Engine configuration, read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use resistencia_domain::PaintRules;

/// Default backend URL (a local PostgREST gateway).
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:54321";

/// Largest paint texture edge. A canvas holds `size² × 4` bytes.
pub const MAX_PAINT_TEXTURE_SIZE: u32 = 4096;

const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: u16 = 3000;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub backend_url: String,
    pub backend_api_key: String,
    pub server_host: String,
    pub server_port: u16,
    pub paint_texture_size: u32,
    pub paint_time_limit_secs: u64,
    /// Live sessions untouched for this long are dropped.
    pub session_idle_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let rules = PaintRules::default();
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_api_key: String::new(),
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            paint_texture_size: rules.texture_size,
            paint_time_limit_secs: rules.time_limit_secs,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
        }
    }
}

impl EngineConfig {
    /// Reads `BACKEND_URL`, `BACKEND_API_KEY`, `SERVER_HOST`, `SERVER_PORT`
    /// (falling back to `PORT`), `PAINT_TEXTURE_SIZE`, `PAINT_TIME_LIMIT_SECS`
    /// and `SESSION_IDLE_SECS`. Missing or unparsable values keep their
    /// defaults; the texture size is capped at [`MAX_PAINT_TEXTURE_SIZE`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let backend_api_key = lookup("BACKEND_API_KEY").unwrap_or_default();
        if backend_api_key.is_empty() {
            tracing::warn!("BACKEND_API_KEY is not set; backend requests will be anonymous");
        }

        Self {
            backend_url: lookup("BACKEND_URL").unwrap_or(defaults.backend_url),
            backend_api_key,
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parsed(&lookup, "SERVER_PORT")
                .or_else(|| parsed(&lookup, "PORT"))
                .unwrap_or(defaults.server_port),
            paint_texture_size: parsed(&lookup, "PAINT_TEXTURE_SIZE")
                .filter(|size: &u32| *size > 0)
                .map(|size| {
                    if size > MAX_PAINT_TEXTURE_SIZE {
                        tracing::warn!(
                            size,
                            max = MAX_PAINT_TEXTURE_SIZE,
                            "PAINT_TEXTURE_SIZE too large, capping"
                        );
                    }
                    size.min(MAX_PAINT_TEXTURE_SIZE)
                })
                .unwrap_or(defaults.paint_texture_size),
            paint_time_limit_secs: parsed(&lookup, "PAINT_TIME_LIMIT_SECS")
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(defaults.paint_time_limit_secs),
            session_idle_secs: parsed(&lookup, "SESSION_IDLE_SECS")
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(defaults.session_idle_secs),
        }
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// Base rules for new paint sessions.
    pub fn paint_rules(&self) -> PaintRules {
        PaintRules::default()
            .with_texture_size(self.paint_texture_size)
            .with_time_limit(self.paint_time_limit_secs)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server_host, self.server_port).parse()
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(config(&[]), EngineConfig::default());
    }

    #[test]
    fn port_falls_back_to_port_variable() {
        assert_eq!(config(&[("PORT", "8080")]).server_port, 8080);
        assert_eq!(
            config(&[("PORT", "8080"), ("SERVER_PORT", "9000")]).server_port,
            9000
        );
        assert_eq!(config(&[("SERVER_PORT", "abc")]).server_port, 3000);
    }

    #[test]
    fn paint_overrides_flow_into_rules() {
        let rules = config(&[("PAINT_TEXTURE_SIZE", "256"), ("PAINT_TIME_LIMIT_SECS", "0")])
            .paint_rules();
        assert_eq!(rules.texture_size, 256);
        assert_eq!(rules.time_limit_secs, 60);
    }

    #[test]
    fn each_setting_parses_as_its_own_type() {
        let parsed = config(&[
            ("SERVER_PORT", " 8081 "),
            ("PAINT_TEXTURE_SIZE", "512"),
            ("PAINT_TIME_LIMIT_SECS", "90"),
            ("SESSION_IDLE_SECS", "120"),
        ]);
        assert_eq!(parsed.server_port, 8081u16);
        assert_eq!(parsed.paint_texture_size, 512u32);
        assert_eq!(parsed.paint_time_limit_secs, 90u64);
        assert_eq!(parsed.session_idle(), Duration::from_secs(120));

        // Does not fit a port
        assert_eq!(
            config(&[("SERVER_PORT", "70000")]).server_port,
            DEFAULT_SERVER_PORT
        );
    }

    #[test]
    fn texture_size_is_capped() {
        assert_eq!(
            config(&[("PAINT_TEXTURE_SIZE", "1000000")]).paint_texture_size,
            MAX_PAINT_TEXTURE_SIZE
        );
        assert_eq!(
            config(&[("PAINT_TEXTURE_SIZE", "-5")]).paint_texture_size,
            EngineConfig::default().paint_texture_size
        );
    }

    #[test]
    fn socket_addr_joins_host_and_port() {
        let addr = config(&[("SERVER_HOST", "127.0.0.1"), ("SERVER_PORT", "4000")])
            .socket_addr()
            .unwrap();
        assert_eq!(addr.port(), 4000);
    }
}
