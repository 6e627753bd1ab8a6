use clap::Parser;
use std::{net::SocketAddr, time::Duration};

/// Tic-tac-toe session host.
#[derive(Parser, Debug, Clone)]
#[command(name = "server", about = "Two-player tic-tac-toe over WebSocket")]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 7350)]
    pub port: u16,

    /// How often the sweeper scans for stale games.
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub sweep_interval_secs: u64,

    /// Games older than this are deleted regardless of state.
    #[arg(long, env = "MAX_GAME_AGE_SECS", default_value_t = 1800)]
    pub max_game_age_secs: u64,

    /// Delay before a game abandoned by one player is deleted.
    #[arg(long, env = "DISCONNECT_GRACE_SECS", default_value_t = 5)]
    pub disconnect_grace_secs: u64,

    /// Minimum gap between two messages from one connection. Off by default.
    #[arg(long, env = "RATE_LIMIT_MS", default_value_t = 0)]
    pub rate_limit_ms: u64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        Ok(addr.parse()?)
    }

    #[must_use]
    pub const fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            max_game_age: Duration::from_secs(self.max_game_age_secs),
            disconnect_grace: Duration::from_secs(self.disconnect_grace_secs),
            rate_limit: Duration::from_millis(self.rate_limit_ms),
        }
    }
}

/// Timing knobs for the registry and its background tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub sweep_interval: Duration,
    pub max_game_age: Duration,
    pub disconnect_grace: Duration,
    pub rate_limit: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(300),
            max_game_age: Duration::from_secs(30 * 60),
            disconnect_grace: Duration::from_secs(5),
            rate_limit: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let config = ServerConfig::parse_from(["server"]);
        assert_eq!(config.session_settings(), SessionSettings::default());
    }

    #[test]
    fn rate_limit_is_off_by_default() {
        assert_eq!(SessionSettings::default().rate_limit, Duration::ZERO);
    }

    #[test]
    fn cli_overrides() {
        let config = ServerConfig::parse_from([
            "server",
            "--port",
            "9000",
            "--host",
            "127.0.0.1",
            "--disconnect-grace-secs",
            "1",
            "--rate-limit-ms",
            "250",
        ]);
        assert_eq!(config.socket_addr().unwrap().port(), 9000);
        let settings = config.session_settings();
        assert_eq!(settings.disconnect_grace, Duration::from_secs(1));
        assert_eq!(settings.rate_limit, Duration::from_millis(250));
    }
}
