use chrono::Duration;
use clap::Parser;
use lpg_common::Secret;

/// Runtime configuration, collected from command line flags or their environment equivalents.
/// Flags win over environment variables.
#[derive(Debug, Clone, Parser)]
#[command(name = "loyalty-points-gateway", version, about = "Multi-tenant loyalty points accrual gateway")]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[arg(short = 'a', long = "address", env = "RUN_ADDRESS", default_value = "localhost:8080")]
    pub run_address: String,

    /// Postgres connection string
    #[arg(short = 'd', long = "database", env = "DATABASE_URI", default_value = "")]
    pub database_url: String,

    /// Base URL of the external accrual calculator
    #[arg(short = 'r', long = "accrual", env = "ACCRUAL_SYSTEM_ADDRESS")]
    pub accrual_address: String,

    /// Key that auth tokens are signed with
    #[arg(short = 's', long = "secret", env = "SECRET", default_value = "")]
    pub secret: Secret<String>,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long = "log_lvl", env = "LOG_LVL", default_value = "info")]
    pub log_level: String,

    /// Auth token lifetime in seconds
    #[arg(long = "token_lifetime", env = "AUTH_TOKEN_LIFETIME", default_value_t = 3600)]
    pub token_lifetime_secs: i64,
}

impl ServerConfig {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::seconds(self.token_lifetime_secs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = ServerConfig::try_parse_from(["lpg", "-r", "http://localhost:8082"]).unwrap();
        assert_eq!(config.run_address, "localhost:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.token_lifetime(), Duration::seconds(3600));
        assert_eq!(config.accrual_address, "http://localhost:8082");
    }

    #[test]
    fn accrual_address_is_required() {
        assert!(ServerConfig::try_parse_from(["lpg"]).is_err());
    }

    #[test]
    fn short_flags_are_accepted() {
        let config = ServerConfig::try_parse_from([
            "lpg",
            "-a",
            "0.0.0.0:9000",
            "-d",
            "postgres://localhost/loyalty",
            "-r",
            "http://accrual:8082",
            "-s",
            "top-secret",
        ])
        .unwrap();
        assert_eq!(config.run_address, "0.0.0.0:9000");
        assert_eq!(config.database_url, "postgres://localhost/loyalty");
        assert_eq!(config.secret.reveal(), "top-secret");
        // the signing key never appears in debug output
        assert!(!format!("{config:?}").contains("top-secret"));
    }
}
