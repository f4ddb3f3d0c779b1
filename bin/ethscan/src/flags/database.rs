use clap::Args;
use ethscan_storage::PostgresConfig;
use std::time::Duration;

/// Database connection arguments.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DatabaseArgs {
    /// Database host.
    #[arg(id = "db.host", long = "db.host", env = "DATABASE_HOST")]
    pub host: String,
    /// Database port.
    #[arg(id = "db.port", long = "db.port", env = "DATABASE_PORT")]
    pub port: u16,
    /// Login user.
    #[arg(id = "db.user", long = "db.user", env = "DATABASE_USERNAME")]
    pub user: String,
    /// Login password.
    #[arg(id = "db.password", long = "db.password", env = "DATABASE_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Database name.
    #[arg(id = "db.name", long = "db.name", env = "DATABASE_NAME")]
    pub name: String,
    /// Connections kept open while idle.
    #[arg(id = "db.max-idle-conns", long = "db.max-idle-conns", env = "SQL_MAX_IDLE_CONNS", default_value_t = 2)]
    pub max_idle_conns: u32,
    /// Upper bound on open connections.
    #[arg(id = "db.max-open-conns", long = "db.max-open-conns", env = "SQL_MAX_OPEN_CONNS", default_value_t = 20)]
    pub max_open_conns: u32,
    /// Lifetime of a pooled connection, in minutes.
    #[arg(id = "db.conn-max-lifetime-mins", long = "db.conn-max-lifetime-mins", env = "SQL_CONN_MAX_LIFE_MINUTES", default_value_t = 30)]
    pub conn_max_lifetime_mins: u64,
    /// How long to wait for a free connection, in seconds.
    #[arg(id = "db.acquire-timeout-secs", long = "db.acquire-timeout-secs", env = "SQL_ACQUIRE_TIMEOUT_SECS", default_value_t = 30)]
    pub acquire_timeout_secs: u64,
}

impl DatabaseArgs {
    /// Builds the Postgres connection configuration.
    pub fn config(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.user.clone(),
            password: self.password.clone(),
            database: self.name.clone(),
            min_connections: self.max_idle_conns.min(self.max_open_conns),
            max_connections: self.max_open_conns,
            max_lifetime: Duration::from_secs(self.conn_max_lifetime_mins.saturating_mul(60)),
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }
}
