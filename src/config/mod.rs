use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application, read from the environment.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database connection URL, e.g. `sqlite://invoicing.db`.
    pub database_url: String,
    /// Port the HTTP server binds to.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    5000
}

impl Config {
    /// Load configuration from environment variables, reading a .env
    /// file first if one exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Get a direct reference to the database URL.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Initialize environment variables and load configuration.
pub fn init() -> Result<Config> {
    dotenv().ok();

    let config = Config::load()?;

    Ok(config)
}
