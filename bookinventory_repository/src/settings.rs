use anyhow::Context;
use config::{Config, Environment};
use serde::Deserialize;

use crate::books_repository::PostgresBooksRepositoryConfig;

pub const ENV_PREFIX: &str = "BOOKINVENTORY";

#[derive(Debug, Clone, Deserialize, PartialEq)]
/// Server settings, every field can be overridden with BOOKINVENTORY_<FIELD> env variable
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub use_in_memory_db: bool,
    pub db_host: String,
    pub db_username: String,
    pub db_password: String,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: Environment) -> anyhow::Result<Self> {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080_i64)?
            .set_default("use_in_memory_db", false)?
            .set_default("db_host", "127.0.0.1")?
            .set_default("db_username", "postgres")?
            .set_default("db_password", "postgres")?
            .add_source(environment.try_parsing(true))
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn postgres_config(&self) -> PostgresBooksRepositoryConfig {
        PostgresBooksRepositoryConfig {
            hostname: self.db_host.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }
}
