// src/env.rs
use std::env;

use dotenv::dotenv;

use crate::config::{ConfigError, PublisherConfig};

pub const AMQP_ADDR: &str = "AMQP_ADDR";
pub const PUBLISHER_QUEUE: &str = "PUBLISHER_QUEUE";
pub const PUBLISHER_CONNECTION_NAME: &str = "PUBLISHER_CONNECTION_NAME";

impl PublisherConfig {
    /// Overrides fields from variables returned by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup(AMQP_ADDR) {
            if uri.is_empty() {
                return Err(ConfigError::Empty(AMQP_ADDR));
            }
            self.uri = uri;
        }
        if let Some(queue) = lookup(PUBLISHER_QUEUE) {
            if queue.is_empty() {
                return Err(ConfigError::Empty(PUBLISHER_QUEUE));
            }
            self.queue = queue;
        }
        if let Some(name) = lookup(PUBLISHER_CONNECTION_NAME) {
            if name.is_empty() {
                return Err(ConfigError::Empty(PUBLISHER_CONNECTION_NAME));
            }
            self.connection_name = name;
        }
        Ok(())
    }

    /// File config (or defaults) with `.env` and process environment on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        let mut config = Self::load()?;
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }
}
