use tabletop_shared::config::TableConfig;

/// Host configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Seed for color generation once the palette runs out
    pub rng_seed: u64,
    pub command_queue_capacity: usize,
    pub broadcast_capacity: usize,
    pub max_connections: usize,
    pub table: TableConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9002".to_string(),
            rng_seed: 42,
            command_queue_capacity: 256,
            broadcast_capacity: 64,
            max_connections: 32,
            table: TableConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `TABLETOP_LISTEN_ADDR` and `TABLETOP_RNG_SEED`.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("TABLETOP_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(seed) = std::env::var("TABLETOP_RNG_SEED") {
            config.rng_seed = seed
                .parse()
                .map_err(|e| format!("TABLETOP_RNG_SEED is not a u64: {}", e))?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("listen_addr must not be empty".to_string());
        }
        if self.command_queue_capacity == 0 {
            return Err("command_queue_capacity must be > 0".to_string());
        }
        if self.broadcast_capacity == 0 {
            return Err("broadcast_capacity must be > 0".to_string());
        }
        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }
        self.table.validate()
    }
}
