use pyhost_config::Config;

/// Register-time behavior taken from the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    pub startup_module: String,
    pub search_path_key: String,
    pub repair_search_path: bool,
}

impl BridgeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            startup_module: config.get_startup_module(),
            search_path_key: config.get_search_path_key(),
            repair_search_path: config.get_repair_search_path(),
        }
    }
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
