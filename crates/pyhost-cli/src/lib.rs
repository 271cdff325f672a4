//! pyhost development host - expose modules for testing

pub mod commands;
pub mod common;
pub mod console;

pub use common::GlobalOpts;
pub use pyhost_config as config_manager;
pub use pyhost_logger as logger;
