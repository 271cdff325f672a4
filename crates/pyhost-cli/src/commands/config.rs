use crate::config_manager::Config;
use crate::logger;
use crate::GlobalOpts;
use anyhow::Context;
use clap::Subcommand;
use colored::*;
use std::io::Write;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Set a configuration value
    Set { key: String, value: String },
    /// Get or set the path to the config file.
    /// If `new_path` is provided, later runs read their config from there.
    /// If omitted, print the current configuration file path.
    Path {
        /// Optional new config path to set
        new_path: Option<String>,
    },
}

pub fn handle_config(action: ConfigAction, opts: &GlobalOpts) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    match action {
        ConfigAction::Show => {
            let config = Config::load().context("Failed to load config")?;
            show_config(&config, opts, &mut out)?;
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().context("Failed to load config")?;
            config.set(&key, value.clone())?;
            config.save().context("Failed to save config")?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path { new_path } => {
            let config_path = Config::path();
            logger::debug(&format!("Reading config from: {}", config_path.display()));
            let pointer_path = Config::pointer_path();

            match new_path {
                Some(p) => {
                    if let Some(parent) = pointer_path.parent() {
                        std::fs::create_dir_all(parent).context("Failed to set config path")?;
                    }
                    std::fs::write(&pointer_path, p.as_bytes())
                        .context("Failed to set config path")?;
                    logger::success(&format!("Config path set to {}", p));
                }
                None => {
                    writeln!(out, "{}", config_path.display())?;
                    if let Ok(contents) = std::fs::read_to_string(&pointer_path) {
                        let trimmed = contents.trim();
                        if !trimmed.is_empty() {
                            writeln!(out, "{} {}", "overridden-by".cyan(), trimmed)?;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn show_config(config: &Config, opts: &GlobalOpts, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{}", "Configuration:".bold().green())?;
    if config.is_empty() {
        if opts.verbosity_level() > 0 {
            writeln!(out, "  {}", "(empty)".yellow())?;
        }
    } else {
        for (key, value) in config.values_iter() {
            writeln!(out, "  {}: {}", key.cyan(), value)?;
        }
    }
    Ok(())
}
