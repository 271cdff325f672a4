//! `pyhost run`: play the host's part of the plug-in lifecycle
//!
//! Register happens on start, UnRegister on `quit` or end of input. In
//! between, commands typed on stdin stand in for the host's process
//! notifications and the display window's reload menu.

use crate::config_manager::Config;
use crate::console::ConsoleEngine;
use crate::logger;
use crate::GlobalOpts;
use anyhow::Context;
use clap::Args;
use pyhost_bridge::{BridgeOptions, HostComponent, HostEngine, LifecycleBridge};
use pyhost_session::{Interpreter, PythonInterpreter, PythonSettings};
use std::io::{BufRead, Write};

#[derive(Args, Debug, Clone)]
pub struct RunCommand {
    /// Startup module to import (overrides `startup-module`)
    #[arg(long)]
    pub startup_module: Option<String>,

    /// Skip the registry search-path repair
    #[arg(long)]
    pub no_repair: bool,

    /// Name handed to the console engine on Register; empty refuses the connection
    #[arg(long, default_value = "console")]
    pub engine: String,
}

/// One line of input to the session loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Reload,
    AddProcess { process_id: u32, module_name: String },
    EndProcess { process_id: u32 },
    Status,
    Help,
    Quit,
}

const HELP: &str = "commands: reload | add <pid> <module> | end <pid> | status | help | quit";

impl HostCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };

        let command = match verb {
            "reload" => HostCommand::Reload,
            "add" => {
                let process_id = parse_pid(words.next())?;
                let module_name = words
                    .next()
                    .ok_or_else(|| "usage: add <pid> <module>".to_string())?
                    .to_string();
                HostCommand::AddProcess {
                    process_id,
                    module_name,
                }
            }
            "end" => HostCommand::EndProcess {
                process_id: parse_pid(words.next())?,
            },
            "status" => HostCommand::Status,
            "help" | "?" => HostCommand::Help,
            "quit" | "exit" => HostCommand::Quit,
            other => return Err(format!("unknown command '{}'", other)),
        };

        if words.next().is_some() {
            return Err(format!("too many arguments for '{}'", verb));
        }
        Ok(command)
    }
}

fn parse_pid(word: Option<&str>) -> Result<u32, String> {
    let word = word.ok_or_else(|| "missing process id".to_string())?;
    word.parse::<u32>()
        .map_err(|_| format!("invalid process id '{}'", word))
}

pub fn handle_run(cmd: RunCommand, _opts: GlobalOpts) -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load config")?;

    let mut options = BridgeOptions::from_config(&config);
    if let Some(module) = cmd.startup_module {
        options.startup_module = module;
    }
    if cmd.no_repair {
        options.repair_search_path = false;
    }
    logger::debug(&format!("Bridge options: {:?}", options));

    let interpreter = PythonInterpreter::new(PythonSettings::from_config(&config));
    let mut bridge = LifecycleBridge::new(ConsoleEngine::new(), interpreter, options);

    let stdin = std::io::stdin();
    let mut out = std::io::stdout();
    run_session(&mut bridge, cmd.engine, stdin.lock(), &mut out)
}

/// Register, serve commands from `input` until quit or EOF, then UnRegister
pub fn run_session<E, I>(
    bridge: &mut LifecycleBridge<E, I>,
    handle: E::Handle,
    input: impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    E: HostEngine,
    I: Interpreter,
{
    bridge.register(handle);
    let served = serve(bridge, input, out);

    // UnRegister runs on every exit path, including a broken input stream
    bridge.unregister();
    served?;
    writeln!(out, "state: {:?}", bridge.state())?;
    Ok(())
}

fn serve<E, I>(
    bridge: &mut LifecycleBridge<E, I>,
    input: impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    E: HostEngine,
    I: Interpreter,
{
    write_status(bridge, out)?;

    for line in input.lines() {
        let line = line.context("Failed to read command")?;
        if line.trim().is_empty() {
            continue;
        }
        match HostCommand::parse(&line) {
            Ok(HostCommand::Quit) => break,
            Ok(command) => execute(bridge, command, out)?,
            Err(e) => writeln!(out, "{}\n{}", e, HELP)?,
        }
    }
    Ok(())
}

fn execute<E, I>(
    bridge: &mut LifecycleBridge<E, I>,
    command: HostCommand,
    out: &mut impl Write,
) -> std::io::Result<()>
where
    E: HostEngine,
    I: Interpreter,
{
    match command {
        HostCommand::Reload => {
            let reloaded = bridge.reload();
            writeln!(out, "reload: {}", if reloaded { "ok" } else { "failed" })
        }
        HostCommand::AddProcess {
            process_id,
            module_name,
        } => {
            bridge.add_process(process_id, &module_name, "", 0);
            writeln!(out, "add {}: ignored", process_id)
        }
        HostCommand::EndProcess { process_id } => {
            bridge.end_process(process_id);
            writeln!(out, "end {}: ignored", process_id)
        }
        HostCommand::Status => write_status(bridge, out),
        HostCommand::Help => writeln!(out, "{}", HELP),
        HostCommand::Quit => Ok(()),
    }
}

fn write_status<E, I>(bridge: &LifecycleBridge<E, I>, out: &mut impl Write) -> std::io::Result<()>
where
    E: HostEngine,
    I: Interpreter,
{
    writeln!(out, "state: {:?}", bridge.state())?;
    writeln!(out, "connected: {}", bridge.is_connected())?;
    writeln!(
        out,
        "startup module: {}",
        bridge.session().startup_module_name().unwrap_or("(not loaded)")
    )?;
    writeln!(out, "interpreter: {:?}", bridge.session().phase())
}
