use clap::{Parser, Subcommand};
use pyhost::{
    commands::{
        config::{self, ConfigAction},
        run,
    },
    logger, GlobalOpts,
};

#[derive(Parser)]
#[command(name = "pyhost")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Development host for the pyhost bridge",
    long_about = "pyhost drives the plug-in lifecycle of an embedded Python session from a terminal: Register on start, UnRegister on quit."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure pyhost
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Register the bridge and serve lifecycle commands from stdin
    Run(run::RunCommand),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level(), false) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    let result = match cli.command {
        Commands::Config { action } => config::handle_config(action, &cli.global),
        Commands::Run(cmd) => run::handle_run(cmd, cli.global),
    };

    if let Err(e) = result {
        logger::error(&format!("{:#}", e));
        logger::show_log_path();
        std::process::exit(1);
    }
}
