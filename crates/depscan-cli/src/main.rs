use clap::{Parser, Subcommand};
use depscan::{
    commands::{
        analyze::{self, AnalyzeCommand},
        config::{self, ConfigAction},
        wrappers::{self, WrappersCommand},
    },
    init_tracing, logger, GlobalOpts,
};

#[derive(Parser)]
#[command(name = "depscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Static service dependency discovery",
    long_about = "depscan infers the TCP dependencies between Go microservices from their \
                  deployment descriptors and service registry calls."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a source tree and write one manifest per application
    Analyze(AnalyzeCommand),
    /// Print the registry wrappers inferred for each application
    Wrappers(WrappersCommand),
    /// Configure depscan
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level(), false) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    let result = match cli.command {
        Commands::Analyze(cmd) => analyze::handle_analyze(cmd, cli.global),
        Commands::Wrappers(cmd) => wrappers::handle_wrappers(cmd, cli.global),
        Commands::Config { action } => config::handle_config(action, cli.global),
    };

    if let Err(e) = result {
        logger::error(&e.to_string());
        if let Some(path) = logger::get_log_path() {
            eprintln!("Log file: {}", path.display());
        }
        std::process::exit(1);
    }
}
