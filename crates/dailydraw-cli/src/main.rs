use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dailydraw-cli", version, about = "Daily photo draw host")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the draw coordinator until Ctrl-C (SIGHUP retries a failed entry load)
    Run(commands::run::RunArgs),
    /// Show the active cycle
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch the entries of the current cycle
    Entries {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Notification history
    Notifications {
        #[command(subcommand)]
        action: commands::notifications::NotificationsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Status { json } => commands::status::run(json),
        Commands::Entries { json } => commands::entries::run(json),
        Commands::Notifications { action } => commands::notifications::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
