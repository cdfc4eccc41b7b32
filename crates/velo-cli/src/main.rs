use clap::{Parser, Subcommand};
use uuid::Uuid;
use velo_core::Config;

mod commands;

#[derive(Parser)]
#[command(name = "velo-cli", version, about = "Velo goal and task planner")]
struct Cli {
    /// Act as this user instead of user.id from the config
    #[arg(long, global = true)]
    user: Option<Uuid>,
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Goal management
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Task management and urgency
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Planning assistant
    Assistant {
        #[command(subcommand)]
        action: commands::assistant::AssistantAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(fallback_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&Config::load_or_default().logging.level);

    let ctx = commands::Context {
        user: cli.user,
        json: cli.json,
    };
    let result = match cli.command {
        Commands::Goal { action } => commands::goal::run(action, &ctx),
        Commands::Task { action } => commands::task::run(action, &ctx),
        Commands::Assistant { action } => commands::assistant::run(action, &ctx),
        Commands::Config { action } => commands::config::run(action, &ctx),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
