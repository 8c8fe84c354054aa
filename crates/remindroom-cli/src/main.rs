use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "remindroom", version, about = "Remindroom CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and register a reminder
    Create(commands::reminder::CreateArgs),
    /// List stored reminders
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one reminder as JSON
    Show {
        /// Reminder id, id prefix or name
        reminder: String,
    },
    /// Change one field of a reminder
    Set {
        /// Reminder id, id prefix or name
        reminder: String,
        /// Field (name, message, every, console, visual, audio, wait,
        /// auto_acknowledge, auto_ack_delay)
        key: String,
        /// New value
        value: String,
    },
    /// Delete a reminder
    Remove {
        /// Reminder id, id prefix or name
        reminder: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run reminders in the foreground, printing events as JSON lines
    Run(commands::run::RunArgs),
}

/// Initialize tracing with environment-based log levels.
///
/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Create(args) => commands::reminder::create(args),
        Commands::List { json } => commands::reminder::list(json),
        Commands::Show { reminder } => commands::reminder::show(&reminder),
        Commands::Set {
            reminder,
            key,
            value,
        } => commands::reminder::set(&reminder, &key, &value),
        Commands::Remove { reminder } => commands::reminder::remove(&reminder),
        Commands::Config { action } => commands::config::run(action),
        Commands::Run(args) => commands::run::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
