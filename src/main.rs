use clap::{Parser, Subcommand};
use fault_relay::{
    cmd::{PingArgs, ping},
    config::AppConfig,
    engine::generate_secret,
    supervisor::Supervisor,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the webhook relay.
    Run {
        /// Directory holding `app.yaml`. Defaults to `configs`.
        #[arg(short, long)]
        config_dir: Option<String>,
    },
    /// Checks the bot credentials against the messaging endpoint.
    Ping(PingArgs),
    /// Prints a random value suitable for `server.webhook_secret`.
    GenerateSecret,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config_dir } => run_supervisor(config_dir.as_deref()).await?,
        Commands::Ping(args) => {
            let identity = ping::execute(args).await?;
            match identity.username {
                Some(username) => println!("Connected as @{username} (id {})", identity.id),
                None => println!("Connected as {} (id {})", identity.first_name, identity.id),
            }
        }
        Commands::GenerateSecret => println!("{}", generate_secret()),
    }

    Ok(())
}

async fn run_supervisor(config_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Loading application configuration...");
    let config = AppConfig::new(config_dir)?;
    config.validate()?;
    tracing::debug!(
        listen_address = %config.server.listen_address,
        chat_id = %config.telegram.chat_id,
        "Configuration loaded."
    );

    let supervisor = Supervisor::builder().config(config).build()?;

    match supervisor.orchestrator().ping().await {
        Ok(identity) => {
            tracing::info!(bot_id = identity.id, username = ?identity.username, "Telegram bot reachable.")
        }
        Err(e) => tracing::warn!(error = %e, "Telegram bot is not reachable at startup."),
    }

    tracing::info!("Supervisor initialized, accepting reports...");

    supervisor.run().await?;

    Ok(())
}
