use clap::{Parser, Subcommand};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wg_easy_client::config::PASSWORD_ENV;
use wg_easy_client::{Config, WgEasyClient};

#[derive(Parser)]
#[command(name = "wg-easy")]
#[command(about = "Manage WireGuard clients on a wg-easy server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// wg-easy URL, overriding the config file
    #[arg(long, global = true)]
    url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate default config file
    Init,
    /// Show the server release
    Release,
    /// Show the session status
    Session,
    /// List all clients
    List,
    /// Look up a client by id, name or address
    Find { client: String },
    /// Create a client
    Create { name: String },
    /// Rename a client
    Rename { client: String, name: String },
    /// Enable a client
    Enable { client: String },
    /// Disable a client
    Disable { client: String },
    /// Change the VPN address of a client
    Address { client: String, address: String },
    /// Print or save the WireGuard configuration of a client
    Config {
        client: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print or save the configuration QR code (SVG) of a client
    Qrcode {
        client: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a client
    Delete { client: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays pipeable
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if let Commands::Init = cli.command {
        info!("Generating default config...");
        Config::default().save(&config_path)?;
        println!("Created default config: {}", config_path.display());
        return Ok(());
    }

    let mut config = Config::load_or_default(&config_path)?;
    if let Some(url) = cli.url {
        config.server.base_url = url;
    }
    debug!("Using server {}", config.server.base_url);

    let password = match config.password(std::env::var(PASSWORD_ENV).ok()) {
        Some(password) => password,
        None => rpassword::prompt_password("wg-easy password: ")?,
    };
    let client =
        WgEasyClient::with_options(&config.server.base_url, &password, &config.client_options())?;

    match cli.command {
        Commands::Init => {}
        Commands::Release => print_json(&client.get_release().await??)?,
        Commands::Session => print_json(&client.get_session().await??)?,
        Commands::List => print_json(&client.get_clients().await??)?,
        Commands::Find { client: token } => print_json(&client.find(&token).await??)?,
        Commands::Create { name } => print_json(&client.create(&name).await??)?,
        Commands::Rename { client: token, name } => {
            let id = resolve_id(&client, &token).await?;
            print_json(&client.rename(&id, &name).await??)?;
        }
        Commands::Enable { client: token } => {
            let id = resolve_id(&client, &token).await?;
            print_json(&client.enable(&id).await??)?;
        }
        Commands::Disable { client: token } => {
            let id = resolve_id(&client, &token).await?;
            print_json(&client.disable(&id).await??)?;
        }
        Commands::Address {
            client: token,
            address,
        } => {
            let id = resolve_id(&client, &token).await?;
            print_json(&client.update_address(&id, &address).await??)?;
        }
        Commands::Config {
            client: token,
            output,
        } => {
            let id = resolve_id(&client, &token).await?;
            write_text(&client.get_config(&id).await??, output)?;
        }
        Commands::Qrcode {
            client: token,
            output,
        } => {
            let id = resolve_id(&client, &token).await?;
            write_text(&client.get_qr_code(&id).await??, output)?;
        }
        Commands::Delete { client: token } => {
            let id = resolve_id(&client, &token).await?;
            print_json(&client.delete(&id).await??)?;
        }
    }

    Ok(())
}

/// Accept an id, name or address wherever a client id is expected
async fn resolve_id(client: &WgEasyClient, token: &str) -> Result<String, Box<dyn Error>> {
    Ok(client.find(token).await??.id)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_text(text: &str, output: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    match output {
        Some(path) => {
            std::fs::write(&path, text)?;
            info!("Wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
