use std::fs;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use northstar::auth::TokenGenerator;
use northstar::config::ServerConfig;
use northstar::server::{AppState, create_router};
use northstar::store::{SqliteStore, Store};
use northstar::types::{Activity, Actor, Role, Session, User};

fn create_session(
    generator: &TokenGenerator,
    is_admin: bool,
    activity_id: Option<String>,
) -> anyhow::Result<(Session, String)> {
    let (raw_token, lookup, hash) = generator.generate()?;
    let session = Session {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        is_admin,
        activity_id,
        created_at: Utc::now(),
        expires_at: None,
        last_used_at: None,
    };
    Ok((session, raw_token))
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "northstar")]
#[command(about = "A goal tracking server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database and config
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin session token)
    Init {
        /// Data directory for the database and config
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join("northstar.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    let token_file = data_path.join(".admin_token");

    if store.has_admin_session()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let generator = TokenGenerator::new();
    let (session, raw_token) = create_session(&generator, true, None)?;

    store.create_session(&session)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin session token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_default_user_prompt(&store, &generator)?;
    }

    Ok(())
}

fn create_default_user_prompt(store: &SqliteStore, generator: &TokenGenerator) -> anyhow::Result<()> {
    let create_user = inquire::Confirm::new("Would you like to create a default user?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let email = inquire::Text::new("Email:")
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Err("Email cannot be empty".into())
            } else if !input.contains('@') || input.contains(char::is_whitespace) {
                Err("Email must look like an email address".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let name = inquire::Text::new("Display name (optional):").prompt()?;
    let name = if name.trim().is_empty() { None } else { Some(name) };

    let now = Utc::now();
    let activity = Activity {
        id: Uuid::new_v4().to_string(),
        created_at: now,
        updated_at: now,
        actor: Actor::User(User {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            name,
            image: None,
            role: Role::Admin,
        }),
    };

    store.create_activity(&activity)?;

    let (session, raw_token) = create_session(generator, false, Some(activity.id.clone()))?;
    store.create_session(&session)?;

    println!();
    println!("========================================");
    println!("Created user '{email}' with session token:");
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("northstar=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let mut config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                ..Default::default()
            };
            config.load_overrides()?;

            let token_file = config.data_dir.join(".admin_token");
            if !token_file.exists() {
                bail!(
                    "Server not initialized. Run 'northstar admin init' first to create the database and admin token."
                );
            }

            let store = SqliteStore::new(config.db_path())?;
            if !store.has_admin_session()? {
                bail!(
                    "Server not initialized. Run 'northstar admin init' first to create the database and admin token."
                );
            }

            info!("Admin token available at {}", token_file.display());
            info!("Goal delete policy: {:?}", config.delete_policy);

            let state = Arc::new(AppState {
                store: Arc::new(store),
                delete_policy: config.delete_policy,
            });

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
