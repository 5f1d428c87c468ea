mod admin_cmds;
mod api;
mod config;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use clap::{Parser, Subcommand};

use aura_db::pool;

use config::AuraConfig;

#[derive(Parser)]
#[command(name = "aura", about = "Multi-tenant school management service")]
struct Cli {
    /// Database URL (overrides AURA_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an aura config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/aura")]
        db_url: String,
        /// Base URL of the assistant service
        #[arg(long)]
        assistant_url: Option<String>,
        /// Workflow webhook URL (omit to disable)
        #[arg(long)]
        webhook_url: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create and migrate the aura database (requires config file or env vars)
    DbInit,
    /// Start the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// School (tenant) management
    School {
        #[command(subcommand)]
        command: SchoolCommands,
    },
    /// User management
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// API token management
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
pub enum SchoolCommands {
    /// Register a new school
    Add {
        /// Display name
        name: String,
        /// Short unique code (e.g. ESC01)
        #[arg(long)]
        code: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// List all schools
    List,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a user to a school
    Add {
        /// Unique login name
        username: String,
        /// Code of the school the user belongs to
        #[arg(long)]
        school: String,
        /// One of: admin, coordinator, teacher, student, guardian
        #[arg(long, default_value = "teacher")]
        role: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// List users, optionally for one school
    List {
        /// School code to filter by
        #[arg(long)]
        school: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Print a bearer token for a user
    Issue {
        username: String,
    },
    /// Invalidate every token previously issued to a user
    Revoke {
        username: String,
    },
}

fn cmd_init(
    db_url: &str,
    assistant_url: Option<String>,
    webhook_url: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let token_secret = config::generate_token_secret();

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        auth: config::AuthSection {
            token_secret: token_secret.clone(),
        },
        assistant: config::AssistantSection {
            url: assistant_url,
            ..Default::default()
        },
        webhook: config::WebhookSection {
            url: webhook_url,
            ..Default::default()
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  auth.token_secret = {}...{}", &token_secret[..8], &token_secret[56..]);
    if let Some(url) = &cfg.assistant.url {
        println!("  assistant.url = {url}");
    }
    if let Some(url) = &cfg.webhook.url {
        println!("  webhook.url = {url}");
    }
    println!();
    println!("Next: run `aura db-init` to create and migrate the database.");

    Ok(())
}

async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = AuraConfig::resolve(cli_db_url)?;

    println!(
        "Initializing aura database at {}...",
        resolved.db_config.redacted_url()
    );

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let result = pool::run_migrations(&db_pool).await;
    let counts = match result {
        Ok(()) => pool::table_counts(&db_pool).await,
        Err(e) => Err(e),
    };
    db_pool.close().await;

    println!("Database ready. Tables:");
    for (table, count) in &counts? {
        println!("  {table}: {count} rows");
    }
    println!("aura db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            assistant_url,
            webhook_url,
            force,
        } => {
            cmd_init(&db_url, assistant_url, webhook_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = AuraConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = serve_cmd::run_serve(db_pool.clone(), &resolved, &bind, port).await;
            db_pool.close().await;
            result?;
        }
        Commands::School { command } => {
            let resolved = AuraConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = admin_cmds::run_school_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::User { command } => {
            let resolved = AuraConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = admin_cmds::run_user_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Token { command } => {
            let resolved = AuraConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                admin_cmds::run_token_command(command, &db_pool, &resolved.token_config).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
