use clap::{Parser, Subcommand};
use migration::MigratorTrait;
use miette::{IntoDiagnostic, Result};
use rolegate::settings::Settings;
use rolegate::storage;
use tracing_subscriber::{fmt, EnvFilter};

/// Administration commands write straight to the database. Running
/// authorizers keep their cached snapshots until `on_after_mutate` is
/// called on them or `cache.expiration_secs` elapses.
#[derive(Parser, Debug)]
#[command(
    name = "rolegate",
    version,
    about = "Role and permission administration"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Create a permission
    CreatePermission {
        /// The name of the permission
        name: String,
        /// The name of the guard
        guard: Option<String>,
    },
    /// Create a role
    CreateRole {
        /// The name of the role
        name: String,
        /// The name of the guard
        guard: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let settings = Settings::load(&cli.config)?;
    tracing::debug!(?settings, "Loaded configuration");

    let db = storage::init(&settings.database).await?;
    let default_guard = settings.auth.default_guard.as_str();

    match cli.command {
        Command::Migrate => {
            migration::Migrator::up(&db, None).await.into_diagnostic()?;
            tracing::info!("Migrations applied");
        }
        Command::CreatePermission { name, guard } => {
            let guard = guard.as_deref().unwrap_or(default_guard);
            let permission = storage::create_permission(&db, &name, guard).await?;
            tracing::info!(permission = %permission.name, guard = %permission.guard_name, "Created permission");
            println!("Permission `{}` created", permission.name);
        }
        Command::CreateRole { name, guard } => {
            let guard = guard.as_deref().unwrap_or(default_guard);
            let role = storage::create_role(&db, &name, guard).await?;
            tracing::info!(role = %role.name, guard = %role.guard_name, "Created role");
            println!("Role `{}` created", role.name);
        }
    }

    Ok(())
}
