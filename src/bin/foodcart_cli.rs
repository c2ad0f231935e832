use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use foodcart_api::{
    auth::{AuthConfig, AuthService},
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::Role,
    migrator::Migrator,
    services::users::{UserService, UserView},
};
use sea_orm_migration::MigratorTrait;
use serde::Serialize;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate(command) => handle_migrate_command(&context, command).await?,
        Commands::CreateAdmin(args) => handle_create_admin(&context, args, cli.json).await?,
        Commands::SetRole(args) => handle_set_role(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "foodcart", about = "Foodcart CLI for schema and account administration", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the database schema
    #[command(subcommand)]
    Migrate(MigrateCommands),
    /// Create an account with the admin role
    CreateAdmin(CreateAdminArgs),
    /// Change the role of an existing account
    SetRole(SetRoleArgs),
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Apply all pending migrations
    Up,
    /// Roll back the most recent migration
    Down {
        #[arg(long, default_value_t = 1, help = "Number of migrations to roll back")]
        steps: u32,
    },
    /// Show applied and pending migrations
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[derive(Args)]
struct CreateAdminArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Args)]
struct SetRoleArgs {
    username: String,
    #[arg(value_parser = parse_role, help = "customer or admin")]
    role: Role,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse::<Role>()
        .map_err(|_| format!("unknown role '{}', expected customer or admin", raw))
}

struct CliContext {
    db: Arc<DbPool>,
    users: UserService,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let cfg: AppConfig = config::load_config().context("failed to load configuration")?;
        config::init_tracing(cfg.log_level(), false);
        debug!("Connecting to {}", cfg.database_url());

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .context("failed to connect to the database")?;
        let db = Arc::new(pool);
        let auth = Arc::new(AuthService::new(AuthConfig::from(&cfg), db.clone()));
        let users = UserService::new(db.clone(), auth);

        Ok(Self { db, users })
    }
}

async fn handle_migrate_command(context: &CliContext, command: MigrateCommands) -> Result<()> {
    let conn = context.db.as_ref();
    match command {
        MigrateCommands::Up => {
            Migrator::up(conn, None)
                .await
                .context("failed to apply migrations")?;
            println!("Migrations applied");
        }
        MigrateCommands::Down { steps } => {
            Migrator::down(conn, Some(steps))
                .await
                .context("failed to roll back migrations")?;
            println!("Rolled back {} migration(s)", steps);
        }
        MigrateCommands::Status => {
            Migrator::status(conn)
                .await
                .context("failed to read migration status")?;
        }
        MigrateCommands::Fresh => {
            Migrator::fresh(conn)
                .await
                .context("failed to rebuild the schema")?;
            println!("Schema rebuilt");
        }
    }
    Ok(())
}

async fn handle_create_admin(context: &CliContext, args: CreateAdminArgs, json: bool) -> Result<()> {
    let user = context
        .users
        .create_user(&args.username, &args.password, args.email.as_deref(), Role::Admin)
        .await
        .map_err(|e| anyhow!("failed to create admin: {}", e))?;

    print_user(&user, json, "Created admin")
}

async fn handle_set_role(context: &CliContext, args: SetRoleArgs, json: bool) -> Result<()> {
    let user = context
        .users
        .set_role(&args.username, args.role)
        .await
        .map_err(|e| anyhow!("failed to update role: {}", e))?;

    print_user(&user, json, "Updated")
}

fn print_user(user: &UserView, json: bool, verb: &str) -> Result<()> {
    if json {
        print_json(user)
    } else {
        println!(
            "{} {} (id {}, role {})",
            verb,
            user.username,
            user.id,
            user.role.as_ref()
        );
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{}", rendered);
    Ok(())
}
