// Crewspace Server - Main Entry Point
//
// Bootstrap, CLI commands and logging setup. Handlers, routes and business
// logic live in the library crate.

use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use crewspace_core::{
    config::AppConfig,
    db::Database,
    user::{NewUser, SubscriptionTier},
    workspace::NewWorkspace,
};
use crewspace_server::{build_state, router};
use dotenvy::{Error as DotenvError, dotenv, from_filename};
use std::{
    env,
    path::{Path, PathBuf},
    sync::OnceLock,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_appender::non_blocking;
use tracing_subscriber::EnvFilter;

static TRACING_GUARD: OnceLock<non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(author, version, about = "Crewspace server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Run database migrations
    Migrate,
    /// Register a user
    CreateUser(CreateUserArgs),
    /// Create a workspace on behalf of an existing user
    CreateWorkspace(CreateWorkspaceArgs),
}

#[derive(Args, Debug)]
struct CreateUserArgs {
    #[arg(long, value_name = "EMAIL")]
    email: String,
    #[arg(long = "first-name", value_name = "NAME")]
    first_name: String,
    #[arg(long = "last-name", value_name = "NAME")]
    last_name: String,
    /// Subscription tier (basic, premium, enterprise, starter, pro, ultimate)
    #[arg(long, value_name = "TIER")]
    tier: Option<String>,
}

#[derive(Args, Debug)]
struct CreateWorkspaceArgs {
    /// Email of the user who becomes the workspace creator
    #[arg(long = "creator-email", value_name = "EMAIL")]
    creator_email: String,
    #[arg(long, value_name = "NAME")]
    name: String,
    #[arg(long = "contact-email", value_name = "EMAIL")]
    contact_email: String,
    #[arg(long = "member-limit", value_name = "COUNT")]
    member_limit: i64,
    /// Workspace plan (basic, premium, enterprise)
    #[arg(long, value_name = "PLAN", default_value = "basic")]
    plan: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_status = load_env_file();
    init_tracing()?;
    report_env_status(&env_status);

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_serve(config).await,
        Command::Migrate => run_migrate(config).await,
        Command::CreateUser(args) => run_create_user(config, args).await,
        Command::CreateWorkspace(args) => run_create_workspace(config, args).await,
    }
}

async fn run_serve(config: AppConfig) -> anyhow::Result<()> {
    info!(
        database_path = %config.database_path,
        database_max_connections = config.database_max_connections,
        "Starting server with database configuration"
    );
    let database = Database::connect(&config).await?;
    let state = build_state(&database);
    info!(
        version = %state.metadata.version,
        message = %state.metadata.message,
        "Loaded server metadata"
    );

    let app = router::build_router(state);

    let listener = TcpListener::bind(config.bind_address)
        .await
        .context("failed to bind socket")?;
    let actual_addr = listener
        .local_addr()
        .context("failed to read local address")?;

    info!("listening on {actual_addr}");

    if let Err(error) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(?error, "server terminated with error");
    }

    Ok(())
}

async fn run_migrate(config: AppConfig) -> anyhow::Result<()> {
    let database = Database::connect(&config).await?;
    info!(
        database_path = %database.database_path().display(),
        "migrations completed"
    );
    Ok(())
}

async fn run_create_user(config: AppConfig, args: CreateUserArgs) -> anyhow::Result<()> {
    let subscription_tier = args
        .tier
        .as_deref()
        .map(str::parse::<SubscriptionTier>)
        .transpose()?;

    let database = Database::connect(&config).await?;
    let state = build_state(&database);
    let user = state
        .user_store
        .register(NewUser {
            email: &args.email,
            first_name: &args.first_name,
            last_name: &args.last_name,
            subscription_tier,
        })
        .await
        .map_err(|err| anyhow!("failed to create user: {err}"))?;

    println!(
        "Created user {} ({}) on the {} tier",
        user.email, user.id, user.subscription_tier
    );
    Ok(())
}

async fn run_create_workspace(config: AppConfig, args: CreateWorkspaceArgs) -> anyhow::Result<()> {
    let CreateWorkspaceArgs {
        creator_email,
        name,
        contact_email,
        member_limit,
        plan,
    } = args;

    if creator_email.trim().is_empty() {
        bail!("creator-email must not be empty");
    }

    let database = Database::connect(&config).await?;
    let state = build_state(&database);
    let creator = state
        .user_store
        .find_by_email(&creator_email)
        .await?
        .with_context(|| format!("no user found with email {}", creator_email.trim()))?;

    let workspace = state
        .workspace_store
        .create(
            &creator.id,
            NewWorkspace {
                name: &name,
                contact_email: &contact_email,
                member_limit,
                plan: &plan,
            },
        )
        .await
        .map_err(|err| anyhow!("failed to create workspace: {err}"))?;

    println!(
        "Created workspace '{}' ({}) for creator {} with room for {} members",
        workspace.name, workspace.id, workspace.creator_id, workspace.member_limit
    );
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    // JSON to a daily rolling file by default; RUST_LOG controls the level.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_to_stdout = env::var("CREWSPACE_LOG_TO_STDOUT")
        .map(|v| !v.trim().is_empty() && v.trim() != "0")
        .unwrap_or(false);

    if log_to_stdout {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .json()
            .with_writer(std::io::stdout)
            .try_init();
        return Ok(());
    }

    let log_dir = env::var("CREWSPACE_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log dir '{log_dir}'"))?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "server.log");
    let (writer, guard) = non_blocking(file_appender);

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .json()
        .with_writer(writer)
        .try_init()
        .is_ok()
    {
        let _ = TRACING_GUARD.set(guard);
    }

    Ok(())
}

enum EnvLoadStatus {
    Loaded(PathBuf),
    NotFound,
    Failed(DotenvError),
}

fn load_env_file() -> EnvLoadStatus {
    if let Ok(env_file) = env::var("CREWSPACE_ENV_FILE") {
        let trimmed = env_file.trim();
        if !trimmed.is_empty() {
            let path = PathBuf::from(trimmed);
            return match from_filename(&path) {
                Ok(_) => EnvLoadStatus::Loaded(make_relative(&path).unwrap_or(path)),
                Err(err) => EnvLoadStatus::Failed(err),
            };
        }
    }

    match dotenv() {
        Ok(path) => EnvLoadStatus::Loaded(make_relative(&path).unwrap_or(path)),
        Err(DotenvError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            EnvLoadStatus::NotFound
        }
        Err(err) => EnvLoadStatus::Failed(err),
    }
}

fn report_env_status(status: &EnvLoadStatus) {
    match status {
        EnvLoadStatus::Loaded(path) => {
            info!("Loaded environment variables from {}", path.display());
        }
        EnvLoadStatus::NotFound => {
            info!("No .env file found; using process environment only");
        }
        EnvLoadStatus::Failed(err) => {
            warn!("Failed to load .env file: {err:?}");
        }
    }
}

fn make_relative(path: &Path) -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    path.strip_prefix(&cwd).map(Path::to_path_buf).ok()
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut term, mut int) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(err), _) | (_, Err(err)) => {
                error!(?err, "failed to install signal handlers; falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = term.recv() => {},
            _ = int.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
