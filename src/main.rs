use std::{process, sync::Arc};

use devblog::{
    application::{
        auth::{SessionAuthority, hash_password},
        error::AppError,
        repos::{BlogStore, RepoError, UsersRepo},
    },
    config::{self, Command, CreateUserArgs},
    infra::{
        db::PgRepositories,
        error::InfraError,
        http::{AppState, build_router},
        telemetry,
        uploads::UploadStorage,
    },
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let command = cli_args.command.unwrap_or(Command::Serve(Box::default()));

    match command {
        Command::Serve(_) => run_serve(settings).await,
        Command::CreateUser(args) => run_create_user(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    if settings.session.secret.trim().is_empty() {
        return Err(InfraError::configuration(
            "session.secret must be set before serving (DEVBLOG_SESSION_SECRET)",
        )
        .into());
    }

    let db = init_repositories(&settings).await?;
    let uploads = Arc::new(
        UploadStorage::new(settings.uploads.dir.clone()).map_err(InfraError::from)?,
    );
    let sessions = Arc::new(SessionAuthority::new(
        settings.session.secret.as_bytes().to_vec(),
        time::Duration::seconds(i64::try_from(settings.session.ttl.as_secs()).unwrap_or(i64::MAX)),
        settings.session.cookie_name.clone(),
    ));

    let store: Arc<dyn BlogStore> = db.clone();
    let state = AppState {
        db: store,
        uploads,
        sessions,
        page_size: settings.site.page_size,
        upload_body_limit: usize::try_from(settings.uploads.max_request_bytes)
            .unwrap_or(usize::MAX),
        expose_errors: settings.server.expose_errors,
    };

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "devblog::serve",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    db.close().await;
    info!(target = "devblog::serve", "shutdown complete");
    Ok(())
}

async fn run_create_user(
    settings: config::Settings,
    args: CreateUserArgs,
) -> Result<(), AppError> {
    let db = init_repositories(&settings).await?;

    let name = resolve_field(args.name, "Enter name: ").await?;
    let email = resolve_field(args.email, "Enter email: ").await?;
    let password = resolve_field(args.password, "Enter password: ").await?;

    let user = db
        .create_user(&name, &email, &hash_password(&password))
        .await
        .map_err(|err| match err {
            RepoError::Duplicate { .. } => {
                AppError::validation(format!("a user with email `{email}` already exists"))
            }
            other => AppError::unexpected(format!("failed to create user: {other}")),
        })?;

    info!(
        target = "devblog::create_user",
        user_id = %user.id,
        email = %user.email,
        "user created"
    );

    db.close().await;
    Ok(())
}

async fn init_repositories(settings: &config::Settings) -> Result<Arc<PgRepositories>, AppError> {
    let pool = PgRepositories::connect(
        &settings.database.url,
        settings.database.max_connections,
    )
    .await
    .map_err(|err| InfraError::database(format!("failed to connect: {err}")))?;

    PgRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(format!("failed to run migrations: {err}")))?;

    Ok(Arc::new(PgRepositories::new(pool)))
}

async fn resolve_field(preset: Option<String>, prompt: &str) -> Result<String, AppError> {
    let value = match preset {
        Some(value) => value,
        None => read_prompted_line(prompt).await?,
    };
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!(
            "{} must not be empty",
            prompt.trim_end_matches(": ").trim_start_matches("Enter ")
        )));
    }
    Ok(trimmed)
}

async fn read_prompted_line(prompt: &str) -> Result<String, AppError> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(prompt.as_bytes())
        .await
        .map_err(InfraError::from)?;
    stdout.flush().await.map_err(InfraError::from)?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(InfraError::from)?;
    Ok(line)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "devblog::serve",
            error = %err,
            "failed to install shutdown signal handler"
        );
        // Without a working signal handler there is nothing to wait for;
        // never resolve rather than shutting the server down immediately.
        std::future::pending::<()>().await;
    }
}
