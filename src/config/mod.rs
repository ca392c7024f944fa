//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;


const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "devblog";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_SESSION_COOKIE: &str = "devblog_session";
const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_PAGE_SIZE: u32 = crate::application::pagination::DEFAULT_PAGE_SIZE;

/// Command-line arguments for the devblog binary.
#[derive(Debug, Parser)]
#[command(name = "devblog", version, about = "Devblog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "DEVBLOG_CONFIG_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the blog HTTP server.
    Serve(Box<ServeArgs>),
    /// Provision an admin account (interactive; flags may pre-supply fields).
    #[command(name = "create-user")]
    CreateUser(CreateUserArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Include diagnostic detail on rendered error pages.
    #[arg(
        long = "server-expose-errors",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub expose_errors: Option<bool>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", env = "DATABASE_URL", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the upload storage directory.
    #[arg(long = "uploads-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub uploads_dir: Option<PathBuf>,

    /// Override the upload request body limit in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,

    /// Override the session signing secret.
    #[arg(
        long = "session-secret",
        env = "DEVBLOG_SESSION_SECRET",
        value_name = "SECRET",
        hide_env_values = true
    )]
    pub session_secret: Option<String>,

    /// Override the session lifetime in seconds.
    #[arg(long = "session-ttl-seconds", value_name = "SECONDS")]
    pub session_ttl_secs: Option<u64>,

    /// Override the number of posts per listing page.
    #[arg(long = "site-page-size", value_name = "COUNT")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CreateUserArgs {
    /// Display name for the account; prompted for when absent.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Login email for the account; prompted for when absent.
    #[arg(long, value_name = "EMAIL")]
    pub email: Option<String>,

    /// Plaintext password; prompted for when absent.
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Override the database connection URL.
    #[arg(long = "database-url", env = "DATABASE_URL", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read configuration sources: {0}")]
    Sources(#[from] config::ConfigError),
    #[error("invalid setting `{field}`: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
    #[error("missing required setting `{field}`")]
    Missing { field: &'static str },
}

impl SettingsError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub expose_errors: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_request_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Signing secret; may be empty when only provisioning runs.
    pub secret: String,
    pub ttl: Duration,
    pub cookie_name: String,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub page_size: u32,
}

/// Fully validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub uploads: UploadSettings,
    pub session: SessionSettings,
    pub site: SiteSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawSettings {
    pub(crate) server: RawServerSettings,
    pub(crate) database: RawDatabaseSettings,
    pub(crate) uploads: RawUploadSettings,
    pub(crate) session: RawSessionSettings,
    pub(crate) site: RawSiteSettings,
    pub(crate) logging: RawLoggingSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawServerSettings {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) expose_errors: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawDatabaseSettings {
    pub(crate) url: Option<String>,
    pub(crate) max_connections: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawUploadSettings {
    pub(crate) dir: Option<PathBuf>,
    pub(crate) max_request_bytes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawSessionSettings {
    pub(crate) secret: Option<String>,
    pub(crate) ttl_secs: Option<u64>,
    pub(crate) cookie_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawSiteSettings {
    pub(crate) page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawLoggingSettings {
    pub(crate) level: Option<String>,
    pub(crate) json: Option<bool>,
}

impl RawSettings {
    pub(crate) fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = &overrides.server_host {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(expose) = overrides.expose_errors {
            self.server.expose_errors = Some(expose);
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = &overrides.database_url {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(dir) = &overrides.uploads_dir {
            self.uploads.dir = Some(dir.clone());
        }
        if let Some(bytes) = overrides.uploads_max_request_bytes {
            self.uploads.max_request_bytes = Some(bytes);
        }
        if let Some(secret) = &overrides.session_secret {
            self.session.secret = Some(secret.clone());
        }
        if let Some(ttl) = overrides.session_ttl_secs {
            self.session.ttl_secs = Some(ttl);
        }
        if let Some(size) = overrides.page_size {
            self.site.page_size = Some(size);
        }
    }

    pub(crate) fn apply_create_user_overrides(&mut self, args: &CreateUserArgs) {
        if let Some(url) = &args.database_url {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    pub(crate) fn from_raw(raw: RawSettings) -> Result<Self, SettingsError> {
        let host = raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = raw.server.port.unwrap_or(DEFAULT_PORT);
        let addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|err| SettingsError::invalid("server.host", err.to_string()))?;

        let database_url = raw
            .database
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::Missing {
                field: "database.url",
            })?;

        let level = match raw.logging.level {
            Some(text) => LevelFilter::from_str(&text)
                .map_err(|err| SettingsError::invalid("logging.level", err.to_string()))?,
            None => LevelFilter::INFO,
        };
        let format = if raw.logging.json.unwrap_or(false) {
            LogFormat::Json
        } else {
            LogFormat::Compact
        };

        let page_size = raw.site.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(SettingsError::invalid(
                "site.page_size",
                "page size must be at least 1",
            ));
        }

        Ok(Self {
            server: ServerSettings {
                addr,
                expose_errors: raw.server.expose_errors.unwrap_or(false),
            },
            database: DatabaseSettings {
                url: database_url,
                max_connections: raw
                    .database
                    .max_connections
                    .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
                    .max(1),
            },
            uploads: UploadSettings {
                dir: raw
                    .uploads
                    .dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
                max_request_bytes: raw
                    .uploads
                    .max_request_bytes
                    .unwrap_or(DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES),
            },
            session: SessionSettings {
                secret: raw.session.secret.unwrap_or_default(),
                ttl: Duration::from_secs(
                    raw.session.ttl_secs.unwrap_or(DEFAULT_SESSION_TTL_SECS).max(1),
                ),
                cookie_name: raw
                    .session
                    .cookie_name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
            },
            site: SiteSettings { page_size },
            logging: LoggingSettings { level, format },
        })
    }
}

/// Parse CLI arguments and load layered settings: defaults file, local
/// file, explicit `--config-file`, `DEVBLOG_*` environment, CLI flags.
pub fn load_with_cli() -> Result<(CliArgs, Settings), SettingsError> {
    let cli = CliArgs::parse();
    let settings = load_settings(&cli)?;
    Ok((cli, settings))
}

fn load_settings(cli: &CliArgs) -> Result<Settings, SettingsError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = &cli.config_file {
        builder = builder.add_source(File::from(path.clone()).required(true));
    }

    let raw_config = builder
        .add_source(Environment::with_prefix("DEVBLOG").separator("__"))
        .build()?;

    let mut raw: RawSettings = raw_config.try_deserialize()?;

    match &cli.command {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::CreateUser(args)) => raw.apply_create_user_overrides(args),
        None => {}
    }

    Settings::from_raw(raw)
}
