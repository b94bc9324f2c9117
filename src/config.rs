use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Default dev server port.
pub const DEFAULT_PORT: u16 = 1420;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Server profile (sets the default bind host)
    #[arg(long, value_enum, env = "CHAT_PROFILE")]
    pub profile: Option<ServerProfile>,

    /// Host to bind
    #[arg(long, env = "CHAT_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}

/// The two environment-specific dev server variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ServerProfile {
    /// Reachable from other machines.
    #[default]
    Public,
    /// Loopback only.
    Loopback,
}

impl ServerProfile {
    pub fn host(self) -> &'static str {
        match self {
            Self::Public => "0.0.0.0",
            Self::Loopback => "127.0.0.1",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub build: BuildConfig,
    pub dev_toolbar: DevToolbarConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Static,
    Server,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuildConfig {
    pub output: OutputMode,
    /// Build output directory served by the dev server.
    pub out_dir: String,
    /// Asset subdirectory inside `out_dir`.
    pub assets: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DevToolbarConfig {
    pub enabled: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layering, lowest to highest: defaults, profile host, `./config.*`,
    /// `--config` file, `CHAT_` environment variables, CLI flags.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let profile = cli.profile.unwrap_or_default();

        let mut builder = Config::builder()
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            .set_default("server.host", profile.host())?
            .set_default("build.output", "static")?
            .set_default("build.out_dir", "dist")?
            .set_default("build.assets", "assets")?
            .set_default("dev_toolbar.enabled", false)?;

        builder = builder.add_source(File::with_name("config").required(false));
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        }

        // E.g. CHAT_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn out_dir(&self) -> PathBuf {
        PathBuf::from(&self.build.out_dir)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.out_dir().join(&self.build.assets)
    }
}
