//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, validate), and their associated argument structs.
//! Every flag has an environment variable equivalent for container
//! deployments. The client secret itself is never accepted as a flag value,
//! only read from the environment or the secrets file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_UPSTREAM;

#[derive(Parser)]
#[command(
    name = "tokenrelay",
    version,
    about = "Credential-injecting reverse proxy for OAuth2 token exchange",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        tokenrelay validate                   Check ./secrets.json\n  \
        tokenrelay run                        Start on :8080 with ./secrets.json\n  \
        CLIENT_SECRET=... tokenrelay run      Take the secret from the environment"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Run(Box<RunArgs>),

    /// Check that the secret and upstream resolve, without starting
    Validate(ValidateArgs),
}

#[derive(Args, Clone, Debug)]
pub struct SecretArgs {
    /// JSON file holding {"client_secret": "..."}
    #[arg(long, env = "SECRETS_FILE", default_value = "secrets.json")]
    pub secrets_file: PathBuf,

    /// Environment variable checked for the secret before the file
    #[arg(long, default_value = "CLIENT_SECRET")]
    pub client_secret_env: String,

    /// Upstream scheme and host every request is forwarded to
    #[arg(long, env = "UPSTREAM_URL", default_value = DEFAULT_UPSTREAM)]
    pub upstream: String,
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        tokenrelay run                                     Defaults (:8080, ./secrets.json)\n  \
        tokenrelay run -p 9000 --pretty                    Local dev mode\n  \
        tokenrelay run --forward-header-deny authorization Drop caller credentials")]
pub struct RunArgs {
    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[command(flatten)]
    pub secrets: SecretArgs,

    // -- Header forwarding --
    /// Forward only these inbound headers (comma-separated)
    #[arg(
        long,
        env = "FORWARD_HEADER_ALLOW",
        value_delimiter = ',',
        conflicts_with = "forward_header_deny",
        help_heading = "Header Forwarding"
    )]
    pub forward_header_allow: Vec<String>,

    /// Forward every inbound header except these (comma-separated)
    #[arg(
        long,
        env = "FORWARD_HEADER_DENY",
        value_delimiter = ',',
        help_heading = "Header Forwarding"
    )]
    pub forward_header_deny: Vec<String>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Observability --
    /// Sentry DSN (enables error tracking)
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_DSN", help_heading = "Observability")]
    pub sentry_dsn: Option<String>,

    /// Sentry environment tag
    #[cfg(feature = "sentry-integration")]
    #[arg(long, env = "SENTRY_ENVIRONMENT", help_heading = "Observability")]
    pub sentry_environment: Option<String>,

    // -- Tuning --
    /// Upstream exchange timeout in milliseconds
    #[arg(
        long,
        env = "REQUEST_TIMEOUT_MS",
        default_value_t = 20_000,
        help_heading = "Tuning"
    )]
    pub timeout: u64,

    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 10_485_760,
        help_heading = "Tuning"
    )]
    pub max_body: usize,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub secrets: SecretArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["tokenrelay", "run"]).unwrap();
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.secrets.upstream, DEFAULT_UPSTREAM);
        assert_eq!(args.secrets.client_secret_env, "CLIENT_SECRET");
        assert_eq!(args.timeout, 20_000);
        assert!(args.forward_header_allow.is_empty());
    }

    #[test]
    fn header_lists_split_on_commas() {
        let cli = Cli::try_parse_from([
            "tokenrelay",
            "run",
            "--forward-header-deny",
            "authorization,cookie",
        ])
        .unwrap();
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.forward_header_deny, ["authorization", "cookie"]);
    }

    #[test]
    fn allow_and_deny_conflict() {
        let result = Cli::try_parse_from([
            "tokenrelay",
            "run",
            "--forward-header-allow",
            "accept",
            "--forward-header-deny",
            "cookie",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
