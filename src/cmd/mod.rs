//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`] or [`validate`]. Each handler lives in its
//! own submodule; both resolve the client secret through [`secret_resolver`].

pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands, SecretArgs};
use crate::config::sources::{EnvSecretSource, FileSecretSource};
use crate::config::SecretResolver;
use crate::error::RelayError;

pub async fn dispatch(cli: Cli) -> Result<(), RelayError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

/// Environment variable first, secrets file second.
#[must_use]
pub fn secret_resolver(args: &SecretArgs) -> SecretResolver {
    SecretResolver::new(vec![
        Box::new(EnvSecretSource::new(args.client_secret_env.clone())),
        Box::new(FileSecretSource::new(args.secrets_file.clone())),
    ])
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  tokenrelay v{version} \u{2014} credential-injecting OAuth2 proxy\n\n  \
         No command provided. To get started:\n\n    \
         tokenrelay validate                Check the secret and upstream\n    \
         tokenrelay run                     Start the proxy on :8080\n    \
         tokenrelay --help                  See all commands and options\n"
    );
}
