use crate::cli::{
    actions::{server, Action},
    commands::auth,
};
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use url::Url;

/// Map parsed arguments to an [`Action`].
///
/// # Errors
/// Returns an error if a required argument is missing or the DSN is not a
/// postgres URL.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .ok_or_else(|| anyhow!("missing required argument: --dsn"))?;
    validate_dsn(&dsn)?;

    let auth = auth::Options::parse(matches)?;

    Ok(Action::Server(server::Args {
        port,
        dsn: SecretString::from(dsn),
        frontend_base_url: auth.frontend_base_url,
        session_ttl_seconds: auth.session_ttl_seconds,
        bcrypt_cost: auth.bcrypt_cost,
    }))
}

fn validate_dsn(dsn: &str) -> Result<()> {
    // never echo the DSN back, it may carry a password
    let parsed = Url::parse(dsn).context("invalid DSN: not a URL")?;
    match parsed.scheme() {
        "postgres" | "postgresql" => Ok(()),
        scheme => Err(anyhow!("invalid DSN scheme '{scheme}', expected postgres")),
    }
}
