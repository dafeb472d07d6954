use crate::{
    api::{self, AuthConfig},
    cli::telemetry,
};
use anyhow::Result;
use secrecy::SecretString;
use std::fmt;
use tracing::debug;

pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub bcrypt_cost: u32,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &"***")
            .field("frontend_base_url", &self.frontend_base_url)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl Args {
    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.frontend_base_url.clone())
            .with_session_ttl_seconds(self.session_ttl_seconds)
            .with_bcrypt_cost(self.bcrypt_cost)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = args.auth_config();
    debug!(?args, "starting server");

    let result = api::new(args.port, args.dsn, auth_config).await;

    telemetry::shutdown_tracer();

    result
}
