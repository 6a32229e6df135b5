//! Agent registry and credential commands.
//!
//! # Environment Variables
//!
//! Read the same variables as the agent backend (`OKTA_DOMAIN` and the
//! per-agent `<KIND>_AGENT_*` set), including a `.env` file.

use progear_agent_api::config::AgentApiConfig;
use progear_agent_api::exchange::{TokenExchanger, client_assertion};
use progear_core::AgentKind;
use tracing::info;

use super::CliError;

/// Log every agent with its scopes and credential state.
///
/// # Errors
///
/// Returns an error if the environment holds an unparseable value.
pub fn list() -> Result<(), CliError> {
    let config = AgentApiConfig::from_env()?;

    for kind in AgentKind::ALL {
        let creds = config.agent(kind);
        let mode = if creds.is_some_and(|c| c.is_configured()) {
            "token-exchange"
        } else {
            "demo"
        };
        info!("{} ({kind})", kind.display_name());
        info!("  Mode: {mode}");
        info!("  Scopes: {}", kind.scopes().join(" "));
        if let Some(creds) = creds {
            info!("  Agent id: {}", creds.agent_id.as_deref().unwrap_or("-"));
            info!("  Key id: {}", creds.key_id.as_deref().unwrap_or("-"));
            info!("  Authorization server: {}", creds.auth_server_id);
        }
    }

    Ok(())
}

/// Sign a client assertion for `kind` from `config`.
///
/// The audience defaults to the org token endpoint, where the first step
/// of the exchange is sent.
///
/// # Errors
///
/// Returns `CliError::MissingCredential` when the agent id or key is unset,
/// and an exchange error for an unusable key or domain.
pub fn mint_assertion(
    config: &AgentApiConfig,
    kind: AgentKind,
    audience: Option<&str>,
) -> Result<String, CliError> {
    let creds = config
        .agent(kind)
        .ok_or(CliError::MissingCredential(kind, "AGENT_ID"))?;
    let agent_id = creds
        .agent_id
        .as_deref()
        .ok_or(CliError::MissingCredential(kind, "AGENT_ID"))?;
    let private_key = creds
        .private_key
        .as_ref()
        .ok_or(CliError::MissingCredential(kind, "AGENT_PRIVATE_KEY"))?;

    let audience = match audience {
        Some(audience) => audience.to_string(),
        None => TokenExchanger::new(config.okta.base_url())
            .org_token_endpoint()?
            .to_string(),
    };

    Ok(client_assertion(
        agent_id,
        creds.key_id.as_deref(),
        private_key,
        &audience,
        chrono::Utc::now(),
    )?)
}

/// Print a client assertion for the configured agent.
///
/// # Errors
///
/// See [`mint_assertion`].
#[allow(clippy::print_stdout)]
pub fn assertion(kind: AgentKind, audience: Option<&str>) -> Result<(), CliError> {
    let config = AgentApiConfig::from_env()?;
    let token = mint_assertion(&config, kind, audience)?;
    info!(agent = %kind, "Client assertion issued");
    println!("{token}");
    Ok(())
}
