//! Profile selection and CLI flag overrides on top of `betaseries_config`.

use std::sync::Arc;
use std::time::Duration;

use betaseries_api::{Authenticator, BetaSeriesClient, ClientConfig};
use betaseries_config::{Config, ConfigError, Profile};
use secrecy::SecretString;
use tracing::{debug, warn};

use crate::auth;
use crate::cli::GlobalOpts;
use crate::error::CliError;

/// A resolved profile with its name.
pub struct ActiveProfile {
    pub name: String,
    pub profile: Profile,
}

/// Pick the profile named by `--profile` (or the default one). Without a
/// matching profile, a `--client-key` flag is enough to run ad hoc.
pub fn active_profile(global: &GlobalOpts, cfg: &Config) -> Result<ActiveProfile, CliError> {
    match cfg.profile(global.profile.as_deref()) {
        Ok((name, profile)) => Ok(ActiveProfile {
            name: name.to_owned(),
            profile: profile.clone(),
        }),
        Err(ConfigError::UnknownProfile { profile: name }) => {
            if global.client_key.is_some() {
                return Ok(ActiveProfile {
                    name,
                    profile: Profile::default(),
                });
            }
            if cfg.profiles.is_empty() {
                return Err(CliError::NoConfig {
                    path: betaseries_config::config_path().display().to_string(),
                });
            }
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            Err(CliError::ProfileNotFound {
                name,
                available: available.join(", "),
            })
        }
        Err(other) => Err(other.into()),
    }
}

/// Build the `ClientConfig` for a profile, applying CLI flag overrides.
pub fn client_config(
    active: &ActiveProfile,
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<ClientConfig, CliError> {
    let mut profile = active.profile.clone();
    if let Some(ref url) = global.api_url {
        profile.api_url = Some(url.clone());
    }
    if let Some(ref key) = global.client_key {
        profile.client_key = Some(key.clone());
        profile.client_key_env = None;
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let mut config =
        betaseries_config::profile_to_client_config(&profile, &active.name, &cfg.defaults)?;
    if let Some(ref key) = global.client_key {
        config.client_key.clone_from(key);
    }
    if let Some(ref token) = global.token {
        config.token = SecretString::from(token.clone());
    }
    if let Some(timeout) = global.timeout {
        config.transport.timeout = Duration::from_secs(timeout);
    }
    Ok(config)
}

/// Build the client: the terminal flow when the profile has an `auth_url`,
/// and refreshed tokens persisted to the keyring.
pub fn build_client(global: &GlobalOpts) -> Result<Arc<BetaSeriesClient>, CliError> {
    let cfg = betaseries_config::load_config_or_default();
    let active = active_profile(global, &cfg)?;
    let config = client_config(&active, global, &cfg)?;

    let authenticator: Arc<dyn Authenticator> = match active.profile.auth_url()? {
        Some(entry_point) => Arc::new(auth::terminal_flow(
            entry_point,
            active.profile.auth_timeout(),
        )),
        None => Arc::new(auth::Unconfigured),
    };

    debug!(profile = %active.name, base_url = %config.base_url, "building client");
    let profile_name = active.name;
    let client = BetaSeriesClient::new(config, authenticator)
        .map_err(|e| CliError::from(betaseries_core::CoreError::from(e)))?
        .on_credential_refresh(move |token| {
            if let Err(e) = betaseries_config::store_token(&profile_name, token) {
                warn!(error = %e, "could not persist refreshed token");
            }
        });
    Ok(Arc::new(client))
}
