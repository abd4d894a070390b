//! Config subcommand handlers.

use secrecy::SecretString;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::active_profile;
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", betaseries_config::config_path().display());
            Ok(())
        }

        ConfigCommand::Show => {
            let path = betaseries_config::config_path();
            if !path.exists() {
                return Err(CliError::NoConfig {
                    path: path.display().to_string(),
                });
            }
            let cfg = betaseries_config::load_config()?;
            let rendered = betaseries_config::render_redacted(&cfg)?;
            print!("{rendered}");
            Ok(())
        }

        ConfigCommand::SetToken => {
            let cfg = betaseries_config::load_config_or_default();
            let active = active_profile(global, &cfg)?;

            let token = rpassword::prompt_password(format!("Token for '{}': ", active.name))?;
            if token.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }

            betaseries_config::store_token(&active.name, &SecretString::from(token.trim().to_owned()))?;
            eprintln!("Token stored in keyring for profile '{}'", active.name);
            Ok(())
        }
    }
}
