use anyhow::{anyhow, Context};
use clap::Subcommand;
use serde_json::json;

use crate::cli::{utils, OutputFormat};
use crate::config::AppConfig;
use crate::state::AppState;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a bearer token for a stored user without a password")]
    Issue {
        #[arg(help = "Email of the user")]
        email: String,
    },

    #[command(about = "Verify a bearer token and print its claims")]
    Inspect {
        #[arg(help = "Bearer token")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { email } => {
            let state = AppState::from_config(config).await?;
            let user = state
                .store
                .find_identity_by_email(&email)
                .await?
                .ok_or_else(|| anyhow!("no user with email '{}'", email))?;
            if !user.is_active {
                return Err(anyhow!("user '{}' is deactivated", email));
            }

            let token = state.tokens.issue(&user).context("issuing token")?;
            match output_format {
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
                OutputFormat::Json => utils::output_success(
                    &output_format,
                    &format!("Issued token for {} ({})", user.email, user.role),
                    Some(json!({ "token": token, "expiresIn": state.tokens.ttl_seconds() })),
                ),
            }
        }
        TokenCommands::Inspect { token } => {
            let tokens = crate::auth::TokenService::from_config(&config.security)?;
            match tokens.verify(&token) {
                Ok(claims) => utils::output_fields(
                    &output_format,
                    &[
                        ("sub", claims.sub.clone()),
                        ("role", claims.role.to_string()),
                        ("org", claims.org.clone().unwrap_or_else(|| "-".into())),
                        ("iss", claims.iss.clone()),
                        ("iat", claims.iat.to_string()),
                        ("exp", claims.exp.to_string()),
                    ],
                ),
                Err(err) => {
                    utils::output_error(&output_format, &err.to_string(), Some("INVALID_TOKEN"))?;
                    Err(anyhow!("token rejected"))
                }
            }
        }
    }
}
