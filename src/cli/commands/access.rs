use anyhow::anyhow;
use clap::Subcommand;
use serde_json::json;

use crate::authz::{decide, AccessDecision, AccessTarget, Requester};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::Store;
use crate::state::AppState;
use crate::types::{BoardId, OrganizationId};

#[derive(Subcommand)]
pub enum AccessCommands {
    #[command(about = "Would this user be allowed into this organization?")]
    Check {
        #[arg(long, help = "Email of the requesting user")]
        user: String,
        #[arg(long, help = "Target organization id")]
        org: Option<String>,
        #[arg(long, help = "Board id the request would carry")]
        board: Option<String>,
    },
}

pub async fn handle(cmd: AccessCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AccessCommands::Check { user, org, board } => {
            let state = AppState::from_config(config).await?;
            let requester = load_requester(state.store.as_ref(), &user).await?;
            let target = AccessTarget {
                organization_id: OrganizationId::parse_param(org.as_deref()),
                board_id: BoardId::parse_param(board.as_deref()),
            };

            let decision = decide(requester.as_ref(), &target);
            let outcome = describe(&decision);

            match output_format {
                OutputFormat::Text => {
                    println!("{} -> {}: {}", user, org.as_deref().unwrap_or("?"), outcome);
                    Ok(())
                }
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "user": user,
                            "organizationId": target.organization_id,
                            "boardId": target.board_id,
                            "allowed": decision.is_allowed(),
                            "outcome": outcome,
                        }))?
                    );
                    Ok(())
                }
            }
        }
    }
}

/// `None` when the email is unknown, mirroring an unauthenticated request
async fn load_requester<S>(store: &S, email: &str) -> anyhow::Result<Option<Requester>>
where
    S: Store + ?Sized,
{
    let Some(identity) = store.find_identity_by_email(email).await? else {
        tracing::warn!("No user with email '{}', evaluating as anonymous", email);
        return Ok(None);
    };

    let organization = match identity.organization_id.as_ref() {
        Some(org_id) => store.find_organization_by_id(org_id).await?,
        None => None,
    };
    if identity.organization_id.is_some() && organization.is_none() {
        return Err(anyhow!("organization of '{}' no longer exists", email));
    }

    Ok(Some(Requester::new(identity, organization)))
}

fn describe(decision: &AccessDecision) -> String {
    match decision {
        AccessDecision::Allow(grant) => format!("allow ({:?})", grant),
        AccessDecision::Deny(reason) => format!("deny ({})", reason.as_str()),
        AccessDecision::Unauthenticated => "unauthenticated".to_string(),
        AccessDecision::Indeterminate => "indeterminate (no organization id)".to_string(),
    }
}
