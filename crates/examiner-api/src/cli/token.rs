//! Access token CLI commands: issue, revoke.

use anyhow::Result;
use console::style;

use examiner_core::repository::token::AccessTokenRepository;
use examiner_types::error::RepositoryError;
use examiner_types::identity::UserId;

use crate::state::AppState;

/// Issue a token for a user and print it once.
pub async fn issue_token(state: &AppState, user_id: UserId, json: bool) -> Result<()> {
    let token = match state.tokens.issue(user_id).await {
        Ok(token) => token,
        Err(RepositoryError::NotFound) => anyhow::bail!(
            "no user with id {user_id}; grant quota first with `examiner quota set {user_id} <seconds>`"
        ),
        Err(err) => return Err(err.into()),
    };

    if json {
        println!("{}", serde_json::json!({"user_id": user_id, "token": token}));
    } else {
        println!();
        println!(
            "  {} Access token issued (save this -- it won't be shown again):",
            style("🔑").bold()
        );
        println!();
        println!("  {}", style(&token).yellow().bold());
        println!();
    }

    Ok(())
}

/// Revoke a token so it no longer opens interviews.
pub async fn revoke_token(state: &AppState, token: &str, json: bool) -> Result<()> {
    let revoked = state.tokens.revoke(token.trim()).await?;

    if json {
        println!("{}", serde_json::json!({"revoked": revoked}));
    } else if revoked {
        println!("  {} Token revoked", style("✓").green().bold());
    } else {
        println!(
            "  {} Token not found or already revoked",
            style("!").yellow().bold()
        );
    }

    Ok(())
}
