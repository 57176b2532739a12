//! Quota administration CLI commands: show, set.

use anyhow::Result;
use console::style;

use examiner_infra::sqlite::quota::QuotaRecord;
use examiner_types::identity::UserId;

use crate::state::AppState;

/// Render seconds as `1h 02m 03s` for humans.
fn format_duration(seconds: i64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m {s:02}s"),
        _ => format!("{h}h {m:02}m {s:02}s"),
    }
}

fn record_json(record: &QuotaRecord) -> serde_json::Value {
    serde_json::json!({
        "user_id": record.identity.user_id,
        "username": record.identity.username,
        "quota_seconds": record.quota_seconds,
    })
}

/// Show the remaining interview time of a user.
pub async fn show_quota(state: &AppState, user_id: UserId, json: bool) -> Result<()> {
    let Some(record) = state.quotas.find(user_id).await? else {
        if json {
            println!(
                "{}",
                serde_json::json!({"user_id": user_id, "found": false, "quota_seconds": 0})
            );
        } else {
            println!(
                "  {} No user with id {}. Create one with: {}",
                style("i").blue().bold(),
                style(user_id).bold(),
                style(format!("examiner quota set {user_id} <seconds>")).yellow()
            );
        }
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record_json(&record))?);
    } else {
        println!();
        println!(
            "  {} ({})",
            style(&record.identity.username).cyan().bold(),
            style(format!("id {}", record.identity.user_id)).dim()
        );
        let remaining = if record.quota_seconds > 0 {
            style(format_duration(record.quota_seconds)).green()
        } else {
            style("none".to_string()).red()
        };
        println!("  Interview time left: {remaining}");
        println!();
    }

    Ok(())
}

/// Set the remaining interview time of a user.
///
/// # Examples
///
/// ```bash
/// examiner quota set 7 3600 --username ada
/// ```
pub async fn set_quota(
    state: &AppState,
    user_id: UserId,
    seconds: i64,
    username: Option<&str>,
    json: bool,
) -> Result<()> {
    let record = state.quotas.set_quota(user_id, seconds, username).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record_json(&record))?);
    } else {
        println!(
            "  {} {} now has {} of interview time",
            style("✓").green().bold(),
            style(&record.identity.username).bold(),
            style(format_duration(record.quota_seconds)).cyan()
        );
    }

    Ok(())
}
