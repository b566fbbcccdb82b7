use super::prompts;
use crate::context::AppContext;
use crate::output::Output;
use chrono::Utc;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::json;
use tracing::info;
use watchlist_core::MergeOutcome;

pub async fn run_login(
    ctx: &AppContext,
    token: Option<String>,
    refresh_token: Option<String>,
    output: &Output,
) -> Result<()> {
    let token = match token {
        Some(token) => token.trim().to_string(),
        None => prompts::prompt_secret("Access token: ")?,
    };
    if token.is_empty() {
        return Err(eyre!("Access token cannot be empty"));
    }

    let mut credentials = ctx.credentials()?;
    credentials.set_access_token(token);
    if let Some(refresh_token) = refresh_token {
        credentials.set_refresh_token(refresh_token);
    }
    credentials.set_logged_in_at(Utc::now());
    credentials
        .save()
        .map_err(|e| eyre!("Failed to save credentials: {}", e))?;
    info!(operation = "login", "Stored access token");

    // A fresh login always counts as a transition, even over a stale session
    ctx.coordinator.auth().set_authenticated(false);
    ctx.coordinator.auth().set_authenticated(true);
    ctx.coordinator.handle_login().await;
    let outcome = ctx.coordinator.wait_for_merge().await;

    output.success("Logged in");
    report_outcome(outcome.as_ref(), output);
    Ok(())
}

pub async fn run_logout(ctx: &AppContext, output: &Output) -> Result<()> {
    ctx.end_session().await?;
    output.success("Logged out; changes are now stored on this device");
    Ok(())
}

pub async fn run_sync(ctx: &AppContext, output: &Output) -> Result<()> {
    match ctx.coordinator.merge_now().await {
        Ok(outcome) => {
            report_outcome(Some(&outcome), output);
            if output.is_human() && outcome.summary().is_none() {
                output.info("Nothing to merge");
            }
            Ok(())
        }
        Err(e) => Err(ctx.fail(e).await),
    }
}

fn report_outcome(outcome: Option<&MergeOutcome>, output: &Output) {
    let Some(outcome) = outcome else {
        return;
    };

    if let MergeOutcome::Merged(report) = outcome {
        output.json(&json!({
            "type": "merge",
            "synced": report.synced,
            "skipped": report.skipped,
            "invalid": report.invalid,
            "total": report.total(),
        }));
        if report.invalid > 0 && output.is_human() {
            output.warn(format!("{} local entries were rejected by the server", report.invalid));
        }
    }
    if let Some(summary) = outcome.summary() {
        if output.is_human() {
            output.info(summary);
        }
    }
}
