use super::prompts;
use crate::context::AppContext;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::fs;

pub fn run_clear(ctx: &AppContext, all: bool, local: bool, credentials: bool, yes: bool, output: &Output) -> Result<()> {
    if !(all || local || credentials) {
        output.warn("No clear option specified. Use --local, --credentials, or --all");
        output.info("\nExample: watchlist clear --local");
        return Ok(());
    }

    if !yes {
        let what = match (all || local, all || credentials) {
            (true, true) => "the local watchlist and stored credentials",
            (true, false) => "the watchlist stored on this device",
            _ => "stored credentials",
        };
        if !prompts::prompt_yes_no(&format!("Really clear {}?", what), false)? {
            output.info("Nothing cleared");
            return Ok(());
        }
    }

    if all || local {
        clear_local(ctx, output);
    }
    if all || credentials {
        clear_credentials(ctx, output)?;
    }
    Ok(())
}

fn clear_local(ctx: &AppContext, output: &Output) {
    let local = ctx.coordinator.local();
    let count = local.count();
    local.clear();
    output.success(format!("Cleared {} local watchlist entries", count));
}

fn clear_credentials(ctx: &AppContext, output: &Output) -> Result<()> {
    let credentials_file = ctx.paths.credentials_file();

    if credentials_file.exists() {
        fs::remove_file(&credentials_file)
            .map_err(|e| eyre!("Failed to remove credentials file at {}: {}", credentials_file.display(), e))?;
        ctx.coordinator.sync_state().reset();
        output.success(format!("Cleared credentials: {}", credentials_file.display()));
    } else {
        output.info("No credentials file found to clear");
    }
    Ok(())
}
