use crate::context::AppContext;
use crate::output::Output;
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use serde_json::json;
use watchlist_config::Config;

pub fn run_config(ctx: &AppContext, cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show_config(ctx, output),
        ConfigCommands::Init { force } => init_config(ctx, force, output),
    }
}

fn show_config(ctx: &AppContext, output: &Output) -> Result<()> {
    let config = &ctx.config;
    let storage_dir = config.storage.resolve_dir(&ctx.paths);
    let credentials = ctx.credentials()?;
    let logged_in = credentials.has_session();
    let logged_in_at = credentials.get_logged_in_at();

    output.json(&json!({
        "config_file": ctx.config_file.display().to_string(),
        "config_file_exists": ctx.config_file.exists(),
        "api": {
            "base_url": config.api.base_url,
            "timeout_seconds": config.api.timeout_seconds,
        },
        "storage": {
            "dir": storage_dir.display().to_string(),
            "watchlist_key": config.storage.watchlist_key,
            "sync_flag_key": config.storage.sync_flag_key,
        },
        "logging": {
            "level": config.logging.level,
            "file": config.logging.file.as_ref().map(|p| p.display().to_string()),
        },
        "logged_in": logged_in,
        "logged_in_at": logged_in_at.map(|at| at.to_rfc3339()),
    }));
    if !output.is_human() {
        return Ok(());
    }

    if !ctx.config_file.exists() {
        output.warn(format!(
            "Configuration file not found at {}; showing defaults. Run 'watchlist config init' to create it.",
            ctx.config_file.display()
        ));
    }

    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    table.add_row(vec![Cell::new("Config file"), Cell::new(ctx.config_file.display())]);
    table.add_row(vec![Cell::new("API base URL"), Cell::new(&config.api.base_url)]);
    table.add_row(vec![Cell::new("API timeout"), Cell::new(format!("{}s", config.api.timeout_seconds))]);
    table.add_row(vec![Cell::new("Storage directory"), Cell::new(storage_dir.display())]);
    table.add_row(vec![Cell::new("Watchlist key"), Cell::new(&config.storage.watchlist_key)]);
    table.add_row(vec![Cell::new("Merge flag key"), Cell::new(&config.storage.sync_flag_key)]);
    table.add_row(vec![Cell::new("Log level"), Cell::new(&config.logging.level)]);
    table.add_row(vec![
        Cell::new("Log file"),
        Cell::new(
            config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stderr".to_string()),
        ),
    ]);
    let session = match (logged_in, logged_in_at) {
        (true, Some(at)) => format!("yes, since {}", at.format("%Y-%m-%d %H:%M UTC")),
        (true, None) => "yes".to_string(),
        (false, _) => "no".to_string(),
    };
    table.add_row(vec![Cell::new("Logged in"), Cell::new(session)]);
    output.table(&mut table);
    Ok(())
}

fn init_config(ctx: &AppContext, force: bool, output: &Output) -> Result<()> {
    if ctx.config_file.exists() && !force {
        output.warn(format!(
            "Configuration file already exists at {} (use --force to overwrite)",
            ctx.config_file.display()
        ));
        return Ok(());
    }

    ctx.paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create directories: {}", e))?;
    let mut config = Config::default();
    config.logging.file = Some(ctx.paths.log_file());
    config
        .save_to_file(&ctx.config_file)
        .map_err(|e| eyre!("Failed to write {}: {}", ctx.config_file.display(), e))?;

    output.success(format!("Wrote default configuration to {}", ctx.config_file.display()));
    Ok(())
}
