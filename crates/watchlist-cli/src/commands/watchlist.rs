use crate::context::AppContext;
use crate::output::Output;
use color_eyre::Result;
use comfy_table::{Cell, Color, Table};
use serde_json::json;
use watchlist_core::TrackState;
use watchlist_models::{filter_by_status, sort_entries, SortOrder, WatchlistStatus};

fn mode_label(ctx: &AppContext) -> &'static str {
    if ctx.coordinator.is_authenticated() {
        "account"
    } else {
        "this device"
    }
}

pub async fn run_status(ctx: &AppContext, anime_id: i64, output: &Output) -> Result<()> {
    let state = match ctx.coordinator.track_state(anime_id).await {
        Ok(state) => state,
        Err(e) => return Err(ctx.fail(e).await),
    };

    output.json(&json!({ "anime_id": anime_id, "track": state }));
    match state {
        TrackState::Tracked(status) => {
            if output.is_human() {
                output.info(format!("Anime #{}: {}", anime_id, status.label()));
            }
        }
        TrackState::Untracked => {
            if output.is_human() {
                output.info(format!("Anime #{} is not on your watchlist", anime_id));
            }
        }
    }
    Ok(())
}

pub async fn run_set(ctx: &AppContext, anime_id: i64, status: WatchlistStatus, output: &Output) -> Result<()> {
    if let Err(e) = ctx.coordinator.set_status(anime_id, status).await {
        return Err(ctx.fail(e).await);
    }
    output.success(format!(
        "Anime #{} set to {} ({})",
        anime_id,
        status.label(),
        mode_label(ctx)
    ));
    Ok(())
}

pub async fn run_remove(ctx: &AppContext, anime_id: i64, output: &Output) -> Result<()> {
    if let Err(e) = ctx.coordinator.remove(anime_id).await {
        return Err(ctx.fail(e).await);
    }
    output.success(format!("Anime #{} removed from watchlist ({})", anime_id, mode_label(ctx)));
    Ok(())
}

pub async fn run_list(
    ctx: &AppContext,
    status: Option<WatchlistStatus>,
    sort: SortOrder,
    output: &Output,
) -> Result<()> {
    let listing = match ctx.coordinator.list().await {
        Ok(listing) => listing,
        Err(e) => return Err(ctx.fail(e).await),
    };

    let mut entries = match status {
        Some(status) => filter_by_status(listing.entries, status),
        None => listing.entries,
    };
    sort_entries(&mut entries, sort);

    output.json(&json!({
        "source": mode_label(ctx),
        "entries": entries,
        "counts": listing.counts,
    }));
    if !output.is_human() {
        return Ok(());
    }

    if entries.is_empty() {
        output.info("Your watchlist is empty");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["ID", "Title", "Status", "Added", "Updated"]);
        for entry in &entries {
            table.add_row(vec![
                Cell::new(entry.anime_id),
                Cell::new(entry.display_title()),
                Cell::new(entry.status.label()).fg(status_color(entry.status)),
                Cell::new(entry.added_at.format("%Y-%m-%d")),
                Cell::new(entry.updated_at.format("%Y-%m-%d")),
            ]);
        }
        output.table(&mut table);
    }

    let mut counts = Table::new();
    counts.set_header(vec!["Status", "Count"]);
    for status in WatchlistStatus::ALL {
        counts.add_row(vec![Cell::new(status.label()), Cell::new(listing.counts.get(status))]);
    }
    counts.add_row(vec![Cell::new("Total"), Cell::new(listing.counts.total)]);
    output.table(&mut counts);
    Ok(())
}

pub async fn run_check(ctx: &AppContext, anime_ids: &[i64], output: &Output) -> Result<()> {
    let statuses = match ctx.coordinator.check(anime_ids).await {
        Ok(statuses) => statuses,
        Err(e) => return Err(ctx.fail(e).await),
    };

    let rows: Vec<_> = anime_ids
        .iter()
        .map(|id| (*id, statuses.get(id).copied()))
        .collect();
    output.json(&json!({
        "statuses": rows
            .iter()
            .map(|(id, status)| json!({ "anime_id": id, "status": status }))
            .collect::<Vec<_>>()
    }));

    let mut table = Table::new();
    table.set_header(vec!["ID", "Status"]);
    for (id, status) in rows {
        let cell = match status {
            Some(status) => Cell::new(status.label()).fg(status_color(status)),
            None => Cell::new("-"),
        };
        table.add_row(vec![Cell::new(id), cell]);
    }
    output.table(&mut table);
    Ok(())
}

fn status_color(status: WatchlistStatus) -> Color {
    match status {
        WatchlistStatus::Watching => Color::Blue,
        WatchlistStatus::Done => Color::Green,
        WatchlistStatus::Break => Color::Yellow,
        WatchlistStatus::Planned => Color::Magenta,
        WatchlistStatus::Dropped => Color::Red,
    }
}
