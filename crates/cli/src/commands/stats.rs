//! `labeler stats` — Summarize stored results.

use labeler_config::AppConfig;
use labeler_core::persistence::PersistedState;
use labeler_engine::Catalog;
use std::fmt::Write;

use crate::runtime;

/// Per-user and per-category summary of a stored document.
pub fn summarize(state: &PersistedState, catalog: &Catalog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Catalog:   {} domains", catalog.len());
    let _ = writeln!(out, "  Users:     {}", state.users.len());

    if !state.users.is_empty() {
        let _ = writeln!(out, "\n  Per user:");
        for (identity, user) in &state.users {
            let remaining = catalog
                .domains()
                .iter()
                .filter(|d| !user.labeled_domains.contains(d))
                .count();
            let _ = writeln!(
                out,
                "    {identity}: {} labeled, {remaining} remaining",
                user.labeled_domains.len()
            );
        }
    }

    if !state.global_categories.is_empty() {
        let _ = writeln!(out, "\n  Per category:");
        for (category, entries) in &state.global_categories {
            let _ = writeln!(out, "    {category}: {}", entries.len());
        }
    }
    out
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let catalog = Catalog::load_or_empty(&config.catalog.source).await;
    let gateway = runtime::persistence_gateway(&config, false)?;
    let state = runtime::load_state(gateway.as_ref()).await.unwrap_or_default();

    println!("🏷️  Labeler Stats");
    println!("================");
    print!("{}", summarize(&state, &catalog));

    Ok(())
}
