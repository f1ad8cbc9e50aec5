//! `labeler export` — Write the per-user or global report.

use clap::ValueEnum;
use labeler_config::AppConfig;
use labeler_engine::{Catalog, SessionController};
use std::path::PathBuf;

use crate::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scope {
    /// `{identity: {total, categories}}`
    Users,
    /// `{category: [{domain, user}]}`
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Txt,
}

/// Render one report. Lists are reshuffled on every call.
pub fn render(
    session: &mut SessionController,
    scope: Scope,
    format: Format,
) -> Result<String, serde_json::Error> {
    Ok(match (scope, format) {
        (Scope::Users, Format::Json) => serde_json::to_string_pretty(&session.export_users())?,
        (Scope::Users, Format::Txt) => session.export_users().to_text(),
        (Scope::Global, Format::Json) => serde_json::to_string_pretty(&session.export_global())?,
        (Scope::Global, Format::Txt) => session.export_global().to_text(),
    })
}

pub async fn run(
    scope: Scope,
    format: Format,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Exports only read stored aggregates; no catalog needed
    let mut runtime = Runtime::open(&config, Catalog::default(), false).await?;
    let rendered = render(&mut runtime.session, scope, format)?;
    runtime.shutdown().await;

    match output {
        Some(path) => {
            tokio::fs::write(&path, rendered).await?;
            eprintln!("✅ Wrote {scope:?} export to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}
