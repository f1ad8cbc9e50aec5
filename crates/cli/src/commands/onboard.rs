//! `labeler onboard` — First-time setup.

use labeler_config::AppConfig;
use std::path::Path;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🏷️  Labeler — First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let source = &config.catalog.source;
    let is_url = source.starts_with("http://") || source.starts_with("https://");
    if !is_url && !Path::new(source).exists() {
        println!("\n⚠️  Domain list not found at: {source}");
        println!("   Point [catalog] source at a newline-delimited file or URL.");
    }

    println!("\n📝 Next steps:");
    println!("   1. Review {}", config_path.display());
    println!("   2. Run: labeler label --user <phone number>");
    println!("   3. Export with: labeler export --scope global\n");

    Ok(())
}
