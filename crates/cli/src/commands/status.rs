//! `labeler status` — Show configuration and stored state.

use labeler_config::AppConfig;

use crate::runtime;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("🏷️  Labeler Status");
    println!("=================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Catalog:      {}", config.catalog.source);
    println!("  Persistence:  {}", config.persistence.backend);
    match config.persistence.backend.as_str() {
        "file" => println!("  State file:   {}", config.state_path().display()),
        "http" => println!(
            "  Endpoint:     {}",
            config.persistence.endpoint.as_deref().unwrap_or("(unset)")
        ),
        _ => {}
    }
    println!("  Identity:     {}", config.session.identity_rule);
    println!("  Categories:   {}", config.session.default_categories.join(", "));
    println!(
        "  Seed:         {}",
        config
            .session
            .seed
            .map_or_else(|| "random".to_string(), |s| s.to_string())
    );
    println!("  Server:       {}:{}", config.server.host, config.server.port);

    let gateway = runtime::persistence_gateway(&config, false)?;
    match runtime::load_state(gateway.as_ref()).await {
        Some(state) => {
            let entries: usize = state.global_categories.values().map(Vec::len).sum();
            println!("\n  ✅ Stored state: {} users, {entries} classifications", state.users.len());
        }
        None => println!("\n  ⚠️  No stored state yet"),
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found");
    } else {
        println!("  ⚠️  No config file — run `labeler onboard` first");
    }

    Ok(())
}
