//! Environment readiness check.

use crate::cli::output::status_line;
use crate::config::{Config, IN_MEMORY_URI};
use crate::renderer::find_chromium;
use crate::store::IndexStore;
use anyhow::Result;

/// Report Chromium availability, store reachability and the effective
/// configuration.
pub async fn run() -> Result<()> {
    println!("Indices Doctor");
    println!("==============");
    println!();

    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let config = Config::from_env()?;

    let chromium = find_chromium(config.render.chromium_path.as_ref());
    match &chromium {
        Some(path) => println!("{}", status_line(true, format!("Chromium found: {}", path.display()))),
        None => println!(
            "{}",
            status_line(false, "Chromium NOT found. Rendered fetches (selenium=true) will fall back to plain HTTP.")
        ),
    }

    let store_location = config
        .store
        .database_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| IN_MEMORY_URI.to_string());
    let store_ok = match IndexStore::open(&config.store) {
        Ok(store) => match store.ping().await {
            Ok(()) => {
                let count = store.count().await.unwrap_or(0);
                println!(
                    "{}",
                    status_line(
                        true,
                        format!(
                            "Store reachable: {store_location}, collection '{}' ({count} records)",
                            store.collection()
                        )
                    )
                );
                true
            }
            Err(e) => {
                println!("{}", status_line(false, format!("Store not answering: {e}")));
                false
            }
        },
        Err(e) => {
            println!("{}", status_line(false, format!("Store unavailable at {store_location}: {e}")));
            false
        }
    };

    println!();
    println!("Configuration");
    println!("  API URL:      {}", config.source.api_url);
    println!("  Page URL:     {}", config.source.page_url);
    println!("  HTTP timeout: {}ms", config.source.timeout.as_millis());
    println!("  Store:        {store_location}");
    println!("  Collection:   {}", config.store.collection);

    println!();
    if store_ok {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
        println!("  Check INDICES_STORE_URI and INDICES_STORE_COLLECTION.");
    }

    Ok(())
}
