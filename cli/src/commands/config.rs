//! Config command - show or initialize the configuration file.

use anyhow::{Context, Result};
use zap_core::{Config, ConfigStore};

pub async fn show(store: &ConfigStore) -> Result<()> {
    let config = store.load_effective().await?;
    let state = if store.path().exists() { "" } else { " (not created, using defaults)" };

    println!("Config file: {}{}", store.path().display(), state);
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub async fn init(store: &ConfigStore) -> Result<()> {
    if store.path().exists() {
        println!("Config file already exists: {}", store.path().display());
        return Ok(());
    }

    store
        .save(&Config::default())
        .await
        .with_context(|| format!("Failed to write {}", store.path().display()))?;
    println!("Created {}", store.path().display());
    Ok(())
}
