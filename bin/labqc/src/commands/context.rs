//! Context management commands.

use std::path::Path;

use anyhow::Result;

use crate::config::{ClientConfig, Context};

/// Create or update a context.
pub fn create(name: &str, server: &str, config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(config_path)?;
    config.upsert_context(Context {
        name: name.to_string(),
        server: server.trim_end_matches('/').to_string(),
        token: String::new(),
    });
    if config.current_context.is_empty() {
        config.current_context = name.to_string();
    }
    config.save(config_path)?;
    println!("Context \"{}\" saved.", name);
    Ok(())
}

/// List contexts; the current one is starred.
pub fn list(config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(config_path)?;
    if config.contexts.is_empty() {
        println!("No contexts. Run `labqc context create <name> --server <url>`.");
        return Ok(());
    }
    for ctx in &config.contexts {
        let marker = if ctx.name == config.current_context { "*" } else { " " };
        let auth = if ctx.token.is_empty() { "" } else { " (logged in)" };
        println!("{} {}  {}{}", marker, ctx.name, ctx.server, auth);
    }
    Ok(())
}

/// Switch the current context.
pub fn use_context(name: &str, config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(config_path)?;
    if config.get_mut(name).is_none() {
        anyhow::bail!("Context \"{}\" not found.", name);
    }
    config.current_context = name.to_string();
    config.save(config_path)?;
    println!("Switched to context \"{}\".", name);
    Ok(())
}

/// Delete a context.
pub fn delete(name: &str, config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(config_path)?;
    if !config.remove_context(name) {
        anyhow::bail!("Context \"{}\" not found.", name);
    }
    config.save(config_path)?;
    println!("Context \"{}\" removed.", name);
    Ok(())
}
