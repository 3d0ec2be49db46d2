//! Login / logout / whoami commands.

use std::path::Path;

use anyhow::Result;

use crate::config::ClientConfig;

/// Login to the current context's server.
pub fn login(username: Option<&str>, password: Option<&str>, config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(config_path)?;

    let ctx = config
        .current()
        .ok_or_else(|| anyhow::anyhow!("No current context. Run `labqc use <name>`."))?
        .clone();
    if ctx.server.is_empty() {
        anyhow::bail!("No server URL set for context \"{}\".", ctx.name);
    }

    let username = match username {
        Some(u) => u.to_string(),
        None => inquire::Text::new("Username:").prompt()?,
    };
    let password = match password {
        Some(p) => p.to_string(),
        None => inquire::Password::new("Password:")
            .without_confirmation()
            .prompt()?,
    };

    let url = format!("{}/auth/v1/login", ctx.server.trim_end_matches('/'));
    let client = reqwest::blocking::Client::new();
    let resp = client
        .post(&url)
        .json(&serde_json::json!({"username": username, "password": password}))
        .send()
        .map_err(|e| anyhow::anyhow!("failed to connect to server: {}", e))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body: serde_json::Value = resp.json().unwrap_or_default();
        let message = body["message"].as_str().unwrap_or("unknown error");
        anyhow::bail!("Login failed ({}): {}", status, message);
    }

    let data: serde_json::Value = resp.json()?;
    let token = data["accessToken"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("No accessToken in response"))?;

    let ctx_mut = config
        .get_mut(&ctx.name)
        .ok_or_else(|| anyhow::anyhow!("Context disappeared"))?;
    ctx_mut.token = token.to_string();
    config.save(config_path)?;

    println!("Logged in as {}.", username);
    if let Some(landing) = data["landingPage"].as_str() {
        println!("Landing page: {}", landing);
    }
    Ok(())
}

/// Logout — clear token from current context.
pub fn logout(config_path: &Path) -> Result<()> {
    let mut config = ClientConfig::load(config_path)?;

    let current_name = config.current_context.clone();
    if current_name.is_empty() {
        anyhow::bail!("No current context.");
    }

    let ctx = config
        .get_mut(&current_name)
        .ok_or_else(|| anyhow::anyhow!("Current context not found."))?;
    ctx.token = String::new();
    config.save(config_path)?;
    println!("Logged out from context \"{}\".", current_name);
    Ok(())
}

/// Show the authenticated user and effective permissions.
pub fn whoami(output_json: bool, config_path: &Path) -> Result<()> {
    let body = crate::commands::resource::get_json("/auth/v1/me", config_path)?;
    if output_json {
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        let user = &body["user"];
        println!(
            "{} ({}) role={}",
            user["name"].as_str().unwrap_or("?"),
            user["username"].as_str().unwrap_or("?"),
            user["role"].as_str().unwrap_or("?"),
        );
        if let Some(landing) = body["landingPage"].as_str() {
            println!("landing page: {}", landing);
        }
    }
    Ok(())
}
