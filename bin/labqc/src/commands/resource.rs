//! Generic resource commands.
//!
//! `labqc get products`, `labqc release <batch-id>`, etc.
//! Translates resource names to REST API paths.

use std::path::Path;

use anyhow::Result;

use crate::config::{ClientConfig, Context};

/// Map a singular/plural resource name to the API path.
fn resource_path(resource: &str) -> Result<(&'static str, &'static str)> {
    // Returns (singular, api_path).
    match resource.to_lowercase().as_str() {
        "user" | "users" => Ok(("user", "/auth/v1/users")),
        "product" | "products" => Ok(("product", "/lab/v1/products")),
        "batch" | "batches" => Ok(("batch", "/lab/v1/batches")),
        "hold" | "holds" => Ok(("hold", "/lab/v1/holds")),
        "hold-history" | "holdhistory" => Ok(("hold", "/lab/v1/holds/history")),
        "pending" | "pending-tests" => Ok(("pending test", "/lab/v1/pending")),
        "certificate" | "certificates" | "cert" | "certs"
            => Ok(("certificate", "/lab/v1/certificates")),
        "setting" | "settings" => Ok(("setting", "/lab/v1/settings")),
        _ => Err(anyhow::anyhow!("Unknown resource type: {}", resource)),
    }
}

/// HTTP client for the current context, with the saved bearer token.
fn build_client(ctx: &Context) -> Result<(reqwest::blocking::Client, String)> {
    if ctx.server.is_empty() {
        anyhow::bail!("No server URL set for context \"{}\".", ctx.name);
    }

    let mut headers = reqwest::header::HeaderMap::new();
    if !ctx.token.is_empty() {
        let val = format!("Bearer {}", ctx.token);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&val)?,
        );
    }

    let client = reqwest::blocking::Client::builder()
        .default_headers(headers)
        .build()?;
    Ok((client, ctx.server.trim_end_matches('/').to_string()))
}

fn check(status: reqwest::StatusCode, body: &serde_json::Value) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    let message = body["message"].as_str().unwrap_or("unknown error");
    anyhow::bail!("Error ({}): {}", status, message);
}

/// GET an arbitrary API path in the current context.
pub fn get_json(api_path: &str, config_path: &Path) -> Result<serde_json::Value> {
    let config = ClientConfig::load(config_path)?;
    let ctx = config
        .current()
        .ok_or_else(|| anyhow::anyhow!("No current context."))?;
    let (client, base_url) = build_client(ctx)?;

    let resp = client.get(format!("{}{}", base_url, api_path)).send()?;
    let status = resp.status();
    let body: serde_json::Value = resp.json()?;
    check(status, &body)?;
    Ok(body)
}

/// POST an arbitrary API path in the current context.
pub fn post_json(
    api_path: &str,
    body: &serde_json::Value,
    config_path: &Path,
) -> Result<serde_json::Value> {
    let config = ClientConfig::load(config_path)?;
    let ctx = config
        .current()
        .ok_or_else(|| anyhow::anyhow!("No current context."))?;
    let (client, base_url) = build_client(ctx)?;

    let resp = client
        .post(format!("{}{}", base_url, api_path))
        .json(body)
        .send()?;
    let status = resp.status();
    let result: serde_json::Value = resp.json()?;
    check(status, &result)?;
    Ok(result)
}

/// GET a resource (list or get by ID).
pub fn get(
    resource: &str,
    id: Option<&str>,
    output_json: bool,
    limit: Option<usize>,
    offset: Option<usize>,
    config_path: &Path,
) -> Result<()> {
    let (_, api_path) = resource_path(resource)?;

    let path = if let Some(id) = id {
        format!("{}/{}", api_path, id)
    } else {
        let mut params = Vec::new();
        if let Some(l) = limit {
            params.push(format!("limit={}", l));
        }
        if let Some(o) = offset {
            params.push(format!("offset={}", o));
        }
        if params.is_empty() {
            api_path.to_string()
        } else {
            format!("{}?{}", api_path, params.join("&"))
        }
    };

    let body = get_json(&path, config_path)?;
    if output_json {
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print_table(resource, &body);
    }
    Ok(())
}

/// CREATE a resource from a JSON body.
pub fn create(resource: &str, json_body: &str, config_path: &Path) -> Result<()> {
    let (singular, api_path) = resource_path(resource)?;
    let body: serde_json::Value = serde_json::from_str(json_body)
        .map_err(|e| anyhow::anyhow!("Invalid JSON: {}", e))?;
    let result = post_json(api_path, &body, config_path)?;
    println!("{} created.", singular);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Release a held batch.
pub fn release(batch_id: &str, config_path: &Path) -> Result<()> {
    let result = post_json(
        &format!("/lab/v1/batches/{}/release", batch_id),
        &serde_json::json!({}),
        config_path,
    )?;
    println!(
        "Batch {} released.",
        result["referenceNo"].as_str().unwrap_or(batch_id)
    );
    Ok(())
}

/// One line per item for the common list shapes; raw JSON otherwise.
fn print_table(resource: &str, body: &serde_json::Value) {
    let items = match body["items"].as_array() {
        Some(items) => items.clone(),
        None => vec![body.clone()],
    };
    if items.is_empty() {
        println!("No {} found.", resource);
        return;
    }
    for item in &items {
        let line = match resource.to_lowercase().as_str() {
            "product" | "products" => format!(
                "{}  {}  specs={}",
                item["code"].as_str().unwrap_or("?"),
                item["name"].as_str().unwrap_or("?"),
                item["specifications"].as_array().map(Vec::len).unwrap_or(0),
            ),
            "batch" | "batches" | "hold" | "holds" | "hold-history" | "pending"
            | "pending-tests" => format!(
                "{}  {}  hold={}  outOfRange={}",
                item["referenceNo"].as_str().unwrap_or("?"),
                item["productName"].as_str().unwrap_or("?"),
                item["isHold"].as_bool().unwrap_or(false),
                item["outOfRange"].as_object().map(|m| m.len()).unwrap_or(0),
            ),
            "certificate" | "certificates" | "cert" | "certs" => format!(
                "{}  {}  {}",
                item["referenceNo"].as_str().unwrap_or("?"),
                item["productName"].as_str().unwrap_or("?"),
                item["status"].as_str().unwrap_or("?"),
            ),
            "user" | "users" => format!(
                "{}  {}  role={}",
                item["username"].as_str().unwrap_or("?"),
                item["name"].as_str().unwrap_or("?"),
                item["role"].as_str().unwrap_or("?"),
            ),
            _ => serde_json::to_string(item).unwrap_or_default(),
        };
        println!("{}", line);
    }
    if let Some(total) = body["total"].as_u64() {
        println!("total: {}", total);
    }
}
