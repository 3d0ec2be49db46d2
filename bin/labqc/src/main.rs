//! `labqc` — the lab QC CLI client.
//!
//! Manages contexts, authentication, and resource operations against a
//! labqcd server.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Lab QC CLI tool.
#[derive(Parser, Debug)]
#[command(name = "labqc", about = "Lab QC CLI client", version)]
struct Cli {
    /// Path to client config file (default: ~/.labqc/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Context management.
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Switch the current context.
    Use {
        /// Context name.
        name: String,
    },

    /// Login to the current context's server.
    Login {
        /// Username.
        #[arg(long)]
        user: Option<String>,
        /// Password (not recommended — use the interactive prompt).
        #[arg(long)]
        password: Option<String>,
    },

    /// Logout — clear token from the current context.
    Logout,

    /// Show the authenticated user.
    Whoami,

    /// Get resource(s): products, batches, holds, pending, certificates, users.
    Get {
        /// Resource type.
        resource: String,
        /// Optional resource ID for single get.
        id: Option<String>,
        /// Limit results.
        #[arg(long)]
        limit: Option<usize>,
        /// Offset for pagination.
        #[arg(long)]
        offset: Option<usize>,
    },

    /// Create a resource from a JSON body.
    Create {
        /// Resource type.
        resource: String,
        /// JSON body.
        #[arg(long = "json")]
        json_body: String,
    },

    /// Release a held batch.
    Release {
        /// Batch ID.
        batch_id: String,
    },

    /// Check server status.
    Status,
}

#[derive(Subcommand, Debug)]
enum ContextAction {
    /// Create or update a context.
    Create {
        /// Context name.
        name: String,
        /// Server URL.
        #[arg(long)]
        server: String,
    },
    /// List contexts.
    List,
    /// Delete a context.
    Delete {
        /// Context name.
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);
    let output_json = cli.output == "json";

    match cli.command {
        Commands::Context { action } => match action {
            ContextAction::Create { name, server } => {
                commands::context::create(&name, &server, &config_path)
            }
            ContextAction::List => commands::context::list(&config_path),
            ContextAction::Delete { name } => commands::context::delete(&name, &config_path),
        },
        Commands::Use { name } => commands::context::use_context(&name, &config_path),
        Commands::Login { user, password } => {
            commands::login::login(user.as_deref(), password.as_deref(), &config_path)
        }
        Commands::Logout => commands::login::logout(&config_path),
        Commands::Whoami => commands::login::whoami(output_json, &config_path),
        Commands::Get {
            resource,
            id,
            limit,
            offset,
        } => commands::resource::get(
            &resource,
            id.as_deref(),
            output_json,
            limit,
            offset,
            &config_path,
        ),
        Commands::Create {
            resource,
            json_body,
        } => commands::resource::create(&resource, &json_body, &config_path),
        Commands::Release { batch_id } => commands::resource::release(&batch_id, &config_path),
        Commands::Status => {
            let body = commands::resource::get_json("/health", &config_path)?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
    }
}
