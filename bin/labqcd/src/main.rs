mod bootstrap;
mod config;
mod middleware;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use labqc_auth::AuthModule;
use labqc_auth::service::AuthService;
use labqc_kv::RedbStore;
use labqc_lab::LabModule;
use labqc_lab::service::LabService;
use labqc_sql::sqlite::SqliteStore;

use config::DaemonConfig;

/// Lab QC service daemon.
#[derive(Parser)]
#[command(name = "labqcd", version)]
struct Args {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "labqcd.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let cfg = DaemonConfig::load(&args.config)?;
    if cfg.jwt.secret.is_none() {
        warn!("jwt.secret not set, using the built-in dev secret");
    }
    let service_cfg = cfg.service_config();

    if let Some(dir) = &service_cfg.data_dir {
        std::fs::create_dir_all(dir)?;
    }

    let sql = Arc::new(SqliteStore::open(&service_cfg.resolve_sqlite_path())?);
    let kv = Arc::new(RedbStore::open(&service_cfg.resolve_kv_path())?);

    let auth = AuthService::new(sql.clone(), cfg.auth_config())?;
    let lab = LabService::new(sql, kv)?;

    if let Some(bootstrap_cfg) = &cfg.bootstrap {
        bootstrap::ensure_admin(&auth, bootstrap_cfg)?;
    }

    let auth_module = AuthModule::new(auth.clone());
    let lab_module = LabModule::new(lab);
    let router = routes::build_router(&[&auth_module, &lab_module], auth);

    let listener = tokio::net::TcpListener::bind(&service_cfg.listen).await?;
    info!(listen = %service_cfg.listen, "labqcd listening");
    axum::serve(listener, router).await?;
    Ok(())
}
