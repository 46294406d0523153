pub mod catalog;
pub mod cli;
pub mod core;
pub mod providers;

use crate::catalog::CatalogCache;
use crate::core::config::AppConfig;
use crate::providers::EastmoneyProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Search {
        keyword: String,
        limit: Option<i64>,
        json: bool,
    },
    Info {
        code: String,
        json: bool,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fundex starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let provider = EastmoneyProvider::new(
        config.providers.eastmoney_base_url(),
        config.catalog.fetch_timeout(),
    )?;
    let catalog = CatalogCache::from_config(Arc::new(provider), &config.catalog);

    match command {
        AppCommand::Search {
            keyword,
            limit,
            json,
        } => cli::search::run(&catalog, &config.search, &keyword, limit, json).await,
        AppCommand::Info { code, json } => cli::info::run(&catalog, &code, json).await,
    }
}
