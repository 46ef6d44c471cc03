use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::info;

pub const DEFAULT_HOST: &str = "https://api.thecatapi.com";
pub const DEFAULT_PAGE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub host: String,
    pub api_key: String,
    pub page_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_key: String::new(),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Load configuration from a `.env`-style file. A missing file is not an
/// error: defaults apply, and CLI flags can override everything anyway.
pub fn load(path: &Path) -> Result<SyncConfig> {
    if !path.exists() {
        info!("No config file at {:?}, using defaults", path);
        return Ok(SyncConfig::default());
    }

    let file = File::open(path).with_context(|| format!("Failed to open config {path:?}"))?;
    let reader = BufReader::new(file);

    let mut config = SyncConfig::default();
    for line in reader.lines() {
        let line = line?;
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "CATS_API_HOST" => config.host = value.to_string(),
            "CATS_API_KEY" => config.api_key = value.to_string(),
            "CATS_API_DATA_LIMIT" => {
                config.page_limit = value
                    .parse()
                    .map_err(|_| anyhow!("CATS_API_DATA_LIMIT is not a number: {value}"))?;
                if config.page_limit == 0 {
                    return Err(anyhow!("CATS_API_DATA_LIMIT must be positive"));
                }
            }
            _ => {}
        }
    }
    info!("Loaded config from {:?}", path);
    Ok(config)
}

pub fn save(path: &Path, config: &SyncConfig) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create config {path:?}"))?;
    writeln!(file, "CATS_API_HOST={}", config.host)?;
    writeln!(file, "CATS_API_KEY={}", config.api_key)?;
    writeln!(file, "CATS_API_DATA_LIMIT={}", config.page_limit)?;
    Ok(())
}
