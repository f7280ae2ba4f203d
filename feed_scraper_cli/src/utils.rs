use crate::error::ExportError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use tracing::info;

/// On-disk form of one scrape run, written only when the user asks for it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FeedExport {
    pub scraped_at: DateTime<Utc>,
    pub blocks: Vec<String>,
}

impl FeedExport {
    pub fn new(blocks: Vec<String>) -> Self {
        Self {
            scraped_at: Utc::now(),
            blocks,
        }
    }
}

pub fn save_json(export: &FeedExport, path: &Path) -> Result<(), ExportError> {
    let mut file = File::create(path)?;
    file.write_all(serde_json::to_string_pretty(export)?.as_bytes())?;
    info!("wrote {} blocks to {:?}", export.blocks.len(), path);
    Ok(())
}

pub fn load_json(path: &Path) -> Result<FeedExport, ExportError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

pub fn save_text(content: &str, path: &Path) -> Result<(), ExportError> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    info!("wrote {:?}", path);
    Ok(())
}
