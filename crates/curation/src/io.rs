use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::state::PipelineState;

pub const RUN_FILE_VERSION: &str = "1.0";

/// A finished run as written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub version: String,
    pub created_at: String,
    pub state: PipelineState,
}

impl RunRecord {
    pub fn new(state: PipelineState) -> Self {
        Self {
            version: RUN_FILE_VERSION.to_string(),
            created_at: Utc::now().to_rfc3339(),
            state,
        }
    }
}

/// Get the default directory for storing run files
pub fn get_default_runs_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .context("Could not determine local data directory")?
        .join("news-curator")
        .join("runs");

    fs::create_dir_all(&data_dir).context("Failed to create runs directory")?;

    Ok(data_dir)
}

/// Keyword reduced to characters that are safe in a file name
fn file_stem(keyword: &str) -> String {
    let stem: String = keyword
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "run".to_string()
    } else {
        stem
    }
}

/// Save a run to the default runs directory
pub fn save_run(state: &PipelineState) -> Result<PathBuf> {
    save_run_in(&get_default_runs_dir()?, state)
}

pub fn save_run_in(dir: &Path, state: &PipelineState) -> Result<PathBuf> {
    if !state.is_final() {
        anyhow::bail!(
            "Refusing to save run for '{}' at stage {}; only final runs are saved",
            state.keyword,
            state.stage
        );
    }

    let record = RunRecord::new(state.clone());
    let filename = format!(
        "{}-{}.json",
        file_stem(&state.keyword),
        Utc::now().format("%Y%m%d-%H%M%S%3f")
    );
    let filepath = dir.join(filename);

    let json = serde_json::to_string_pretty(&record).context("Failed to serialize run")?;
    fs::write(&filepath, json)
        .with_context(|| format!("Failed to write run file: {}", filepath.display()))?;

    Ok(filepath)
}

/// Load a run from a JSON file
pub fn load_run(filepath: &Path) -> Result<RunRecord> {
    if !filepath.exists() {
        anyhow::bail!("Run file not found: {}", filepath.display());
    }

    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read run file: {}", filepath.display()))?;

    let record: RunRecord = serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse run JSON from {}. The file may be corrupted or not a run file.",
            filepath.display()
        )
    })?;

    if record.version != RUN_FILE_VERSION {
        anyhow::bail!(
            "Unsupported run file version: {}. Expected {}.",
            record.version,
            RUN_FILE_VERSION
        );
    }

    record
        .state
        .validate()
        .with_context(|| format!("Run file {} is inconsistent", filepath.display()))?;

    Ok(record)
}

/// List saved runs in the default directory, newest first
pub fn list_runs() -> Result<Vec<(PathBuf, RunRecord)>> {
    list_runs_in(&get_default_runs_dir()?)
}

pub fn list_runs_in(dir: &Path) -> Result<Vec<(PathBuf, RunRecord)>> {
    let mut files = Vec::new();

    if dir.exists() {
        for entry in fs::read_dir(dir).context("Failed to read runs directory")? {
            let path = entry?.path();

            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                match load_run(&path) {
                    Ok(record) => files.push((path, record)),
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable run file"),
                }
            }
        }
    }

    files.sort_by(|a, b| {
        let time_a = DateTime::parse_from_rfc3339(&a.1.created_at).ok();
        let time_b = DateTime::parse_from_rfc3339(&b.1.created_at).ok();
        time_b.cmp(&time_a)
    });

    Ok(files)
}
