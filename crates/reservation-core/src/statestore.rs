use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::codec::{self, PickerState};

const STATE_FILE: &str = "picker-state.json";

/// Keeps the encoded picker state on disk between runs.
#[derive(Debug)]
pub struct StateStore {
    pub data_dir: PathBuf,
    pub state_path: PathBuf,
}

impl StateStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let state_path = data_dir.join(STATE_FILE);
        info!(
            data_dir = %data_dir.display(),
            state = %state_path.display(),
            "opened state store"
        );

        Ok(Self {
            data_dir,
            state_path,
        })
    }

    /// Raw blob, or `None` when nothing has been saved yet.
    #[tracing::instrument(skip(self))]
    pub fn load_blob(&self) -> anyhow::Result<Option<String>> {
        if !self.state_path.exists() {
            debug!(file = %self.state_path.display(), "no saved state");
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.state_path)
            .with_context(|| format!("failed reading {}", self.state_path.display()))?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }

    #[tracing::instrument(skip(self, state))]
    pub fn save(&self, state: &PickerState) -> anyhow::Result<()> {
        let blob = codec::encode(state).context("failed to encode picker state")?;
        self.save_blob(&blob)
    }

    #[tracing::instrument(skip(self, blob))]
    pub fn save_blob(&self, blob: &str) -> anyhow::Result<()> {
        debug!(file = %self.state_path.display(), bytes = blob.len(), "saving state atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        writeln!(temp, "{blob}")?;
        temp.flush()?;

        temp.persist(&self.state_path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.state_path.display(), err))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn reset(&self) -> anyhow::Result<()> {
        if self.state_path.exists() {
            fs::remove_file(&self.state_path)
                .with_context(|| format!("failed removing {}", self.state_path.display()))?;
            info!(file = %self.state_path.display(), "removed saved state");
        }
        Ok(())
    }
}
