//! Private scratch directories for strategies that shell out.
//!
//! Uploads are stored under their content hash with no extension, while most
//! tools sniff the format from the file name. A staging directory holds a
//! correctly named link to the input and receives the tool's output, which is
//! only moved to the final path once the tool succeeded.

use std::path::{Path, PathBuf};

use super::error::StrategyError;
use super::types::StrategyRequest;

/// Name prefix of every staging directory.
pub(crate) const STAGE_PREFIX: &str = ".stage-";

pub(crate) struct Staging {
    dir: PathBuf,
}

impl Staging {
    /// Creates `<output dir>/.stage-<job>-<label>`.
    pub(crate) async fn create(
        request: &StrategyRequest,
        label: &str,
    ) -> Result<Self, StrategyError> {
        let parent = request
            .output_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let dir = parent.join(format!("{}{}-{}", STAGE_PREFIX, request.job_id, label));
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    /// Links (or copies) the input into the staging dir with its extension.
    pub(crate) async fn stage_input(
        &self,
        request: &StrategyRequest,
    ) -> Result<PathBuf, StrategyError> {
        let staged = self
            .dir
            .join(format!("input.{}", request.pair.source.extension()));
        if tokio::fs::hard_link(&request.input_path, &staged).await.is_err() {
            tokio::fs::copy(&request.input_path, &staged)
                .await
                .map_err(|e| {
                    StrategyError::unreadable(format!(
                        "cannot stage {}: {}",
                        request.input_path.display(),
                        e
                    ))
                })?;
        }
        Ok(staged)
    }

    /// Path the tool should write to.
    pub(crate) fn output_path(&self, request: &StrategyRequest) -> PathBuf {
        self.dir
            .join(format!("output.{}", request.pair.destination.extension()))
    }

    /// Moves a produced file to the request's final output path.
    pub(crate) async fn publish(
        &self,
        produced: &Path,
        request: &StrategyRequest,
    ) -> Result<(), StrategyError> {
        if tokio::fs::metadata(produced).await.is_err() {
            return Err(StrategyError::OutputMissing {
                path: produced.to_path_buf(),
            });
        }
        tokio::fs::rename(produced, &request.output_path).await?;
        Ok(())
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}
