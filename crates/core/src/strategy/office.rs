//! LibreOffice headless conversion.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::error::StrategyError;
use super::staging::Staging;
use super::traits::Strategy;
use super::types::{ProgressReporter, StrategyOutcome, StrategyRequest};

/// Runs `soffice --headless --convert-to <ext>`.
///
/// soffice picks its own output name (`<input stem>.<ext>` inside
/// `--outdir`) and refuses to run twice against one user profile, so every
/// invocation gets a private profile inside its staging directory.
#[derive(Debug, Clone)]
pub struct OfficeStrategy {
    name: String,
    program: PathBuf,
}

impl OfficeStrategy {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            name: "libreoffice".to_string(),
            program: program.into(),
        }
    }

    fn profile_url(dir: &Path) -> String {
        format!(
            "-env:UserInstallation=file://{}",
            dir.join("profile").to_string_lossy()
        )
    }
}

#[async_trait]
impl Strategy for OfficeStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn convert(
        &self,
        request: &StrategyRequest,
        progress: &ProgressReporter,
    ) -> Result<StrategyOutcome, StrategyError> {
        let staging = Staging::create(request, &self.name).await?;
        let input = staging.stage_input(request).await?;
        let ext = request.pair.destination.extension();
        let out_dir = staging.dir().join("out");
        tokio::fs::create_dir_all(&out_dir).await?;

        debug!(job_id = %request.job_id, ext, "Running soffice");
        progress.report(5);

        let output = Command::new(&self.program)
            .arg(Self::profile_url(staging.dir()))
            .args(["--headless", "--norestore", "--convert-to", ext, "--outdir"])
            .arg(&out_dir)
            .arg(&input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StrategyError::ToolNotFound {
                        tool: self.name.clone(),
                        path: self.program.clone(),
                    }
                } else {
                    StrategyError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(StrategyError::tool_failed(
                &self.name,
                output.status.code(),
                &String::from_utf8_lossy(&output.stderr),
            ));
        }
        progress.report(90);

        // soffice exits 0 even when no filter matched; the file is the proof.
        let produced = out_dir.join(format!("input.{}", ext));
        staging.publish(&produced, request).await?;
        progress.report(95);

        Ok(StrategyOutcome::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Format, FormatPair};
    use tempfile::TempDir;

    #[test]
    fn test_profile_url() {
        let url = OfficeStrategy::profile_url(Path::new("/tmp/stage"));
        assert_eq!(url, "-env:UserInstallation=file:///tmp/stage/profile");
    }

    #[tokio::test]
    async fn test_missing_soffice() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("cafe");
        std::fs::write(&input, b"doc").unwrap();
        let request = StrategyRequest {
            job_id: "job-2".to_string(),
            input_path: input,
            output_path: temp.path().join("job-2.pdf"),
            pair: FormatPair::new(Format::Docx, Format::Pdf),
        };

        let strategy = OfficeStrategy::new("/nonexistent/soffice");
        let err = strategy
            .convert(&request, &ProgressReporter::noop())
            .await
            .unwrap_err();

        assert_eq!(strategy.name(), "libreoffice");
        assert!(matches!(err, StrategyError::ToolNotFound { .. }));
        assert!(!temp.path().join(".stage-job-2-libreoffice").exists());
    }
}
