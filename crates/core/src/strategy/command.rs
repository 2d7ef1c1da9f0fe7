//! Strategy that runs an external command line tool.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::format::FormatPair;

use super::error::StrategyError;
use super::staging::Staging;
use super::traits::Strategy;
use super::types::{ProgressReporter, StrategyOutcome, StrategyRequest};

/// Wraps a tool invoked as `program <args>` where the argument template may
/// contain `{input}`, `{output}`, `{source_ext}` and `{dest_ext}`.
#[derive(Debug, Clone)]
pub struct CommandStrategy {
    name: String,
    program: PathBuf,
    args: Vec<String>,
}

impl CommandStrategy {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument template.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several argument templates.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn render(&self, input: &Path, output: &Path, pair: &FormatPair) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{source_ext}", pair.source.extension())
                    .replace("{dest_ext}", pair.destination.extension())
            })
            .collect()
    }
}

#[async_trait]
impl Strategy for CommandStrategy {
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
        let produced = staging.output_path(request);
        let args = self.render(&input, &produced, &request.pair);

        debug!(
            job_id = %request.job_id,
            strategy = %self.name,
            program = %self.program.display(),
            "Running conversion tool"
        );
        progress.report(5);

        // Dropping this future (timeout, cancellation) kills the child.
        let output = Command::new(&self.program)
            .args(&args)
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

        staging.publish(&produced, request).await?;
        progress.report(95);

        Ok(StrategyOutcome::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use tempfile::TempDir;

    fn request(dir: &Path, pair: FormatPair) -> StrategyRequest {
        let input = dir.join("deadbeef");
        std::fs::write(&input, b"payload").unwrap();
        StrategyRequest {
            job_id: "job-7".to_string(),
            input_path: input,
            output_path: dir.join(format!("job-7.{}", pair.destination.extension())),
            pair,
        }
    }

    #[test]
    fn test_render_placeholders() {
        let strategy = CommandStrategy::new("magick", "magick")
            .arg("{input}[0]")
            .args(["-format", "{dest_ext}", "{output}"]);
        let rendered = strategy.render(
            Path::new("/s/input.png"),
            Path::new("/s/output.jpg"),
            &FormatPair::new(Format::Png, Format::Jpg),
        );
        assert_eq!(
            rendered,
            vec!["/s/input.png[0]", "-format", "jpg", "/s/output.jpg"]
        );
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let temp = TempDir::new().unwrap();
        let request = request(temp.path(), FormatPair::new(Format::Wav, Format::Mp3));
        let strategy = CommandStrategy::new("ffmpeg", "/nonexistent/bin/ffmpeg")
            .args(["-i", "{input}", "{output}"]);

        let err = strategy
            .convert(&request, &ProgressReporter::noop())
            .await
            .unwrap_err();

        assert!(matches!(err, StrategyError::ToolNotFound { .. }));
        assert!(!request.output_path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_tool_succeeds() {
        let temp = TempDir::new().unwrap();
        let request = request(temp.path(), FormatPair::new(Format::Txt, Format::Html));
        let strategy = CommandStrategy::new("cp", "cp").args(["{input}", "{output}"]);

        let outcome = strategy
            .convert(&request, &ProgressReporter::noop())
            .await
            .unwrap();

        assert_eq!(outcome, StrategyOutcome::success());
        assert_eq!(std::fs::read(&request.output_path).unwrap(), b"payload");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_tool_leaves_no_output() {
        let temp = TempDir::new().unwrap();
        let request = request(temp.path(), FormatPair::new(Format::Txt, Format::Pdf));
        let strategy = CommandStrategy::new("false", "false");

        let err = strategy
            .convert(&request, &ProgressReporter::noop())
            .await
            .unwrap_err();

        assert!(matches!(err, StrategyError::ToolFailed { .. }));
        assert!(!request.output_path.exists());
    }
}
