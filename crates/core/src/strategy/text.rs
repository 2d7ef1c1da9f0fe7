//! In-process text extraction, the last resort for TXT and HTML targets.

use async_trait::async_trait;

use crate::format::Format;

use super::error::StrategyError;
use super::staging::Staging;
use super::traits::Strategy;
use super::types::{ProgressReporter, StrategyOutcome, StrategyRequest};

/// Warning attached to every result of the text fallback.
pub const TEXT_FALLBACK_WARNING: &str =
    "text-only fallback: layout, images and formatting were discarded";

/// Shortest run of printable bytes kept when scanning binary input.
const MIN_RUN: usize = 4;

/// Extracts readable text from any input and writes it as TXT or HTML.
#[derive(Debug, Clone, Default)]
pub struct TextFallbackStrategy;

impl TextFallbackStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Whether the fallback can write `format`.
    pub fn supports(format: Format) -> bool {
        matches!(format, Format::Txt | Format::Html)
    }
}

#[async_trait]
impl Strategy for TextFallbackStrategy {
    fn name(&self) -> &str {
        "text-fallback"
    }

    async fn convert(
        &self,
        request: &StrategyRequest,
        progress: &ProgressReporter,
    ) -> Result<StrategyOutcome, StrategyError> {
        let destination = request.pair.destination;
        if !Self::supports(destination) {
            return Ok(StrategyOutcome::soft_failure(format!(
                "text fallback cannot produce {}",
                destination
            )));
        }

        let bytes = tokio::fs::read(&request.input_path)
            .await
            .map_err(|e| StrategyError::unreadable(e.to_string()))?;
        progress.report(30);

        let text = extract_text(&bytes, request.pair.source);
        if text.trim().is_empty() {
            return Ok(StrategyOutcome::soft_failure("no extractable text in input"));
        }
        progress.report(60);

        let rendered = match destination {
            Format::Html => render_html(&text),
            _ => text,
        };

        let staging = Staging::create(request, self.name()).await?;
        let produced = staging.output_path(request);
        tokio::fs::write(&produced, rendered.as_bytes()).await?;
        staging.publish(&produced, request).await?;
        progress.report(95);

        Ok(StrategyOutcome::degraded(TEXT_FALLBACK_WARNING))
    }
}

/// Returns the readable text in `bytes`.
///
/// Valid UTF-8 is kept as is (markup formats have their tags stripped);
/// anything else is scanned for runs of printable ASCII.
fn extract_text(bytes: &[u8], source: Format) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if matches!(source, Format::Html | Format::Xml | Format::Svg) => strip_markup(s),
        Ok(s) => s.to_string(),
        Err(_) => printable_runs(bytes),
    }
}

fn strip_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn printable_runs(bytes: &[u8]) -> String {
    let mut lines = Vec::new();
    let mut run = String::new();
    for &b in bytes {
        if b.is_ascii_graphic() || b == b' ' || b == b'\t' {
            run.push(b as char);
        } else {
            if run.trim().len() >= MIN_RUN {
                lines.push(run.trim().to_string());
            }
            run.clear();
        }
    }
    if run.trim().len() >= MIN_RUN {
        lines.push(run.trim().to_string());
    }
    lines.join("\n")
}

fn render_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"></head><body><pre>{}</pre></body></html>\n",
        escaped
    )
}
