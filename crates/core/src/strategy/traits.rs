//! Trait definitions for the strategy module.

use async_trait::async_trait;

use super::error::StrategyError;
use super::types::{ProgressReporter, StrategyOutcome, StrategyRequest};

/// One swappable way of performing a conversion.
///
/// Implementations must not leave partial output at `request.output_path`
/// when they fail.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Returns the name recorded as `strategy_used` on success.
    fn name(&self) -> &str;

    /// Converts `request.input_path` into `request.output_path`.
    ///
    /// `Ok(SoftFailure)` is an expected inability to convert; `Err` is a
    /// fault. Callers treat both as a reason to escalate.
    async fn convert(
        &self,
        request: &StrategyRequest,
        progress: &ProgressReporter,
    ) -> Result<StrategyOutcome, StrategyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Format, FormatPair};
    use std::path::PathBuf;

    struct AlwaysSoft;

    #[async_trait]
    impl Strategy for AlwaysSoft {
        fn name(&self) -> &str {
            "always-soft"
        }

        async fn convert(
            &self,
            request: &StrategyRequest,
            progress: &ProgressReporter,
        ) -> Result<StrategyOutcome, StrategyError> {
            progress.report(50);
            Ok(StrategyOutcome::soft_failure(format!(
                "cannot convert {}",
                request.pair
            )))
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let strategy: Box<dyn Strategy> = Box::new(AlwaysSoft);
        let request = StrategyRequest {
            job_id: "job-1".to_string(),
            input_path: PathBuf::from("/in"),
            output_path: PathBuf::from("/out.txt"),
            pair: FormatPair::new(Format::Pdf, Format::Txt),
        };

        let outcome = strategy
            .convert(&request, &ProgressReporter::noop())
            .await
            .unwrap();

        assert_eq!(strategy.name(), "always-soft");
        assert_eq!(
            outcome,
            StrategyOutcome::soft_failure("cannot convert PDF -> TXT")
        );
    }
}
