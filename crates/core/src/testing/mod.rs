//! Testing utilities and mock implementations.
//!
//! This module provides a scriptable [`MockStrategy`] and fixtures for
//! building registries out of mocks, allowing the whole job lifecycle to be
//! exercised without any external conversion tool installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use transmute_core::testing::{fixtures, MockStrategy};
//!
//! let first = Arc::new(MockStrategy::failing("strategy-1", "no tool"));
//! let second = Arc::new(MockStrategy::succeeding("strategy-2"));
//! let registry = fixtures::registry("docx", "pdf", &[&first, &second]);
//! ```

mod mock_strategy;

pub use mock_strategy::{MockBehavior, MockStrategy};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use super::MockStrategy;
    use crate::format::FormatPair;
    use crate::strategy::{Strategy, StrategyChain, StrategyRegistry};

    /// Chain made of the given mocks, in order.
    pub fn chain(strategies: &[&Arc<MockStrategy>]) -> StrategyChain {
        StrategyChain::new(
            strategies
                .iter()
                .map(|s| Arc::clone(*s) as Arc<dyn Strategy>)
                .collect(),
        )
    }

    /// Registry with a single supported pair.
    ///
    /// Panics if either tag is unknown.
    pub fn registry(
        source: &str,
        destination: &str,
        strategies: &[&Arc<MockStrategy>],
    ) -> StrategyRegistry {
        let pair = FormatPair::parse(source, destination).expect("valid format tags");
        StrategyRegistry::builder()
            .chain(
                pair,
                strategies
                    .iter()
                    .map(|s| Arc::clone(*s) as Arc<dyn Strategy>)
                    .collect(),
            )
            .build()
    }
}
