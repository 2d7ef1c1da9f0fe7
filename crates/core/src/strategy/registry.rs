//! Immutable map from format pair to strategy chain.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::format::{Format, FormatPair};

use super::traits::Strategy;

/// Ordered, immutable list of strategies for one pair.
///
/// Cloning is cheap; all clones share the same strategies.
#[derive(Clone)]
pub struct StrategyChain {
    strategies: Arc<[Arc<dyn Strategy>]>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Arc<dyn Strategy>>) -> Self {
        Self {
            strategies: strategies.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Strategy>> {
        self.strategies.iter()
    }

    /// Strategy names in escalation order.
    pub fn names(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.name().to_string()).collect()
    }
}

impl fmt::Debug for StrategyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Destinations reachable from one source format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportedFormat {
    pub source: Format,
    pub destinations: Vec<Format>,
}

/// Static table of strategy chains, built once at startup.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    chains: HashMap<FormatPair, StrategyChain>,
}

impl StrategyRegistry {
    pub fn builder() -> StrategyRegistryBuilder {
        StrategyRegistryBuilder::default()
    }

    /// Returns the chain for `pair`, or `None` if the pair is unsupported.
    pub fn lookup(&self, pair: &FormatPair) -> Option<StrategyChain> {
        self.chains.get(pair).cloned()
    }

    pub fn is_supported(&self, pair: &FormatPair) -> bool {
        self.chains.contains_key(pair)
    }

    /// Number of supported pairs.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Supported pairs grouped by source, sorted for stable output.
    pub fn supported_formats(&self) -> Vec<SupportedFormat> {
        let mut grouped: BTreeMap<Format, Vec<Format>> = BTreeMap::new();
        for pair in self.chains.keys() {
            grouped.entry(pair.source).or_default().push(pair.destination);
        }
        grouped
            .into_iter()
            .map(|(source, mut destinations)| {
                destinations.sort();
                SupportedFormat {
                    source,
                    destinations,
                }
            })
            .collect()
    }
}

/// Builder for [`StrategyRegistry`].
#[derive(Default)]
pub struct StrategyRegistryBuilder {
    chains: HashMap<FormatPair, Vec<Arc<dyn Strategy>>>,
}

impl StrategyRegistryBuilder {
    /// Appends `strategy` to the chain for `pair`.
    pub fn register(mut self, pair: FormatPair, strategy: Arc<dyn Strategy>) -> Self {
        self.push(pair, strategy);
        self
    }

    /// Replaces the chain for `pair`.
    pub fn chain(mut self, pair: FormatPair, strategies: Vec<Arc<dyn Strategy>>) -> Self {
        self.chains.insert(pair, strategies);
        self
    }

    pub(crate) fn push(&mut self, pair: FormatPair, strategy: Arc<dyn Strategy>) {
        self.chains.entry(pair).or_default().push(strategy);
    }

    /// Freezes the table. Pairs with no strategies are dropped.
    pub fn build(self) -> StrategyRegistry {
        StrategyRegistry {
            chains: self
                .chains
                .into_iter()
                .filter(|(_, strategies)| !strategies.is_empty())
                .map(|(pair, strategies)| (pair, StrategyChain::new(strategies)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStrategy;

    fn pair(source: Format, destination: Format) -> FormatPair {
        FormatPair::new(source, destination)
    }

    #[test]
    fn test_lookup_preserves_registration_order() {
        let registry = StrategyRegistry::builder()
            .register(
                pair(Format::Pdf, Format::Docx),
                Arc::new(MockStrategy::succeeding("strategy-1")),
            )
            .register(
                pair(Format::Pdf, Format::Docx),
                Arc::new(MockStrategy::succeeding("strategy-2")),
            )
            .build();

        let chain = registry.lookup(&pair(Format::Pdf, Format::Docx)).unwrap();
        assert_eq!(chain.names(), vec!["strategy-1", "strategy-2"]);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_unsupported_pair() {
        let registry = StrategyRegistry::builder()
            .register(
                pair(Format::Png, Format::Jpg),
                Arc::new(MockStrategy::succeeding("magick")),
            )
            .build();

        assert!(registry.lookup(&pair(Format::Jpg, Format::Png)).is_none());
        assert!(!registry.is_supported(&pair(Format::Mp3, Format::Pdf)));
    }

    #[test]
    fn test_empty_chains_are_dropped() {
        let registry = StrategyRegistry::builder()
            .chain(pair(Format::Txt, Format::Pdf), vec![])
            .build();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_supported_formats_grouped_and_sorted() {
        let strategy: Arc<dyn Strategy> = Arc::new(MockStrategy::succeeding("s"));
        let registry = StrategyRegistry::builder()
            .register(pair(Format::Png, Format::Pdf), Arc::clone(&strategy))
            .register(pair(Format::Png, Format::Jpg), Arc::clone(&strategy))
            .register(pair(Format::Pdf, Format::Txt), strategy)
            .build();

        let formats = registry.supported_formats();
        assert_eq!(
            formats,
            vec![
                SupportedFormat {
                    source: Format::Pdf,
                    destinations: vec![Format::Txt],
                },
                SupportedFormat {
                    source: Format::Png,
                    destinations: vec![Format::Pdf, Format::Jpg],
                },
            ]
        );
    }
}
