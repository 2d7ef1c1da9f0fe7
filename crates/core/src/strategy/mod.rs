//! Conversion strategies and the registry that orders them.
//!
//! A strategy turns one input file into one output file for a
//! [`FormatPair`](crate::format::FormatPair). Each pair maps to a
//! [`StrategyChain`], ordered from most capable to least capable; the
//! executor walks the chain until one strategy succeeds.
//!
//! # Example
//!
//! ```ignore
//! use transmute_core::strategy::{StrategyConfig, StrategyRegistry};
//! use transmute_core::format::FormatPair;
//!
//! let registry = StrategyRegistry::with_defaults(&StrategyConfig::default());
//! let chain = registry.lookup(&FormatPair::parse("docx", "pdf")?).unwrap();
//! println!("{:?}", chain); // ["libreoffice", "pandoc"]
//! ```

mod catalog;
mod command;
mod config;
mod data;
mod error;
mod office;
mod registry;
mod staging;
mod text;
mod traits;
mod types;

pub use catalog::FORMAT_MATRIX;
pub use command::CommandStrategy;
pub use config::StrategyConfig;
pub use data::DataStrategy;
pub use error::StrategyError;
pub use office::OfficeStrategy;
pub(crate) use staging::STAGE_PREFIX;
pub use registry::{StrategyChain, StrategyRegistry, StrategyRegistryBuilder, SupportedFormat};
pub use text::{TextFallbackStrategy, TEXT_FALLBACK_WARNING};
pub use traits::Strategy;
pub use types::{ProgressCallback, ProgressReporter, StrategyOutcome, StrategyRequest};
