//! Format tags and (source, destination) pairs.
//!
//! Formats are a closed set. Parsing is case-insensitive and folds the
//! `JPEG` alias into `JPG`, so `"jpeg"`, `"JPG"` and `"Jpg"` all resolve to
//! [`Format::Jpg`].

mod types;

pub use types::{Format, FormatError, FormatFamily, FormatPair};
