//! Request validation.

use crate::format::{Format, FormatPair};
use crate::strategy::{StrategyChain, StrategyRegistry};

use super::error::ValidationError;

/// Rejects names that could address anything outside a single directory
/// entry: separators, NUL, `.`/`..` and drive prefixes such as `C:`.
///
/// An empty name is allowed; the download then uses a default stem.
pub fn validate_filename(name: &str) -> Result<(), ValidationError> {
    let has_drive_prefix = {
        let bytes = name.as_bytes();
        bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
    };

    if name.contains(['/', '\\', '\0']) || name == "." || name == ".." || has_drive_prefix {
        return Err(ValidationError::UnsafeFilename(name.to_string()));
    }
    Ok(())
}

/// Parses both tags and resolves the chain for the pair.
pub fn resolve_chain(
    registry: &StrategyRegistry,
    source: &str,
    destination: &str,
) -> Result<(FormatPair, StrategyChain), ValidationError> {
    let from = source
        .parse::<Format>()
        .map_err(|_| ValidationError::UnknownFormat(source.to_string()))?;
    let to = destination
        .parse::<Format>()
        .map_err(|_| ValidationError::UnknownFormat(destination.to_string()))?;
    let pair = FormatPair::new(from, to);

    registry
        .lookup(&pair)
        .map(|chain| (pair, chain))
        .ok_or(ValidationError::UnsupportedPair { from, to })
}

/// Checks the upload size against `limit`.
pub fn validate_size(size: u64, limit: u64) -> Result<(), ValidationError> {
    if size == 0 {
        return Err(ValidationError::EmptyFile);
    }
    if size > limit {
        return Err(ValidationError::TooLarge { size, limit });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockStrategy};
    use std::sync::Arc;

    #[test]
    fn test_safe_filenames() {
        for name in ["report.docx", "", "my file (1).pdf", ".hidden", "a..b.txt"] {
            assert!(validate_filename(name).is_ok(), "{name:?} should be accepted");
        }
    }

    #[test]
    fn test_unsafe_filenames() {
        for name in [
            "../etc/passwd",
            "dir/file.txt",
            "..\\boot.ini",
            "C:evil.exe",
            "nul\0byte",
            ".",
            "..",
        ] {
            assert_eq!(
                validate_filename(name),
                Err(ValidationError::UnsafeFilename(name.to_string()))
            );
        }
    }

    #[test]
    fn test_resolve_chain() {
        let strategy = Arc::new(MockStrategy::succeeding("s"));
        let registry = fixtures::registry("docx", "pdf", &[&strategy]);

        let (pair, chain) = resolve_chain(&registry, "DOCX", "pdf").unwrap();
        assert_eq!(pair, FormatPair::new(Format::Docx, Format::Pdf));
        assert_eq!(chain.names(), vec!["s"]);

        assert_eq!(
            resolve_chain(&registry, "FOO", "BAR").unwrap_err(),
            ValidationError::UnknownFormat("FOO".to_string())
        );
        assert_eq!(
            resolve_chain(&registry, "pdf", "docx").unwrap_err(),
            ValidationError::UnsupportedPair {
                from: Format::Pdf,
                to: Format::Docx
            }
        );
    }

    #[test]
    fn test_validate_size() {
        assert!(validate_size(10, 10).is_ok());
        assert_eq!(validate_size(0, 10), Err(ValidationError::EmptyFile));
        assert_eq!(
            validate_size(11, 10),
            Err(ValidationError::TooLarge { size: 11, limit: 10 })
        );
    }
}
