//! Format types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a format tag cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown format: {0}")]
pub struct FormatError(pub String);

/// Broad family a format belongs to. Used to pick conversion tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatFamily {
    Document,
    Spreadsheet,
    Presentation,
    Ebook,
    Image,
    Vector,
    Data,
    Audio,
    Video,
}

macro_rules! formats {
    ($($variant:ident => ($tag:literal, $ext:literal, $family:ident)),+ $(,)?) => {
        /// A validated file format tag.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Format {
            $($variant),+
        }

        impl Format {
            /// Every known format, in declaration order.
            pub const ALL: &'static [Format] = &[$(Format::$variant),+];

            /// Canonical upper-case tag (e.g. `"DOCX"`).
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Format::$variant => $tag),+
                }
            }

            /// File extension without the leading dot.
            pub fn extension(&self) -> &'static str {
                match self {
                    $(Format::$variant => $ext),+
                }
            }

            /// Family the format belongs to.
            pub fn family(&self) -> FormatFamily {
                match self {
                    $(Format::$variant => FormatFamily::$family),+
                }
            }
        }

        impl FromStr for Format {
            type Err = FormatError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let tag = s.trim().trim_start_matches('.').to_ascii_uppercase();
                match tag.as_str() {
                    "JPEG" => Ok(Format::Jpg),
                    "TIF" => Ok(Format::Tiff),
                    $($tag => Ok(Format::$variant),)+
                    _ => Err(FormatError(s.to_string())),
                }
            }
        }
    };
}

formats! {
    Pdf => ("PDF", "pdf", Document),
    Docx => ("DOCX", "docx", Document),
    Doc => ("DOC", "doc", Document),
    Rtf => ("RTF", "rtf", Document),
    Odt => ("ODT", "odt", Document),
    Xlsx => ("XLSX", "xlsx", Spreadsheet),
    Xls => ("XLS", "xls", Spreadsheet),
    Ods => ("ODS", "ods", Spreadsheet),
    Pptx => ("PPTX", "pptx", Presentation),
    Ppt => ("PPT", "ppt", Presentation),
    Odp => ("ODP", "odp", Presentation),
    Epub => ("EPUB", "epub", Ebook),
    Mobi => ("MOBI", "mobi", Ebook),
    Azw3 => ("AZW3", "azw3", Ebook),
    Jpg => ("JPG", "jpg", Image),
    Png => ("PNG", "png", Image),
    Bmp => ("BMP", "bmp", Image),
    Gif => ("GIF", "gif", Image),
    Tiff => ("TIFF", "tiff", Image),
    Webp => ("WEBP", "webp", Image),
    Ico => ("ICO", "ico", Image),
    Svg => ("SVG", "svg", Vector),
    Txt => ("TXT", "txt", Data),
    Html => ("HTML", "html", Data),
    Xml => ("XML", "xml", Data),
    Csv => ("CSV", "csv", Data),
    Json => ("JSON", "json", Data),
    Mp3 => ("MP3", "mp3", Audio),
    Wav => ("WAV", "wav", Audio),
    Aac => ("AAC", "aac", Audio),
    Flac => ("FLAC", "flac", Audio),
    Ogg => ("OGG", "ogg", Audio),
    M4a => ("M4A", "m4a", Audio),
    Mp4 => ("MP4", "mp4", Video),
    Avi => ("AVI", "avi", Video),
    Mov => ("MOV", "mov", Video),
    Wmv => ("WMV", "wmv", Video),
    Flv => ("FLV", "flv", Video),
    Mkv => ("MKV", "mkv", Video),
    Webm => ("WEBM", "webm", Video),
}

impl Format {
    /// Whether the format carries plain, human-readable text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Format::Txt | Format::Html | Format::Xml | Format::Csv | Format::Json | Format::Svg
        )
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Format {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Format {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A (source, destination) conversion pair. Key of the strategy registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatPair {
    pub source: Format,
    pub destination: Format,
}

impl FormatPair {
    pub fn new(source: Format, destination: Format) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Parses both tags.
    pub fn parse(source: &str, destination: &str) -> Result<Self, FormatError> {
        Ok(Self::new(source.parse()?, destination.parse()?))
    }
}

impl fmt::Display for FormatPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("pdf".parse::<Format>().unwrap(), Format::Pdf);
        assert_eq!("Docx".parse::<Format>().unwrap(), Format::Docx);
        assert_eq!(" .mp4 ".parse::<Format>().unwrap(), Format::Mp4);
    }

    #[test]
    fn test_jpeg_alias() {
        assert_eq!("JPEG".parse::<Format>().unwrap(), Format::Jpg);
        assert_eq!("jpeg".parse::<Format>().unwrap(), Format::Jpg);
        assert_eq!(Format::Jpg.extension(), "jpg");
    }

    #[test]
    fn test_unknown_format() {
        let err = "FOO".parse::<Format>().unwrap_err();
        assert_eq!(err.to_string(), "unknown format: FOO");
    }

    #[test]
    fn test_tags_roundtrip_through_parse() {
        for format in Format::ALL {
            assert_eq!(format.as_str().parse::<Format>().unwrap(), *format);
        }
    }

    #[test]
    fn test_families() {
        assert_eq!(Format::Xlsx.family(), FormatFamily::Spreadsheet);
        assert_eq!(Format::Svg.family(), FormatFamily::Vector);
        assert_eq!(Format::Mkv.family(), FormatFamily::Video);
        assert!(Format::Csv.is_textual());
        assert!(!Format::Png.is_textual());
    }

    #[test]
    fn test_pair_display_and_serde() {
        let pair = FormatPair::parse("pdf", "jpeg").unwrap();
        assert_eq!(pair.to_string(), "PDF -> JPG");

        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"{"source":"PDF","destination":"JPG"}"#);
    }
}
