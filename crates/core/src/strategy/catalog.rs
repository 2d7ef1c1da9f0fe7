//! Default strategy table.
//!
//! The advertised format matrix is fixed; each pair gets every tool able to
//! handle it, best fidelity first. In-process strategies close the chain:
//! the data converter for JSON/CSV/XML targets and the text extractor for
//! TXT/HTML targets. Pairs nothing can handle are left out and are therefore
//! rejected at submission.

use std::sync::Arc;

use crate::format::{Format, FormatFamily, FormatPair};

use super::command::CommandStrategy;
use super::config::StrategyConfig;
use super::data::DataStrategy;
use super::office::OfficeStrategy;
use super::registry::{StrategyRegistry, StrategyRegistryBuilder};
use super::text::TextFallbackStrategy;
use super::traits::Strategy;

use Format::*;

/// Advertised source -> destination matrix.
pub const FORMAT_MATRIX: &[(Format, &[Format])] = &[
    (Pdf, &[Docx, Doc, Xlsx, Xls, Html, Jpg, Png, Tiff, Gif, Txt, Ppt, Pptx, Csv, Xml, Epub, Mobi]),
    (Docx, &[Pdf, Html, Txt, Rtf, Odt, Xml, Epub, Mobi, Jpg, Png]),
    (Doc, &[Pdf, Html, Txt, Rtf, Odt, Xml, Epub, Mobi, Jpg, Png]),
    (Xlsx, &[Csv, Pdf, Html, Xml, Ods, Txt, Json]),
    (Xls, &[Csv, Pdf, Html, Xml, Ods, Txt, Json]),
    (Jpg, &[Pdf, Png, Bmp, Gif, Tiff, Webp, Svg, Ico, Docx, Doc, Pptx, Txt]),
    (Png, &[Pdf, Jpg, Bmp, Gif, Tiff, Webp, Svg, Ico, Docx, Doc, Xlsx, Pptx, Txt]),
    (Bmp, &[Pdf, Jpg, Png, Gif, Tiff, Webp, Svg, Ico, Docx, Doc, Txt]),
    (Gif, &[Pdf, Jpg, Png, Bmp, Tiff, Webp, Svg, Ico, Docx, Doc]),
    (Tiff, &[Pdf, Jpg, Png, Bmp, Gif, Webp, Svg, Ico, Docx, Doc, Txt]),
    (Txt, &[Docx, Doc, Pdf, Html, Rtf, Odt, Epub, Mobi, Csv, Xml, Json, Mp3]),
    (Xml, &[Docx, Pdf, Html, Txt, Xlsx, Xls, Csv, Json]),
    (Html, &[Pdf, Docx, Doc, Txt, Epub, Mobi, Jpg, Png]),
    (Csv, &[Xlsx, Xls, Pdf, Html, Xml, Json, Txt]),
    (Pptx, &[Pdf, Jpg, Png, Ppt, Html, Odp]),
    (Ppt, &[Pdf, Jpg, Png, Pptx, Html, Odp]),
    (Rtf, &[Docx, Doc, Pdf, Html, Txt, Odt]),
    (Odt, &[Docx, Doc, Pdf, Html, Txt, Rtf, Epub, Mobi]),
    (Ods, &[Xlsx, Xls, Csv, Pdf, Html, Xml, Json]),
    (Odp, &[Pptx, Ppt, Pdf, Jpg, Png, Html]),
    (Epub, &[Pdf, Mobi, Azw3, Txt, Html, Docx, Doc]),
    (Mobi, &[Pdf, Epub, Azw3, Txt, Html, Docx, Doc]),
    (Azw3, &[Pdf, Epub, Mobi, Txt, Html, Docx, Doc]),
    (Json, &[Xml, Csv, Txt, Html, Xlsx, Xls]),
    (Webp, &[Jpg, Png, Bmp, Gif, Tiff, Pdf, Svg, Ico]),
    (Svg, &[Png, Jpg, Pdf, Webp, Bmp, Gif, Tiff]),
    (Mp3, &[Wav, Aac, Flac, Ogg, M4a]),
    (Wav, &[Mp3, Aac, Flac, Ogg, M4a]),
    (Mp4, &[Avi, Mov, Wmv, Flv, Mkv, Webm, Mp3, Wav, Gif]),
    (Avi, &[Mp4, Mov, Wmv, Flv, Mkv, Webm, Mp3, Wav, Gif]),
    (Mov, &[Mp4, Avi, Wmv, Flv, Mkv, Webm, Mp3, Wav, Gif]),
];

/// Shared instances of every built-in strategy.
struct Toolbox {
    office: Arc<dyn Strategy>,
    pandoc: Arc<dyn Strategy>,
    calibre: Arc<dyn Strategy>,
    magick: Arc<dyn Strategy>,
    rsvg: Arc<dyn Strategy>,
    ffmpeg: Arc<dyn Strategy>,
    data: Arc<dyn Strategy>,
    text: Option<Arc<dyn Strategy>>,
}

impl Toolbox {
    fn new(config: &StrategyConfig) -> Self {
        Self {
            office: Arc::new(OfficeStrategy::new(&config.soffice_path)),
            pandoc: Arc::new(
                CommandStrategy::new("pandoc", &config.pandoc_path)
                    .args(["--standalone", "-o", "{output}", "{input}"]),
            ),
            calibre: Arc::new(
                CommandStrategy::new("calibre", &config.ebook_convert_path)
                    .args(["{input}", "{output}"]),
            ),
            magick: Arc::new(
                CommandStrategy::new("imagemagick", &config.magick_path)
                    .args(["{input}[0]", "{output}"]),
            ),
            rsvg: Arc::new(
                CommandStrategy::new("rsvg", &config.rsvg_convert_path)
                    .args(["-f", "{dest_ext}", "-o", "{output}", "{input}"]),
            ),
            ffmpeg: Arc::new(
                CommandStrategy::new("ffmpeg", &config.ffmpeg_path)
                    .args(["-hide_banner", "-nostdin", "-y", "-i", "{input}", "{output}"]),
            ),
            data: Arc::new(DataStrategy::new()),
            text: config
                .text_fallback
                .then(|| Arc::new(TextFallbackStrategy::new()) as Arc<dyn Strategy>),
        }
    }

    /// Chain for one pair, most capable first.
    fn chain_for(&self, pair: FormatPair) -> Vec<Arc<dyn Strategy>> {
        let FormatPair {
            source,
            destination,
        } = pair;
        let mut chain = Vec::new();

        if office_reads(source) && office_writes(destination) {
            chain.push(Arc::clone(&self.office));
        }
        if pandoc_reads(source) && pandoc_writes(destination) {
            chain.push(Arc::clone(&self.pandoc));
        }
        if is_ebook_pair(source, destination) {
            chain.push(Arc::clone(&self.calibre));
        }
        if source == Svg && matches!(destination, Png | Pdf) {
            chain.push(Arc::clone(&self.rsvg));
        }
        if magick_reads(source) && magick_writes(destination) {
            chain.push(Arc::clone(&self.magick));
        }
        if ffmpeg_handles(source, destination) {
            chain.push(Arc::clone(&self.ffmpeg));
        }
        if DataStrategy::supports(source, destination) {
            chain.push(Arc::clone(&self.data));
        }
        if let Some(ref text) = self.text {
            if TextFallbackStrategy::supports(destination) && source != destination {
                chain.push(Arc::clone(text));
            }
        }

        chain
    }
}

fn office_reads(format: Format) -> bool {
    matches!(
        format.family(),
        FormatFamily::Spreadsheet | FormatFamily::Presentation
    ) || matches!(format, Docx | Doc | Rtf | Odt | Txt | Html | Csv)
}

fn office_writes(format: Format) -> bool {
    matches!(
        format,
        Pdf | Docx | Doc | Rtf | Odt | Xlsx | Xls | Ods | Pptx | Ppt | Odp | Html | Txt | Csv
            | Xml | Jpg | Png
    )
}

fn pandoc_reads(format: Format) -> bool {
    matches!(format, Docx | Odt | Rtf | Html | Txt | Epub | Csv)
}

fn pandoc_writes(format: Format) -> bool {
    matches!(format, Docx | Odt | Rtf | Html | Txt | Epub | Pdf)
}

fn is_ebook_pair(source: Format, destination: Format) -> bool {
    let ebook_side = |f: Format| {
        matches!(
            f,
            Pdf | Epub | Mobi | Azw3 | Txt | Html | Docx | Doc | Rtf | Odt
        )
    };
    (source.family() == FormatFamily::Ebook || destination.family() == FormatFamily::Ebook)
        && ebook_side(source)
        && ebook_side(destination)
}

fn magick_reads(format: Format) -> bool {
    format.family() == FormatFamily::Image || matches!(format, Svg | Pdf)
}

fn magick_writes(format: Format) -> bool {
    format.family() == FormatFamily::Image || matches!(format, Pdf | Svg)
}

fn ffmpeg_handles(source: Format, destination: Format) -> bool {
    use FormatFamily::{Audio, Image, Video};
    match (source.family(), destination.family()) {
        (Audio, Audio) | (Video, Video) | (Video, Audio) => true,
        (Video, Image) => destination == Gif,
        (Image, Image) => source != Ico && destination != Svg,
        _ => false,
    }
}

/// Builds the standard registry from [`FORMAT_MATRIX`].
pub(crate) fn default_builder(config: &StrategyConfig) -> StrategyRegistryBuilder {
    let toolbox = Toolbox::new(config);
    let mut builder = StrategyRegistry::builder();
    for (source, destinations) in FORMAT_MATRIX {
        for destination in destinations.iter() {
            let pair = FormatPair::new(*source, *destination);
            for strategy in toolbox.chain_for(pair) {
                builder.push(pair, strategy);
            }
        }
    }
    builder
}

impl StrategyRegistry {
    /// The standard registry wrapping the configured external tools.
    pub fn with_defaults(config: &StrategyConfig) -> Self {
        default_builder(config).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(registry: &StrategyRegistry, source: Format, destination: Format) -> Vec<String> {
        registry
            .lookup(&FormatPair::new(source, destination))
            .map(|chain| chain.names())
            .unwrap_or_default()
    }

    #[test]
    fn test_document_chain_order() {
        let registry = StrategyRegistry::with_defaults(&StrategyConfig::default());
        assert_eq!(
            names(&registry, Docx, Txt),
            vec!["libreoffice", "pandoc", "text-fallback"]
        );
        assert_eq!(names(&registry, Docx, Pdf), vec!["libreoffice", "pandoc"]);
    }

    #[test]
    fn test_media_chains() {
        let registry = StrategyRegistry::with_defaults(&StrategyConfig::default());
        assert_eq!(names(&registry, Mp4, Mp3), vec!["ffmpeg"]);
        assert_eq!(names(&registry, Png, Jpg), vec!["imagemagick", "ffmpeg"]);
        assert_eq!(names(&registry, Svg, Png), vec!["rsvg", "imagemagick"]);
        assert_eq!(names(&registry, Epub, Mobi), vec!["calibre"]);
    }

    #[test]
    fn test_data_chains_end_in_process() {
        let registry = StrategyRegistry::with_defaults(&StrategyConfig::default());
        assert_eq!(names(&registry, Csv, Json), vec!["data"]);
        assert_eq!(names(&registry, Json, Xml), vec!["data"]);
        assert_eq!(names(&registry, Xml, Csv), vec!["data"]);
        assert_eq!(names(&registry, Xlsx, Json), vec!["data"]);
        assert_eq!(names(&registry, Xlsx, Csv), vec!["libreoffice", "data"]);
        assert_eq!(names(&registry, Txt, Json), vec!["data"]);
    }

    #[test]
    fn test_pdf_to_txt_falls_back_to_text() {
        let registry = StrategyRegistry::with_defaults(&StrategyConfig::default());
        assert_eq!(names(&registry, Pdf, Txt), vec!["text-fallback"]);

        let registry =
            StrategyRegistry::with_defaults(&StrategyConfig::default().without_text_fallback());
        assert!(names(&registry, Pdf, Txt).is_empty());
    }

    #[test]
    fn test_pairs_without_tools_are_unsupported() {
        let registry = StrategyRegistry::with_defaults(&StrategyConfig::default());
        assert!(!registry.is_supported(&FormatPair::new(Txt, Mp3)));
        assert!(!registry.is_supported(&FormatPair::new(Mp3, Pdf)));
        assert!(!registry.is_supported(&FormatPair::new(Json, Xlsx)));
    }

    #[test]
    fn test_every_chain_is_within_matrix() {
        let registry = StrategyRegistry::with_defaults(&StrategyConfig::default());
        for supported in registry.supported_formats() {
            let (_, advertised) = FORMAT_MATRIX
                .iter()
                .find(|(source, _)| *source == supported.source)
                .expect("source must be advertised");
            for destination in supported.destinations {
                assert!(advertised.contains(&destination));
            }
        }
        assert!(registry.len() > 150);
    }
}
