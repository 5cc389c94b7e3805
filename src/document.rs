//! Study documents and how they get into the library.

use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{Result, StudyTypeError},
    optimize::TextOptimizer,
    text, util,
};

/// Documents with less cleaned text than this are rejected on import.
pub const MIN_TEXT_CHARS: usize = 50;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_text: Option<String>,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let created_at = Utc::now();
        Self {
            id: util::generate_id(created_at, &mut rand::thread_rng()),
            name: name.into(),
            text: text.into(),
            created_at,
            optimized_text: None,
        }
    }

    /// Optimized text when it is preferred and has words, raw text otherwise.
    pub fn practice_text(&self, prefer_optimized: bool) -> &str {
        match (self.usable_optimized(), prefer_optimized) {
            (Some(optimized), true) => optimized,
            _ => &self.text,
        }
    }

    fn usable_optimized(&self) -> Option<&str> {
        self.optimized_text
            .as_deref()
            .filter(|t| !text::tokenize(t).is_empty())
    }

    pub fn word_count(&self) -> usize {
        self.text.split(' ').filter(|w| !w.is_empty()).count()
    }

    pub fn is_optimized(&self) -> bool {
        self.usable_optimized().is_some()
    }
}

/// Pulls raw text out of a file on disk.
pub trait TextExtractor {
    fn extract(&self, path: &Path) -> Result<String>;
}

/// PDF text via `pdf-extract`; pages are separated by blank lines.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path)?;
        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| StudyTypeError::Pdf(e.to_string()))?;
        Ok(pages.join("\n\n"))
    }
}

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }
}

/// Picks an extractor from the file extension.
pub fn extractor_for(path: &Path) -> Result<Box<dyn TextExtractor>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("pdf") => Ok(Box::new(PdfExtractor)),
        Some("txt") | Some("md") => Ok(Box::new(PlainTextExtractor)),
        _ => Err(StudyTypeError::UnsupportedFile(path.to_path_buf())),
    }
}

/// A freshly imported document plus anything the user should be told.
#[derive(Debug)]
pub struct Import {
    pub document: Document,
    pub advisory: Option<String>,
}

/// Extracts, cleans and (optionally) optimizes a file into a [`Document`].
///
/// Optimizer failures never fail the import; the raw text is kept and the
/// failure comes back as an advisory.
pub fn import(
    path: &Path,
    extractor: &dyn TextExtractor,
    optimizer: Option<&dyn TextOptimizer>,
) -> Result<Import> {
    let raw = extractor.extract(path)?;
    let cleaned = text::clean(&raw);

    if cleaned.len() < MIN_TEXT_CHARS {
        return Err(StudyTypeError::ContentTooShort {
            chars: cleaned.len(),
            min: MIN_TEXT_CHARS,
        });
    }

    let mut document = Document::new(document_name(path), cleaned);
    let mut advisory = None;

    if let Some(optimizer) = optimizer {
        match optimizer.optimize(&document.text) {
            Ok(optimized) => {
                let optimized = text::clean(&optimized);
                if text::tokenize(&optimized).is_empty() {
                    warn!(document = %document.id, "optimizer returned no usable words");
                    advisory = Some(
                        "AI optimization returned no usable text, using raw text".to_string(),
                    );
                } else {
                    info!(document = %document.id, chars = optimized.len(), "optimized text");
                    document.optimized_text = Some(optimized);
                }
            }
            Err(e) => {
                warn!("failed to optimize text: {}", e);
                advisory = Some(format!("AI optimization failed, using raw text: {}", e));
            }
        }
    }

    info!(document = %document.id, name = %document.name, "imported document");
    Ok(Import { document, advisory })
}

fn document_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::tempdir;

    const LONG_TEXT: &str = "Mitochondria are membrane bound organelles that generate most \
                             of the chemical energy needed to power the cell.";

    struct StaticExtractor(&'static str);

    impl TextExtractor for StaticExtractor {
        fn extract(&self, _path: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct UpperOptimizer;

    impl TextOptimizer for UpperOptimizer {
        fn optimize(&self, text: &str) -> Result<String> {
            Ok(text.to_uppercase())
        }
    }

    struct ForeignOptimizer;

    impl TextOptimizer for ForeignOptimizer {
        fn optimize(&self, _text: &str) -> Result<String> {
            Ok("線粒體是細胞的能量工廠 🔋".to_string())
        }
    }

    struct BrokenOptimizer;

    impl TextOptimizer for BrokenOptimizer {
        fn optimize(&self, _text: &str) -> Result<String> {
            Err(StudyTypeError::Optimizer("rate limited".into()))
        }
    }

    #[test]
    fn practice_text_prefers_optimized_when_present() {
        let mut doc = Document::new("bio", "raw text");
        assert_eq!(doc.practice_text(true), "raw text");

        doc.optimized_text = Some("dense text".into());
        assert_eq!(doc.practice_text(true), "dense text");
        assert_eq!(doc.practice_text(false), "raw text");
    }

    #[test]
    fn word_count_counts_words() {
        assert_eq!(Document::new("x", "one two  three").word_count(), 3);
    }

    #[test]
    fn extractor_by_extension() {
        assert!(extractor_for(Path::new("notes.PDF")).is_ok());
        assert!(extractor_for(Path::new("notes.txt")).is_ok());
        assert!(matches!(
            extractor_for(Path::new("notes.docx")),
            Err(StudyTypeError::UnsupportedFile(_))
        ));
        assert!(matches!(
            extractor_for(Path::new("README")),
            Err(StudyTypeError::UnsupportedFile(_))
        ));
    }

    #[test]
    fn import_cleans_and_names_from_stem() {
        let raw = "  Chapter\u{2003}1:\n\nMitochondria  are \u{fb01}membrane bound organelles that power the cell. ";
        let import = import(Path::new("/tmp/Cell Biology.pdf"), &StaticExtractor(raw), None).unwrap();

        assert_eq!(import.document.name, "Cell Biology");
        assert_eq!(
            import.document.text,
            "Chapter 1: Mitochondria are membrane bound organelles that power the cell."
        );
        assert!(import.document.optimized_text.is_none());
        assert!(import.advisory.is_none());
    }

    #[test]
    fn import_rejects_short_text() {
        let err = import(Path::new("a.pdf"), &StaticExtractor("too short"), None).unwrap_err();
        assert_matches!(err, StudyTypeError::ContentTooShort { chars: 9, min: 50 });
    }

    #[test]
    fn import_stores_optimized_text() {
        let import = import(
            Path::new("a.txt"),
            &StaticExtractor(LONG_TEXT),
            Some(&UpperOptimizer),
        )
        .unwrap();
        assert_eq!(
            import.document.optimized_text.as_deref(),
            Some(LONG_TEXT.to_uppercase().as_str())
        );
    }

    #[test]
    fn optimizer_failure_falls_back_to_raw_text() {
        let import = import(
            Path::new("a.txt"),
            &StaticExtractor(LONG_TEXT),
            Some(&BrokenOptimizer),
        )
        .unwrap();
        assert!(import.document.optimized_text.is_none());
        assert!(import.advisory.unwrap().contains("rate limited"));
    }

    #[test]
    fn optimizer_reply_without_words_keeps_raw_text() {
        let import = import(
            Path::new("a.txt"),
            &StaticExtractor(LONG_TEXT),
            Some(&ForeignOptimizer),
        )
        .unwrap();
        assert!(import.document.optimized_text.is_none());
        assert!(!import.document.is_optimized());
        assert!(import.advisory.unwrap().contains("no usable text"));
        assert_eq!(import.document.practice_text(true), LONG_TEXT);
    }

    #[test]
    fn empty_optimized_text_is_not_practised() {
        let mut doc = Document::new("bio", "raw text");
        doc.optimized_text = Some(String::new());
        assert_eq!(doc.practice_text(true), "raw text");
        assert!(!doc.is_optimized());
    }

    #[test]
    fn plain_text_extractor_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", LONG_TEXT).unwrap();

        let text = PlainTextExtractor.extract(&path).unwrap();
        assert_eq!(text, LONG_TEXT);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PlainTextExtractor
            .extract(Path::new("/definitely/not/here.txt"))
            .unwrap_err();
        assert_matches!(err, StudyTypeError::Io(_));
    }

    #[test]
    fn document_roundtrips_through_json() {
        let mut doc = Document::new("bio", LONG_TEXT);
        doc.optimized_text = Some("short".into());
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(serde_json::from_str::<Document>(&json).unwrap(), doc);
    }
}
