// src/extractor.rs
// PDF bytes -> plain text, page order preserved

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, PipelineError, PipelineResult};

/// Separator placed between consecutive pages
pub const PAGE_SEPARATOR: &str = "\n";

/// Raw PDF content read from disk
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Document {
    /// Read a PDF from disk. The file is opened read-only and closed before returning.
    pub async fn read(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), bytes = bytes.len(), "Read PDF");
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
        })
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    /// Original file name, e.g. `report.pdf`
    pub fn file_name(&self) -> String {
        source_name(&self.path)
    }
}

/// Where one page's words sit in the joined text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpan {
    /// One-based page number in the PDF
    pub page_number: u32,
    pub word_count: usize,
}

/// First and last page a run of words was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

/// All page text of one document, concatenated in page order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
    /// Pages that contributed words, in order
    pub pages: Vec<PageSpan>,
}

impl ExtractedText {
    /// Normalise each page and join them with [`PAGE_SEPARATOR`]. Blank pages
    /// count towards `page_count` but contribute no text.
    pub fn from_pages<'a>(pages: impl IntoIterator<Item = (u32, &'a str)>) -> Self {
        let mut page_count = 0;
        let mut spans = Vec::new();
        let mut cleaned = Vec::new();
        for (page_number, raw) in pages {
            page_count += 1;
            let page = clean_text(raw);
            if page.is_empty() {
                continue;
            }
            spans.push(PageSpan {
                page_number,
                word_count: page.split_whitespace().count(),
            });
            cleaned.push(page);
        }
        Self {
            text: cleaned.join(PAGE_SEPARATOR),
            page_count,
            pages: spans,
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Pages holding words `start_word .. start_word + word_count`
    pub fn page_range(&self, start_word: usize, word_count: usize) -> Option<PageRange> {
        if word_count == 0 {
            return None;
        }
        let last_word = start_word + word_count - 1;
        let mut first_page = None;
        let mut seen = 0;
        for span in &self.pages {
            let next = seen + span.word_count;
            if first_page.is_none() && start_word < next {
                first_page = Some(span.page_number);
            }
            if last_word < next {
                return first_page.map(|start| PageRange {
                    start,
                    end: span.page_number,
                });
            }
            seen = next;
        }
        None
    }
}

/// Extract text from every page of `document`.
///
/// The PDF is parsed once; each page is then rendered to text in page order.
/// Fails with `EmptyDocument` when the PDF parses but carries no text.
/// This is CPU-bound; async callers should run it on a blocking thread.
pub fn extract_text(document: &Document) -> PipelineResult<ExtractedText> {
    let mut pdf = lopdf::Document::load_mem(&document.bytes)
        .map_err(|e| ExtractionError::InvalidPdf(e.to_string()))?;
    if pdf.is_encrypted() {
        // Owner-password-only files still open with the empty user password
        pdf.decrypt("").map_err(|e| {
            debug!(path = %document.path.display(), error = %e, "Empty user password rejected");
            ExtractionError::Encrypted
        })?;
        // Objects are plaintext in memory now
        pdf.trailer.remove(b"Encrypt");
    }

    let page_numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());
    for page_number in page_numbers {
        pages.push((page_number, page_text(&pdf, page_number)?));
    }

    let extracted = ExtractedText::from_pages(pages.iter().map(|(n, text)| (*n, text.as_str())));
    if extracted.text.is_empty() {
        warn!(path = %document.path.display(), pages = extracted.page_count, "No text extracted");
        return Err(PipelineError::EmptyDocument);
    }

    info!(
        path = %document.path.display(),
        pages = extracted.page_count,
        chars = extracted.text.len(),
        "Extracted text"
    );
    Ok(extracted)
}

/// Render one page; a page that fails fails the whole document.
fn page_text(pdf: &lopdf::Document, page_number: u32) -> Result<String, ExtractionError> {
    let mut text = String::new();
    {
        let mut output = pdf_extract::PlainTextOutput::new(&mut text);
        pdf_extract::output_doc_page(pdf, &mut output, page_number)
            .map_err(|e| ExtractionError::InvalidPdf(format!("page {}: {}", page_number, e)))?;
    }
    Ok(text)
}

/// Whitespace cleanup that never changes the word sequence
pub fn clean_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\t', " ")
        .split('\n')
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// File name of `path` as shown in artifacts
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
