// tests/common/mod.rs
// Shared fixtures: in-memory PDFs and a scripted embedding provider

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdfembed::embedder::{EmbeddingProvider, EmbeddingVector};
use pdfembed::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const WORDS_PER_LINE: usize = 8;
pub const LINES_PER_PAGE: usize = 40;

/// `count` distinct words: alpha1 alpha2 ...
pub fn numbered_words(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("alpha{}", i)).collect()
}

/// Build a PDF whose pages contain `words` in order, one Tj per line.
/// An empty slice yields a single blank page.
pub fn pdf_with_words(words: &[String]) -> Vec<u8> {
    save(&mut document_with_words(words))
}

/// Same pages as `pdf_with_words`, behind a Standard security handler
/// whose user password is not empty.
pub fn locked_pdf_with_words(words: &[String]) -> Vec<u8> {
    let mut doc = document_with_words(words);
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0x4fu8; 32]),
        "U" => Object::string_literal(vec![0x55u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::string_literal(vec![0x11u8; 16]),
            Object::string_literal(vec![0x22u8; 16]),
        ],
    );
    save(&mut doc)
}

fn save(doc: &mut Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    bytes
}

fn document_with_words(words: &[String]) -> Document {
    let lines: Vec<String> = words
        .chunks(WORDS_PER_LINE)
        .map(|line| line.join(" "))
        .collect();
    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![&lines[..]]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page_lines in &pages {
        let mut operations = Vec::new();
        for (i, line) in page_lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new(
                "Td",
                vec![40.into(), (800 - 18 * i as i64).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn write_pdf(dir: &Path, name: &str, words: &[String]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pdf_with_words(words)).expect("write pdf");
    path
}

/// Provider returning fixed-size vectors; optionally fails on the nth call.
pub struct ScriptedProvider {
    pub dimensions: usize,
    pub fail_on_call: Option<usize>,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail_on_call: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(dimensions: usize, call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new(dimensions)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for ScriptedProvider {
    async fn embed_batch(&self, inputs: &[&str]) -> PipelineResult<Vec<EmbeddingVector>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_call == Some(call) {
            return Err(PipelineError::EmbeddingService(
                "request failed (500 Internal Server Error)".to_string(),
            ));
        }
        Ok(inputs
            .iter()
            .map(|text| {
                let mut v = vec![0.0; self.dimensions];
                v[0] = text.split(' ').count() as f32;
                v
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}
