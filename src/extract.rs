//! Plain-text extraction from uploaded documents.
//!
//! PDFs are read page by page with `lopdf`; PPTX decks are ZIP archives whose
//! slide XML is walked with `quick-xml`. No OCR: image-only documents simply
//! produce little or no text.

use crate::error::QuizError;
use anyhow::{anyhow, Context};
use lopdf::Document;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

pub const MAX_CONTENT_CHARS: usize = 15_000;
pub const TRUNCATION_MARKER: &str = "...[truncated]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Pptx,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, QuizError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "pptx" => Ok(Self::Pptx),
            _ => Err(QuizError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub raw_text: String,
    pub character_count: usize,
}

impl ExtractedContent {
    pub fn new(raw_text: String) -> Self {
        let character_count = raw_text.chars().count();
        Self { raw_text, character_count }
    }

    /// Cuts the text to `max_chars` characters and appends [`TRUNCATION_MARKER`].
    /// Returns whether anything was cut.
    pub fn truncate(&mut self, max_chars: usize) -> bool {
        if self.character_count <= max_chars {
            return false;
        }
        let cut = self
            .raw_text
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.raw_text.len());
        self.raw_text.truncate(cut);
        self.raw_text.push_str(TRUNCATION_MARKER);
        self.character_count = self.raw_text.chars().count();
        true
    }
}

/// Extracts the text of a PDF or PPTX file. Blocking; run it off the async runtime.
pub fn extract(path: &Path) -> Result<ExtractedContent, QuizError> {
    let format = DocumentFormat::from_path(path)?;
    let result = match format {
        DocumentFormat::Pdf => std::fs::read(path)
            .with_context(|| format!("reading {}", path.display()))
            .and_then(|bytes| extract_pdf(&bytes)),
        DocumentFormat::Pptx => std::fs::File::open(path)
            .with_context(|| format!("opening {}", path.display()))
            .and_then(extract_pptx),
    };
    result
        .map(ExtractedContent::new)
        .map_err(|err| QuizError::Extraction {
            path: path.display().to_string(),
            message: format!("{err:#}"),
        })
}

fn extract_pdf(bytes: &[u8]) -> anyhow::Result<String> {
    let document = Document::load_mem(bytes).context("parsing PDF")?;
    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(err) => {
                tracing::warn!(page = page_number, error = %err, "skipping unreadable PDF page");
            }
        }
        text.push('\n');
    }
    Ok(text)
}

fn extract_pptx<R: Read + Seek>(reader: R) -> anyhow::Result<String> {
    let mut archive = ZipArchive::new(reader).context("opening PPTX archive")?;
    let slides = slide_order(&mut archive)?;

    let mut fragments = Vec::new();
    for slide_path in &slides {
        let xml = read_archive_file(&mut archive, slide_path)?;
        fragments.extend(shape_texts(&xml).with_context(|| format!("parsing {slide_path}"))?);
    }
    Ok(fragments.join("\n"))
}

/// Slide part paths in presentation order.
fn slide_order<R: Read + Seek>(archive: &mut ZipArchive<R>) -> anyhow::Result<Vec<String>> {
    let rels_xml = read_archive_file(archive, "ppt/_rels/presentation.xml.rels")?;
    let targets = slide_relationships(&rels_xml)?;

    if let Ok(presentation_xml) = read_archive_file(archive, "ppt/presentation.xml") {
        let ordered: Vec<String> = slide_id_refs(&presentation_xml)?
            .iter()
            .filter_map(|rid| targets.get(rid).cloned())
            .collect();
        if !ordered.is_empty() {
            return Ok(ordered);
        }
    }

    let mut by_number: Vec<(Option<usize>, String)> = targets
        .into_values()
        .map(|path| (slide_number(&path), path))
        .collect();
    by_number.sort();
    Ok(by_number.into_iter().map(|(_, path)| path).collect())
}

/// Maps relationship id to archive path for every slide relationship.
fn slide_relationships(xml: &str) -> anyhow::Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"Relationship" => {
                let mut rel_type = String::new();
                let mut target = String::new();
                let mut id = String::new();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Type" => rel_type = value,
                        b"Target" => target = value,
                        b"Id" => id = value,
                        _ => {}
                    }
                }
                if rel_type.ends_with("/slide") {
                    let path = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("ppt/{target}"),
                    };
                    targets.insert(id, path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("error parsing presentation relationships: {e}")),
            _ => {}
        }
    }

    Ok(targets)
}

/// Relationship ids of `<p:sldId r:id="…"/>` entries, in deck order.
fn slide_id_refs(xml: &str) -> anyhow::Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut refs = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"sldId" => {
                let rid = e.attributes().flatten().find_map(|attr| {
                    let key = attr.key.as_ref();
                    let namespaced = key.contains(&b':');
                    (namespaced && local_name(key) == b"id")
                        .then(|| String::from_utf8_lossy(&attr.value).to_string())
                });
                if let Some(rid) = rid {
                    refs.push(rid);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("error parsing presentation.xml: {e}")),
            _ => {}
        }
    }

    Ok(refs)
}

/// Text of every shape on a slide, one entry per shape, paragraphs split by newlines.
///
/// Graphic frames count as shapes, so table cell paragraphs end up in the frame's entry.
fn shape_texts(xml: &str) -> anyhow::Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut texts = Vec::new();

    let mut shape_depth = 0usize;
    let mut in_run_text = false;
    let mut paragraphs: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"graphicFrame" => {
                    if shape_depth == 0 {
                        paragraphs.clear();
                    }
                    shape_depth += 1;
                }
                b"p" if shape_depth > 0 => paragraphs.push(String::new()),
                b"t" if shape_depth > 0 => in_run_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"p" if shape_depth > 0 => paragraphs.push(String::new()),
                b"br" if shape_depth > 0 => {
                    if let Some(current) = paragraphs.last_mut() {
                        current.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_run_text => {
                let text = e
                    .unescape()
                    .map_err(|err| anyhow!("invalid text run: {err}"))?;
                if let Some(current) = paragraphs.last_mut() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_run_text = false,
                b"sp" | b"graphicFrame" if shape_depth > 0 => {
                    shape_depth -= 1;
                    if shape_depth == 0 {
                        let text = paragraphs.join("\n");
                        if !text.trim().is_empty() {
                            texts.push(text);
                        }
                        paragraphs.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("malformed slide XML: {e}")),
            _ => {}
        }
    }

    Ok(texts)
}

fn read_archive_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> anyhow::Result<String> {
    let mut file = archive
        .by_name(path)
        .with_context(|| format!("'{path}' not found in archive"))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .with_context(|| format!("reading '{path}'"))?;
    Ok(content)
}

/// Local part of a possibly namespaced XML name (`p:sp` -> `sp`).
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Trailing number of a part name such as `ppt/slides/slide12.xml`.
fn slide_number(path: &str) -> Option<usize> {
    let stem = path.trim_end_matches(".xml");
    let digits: String = stem.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    digits.chars().rev().collect::<String>().parse().ok()
}
