//! PPTX file parser implementation.

use pptscript_core::{Element, ElementCategory, Error, LoadMode, Result, TextCleaner};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";

/// Parser for PPTX (Office Open XML) files.
#[derive(Debug, Clone, Default)]
pub struct PptxParser {
    cleaner: TextCleaner,
}

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a PPTX file from a reader into text elements.
    pub fn parse<R: Read + Seek>(&self, reader: R, mode: LoadMode) -> Result<Vec<Element>> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let slide_order = self.get_slide_order(&mut archive)?;
        log::debug!("Found {} slides", slide_order.len());

        let mut slides = Vec::with_capacity(slide_order.len());
        for slide_path in &slide_order {
            slides.push(self.parse_slide(&mut archive, slide_path)?);
        }

        Ok(self.shape_elements(slides, mode))
    }

    /// Shape the per-slide text into elements for the requested mode.
    fn shape_elements(&self, slides: Vec<Vec<ShapeInfo>>, mode: LoadMode) -> Vec<Element> {
        let mut elements = Vec::new();
        let mut whole_deck = Vec::new();

        for (idx, shapes) in slides.into_iter().enumerate() {
            let page_number = (idx + 1) as u32;
            let cleaned: Vec<(String, ElementCategory)> = shapes
                .into_iter()
                .map(|shape| (self.cleaner.clean(&shape.text), shape.category))
                .filter(|(text, _)| !text.is_empty())
                .collect();

            match mode {
                LoadMode::Elements => {
                    for (text, category) in cleaned {
                        elements.push(Element::on_page(text, page_number, category));
                    }
                }
                LoadMode::Paged => {
                    if !cleaned.is_empty() {
                        let text = join_texts(&cleaned, "\n");
                        elements.push(Element::on_page(text, page_number, ElementCategory::Composite));
                    }
                }
                LoadMode::Single => {
                    if !cleaned.is_empty() {
                        whole_deck.push(join_texts(&cleaned, "\n"));
                    }
                }
            }
        }

        if mode == LoadMode::Single && !whole_deck.is_empty() {
            elements.push(Element::unpaged(whole_deck.join("\n\n"), ElementCategory::Composite));
        }

        elements
    }

    /// Get the ordered list of slide paths.
    ///
    /// Uses the `sldIdLst` of presentation.xml when present, otherwise falls
    /// back to the numbering of the relationship ids.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = self.read_file_from_archive(archive, PRESENTATION_RELS_PATH)?;
        let relationships = parse_slide_relationships(&rels_content)?;

        if let Ok(presentation) = self.read_file_from_archive(archive, PRESENTATION_PATH) {
            let ids = parse_slide_id_list(&presentation)?;
            let by_id: HashMap<&str, &SlideRelationship> =
                relationships.iter().map(|r| (r.id.as_str(), r)).collect();
            let ordered: Vec<String> = ids
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).map(|r| r.path.clone()))
                .collect();
            if !ordered.is_empty() {
                return Ok(ordered);
            }
        }

        let mut slides: Vec<(String, Option<usize>)> = relationships
            .into_iter()
            .map(|r| {
                let order_num = extract_slide_number(&r.id).or_else(|| extract_slide_number(&r.path));
                (r.path, order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a single slide into position-sorted shapes.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
    ) -> Result<Vec<ShapeInfo>> {
        let content = self.read_file_from_archive(archive, slide_path)?;
        let mut shapes = extract_shapes_from_xml(&content);

        // Top-to-bottom, then left-to-right
        shapes.sort_by(|a, b| {
            a.y.partial_cmp(&b.y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        Ok(shapes)
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

fn join_texts(texts: &[(String, ElementCategory)], separator: &str) -> String {
    texts
        .iter()
        .map(|(text, _)| text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// A slide relationship from presentation.xml.rels.
#[derive(Debug)]
struct SlideRelationship {
    id: String,
    path: String,
}

/// Collect slide relationships, skipping layouts, masters and notes.
fn parse_slide_relationships(xml: &str) -> Result<Vec<SlideRelationship>> {
    let mut relationships = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let rel_type = attribute(e, b"Type").unwrap_or_default();
                let target = attribute(e, b"Target").unwrap_or_default();
                let id = attribute(e, b"Id").unwrap_or_default();

                if rel_type.ends_with("/slide") {
                    let path = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("ppt/{}", target),
                    };
                    relationships.push(SlideRelationship { id, path });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Relationship ids of `<p:sldId>` entries, in presentation order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                if let Some(id) = relationship_id(e) {
                    ids.push(id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Information about a shape extracted from XML.
#[derive(Debug)]
struct ShapeInfo {
    text: String,
    x: f64,
    y: f64,
    category: ElementCategory,
}

impl Default for ShapeInfo {
    fn default() -> Self {
        Self {
            text: String::new(),
            x: 0.0,
            y: 0.0,
            category: ElementCategory::NarrativeText,
        }
    }
}

impl ShapeInfo {
    /// Read the `x`/`y` attributes of an `<a:off>` element.
    fn set_offset(&mut self, e: &BytesStart) {
        if let Some(x) = attribute(e, b"x").and_then(|v| v.parse::<f64>().ok()) {
            self.x = x;
        }
        if let Some(y) = attribute(e, b"y").and_then(|v| v.parse::<f64>().ok()) {
            self.y = y;
        }
    }

    /// Mark title placeholders from a `<p:ph>` element.
    fn set_placeholder(&mut self, e: &BytesStart) {
        if let Some(kind) = attribute(e, b"type") {
            if kind == "title" || kind == "ctrTitle" {
                self.category = ElementCategory::Title;
            }
        }
    }
}

/// Extract shapes with text and position from slide XML.
///
/// Only text inside `<a:t>` runs is kept; paragraphs and `<a:br>` become
/// newlines. Malformed XML ends the scan with whatever was read so far.
fn extract_shapes_from_xml(xml_content: &str) -> Vec<ShapeInfo> {
    let mut shapes = Vec::new();
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(false);

    let mut current_shape: Option<ShapeInfo> = None;
    let mut in_text_body = false;
    let mut in_run_text = false;
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"graphicFrame" => {
                    current_shape = Some(ShapeInfo::default());
                    current_text.clear();
                }
                b"off" => {
                    if let Some(ref mut shape) = current_shape {
                        shape.set_offset(e);
                    }
                }
                b"ph" => {
                    if let Some(ref mut shape) = current_shape {
                        shape.set_placeholder(e);
                    }
                }
                b"tbl" => {
                    if let Some(ref mut shape) = current_shape {
                        shape.category = ElementCategory::Table;
                    }
                }
                b"txBody" => in_text_body = true,
                b"p" if in_text_body && !current_text.is_empty() => current_text.push('\n'),
                b"t" if in_text_body => in_run_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"off" => {
                    if let Some(ref mut shape) = current_shape {
                        shape.set_offset(e);
                    }
                }
                b"ph" => {
                    if let Some(ref mut shape) = current_shape {
                        shape.set_placeholder(e);
                    }
                }
                b"br" if in_text_body => current_text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_run_text {
                    let text = e.unescape().unwrap_or_default();
                    current_text.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" | b"graphicFrame" => {
                    if let Some(mut shape) = current_shape.take() {
                        shape.text = current_text.trim().to_string();
                        if !shape.text.is_empty() {
                            shapes.push(shape);
                        }
                    }
                    current_text.clear();
                    in_text_body = false;
                    in_run_text = false;
                }
                b"txBody" => in_text_body = false,
                b"t" => in_run_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("XML parsing error, keeping {} shapes read so far: {}", shapes.len(), e);
                break;
            }
            _ => {}
        }
    }

    shapes
}

/// Value of an attribute, matched on its local name.
fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| local_name(attr.key.as_ref()) == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// The `r:id` attribute of an element, ignoring its unprefixed `id`.
fn relationship_id(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| {
            let key = attr.key.as_ref();
            key.contains(&b':') && local_name(key) == b"id"
        })
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
