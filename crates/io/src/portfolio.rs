//! Portfolio XML document read/write.
//!
//! The host format keeps an ordered `<securities>` list and a set of
//! `<taxonomies>`. Classification nodes nest recursively; each carries its
//! assignments as `<assignment>` elements whose `<reference>` text is a
//! relative path into the securities list — stored and re-emitted verbatim,
//! never interpreted here. A classification without an `<assignments>`
//! container simply has none.

use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use foliotax_core::{Assignment, Classification, InstrumentKind, PortfolioDocument, Security, Taxonomy};

use crate::error::StoreError;

fn xml_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Xml(e.to_string())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

pub fn load(path: &Path) -> Result<PortfolioDocument, StoreError> {
    let xml = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Io(format!("cannot read {}: {e}", path.display())))?;
    parse(&xml)
}

pub fn parse(xml: &str) -> Result<PortfolioDocument, StoreError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut document = PortfolioDocument::default();

    // Nested <classification> elements are built on an explicit stack; the
    // element closing with an empty stack is a taxonomy root.
    let mut stack: Vec<Classification> = Vec::new();
    let mut assignment: Option<Assignment> = None;
    let mut security: Option<Security> = None;
    let mut current_tag: Vec<u8> = Vec::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                current_tag = e.name().as_ref().to_vec();
                match e.name().as_ref() {
                    b"classification" => stack.push(Classification::default()),
                    b"assignment" => {
                        assignment = Some(Assignment { reference: String::new(), weight: 0, rank: 0 })
                    }
                    b"security" => {
                        security = Some(Security {
                            identifier: String::new(),
                            name: String::new(),
                            kind: InstrumentKind::Single,
                        })
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| StoreError::Xml(e.to_string()))?
                    .into_owned();
                apply_text(&current_tag, text, &mut stack, &mut assignment, &mut security);
            }
            Ok(Event::End(ref e)) => {
                current_tag.clear();
                match e.name().as_ref() {
                    b"classification" => {
                        let node = stack.pop().unwrap_or_default();
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(node),
                            None => document.taxonomies.push(Taxonomy { root: node }),
                        }
                    }
                    b"assignment" => {
                        if let (Some(done), Some(node)) = (assignment.take(), stack.last_mut()) {
                            node.assignments.push(done);
                        }
                    }
                    b"security" => {
                        if let Some(done) = security.take() {
                            document.securities.push(done);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StoreError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(document)
}

fn apply_text(
    tag: &[u8],
    text: String,
    stack: &mut [Classification],
    assignment: &mut Option<Assignment>,
    security: &mut Option<Security>,
) {
    if let Some(a) = assignment {
        match tag {
            b"reference" => a.reference = text,
            b"weight" => a.weight = text.parse().unwrap_or(0),
            b"rank" => a.rank = text.parse().unwrap_or(0),
            _ => {}
        }
        return;
    }
    if let Some(s) = security {
        match tag {
            b"identifier" => s.identifier = text,
            b"name" => s.name = text,
            b"kind" => {
                s.kind = if text == "basket" { InstrumentKind::Basket } else { InstrumentKind::Single }
            }
            _ => {}
        }
        return;
    }
    if let Some(node) = stack.last_mut() {
        match tag {
            b"name" => node.name = text,
            b"color" => node.color = Some(text),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

pub fn save(document: &PortfolioDocument, path: &Path) -> Result<(), StoreError> {
    let xml = render(document)?;
    std::fs::write(path, xml)
        .map_err(|e| StoreError::Io(format!("cannot write {}: {e}", path.display())))
}

pub fn render(document: &PortfolioDocument) -> Result<String, StoreError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;
    writer.write_event(Event::Start(BytesStart::new("portfolio"))).map_err(xml_err)?;

    writer.write_event(Event::Start(BytesStart::new("securities"))).map_err(xml_err)?;
    for security in &document.securities {
        writer.write_event(Event::Start(BytesStart::new("security"))).map_err(xml_err)?;
        write_text_element(&mut writer, "identifier", &security.identifier)?;
        write_text_element(&mut writer, "name", &security.name)?;
        write_text_element(&mut writer, "kind", &security.kind.to_string())?;
        writer.write_event(Event::End(BytesEnd::new("security"))).map_err(xml_err)?;
    }
    writer.write_event(Event::End(BytesEnd::new("securities"))).map_err(xml_err)?;

    writer.write_event(Event::Start(BytesStart::new("taxonomies"))).map_err(xml_err)?;
    for taxonomy in &document.taxonomies {
        writer.write_event(Event::Start(BytesStart::new("taxonomy"))).map_err(xml_err)?;
        write_classification(&mut writer, &taxonomy.root)?;
        writer.write_event(Event::End(BytesEnd::new("taxonomy"))).map_err(xml_err)?;
    }
    writer.write_event(Event::End(BytesEnd::new("taxonomies"))).map_err(xml_err)?;

    writer.write_event(Event::End(BytesEnd::new("portfolio"))).map_err(xml_err)?;

    let bytes = writer.into_inner();
    String::from_utf8(bytes).map_err(|e| StoreError::Xml(e.to_string()))
}

fn write_classification(
    writer: &mut Writer<Vec<u8>>,
    node: &Classification,
) -> Result<(), StoreError> {
    writer.write_event(Event::Start(BytesStart::new("classification"))).map_err(xml_err)?;
    write_text_element(writer, "name", &node.name)?;
    if let Some(ref color) = node.color {
        write_text_element(writer, "color", color)?;
    }
    if !node.children.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("children"))).map_err(xml_err)?;
        for child in &node.children {
            write_classification(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new("children"))).map_err(xml_err)?;
    }
    if !node.assignments.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("assignments"))).map_err(xml_err)?;
        for assignment in &node.assignments {
            writer.write_event(Event::Start(BytesStart::new("assignment"))).map_err(xml_err)?;
            write_text_element(writer, "reference", &assignment.reference)?;
            write_text_element(writer, "weight", &assignment.weight.to_string())?;
            write_text_element(writer, "rank", &assignment.rank.to_string())?;
            writer.write_event(Event::End(BytesEnd::new("assignment"))).map_err(xml_err)?;
        }
        writer.write_event(Event::End(BytesEnd::new("assignments"))).map_err(xml_err)?;
    }
    writer.write_event(Event::End(BytesEnd::new("classification"))).map_err(xml_err)?;
    Ok(())
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    text: &str,
) -> Result<(), StoreError> {
    writer.write_event(Event::Start(BytesStart::new(tag))).map_err(xml_err)?;
    writer.write_event(Event::Text(BytesText::new(text))).map_err(xml_err)?;
    writer.write_event(Event::End(BytesEnd::new(tag))).map_err(xml_err)?;
    Ok(())
}
