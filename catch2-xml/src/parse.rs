// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parse a Catch2 XML document into an [`XmlElement`] tree.
//!
//! The parser is a pull loop over `quick_xml` events with an explicit stack of open elements, so
//! deeply nested input never recurses.

use crate::{ParseError, XmlElement};
use quick_xml::{
    Reader,
    encoding::Decoder,
    events::{BytesStart, Event},
};

/// The deepest element nesting the parser accepts.
///
/// Catch2 reports nest one level per section. Anything close to this limit is adversarial.
pub const MAX_ELEMENT_DEPTH: usize = 512;

/// An element whose end tag hasn't been seen yet.
struct OpenElement {
    element: XmlElement,
    text: String,
    position: usize,
}

impl OpenElement {
    fn new(element: XmlElement, position: usize) -> Self {
        Self {
            element,
            text: String::new(),
            position,
        }
    }

    fn finish(self) -> XmlElement {
        let Self {
            mut element, text, ..
        } = self;
        if !text.trim().is_empty() {
            element.text = Some(text);
        }
        element
    }
}

pub(crate) fn parse_document(input: &str) -> Result<XmlElement, ParseError> {
    let mut reader = Reader::from_str(input);
    reader.check_end_names(true).expand_empty_elements(false);
    let decoder = reader.decoder();

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|err| ParseError::xml(position, err))?;

        match event {
            Event::Start(start) => {
                let element = start_element(decoder, &start, position)?;
                if root.is_some() {
                    return Err(ParseError::TrailingContent { position });
                }
                if stack.len() >= MAX_ELEMENT_DEPTH {
                    return Err(ParseError::DepthLimitExceeded {
                        limit: MAX_ELEMENT_DEPTH,
                        position,
                    });
                }
                stack.push(OpenElement::new(element, position));
            }
            Event::Empty(start) => {
                let element = start_element(decoder, &start, position)?;
                close_element(&mut stack, &mut root, element, position)?;
            }
            Event::End(_) => {
                let open = stack
                    .pop()
                    .ok_or(ParseError::UnexpectedEnd { position })?;
                close_element(&mut stack, &mut root, open.finish(), position)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|err| ParseError::xml(position, err))?;
                push_text(&mut stack, &text, position)?;
            }
            Event::CData(cdata) => {
                let bytes = cdata.into_inner();
                let text = std::str::from_utf8(&bytes)
                    .map_err(|err| ParseError::InvalidUtf8 { position, err })?;
                push_text(&mut stack, text, position)?;
            }
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::UnclosedElement {
            name: open.element.name,
            position: open.position,
        });
    }

    root.ok_or(ParseError::NoRootElement)
}

fn start_element(
    decoder: Decoder,
    start: &BytesStart<'_>,
    position: usize,
) -> Result<XmlElement, ParseError> {
    let qname = start.name();
    let name = decoder
        .decode(qname.as_ref())
        .map_err(|err| ParseError::xml(position, err))?;
    let mut element = XmlElement::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| ParseError::xml(position, err))?;
        let key = decoder
            .decode(attribute.key.as_ref())
            .map_err(|err| ParseError::xml(position, err))?;
        let value = attribute
            .unescape_value()
            .map_err(|err| ParseError::xml(position, err))?;
        element
            .attributes
            .insert(key.into_owned(), value.into_owned());
    }

    Ok(element)
}

fn close_element(
    stack: &mut [OpenElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
    position: usize,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.element.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ParseError::TrailingContent { position }),
    }
    Ok(())
}

fn push_text(stack: &mut [OpenElement], text: &str, position: usize) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.text.push_str(text),
        // Whitespace around the root element is allowed, anything else isn't.
        None if text.trim().is_empty() => {}
        None => return Err(ParseError::TrailingContent { position }),
    }
    Ok(())
}
