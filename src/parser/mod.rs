//! Schema-validating parser for target-reported library-list documents.
//!
//! The wire format is a small XML dialect:
//!
//! ```text
//! <library-list version="1.0">
//!   <library name="NAME">
//!     <segment address="0xADDR"/>   (one or more)
//!     <!-- or -->
//!     <section address="0xADDR"/>   (one or more)
//!   </library>                      (zero or more)
//! </library-list>
//! ```
//!
//! Parsing is one top-down pass over the document with an explicit state
//! machine and no backtracking. Validation is all-or-nothing: any schema
//! violation discards every partially built descriptor and returns a single
//! [`ParseError`]. XML noise (comments, declarations, processing
//! instructions, character data) is skipped; everything else outside the
//! grammar is rejected.
//!
//! When the crate is built without the `xml` feature the same entry point
//! exists but reports [`ParseError::XmlUnsupported`] once per process and
//! returns empty lists afterwards, so the enclosing debugger warns the user
//! a single time instead of on every refresh.

use crate::core::descriptor::LibraryDescriptor;
use crate::error::Result;

#[cfg(not(feature = "xml"))]
use crate::error::ParseError;

/// Decode a library-list document into descriptors, in document order.
#[cfg(feature = "xml")]
pub fn parse_library_list(document: &str) -> Result<Vec<LibraryDescriptor>> {
    let libraries = xml::parse(document)?;
    tracing::debug!(count = libraries.len(), "parsed target library list");
    Ok(libraries)
}

/// Decode a library-list document into descriptors, in document order.
///
/// This build has no XML support; the first call fails with
/// [`ParseError::XmlUnsupported`] and later calls return an empty list.
#[cfg(not(feature = "xml"))]
pub fn parse_library_list(_document: &str) -> Result<Vec<LibraryDescriptor>> {
    use std::sync::atomic::{AtomicBool, Ordering};

    static WARNED: AtomicBool = AtomicBool::new(false);

    if !WARNED.swap(true, Ordering::Relaxed) {
        tracing::warn!("cannot parse library list: XML support was disabled at compile time");
        return Err(ParseError::XmlUnsupported);
    }
    Ok(Vec::new())
}

#[cfg(feature = "xml")]
mod xml {
    use quick_xml::events::{BytesStart, Event};
    use quick_xml::Reader;

    use crate::core::descriptor::{Bases, LibraryDescriptor};
    use crate::error::{ParseError, Result};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum BaseKind {
        Segment,
        Section,
    }

    /// A `<library>` element that has not closed yet.
    struct PendingLibrary {
        name: String,
        kind: Option<BaseKind>,
        addresses: Vec<u64>,
    }

    impl PendingLibrary {
        fn push_base(&mut self, kind: BaseKind, address: u64) -> Result<()> {
            // Whichever kind appears first fixes the variant.
            match self.kind {
                Some(existing) if existing != kind => Err(ParseError::MixedBaseKinds {
                    library: self.name.clone(),
                }),
                _ => {
                    self.kind = Some(kind);
                    self.addresses.push(address);
                    Ok(())
                }
            }
        }

        fn finish(self) -> Result<LibraryDescriptor> {
            let bases = match self.kind {
                Some(BaseKind::Segment) => Bases::Segments(self.addresses),
                Some(BaseKind::Section) => Bases::Sections(self.addresses),
                None => {
                    return Err(ParseError::NoBases {
                        library: self.name,
                    })
                }
            };
            Ok(LibraryDescriptor::new(self.name, bases))
        }
    }

    /// Where the single forward pass currently stands.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum State {
        /// Before the `<library-list>` root.
        Prolog,
        /// Inside `<library-list>`.
        List,
        /// Inside a `<library>`.
        Library,
        /// Inside a non-empty `<segment>`/`<section>`, waiting for its end tag.
        Base,
        /// After `</library-list>`.
        Epilog,
    }

    pub(super) fn parse(document: &str) -> Result<Vec<LibraryDescriptor>> {
        let mut reader = Reader::from_str(document);
        reader.config_mut().trim_text(true);

        let mut state = State::Prolog;
        let mut libraries: Vec<LibraryDescriptor> = Vec::new();
        let mut pending: Option<PendingLibrary> = None;

        loop {
            match reader.read_event().map_err(ParseError::Xml)? {
                Event::Start(e) => {
                    state = open_element(&e, state, &mut pending, false)?;
                }
                Event::Empty(e) => {
                    state = open_element(&e, state, &mut pending, true)?;
                }
                Event::End(e) => {
                    // quick-xml already rejects mismatched end tags.
                    state = match state {
                        State::List => State::Epilog,
                        State::Library => {
                            let lib = pending.take().ok_or_else(|| unexpected(&e.name()))?;
                            libraries.push(lib.finish()?);
                            State::List
                        }
                        State::Base => State::Library,
                        State::Prolog | State::Epilog => return Err(unexpected(&e.name())),
                    };
                }
                Event::Text(_) | Event::CData(_) => {
                    // The grammar defines no element body text; stray
                    // character data is skipped, not validated.
                }
                Event::Eof => {
                    return if state == State::Epilog {
                        Ok(libraries)
                    } else {
                        Err(ParseError::UnexpectedEof)
                    };
                }
                // Declarations, comments, doctypes, processing instructions.
                _ => {}
            }
        }
    }

    /// Handle a start or self-closing element in one place; `empty` folds
    /// the open and close transitions together.
    fn open_element(
        e: &BytesStart<'_>,
        state: State,
        pending: &mut Option<PendingLibrary>,
        empty: bool,
    ) -> Result<State> {
        let name = e.name();
        match (state, name.as_ref()) {
            (State::Prolog, b"library-list") => {
                check_version(e)?;
                Ok(if empty { State::Epilog } else { State::List })
            }
            (State::List, b"library") => {
                let lib = PendingLibrary {
                    name: library_name(e)?,
                    kind: None,
                    addresses: Vec::new(),
                };
                if empty {
                    // Closed with neither segment nor section children.
                    return Err(ParseError::NoBases { library: lib.name });
                }
                *pending = Some(lib);
                Ok(State::Library)
            }
            (State::Library, b"segment") => {
                open_base(e, BaseKind::Segment, pending, empty)
            }
            (State::Library, b"section") => {
                open_base(e, BaseKind::Section, pending, empty)
            }
            _ => Err(unexpected(&name)),
        }
    }

    /// Record one `<segment>`/`<section>` base on the open library.
    fn open_base(
        e: &BytesStart<'_>,
        kind: BaseKind,
        pending: &mut Option<PendingLibrary>,
        empty: bool,
    ) -> Result<State> {
        let address = base_address(e)?;
        let lib = pending.as_mut().ok_or_else(|| unexpected(&e.name()))?;
        lib.push_base(kind, address)?;
        Ok(if empty { State::Library } else { State::Base })
    }

    fn unexpected(name: &quick_xml::name::QName<'_>) -> ParseError {
        ParseError::UnexpectedElement {
            element: String::from_utf8_lossy(name.as_ref()).into_owned(),
        }
    }

    /// `<library-list>` takes only an optional `version`, which must be "1.0".
    fn check_version(e: &BytesStart<'_>) -> Result<()> {
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            match attr.key.as_ref() {
                b"version" => {
                    let value = attr.unescape_value().map_err(ParseError::Xml)?;
                    if value != "1.0" {
                        return Err(ParseError::UnsupportedVersion(value.into_owned()));
                    }
                }
                other => {
                    return Err(unexpected_attribute(b"library-list", other));
                }
            }
        }
        Ok(())
    }

    /// `<library>` takes exactly one attribute, a non-empty `name`.
    fn library_name(e: &BytesStart<'_>) -> Result<String> {
        let mut name = None;
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            match attr.key.as_ref() {
                b"name" => {
                    name = Some(attr.unescape_value().map_err(ParseError::Xml)?.into_owned());
                }
                other => {
                    return Err(unexpected_attribute(b"library", other));
                }
            }
        }
        match name {
            Some(name) if name.is_empty() => Err(ParseError::EmptyLibraryName),
            Some(name) => Ok(name),
            None => Err(missing_attribute(b"library", b"name")),
        }
    }

    /// `<segment>`/`<section>` take exactly one attribute, `address`.
    fn base_address(e: &BytesStart<'_>) -> Result<u64> {
        let mut address = None;
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            match attr.key.as_ref() {
                b"address" => {
                    let value = attr.unescape_value().map_err(ParseError::Xml)?;
                    address = Some(parse_address(&value)?);
                }
                other => {
                    return Err(unexpected_attribute(e.name().as_ref(), other));
                }
            }
        }
        address.ok_or_else(|| missing_attribute(e.name().as_ref(), b"address"))
    }

    /// Addresses are pointer-width unsigned integers, `0x` hex or decimal.
    fn parse_address(value: &str) -> Result<u64> {
        let text = value.trim();
        let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => text.parse::<u64>(),
        };
        parsed.map_err(|_| ParseError::MalformedAddress {
            value: value.to_string(),
        })
    }

    fn unexpected_attribute(element: &[u8], attribute: &[u8]) -> ParseError {
        ParseError::UnexpectedAttribute {
            element: String::from_utf8_lossy(element).into_owned(),
            attribute: String::from_utf8_lossy(attribute).into_owned(),
        }
    }

    fn missing_attribute(element: &[u8], attribute: &[u8]) -> ParseError {
        ParseError::MissingAttribute {
            element: String::from_utf8_lossy(element).into_owned(),
            attribute: String::from_utf8_lossy(attribute).into_owned(),
        }
    }

}
