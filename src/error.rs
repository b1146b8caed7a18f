//! Error types for library-list parsing.
//!
//! Schema errors are fatal to the whole document: the parser returns one of
//! these and no descriptors. Per-library relocation problems are not errors
//! at all; they surface as [`crate::relocate::RelocationWarning`] instead.

use thiserror::Error;

/// Schema and capability errors raised while decoding a library-list document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The `version` attribute is present but not `"1.0"`.
    #[error("library list has unsupported version \"{0}\"")]
    UnsupportedVersion(String),

    /// A single `<library>` carries both `<segment>` and `<section>` children.
    #[error("library \"{library}\" has both segment and section bases")]
    MixedBaseKinds { library: String },

    /// A `<library>` closed without any `<segment>` or `<section>` child.
    #[error("library \"{library}\" has no segment or section bases")]
    NoBases { library: String },

    /// An `address` attribute that is neither decimal nor `0x` hexadecimal.
    #[error("malformed address value \"{value}\"")]
    MalformedAddress { value: String },

    /// An element outside the library-list grammar.
    #[error("unexpected element <{element}>")]
    UnexpectedElement { element: String },

    /// An attribute the grammar does not define for its element.
    #[error("unexpected attribute \"{attribute}\" on <{element}>")]
    UnexpectedAttribute { element: String, attribute: String },

    /// A required attribute is absent.
    #[error("missing attribute \"{attribute}\" on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    /// A `<library>` whose `name` attribute is the empty string.
    #[error("library element has an empty name")]
    EmptyLibraryName,

    /// The document ended inside an open element.
    #[error("unexpected end of document")]
    UnexpectedEof,

    /// The document is not well-formed XML.
    #[cfg(feature = "xml")]
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML support was disabled at compile time.
    #[error("cannot parse library list: XML support was disabled at compile time")]
    XmlUnsupported,
}

/// Result type alias for library-list operations.
pub type Result<T> = std::result::Result<T, ParseError>;
