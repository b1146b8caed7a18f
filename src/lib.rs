//! Target-reported shared library lists: parsing and relocation.
//!
//! Some execution environments report the shared libraries loaded in a
//! process as a small XML document rather than exposing a dynamic-linker
//! rendezvous structure. This crate decodes that document into
//! [`LibraryDescriptor`]s and, once the matching binary object has been
//! opened, computes the per-section relocation offsets and the address
//! range each library occupies.
//!
//! ```
//! use solib_list::{parse_library_list, Bases};
//!
//! let doc = r#"<library-list version="1.0">
//!   <library name="libc.so"><section address="0x4000"/></library>
//! </library-list>"#;
//! let libraries = parse_library_list(doc).unwrap();
//! assert_eq!(libraries[0].name(), "libc.so");
//! assert_eq!(libraries[0].bases(), &Bases::Sections(vec![0x4000]));
//! ```
//!
//! The crate never fetches the document or opens object files itself;
//! both arrive through the caller (see [`core::layout::BinaryLayout`]).

/// Core data types: descriptors and the object-layout seam.
pub mod core;
/// Schema and capability errors.
pub mod error;
/// Adapters from concrete object-file parsers to [`BinaryLayout`].
pub mod formats;
/// Tracing subscriber setup.
pub mod logging;
/// The library-list document parser.
pub mod parser;
/// The relocation calculator.
pub mod relocate;

pub use crate::core::descriptor::{AddressRange, Bases, LibraryDescriptor, OffsetTable};
pub use crate::core::layout::{BinaryLayout, SectionInfo, SegmentLayout};
pub use crate::error::{ParseError, Result};
pub use crate::parser::parse_library_list;
pub use crate::relocate::{relocate, RelocationWarning, WarningKind};
