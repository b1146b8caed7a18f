//! Library descriptors decoded from a target-reported library list.
//!
//! A descriptor is the in-memory form of one `<library>` element: a name
//! plus either segment base addresses or section base addresses. Relocation
//! results are attached lazily, at most once, the first time an offset is
//! needed; the binary object is assumed immutable for the descriptor's
//! lifetime, so the memoized result is never invalidated.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive `[low, high]` byte span a library occupies at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressRange {
    pub low: u64,
    pub high: u64,
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x}]", self.low, self.high)
    }
}

/// Per-section relocation deltas, indexed by the binary object's native
/// section order. Always sized to the object's full section count;
/// non-allocatable sections keep a delta of zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetTable(Vec<u64>);

impl OffsetTable {
    pub(crate) fn zeroed(section_count: usize) -> Self {
        Self(vec![0; section_count])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Delta to add to section `index`'s static address. Out-of-range
    /// indices map to zero, i.e. identity relocation.
    pub fn offset(&self, index: usize) -> u64 {
        self.0.get(index).copied().unwrap_or(0)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u64] {
        &mut self.0
    }

    pub(crate) fn set(&mut self, index: usize, value: u64) {
        self.0[index] = value;
    }
}

/// Base addresses reported for one library. The target reports either the
/// bases of its independently relocatable segments or the bases of its
/// independently allocatable sections, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bases {
    Segments(Vec<u64>),
    Sections(Vec<u64>),
}

impl Bases {
    /// The reported addresses, in document order.
    pub fn addresses(&self) -> &[u64] {
        match self {
            Bases::Segments(a) | Bases::Sections(a) => a,
        }
    }

    pub fn len(&self) -> usize {
        self.addresses().len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses().is_empty()
    }
}

/// Memoized output of the relocation calculator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relocation {
    pub(crate) offsets: OffsetTable,
    pub(crate) range: Option<AddressRange>,
}

/// One shared library as reported by the target.
///
/// Created by the parser; identity is the position in the parsed list.
/// The relocation result goes through exactly one unset-to-set transition,
/// guarded by a [`OnceCell`] so independent descriptors can be relocated
/// from separate workers without coordination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDescriptor {
    name: String,
    bases: Bases,
    reloc: OnceCell<Relocation>,
}

impl LibraryDescriptor {
    /// `bases` must be non-empty; the parser guarantees this for decoded
    /// descriptors.
    pub fn new(name: impl Into<String>, bases: Bases) -> Self {
        debug_assert!(!bases.is_empty());
        Self {
            name: name.into(),
            bases,
            reloc: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bases(&self) -> &Bases {
        &self.bases
    }

    /// Whether the relocation calculator already ran for this descriptor,
    /// successfully or not.
    pub fn is_relocated(&self) -> bool {
        self.reloc.get().is_some()
    }

    /// The computed offset table, absent until relocation runs.
    pub fn offsets(&self) -> Option<&OffsetTable> {
        self.reloc.get().map(|r| &r.offsets)
    }

    /// The computed load range, absent until relocation runs and also
    /// absent when relocation degraded for this descriptor.
    pub fn address_range(&self) -> Option<AddressRange> {
        self.reloc.get().and_then(|r| r.range)
    }

    /// Delta to apply to section `index`; zero while unrelocated, so
    /// callers fall back to identity relocation.
    pub fn section_offset(&self, index: usize) -> u64 {
        self.offsets().map(|t| t.offset(index)).unwrap_or(0)
    }

    pub(crate) fn install(&self, reloc: Relocation) {
        // First writer wins; losing a race is equivalent to the memoized
        // no-op path.
        let _ = self.reloc.set(reloc);
    }
}

impl fmt::Display for LibraryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address_range() {
            Some(range) => write!(f, "{} {}", self.name, range),
            None => write!(f, "{} (not relocated)", self.name),
        }
    }
}
