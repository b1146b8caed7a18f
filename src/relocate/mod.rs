//! Per-descriptor relocation: offset tables and load ranges.
//!
//! Given a descriptor and the layout of its opened binary object, compute
//! the delta to add to every section's static address and the contiguous
//! address range the library occupies. The result is attached to the
//! descriptor exactly once; relocation problems degrade that one descriptor
//! (offsets stay zero) and never abort a batch, matching the warn-and-
//! continue behavior expected by debugger refresh cycles.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::descriptor::{AddressRange, Bases, LibraryDescriptor, OffsetTable, Relocation};
use crate::core::layout::BinaryLayout;

/// Why one library could not be (fully) relocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// The object's allocatable section count does not match the number of
    /// reported section bases.
    SectionCountMismatch { provided: usize, allocatable: usize },
    /// The object carries no natural segment layout.
    NoSegments,
    /// The segment mapper rejected the reported bases.
    BadOffsets,
}

/// Non-fatal diagnostic for a single library within a relocation batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationWarning {
    pub library: String,
    pub kind: WarningKind,
}

impl fmt::Display for RelocationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not relocate shared library \"{}\": ", self.library)?;
        match self.kind {
            WarningKind::SectionCountMismatch {
                provided,
                allocatable,
            } => write!(
                f,
                "wrong number of allocatable sections ({} bases for {} sections)",
                provided, allocatable
            ),
            WarningKind::NoSegments => write!(f, "no segments"),
            WarningKind::BadOffsets => write!(f, "bad offsets"),
        }
    }
}

/// Compute and memoize `descriptor`'s offset table and load range.
///
/// Idempotent: once the descriptor carries a result, later calls are O(1)
/// no-ops returning `None`. On degradation the zeroed table is still
/// installed, so the failed computation is memoized too and the warning is
/// emitted once, not once per section lookup.
pub fn relocate<L: BinaryLayout>(
    descriptor: &LibraryDescriptor,
    object: &L,
) -> Option<RelocationWarning> {
    if descriptor.is_relocated() {
        return None;
    }

    let mut offsets = OffsetTable::zeroed(object.sections().len());
    let mut range = None;

    let warning = match descriptor.bases() {
        Bases::Sections(bases) => {
            relocate_by_sections(object, bases, &mut offsets, &mut range)
        }
        Bases::Segments(bases) => {
            relocate_by_segments(object, bases, &mut offsets, &mut range)
        }
    }
    .map(|kind| RelocationWarning {
        library: descriptor.name().to_string(),
        kind,
    });

    if let Some(w) = &warning {
        tracing::warn!(library = %descriptor.name(), "{w}");
    }
    descriptor.install(Relocation { offsets, range });
    warning
}

/// Section-base mode: the i-th reported base is the runtime address of the
/// i-th allocatable section, paired positionally.
fn relocate_by_sections<L: BinaryLayout>(
    object: &L,
    bases: &[u64],
    offsets: &mut OffsetTable,
    range: &mut Option<AddressRange>,
) -> Option<WarningKind> {
    let sections = object.sections();
    let allocatable = sections.iter().filter(|s| s.allocatable).count();
    if allocatable != bases.len() {
        return Some(WarningKind::SectionCountMismatch {
            provided: bases.len(),
            allocatable,
        });
    }

    let mut next_base = 0;
    let mut low = u64::MAX;
    let mut high = 0;
    let mut found_range = false;
    for (index, section) in sections.iter().enumerate() {
        if !section.allocatable {
            continue;
        }
        let base = bases[next_base];
        next_base += 1;
        offsets.set(index, base);
        if section.size > 0 {
            low = low.min(base);
            high = high.max(base + section.size - 1);
            found_range = true;
        }
    }
    *range = Some(if found_range {
        AddressRange { low, high }
    } else {
        AddressRange { low: 0, high: 0 }
    });
    debug_assert!(range.map_or(true, |r| r.low <= r.high));
    None
}

/// Segment-base mode: the external mapper turns segment bases into
/// per-section deltas; the reported range covers the leading run of
/// segments that all moved by the same delta.
fn relocate_by_segments<L: BinaryLayout>(
    object: &L,
    bases: &[u64],
    offsets: &mut OffsetTable,
    range: &mut Option<AddressRange>,
) -> Option<WarningKind> {
    let natural = match object.natural_segments() {
        Some(natural) if !natural.is_empty() => natural,
        _ => return Some(WarningKind::NoSegments),
    };
    if bases.is_empty() {
        return Some(WarningKind::BadOffsets);
    }

    let mapped = object.map_segment_offsets(bases, offsets.as_mut_slice());

    // The range is reported even when the mapper rejected the bases; the
    // leading-run rule only needs the first base.
    let delta0 = bases[0].wrapping_sub(natural.bases[0]);
    let mut last = 0;
    for index in 1..natural.len() {
        // Segments past the reported bases implicitly share delta0 and
        // keep extending the run.
        if index < bases.len() && bases[index].wrapping_sub(natural.bases[index]) != delta0 {
            break;
        }
        last = index;
    }
    let high = natural.bases[last]
        .wrapping_add(natural.sizes[last])
        .wrapping_add(delta0);
    *range = Some(AddressRange {
        low: bases[0],
        high,
    });
    debug_assert!(range.map_or(true, |r| r.low <= r.high));

    if mapped {
        None
    } else {
        Some(WarningKind::BadOffsets)
    }
}
