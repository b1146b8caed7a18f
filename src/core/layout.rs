//! The seam between the relocation calculator and an opened binary object.
//!
//! The calculator never opens or parses object files itself; it consumes a
//! [`BinaryLayout`], which exposes exactly the three facts it needs: the
//! ordered section list, the object's natural segment layout, and the
//! base-to-offset segment mapping. [`crate::formats::object::ObjectLayout`]
//! implements this for files parsed with the `object` crate; tests supply
//! in-memory fakes.

use serde::{Deserialize, Serialize};

/// One section of a binary object, in the object's native order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionInfo {
    /// Whether the section occupies memory at runtime (ELF `SHF_ALLOC`).
    pub allocatable: bool,
    /// Section size in bytes.
    pub size: u64,
}

/// The link-time segment layout of a binary object: parallel base and size
/// arrays in object-native order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentLayout {
    pub bases: Vec<u64>,
    pub sizes: Vec<u64>,
}

impl SegmentLayout {
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

/// Section and segment layout of one opened binary object.
pub trait BinaryLayout {
    /// All sections in object-native order.
    fn sections(&self) -> &[SectionInfo];

    /// Natural (link-time) segment layout, or `None` when the object
    /// carries no segment data.
    fn natural_segments(&self) -> Option<SegmentLayout>;

    /// Map target-provided segment bases to per-section deltas, writing
    /// into `offsets` (pre-zeroed, one slot per section). Returns `false`
    /// when the bases are malformed or insufficient; `offsets` is then left
    /// as found.
    fn map_segment_offsets(&self, bases: &[u64], offsets: &mut [u64]) -> bool;
}
