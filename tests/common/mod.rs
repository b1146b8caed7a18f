//! Shared fixtures: an in-memory stand-in for an opened binary object.

#![allow(dead_code)]

use solib_list::{BinaryLayout, SectionInfo, SegmentLayout};

/// A scripted [`BinaryLayout`] with a containment-style segment mapper.
pub struct FakeObject {
    pub sections: Vec<SectionInfo>,
    pub segments: Option<SegmentLayout>,
    /// Natural segment owning each section, parallel to `sections`.
    pub section_segments: Vec<Option<usize>>,
    /// Force the segment mapper to report failure.
    pub mapper_fails: bool,
}

impl FakeObject {
    /// An object with sections only (no segment data).
    pub fn with_sections(sections: Vec<SectionInfo>) -> Self {
        let count = sections.len();
        Self {
            sections,
            segments: None,
            section_segments: vec![None; count],
            mapper_fails: false,
        }
    }

    /// An object with both a section list and a natural segment layout.
    pub fn with_segments(
        sections: Vec<SectionInfo>,
        segments: SegmentLayout,
        section_segments: Vec<Option<usize>>,
    ) -> Self {
        assert_eq!(sections.len(), section_segments.len());
        Self {
            sections,
            segments: Some(segments),
            section_segments,
            mapper_fails: false,
        }
    }
}

impl BinaryLayout for FakeObject {
    fn sections(&self) -> &[SectionInfo] {
        &self.sections
    }

    fn natural_segments(&self) -> Option<SegmentLayout> {
        self.segments.clone()
    }

    fn map_segment_offsets(&self, bases: &[u64], offsets: &mut [u64]) -> bool {
        if self.mapper_fails || bases.is_empty() {
            return false;
        }
        let natural = match &self.segments {
            Some(natural) => natural,
            None => return false,
        };
        let last_base = bases[bases.len() - 1];
        for (index, owner) in self.section_segments.iter().enumerate() {
            if let Some(seg) = *owner {
                let base = bases.get(seg).copied().unwrap_or(last_base);
                offsets[index] = base.wrapping_sub(natural.bases[seg]);
            }
        }
        true
    }
}

pub fn alloc(size: u64) -> SectionInfo {
    SectionInfo {
        allocatable: true,
        size,
    }
}

pub fn non_alloc(size: u64) -> SectionInfo {
    SectionInfo {
        allocatable: false,
        size,
    }
}
