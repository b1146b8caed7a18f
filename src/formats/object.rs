//! [`BinaryLayout`] backed by a file parsed with the `object` crate.
//!
//! Extracting the section and segment layout up front keeps the relocation
//! calculator free of any `object` types and lets the layout outlive the
//! mapped file data.

use object::{Object, ObjectSection, ObjectSegment, SectionFlags, SectionKind};

use crate::core::layout::{BinaryLayout, SectionInfo, SegmentLayout};

/// Section and segment layout extracted from an [`object::File`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectLayout {
    sections: Vec<SectionInfo>,
    /// Static (link-time) address of each section, parallel to `sections`.
    section_addrs: Vec<u64>,
    segments: SegmentLayout,
}

impl ObjectLayout {
    pub fn from_object<'data, R: object::ReadRef<'data>>(file: &object::File<'data, R>) -> Self {
        let mut sections = Vec::new();
        let mut section_addrs = Vec::new();
        for section in file.sections() {
            sections.push(SectionInfo {
                allocatable: is_allocatable(&section),
                size: section.size(),
            });
            section_addrs.push(section.address());
        }

        let mut segments = SegmentLayout::default();
        for segment in file.segments() {
            segments.bases.push(segment.address());
            segments.sizes.push(segment.size());
        }

        Self {
            sections,
            section_addrs,
            segments,
        }
    }
}

impl BinaryLayout for ObjectLayout {
    fn sections(&self) -> &[SectionInfo] {
        &self.sections
    }

    fn natural_segments(&self) -> Option<SegmentLayout> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.segments.clone())
        }
    }

    /// Each allocatable section inherits the delta of the natural segment
    /// containing its static address. Segments past the end of the reported
    /// bases reuse the last reported base; sections outside every segment
    /// keep a zero delta.
    fn map_segment_offsets(&self, bases: &[u64], offsets: &mut [u64]) -> bool {
        if bases.is_empty() || self.segments.is_empty() {
            return false;
        }
        let last_base = bases[bases.len() - 1];
        for (index, section) in self.sections.iter().enumerate() {
            if !section.allocatable {
                continue;
            }
            let addr = self.section_addrs[index];
            let containing = self
                .segments
                .bases
                .iter()
                .zip(&self.segments.sizes)
                .position(|(&base, &size)| addr >= base && addr - base < size);
            if let Some(seg) = containing {
                let base = bases.get(seg).copied().unwrap_or(last_base);
                offsets[index] = base.wrapping_sub(self.segments.bases[seg]);
            }
        }
        true
    }
}

fn is_allocatable<'data, 'file, R: object::ReadRef<'data>>(
    section: &object::Section<'data, 'file, R>,
) -> bool {
    match section.flags() {
        SectionFlags::Elf { sh_flags } => sh_flags & u64::from(object::elf::SHF_ALLOC) != 0,
        _ => matches!(
            section.kind(),
            SectionKind::Text
                | SectionKind::Data
                | SectionKind::ReadOnlyData
                | SectionKind::ReadOnlyDataWithRel
                | SectionKind::ReadOnlyString
                | SectionKind::UninitializedData
                | SectionKind::Tls
                | SectionKind::UninitializedTls
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u16(data: &mut [u8], offset: usize, value: u16) {
        data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn put_u32(data: &mut [u8], offset: usize, value: u32) {
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn put_u64(data: &mut [u8], offset: usize, value: u64) {
        data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    #[allow(clippy::too_many_arguments)]
    fn put_shdr(
        data: &mut [u8],
        offset: usize,
        name: u32,
        sh_type: u32,
        flags: u64,
        addr: u64,
        file_off: u64,
        size: u64,
    ) {
        put_u32(data, offset, name);
        put_u32(data, offset + 4, sh_type);
        put_u64(data, offset + 8, flags);
        put_u64(data, offset + 16, addr);
        put_u64(data, offset + 24, file_off);
        put_u64(data, offset + 32, size);
        // link/info zero
        put_u64(data, offset + 48, 1); // sh_addralign
    }

    /// A minimal ELF64 shared object: two PT_LOAD segments, sections
    /// .text (alloc), .data (alloc), .debug_info (non-alloc), .shstrtab.
    fn test_elf() -> Vec<u8> {
        let mut data = vec![0u8; 0x340];

        // ELF header
        data[0..4].copy_from_slice(b"\x7fELF");
        data[4] = 2; // 64-bit
        data[5] = 1; // little endian
        data[6] = 1; // EI_VERSION
        put_u16(&mut data, 16, 3); // e_type = ET_DYN
        put_u16(&mut data, 18, 62); // e_machine = EM_X86_64
        put_u32(&mut data, 20, 1); // e_version
        put_u64(&mut data, 32, 0x40); // e_phoff
        put_u64(&mut data, 40, 0x200); // e_shoff
        put_u16(&mut data, 52, 64); // e_ehsize
        put_u16(&mut data, 54, 56); // e_phentsize
        put_u16(&mut data, 56, 2); // e_phnum
        put_u16(&mut data, 58, 64); // e_shentsize
        put_u16(&mut data, 60, 5); // e_shnum
        put_u16(&mut data, 62, 4); // e_shstrndx

        // PT_LOAD r-x: vaddr 0x1000, size 0x10, file offset 0x100
        let ph = 0x40;
        put_u32(&mut data, ph, 1); // p_type
        put_u32(&mut data, ph + 4, 5); // p_flags = R|X
        put_u64(&mut data, ph + 8, 0x100); // p_offset
        put_u64(&mut data, ph + 16, 0x1000); // p_vaddr
        put_u64(&mut data, ph + 24, 0x1000); // p_paddr
        put_u64(&mut data, ph + 32, 0x10); // p_filesz
        put_u64(&mut data, ph + 40, 0x10); // p_memsz
        put_u64(&mut data, ph + 48, 0x1000); // p_align

        // PT_LOAD rw-: vaddr 0x2000, size 0x8, file offset 0x110
        let ph = 0x40 + 56;
        put_u32(&mut data, ph, 1);
        put_u32(&mut data, ph + 4, 6); // p_flags = R|W
        put_u64(&mut data, ph + 8, 0x110);
        put_u64(&mut data, ph + 16, 0x2000);
        put_u64(&mut data, ph + 24, 0x2000);
        put_u64(&mut data, ph + 32, 0x8);
        put_u64(&mut data, ph + 40, 0x8);
        put_u64(&mut data, ph + 48, 0x1000);

        // Section name strings at 0x120
        let strtab = b"\0.text\0.data\0.debug_info\0.shstrtab\0";
        data[0x120..0x120 + strtab.len()].copy_from_slice(strtab);

        // Section headers at 0x200 (index 0 stays the null section)
        let progbits = 1;
        let sh_strtab = 3;
        put_shdr(&mut data, 0x240, 1, progbits, 0x6, 0x1000, 0x100, 0x10); // .text A|X
        put_shdr(&mut data, 0x280, 7, progbits, 0x3, 0x2000, 0x110, 0x8); // .data A|W
        put_shdr(&mut data, 0x2c0, 13, progbits, 0, 0, 0x118, 0x4); // .debug_info
        put_shdr(
            &mut data,
            0x300,
            25,
            sh_strtab,
            0,
            0,
            0x120,
            strtab.len() as u64,
        ); // .shstrtab

        data
    }

    #[test]
    fn test_layout_extraction() {
        let data = test_elf();
        let file = object::File::parse(&*data).unwrap();
        let layout = ObjectLayout::from_object(&file);

        // object's iterator skips the null section.
        assert_eq!(layout.sections().len(), 4);
        assert_eq!(
            layout
                .sections()
                .iter()
                .map(|s| s.allocatable)
                .collect::<Vec<_>>(),
            vec![true, true, false, false]
        );
        assert_eq!(layout.sections()[0].size, 0x10);
        assert_eq!(layout.sections()[1].size, 0x8);

        let segments = layout.natural_segments().unwrap();
        assert_eq!(segments.bases, vec![0x1000, 0x2000]);
        assert_eq!(segments.sizes, vec![0x10, 0x8]);
    }

    #[test]
    fn test_map_segment_offsets() {
        let data = test_elf();
        let file = object::File::parse(&*data).unwrap();
        let layout = ObjectLayout::from_object(&file);

        let mut offsets = vec![0u64; layout.sections().len()];
        assert!(layout.map_segment_offsets(&[0x401000, 0x802000], &mut offsets));
        // .text moved by 0x400000, .data by 0x800000, the rest untouched.
        assert_eq!(offsets, vec![0x400000, 0x800000, 0, 0]);
    }

    #[test]
    fn test_map_reuses_last_base_for_trailing_segments() {
        let data = test_elf();
        let file = object::File::parse(&*data).unwrap();
        let layout = ObjectLayout::from_object(&file);

        let mut offsets = vec![0u64; layout.sections().len()];
        assert!(layout.map_segment_offsets(&[0x401000], &mut offsets));
        // One base for two segments: the second segment reuses it.
        assert_eq!(offsets[0], 0x400000);
        assert_eq!(offsets[1], 0x401000u64.wrapping_sub(0x2000));
    }

    #[test]
    fn test_map_rejects_empty_bases() {
        let data = test_elf();
        let file = object::File::parse(&*data).unwrap();
        let layout = ObjectLayout::from_object(&file);

        let mut offsets = vec![0u64; layout.sections().len()];
        assert!(!layout.map_segment_offsets(&[], &mut offsets));
        assert!(offsets.iter().all(|&o| o == 0));
    }
}
