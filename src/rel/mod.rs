//! Dolphin relocatable modules (`.rel`).

mod symbols;
pub use symbols::*;

mod pointer;
pub use pointer::*;

use crate::stream::{read_u32_be, Stream};
use crate::ExtractError;

pub const HEADER_SIZE: usize = 0x40;
pub const SECTION_ENTRY_SIZE: usize = 0x08;
pub const IMPORT_ENTRY_SIZE: usize = 0x08;
pub const RELOCATION_ENTRY_SIZE: usize = 0x08;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RelHeader {
    pub module_id: u32,
    pub section_count: u32,
    pub section_table_offset: u32,
    pub name_offset: u32,
    pub name_size: u32,
    pub version: u32,
    pub bss_size: u32,
    pub relocation_offset: u32,
    pub import_offset: u32,
    pub import_size: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RelSection {
    /// File offset. Zero for sections without file data (bss).
    pub offset: u32,
    pub size: u32,
    pub flags: u8,
}

impl RelSection {
    pub fn is_executable(self) -> bool {
        self.flags & 1 != 0
    }

    pub fn contains_file_offset(self, file_offset: u32) -> bool {
        file_offset >= self.offset && file_offset - self.offset < self.size
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Relocation {
    /// Module the import entry refers to.
    pub module_id: u32,
    pub patch_section: u8,
    /// Relative to the start of `patch_section`.
    pub patch_offset: u32,
    pub kind: u8,
    pub target_section: u8,
    pub addend: u32,
}

impl Relocation {
    pub fn kind(&self) -> RelocKind {
        RelocKind::from_u8(self.kind)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RelocKind {
    None,
    Addr32,
    Addr24,
    Addr16,
    Addr16Lo,
    Addr16Hi,
    Addr16Ha,
    Addr14,
    Rel24,
    Rel14,
    DolphinNop,
    DolphinSection,
    DolphinEnd,
    Other(u8),
}

impl RelocKind {
    pub fn from_u8(n: u8) -> Self {
        use RelocKind::*;
        match n {
            0 => None,
            1 => Addr32,
            2 => Addr24,
            3 => Addr16,
            4 => Addr16Lo,
            5 => Addr16Hi,
            6 => Addr16Ha,
            7 => Addr14,
            10 => Rel24,
            11 => Rel14,
            201 => DolphinNop,
            202 => DolphinSection,
            203 => DolphinEnd,
            n => Other(n),
        }
    }
}

pub fn parse_rel_header(data: &[u8]) -> Result<RelHeader, ExtractError> {
    let mut words = [0u32; 16];
    for (i, w) in words.iter_mut().enumerate() {
        *w = read_u32_be(data, i * 4)?;
    }

    Ok(RelHeader {
        module_id: words[0],
        section_count: words[3],
        section_table_offset: words[4],
        name_offset: words[5],
        name_size: words[6],
        version: words[7],
        bss_size: words[8],
        relocation_offset: words[9],
        import_offset: words[10],
        import_size: words[11],
    })
}

pub fn parse_rel_sections(data: &[u8], header: &RelHeader) -> Result<Box<[RelSection]>, ExtractError> {
    let r = Stream::at(data, header.section_table_offset as usize);

    // checked before allocating so a garbage count can't blow up
    let table_size = header.section_count as usize * SECTION_ENTRY_SIZE;
    if table_size > r.remaining() {
        return Err(ExtractError::OutOfBounds {
            offset: header.section_table_offset as usize,
            width: table_size,
            len: data.len(),
        });
    }

    let mut sections = Vec::with_capacity(header.section_count as usize);
    for _ in 0..header.section_count {
        let offset_and_flags = r.read_u32()?;
        let size = r.read_u32()?;
        sections.push(RelSection {
            offset: offset_and_flags & !3,
            size,
            flags: (offset_and_flags & 3) as u8,
        });
    }

    Ok(sections.into_boxed_slice())
}

pub fn parse_relocations(data: &[u8], header: &RelHeader) -> Result<Box<[Relocation]>, ExtractError> {
    let mut relocs = Vec::new();
    let import_count = header.import_size as usize / IMPORT_ENTRY_SIZE;

    for i in 0..import_count {
        let imp = Stream::at(data, header.import_offset as usize + i * IMPORT_ENTRY_SIZE);
        let module_id = imp.read_u32()?;
        let table_offset = imp.read_u32()? as usize;

        walk_relocation_chain(data, module_id, table_offset, &mut relocs);
    }

    Ok(relocs.into_boxed_slice())
}

fn walk_relocation_chain(data: &[u8], module_id: u32, table_offset: usize, relocs: &mut Vec<Relocation>) {
    let r = Stream::at(data, table_offset);
    let mut patch_section = None;
    let mut patch_offset = 0u32;

    while r.remaining() >= RELOCATION_ENTRY_SIZE {
        // remaining() guarantees the whole record is present
        let (Ok(delta), Ok(kind), Ok(section), Ok(addend)) =
            (r.read_u16(), r.read_byte(), r.read_byte(), r.read_u32())
        else { break };

        match RelocKind::from_u8(kind) {
            RelocKind::None => break,
            RelocKind::DolphinSection => {
                patch_section = Some(section);
                patch_offset = 0;
            }
            // NOP and END records are emitted like any other kind
            _ => {
                let Some(patch_section) = patch_section else { continue };
                patch_offset = patch_offset.wrapping_add(delta as u32);
                relocs.push(Relocation {
                    module_id,
                    patch_section,
                    patch_offset,
                    kind,
                    target_section: section,
                    addend,
                });
            }
        }
    }
}

/// A parsed module. Borrows the file data for the length of an extraction run.
#[derive(Debug)]
pub struct RelFile<'a> {
    pub data: &'a [u8],
    pub header: RelHeader,
    pub sections: Box<[RelSection]>,
    pub relocations: Box<[Relocation]>,
}

impl<'a> RelFile<'a> {
    pub fn open(data: &'a [u8]) -> Result<Self, ExtractError> {
        let header = parse_rel_header(data)?;
        let sections = parse_rel_sections(data, &header)?;
        let relocations = parse_relocations(data, &header)?;

        log::debug!(
            "rel: module {} v{}, {} sections, {} relocations",
            header.module_id, header.version, sections.len(), relocations.len()
        );

        Ok(Self { data, header, sections, relocations })
    }

    pub fn section(&self, index: usize) -> Result<RelSection, ExtractError> {
        self.sections.get(index).copied().ok_or(ExtractError::SectionMissing(index))
    }
}
