use ahash::{HashMap, HashMapExt};

use crate::rel::{Relocation, RelSection, SectionAddressing};
use crate::stream::{read_cstring, read_u32_be};

/// Where one pointer slot of a table leads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotTarget {
    /// Patched by a relocation. The section is only checked against the section table
    /// once all sections are known.
    Relocated { section: usize, addend: u32 },
    /// A literal pointer into the table's own section.
    InPlace { section: usize, addend: u32 },
    Absent,
}

impl SlotTarget {
    pub fn section_and_addend(self) -> Option<(usize, u32)> {
        match self {
            SlotTarget::Relocated { section, addend } => Some((section, addend)),
            SlotTarget::InPlace { section, addend } => Some((section, addend)),
            SlotTarget::Absent => None,
        }
    }
}

/// Classifies `slot_count` pointer slots starting at `table_file_offset`, which must lie in
/// the addressed section. A relocation at a slot always wins over the bytes stored there.
pub fn resolve_pointer_table(
    data: &[u8],
    addressing: &SectionAddressing,
    section_count: usize,
    relocs: &[Relocation],
    table_file_offset: u32,
    slot_count: usize,
) -> Box<[SlotTarget]> {
    let table_offset = table_file_offset.wrapping_sub(addressing.section.offset);
    let table_end = table_offset as u64 + slot_count as u64 * 4;

    let mut relocs_by_offset: HashMap<u32, &Relocation> = HashMap::with_capacity(slot_count);
    for r in relocs.iter() {
        if r.patch_section as usize == addressing.index
            && r.patch_offset >= table_offset
            && (r.patch_offset as u64) < table_end
        {
            relocs_by_offset.insert(r.patch_offset, r);
        }
    }

    let mut slots = Vec::with_capacity(slot_count);
    for i in 0..slot_count {
        let slot_offset = table_offset.wrapping_add(i as u32 * 4);

        let target = match relocs_by_offset.get(&slot_offset) {
            Some(r) => {
                let section = r.target_section as usize;
                if section == 0 || section >= section_count {
                    SlotTarget::Absent
                } else {
                    SlotTarget::Relocated { section, addend: r.addend }
                }
            }
            None => {
                let file_offset = addressing.section.offset as usize + slot_offset as usize;
                match read_u32_be(data, file_offset) {
                    Ok(0) | Err(_) => SlotTarget::Absent,
                    Ok(ptr) => match addressing.section_offset_of(ptr) {
                        Some(addend) => SlotTarget::InPlace { section: addressing.index, addend },
                        // escapes the section, can't be followed without more context
                        None => SlotTarget::Absent,
                    },
                }
            }
        };

        slots.push(target);
    }

    slots.into_boxed_slice()
}

/// Second pass: reads the string each slot points at.
pub fn resolve_slot_strings(data: &[u8], sections: &[RelSection], slots: &[SlotTarget]) -> Box<[Option<String>]> {
    slots.iter()
        .map(|slot| {
            let (index, addend) = slot.section_and_addend()?;
            let section = sections.get(index)?;
            if section.offset == 0 {
                return None;
            }
            read_cstring(data, section.offset as usize + addend as usize).ok()
        })
        .collect()
}
