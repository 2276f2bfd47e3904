use crate::rel::RelSection;
use crate::ExtractError;

pub const STAGE_WORLD_THEMES_LEN: usize = 420;
pub const MAX_THEME: u8 = 41;

// g_bg_filename_list's strings sit right after the theme table
const SCAN_MARKER: &[u8] = b"bg/";
const SCAN_MARKER_WINDOW: usize = 16;

// mkb2.main_loop.rel (NTSC)
pub const DEFAULT_STAGE_WORLD_THEMES_FILE_OFFSET: u32 = 0x204E48;

/// File offset of the stage -> theme table. A preferred offset is used as is when it falls
/// inside `section`, otherwise the section is scanned.
pub fn locate_stage_world_themes(data: &[u8], section: RelSection, preferred: Option<u32>) -> Result<u32, ExtractError> {
    if let Some(off) = preferred {
        if section.contains_file_offset(off) {
            return Ok(off);
        }
        log::warn!("theme table offset {:X} is outside section at {:X}, scanning", off, section.offset);
    }

    let off = scan_stage_world_themes(data, section)
        .ok_or(ExtractError::TableNotFound("STAGE_WORLD_THEMES"))?;
    log::debug!("theme table found at {:X}", off);
    Ok(off as u32)
}

/// First run of `STAGE_WORLD_THEMES_LEN` bytes, all valid theme ids,
/// with the `bg/` strings following shortly after.
fn scan_stage_world_themes(data: &[u8], section: RelSection) -> Option<usize> {
    let start = section.offset as usize;
    let end = (section.offset as usize + section.size as usize).min(data.len());
    let last = end.checked_sub(STAGE_WORLD_THEMES_LEN)?;

    let mut off = start;
    while off < last {
        let run = &data[off..off + STAGE_WORLD_THEMES_LEN];

        // nothing before the bad byte can start a valid run
        if let Some(bad) = run.iter().rposition(|&b| b > MAX_THEME) {
            off += bad + 1;
            continue;
        }

        let tail_start = off + STAGE_WORLD_THEMES_LEN;
        let tail_end = (tail_start + SCAN_MARKER_WINDOW).min(data.len());
        if data[tail_start..tail_end].windows(SCAN_MARKER.len()).any(|w| w == SCAN_MARKER) {
            return Some(off);
        }

        off += 1;
    }

    None
}

pub fn read_stage_world_themes(data: &[u8], file_offset: u32) -> Result<Box<[u8]>, ExtractError> {
    let off = file_offset as usize;
    data.get(off..off + STAGE_WORLD_THEMES_LEN)
        .map(Box::from)
        .ok_or(ExtractError::OutOfBounds { offset: off, width: STAGE_WORLD_THEMES_LEN, len: data.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(table_at: usize, marker_gap: usize) -> (Vec<u8>, RelSection) {
        let mut data = vec![0xAAu8; 0x800];
        for i in 0..STAGE_WORLD_THEMES_LEN {
            data[table_at + i] = (i % 42) as u8;
        }
        let m = table_at + STAGE_WORLD_THEMES_LEN + marker_gap;
        data[m..m + 3].copy_from_slice(b"bg/");
        (data, RelSection { offset: 0x100, size: 0x600, flags: 0 })
    }

    #[test]
    fn preferred_offset_inside_section() {
        let (data, section) = image(0x200, 4);
        assert_eq!(locate_stage_world_themes(&data, section, Some(0x180)).unwrap(), 0x180);
    }

    #[test]
    fn falls_back_to_scan() {
        let (data, section) = image(0x200, 4);
        assert_eq!(locate_stage_world_themes(&data, section, Some(0x204E48)).unwrap(), 0x200);
        assert_eq!(locate_stage_world_themes(&data, section, None).unwrap(), 0x200);

        let themes = read_stage_world_themes(&data, 0x200).unwrap();
        assert_eq!(themes.len(), STAGE_WORLD_THEMES_LEN);
        assert_eq!(themes[43], 1);
        assert!(themes.iter().all(|&t| t <= MAX_THEME));
    }

    #[test]
    fn marker_must_be_close() {
        let (data, section) = image(0x200, 14);
        assert!(matches!(
            locate_stage_world_themes(&data, section, None),
            Err(ExtractError::TableNotFound(_))
        ));

        let (data, section) = image(0x200, 13);
        assert_eq!(locate_stage_world_themes(&data, section, None).unwrap(), 0x200);
    }

    #[test]
    fn run_must_be_complete() {
        let (mut data, section) = image(0x200, 4);
        data[0x200 + 100] = 42;
        assert!(locate_stage_world_themes(&data, section, None).is_err());
    }

    #[test]
    fn tiny_section_is_not_found() {
        let data = vec![0u8; 0x100];
        let section = RelSection { offset: 0x40, size: 0x40, flags: 0 };
        assert!(locate_stage_world_themes(&data, section, None).is_err());
    }

    #[test]
    fn short_read_fails() {
        let data = vec![0u8; 500];
        assert!(read_stage_world_themes(&data, 80).is_ok());
        assert!(matches!(read_stage_world_themes(&data, 81), Err(ExtractError::OutOfBounds { .. })));
    }
}
