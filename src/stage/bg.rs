use glam::{Vec3, Vec4};

use crate::rel::{resolve_pointer_table, resolve_slot_strings, RelFile, SectionAddressing};
use crate::stage::ThemeLight;
use crate::ExtractError;

pub const BG_NAME_COUNT: usize = 43;

/// Theme -> background file (NTSC).
pub static BG_NAME_TABLE: [Option<&str>; BG_NAME_COUNT] = [
    None,                   // 0
    None,                   // 1
    Some("bg_jun"),
    Some("bg_wat"),
    Some("bg_nig"),
    Some("bg_sun"),
    Some("bg_spa"),
    Some("bg_snd"),
    Some("bg_ice"),
    Some("bg_stm"),
    Some("bg_bns"),
    Some("bg_pil"),
    None,                   // 12
    Some("bg_gol"),
    Some("bg_bow"),
    Some("bg_mst"),
    Some("bg_ending"),
    Some("bg_lav2"),
    Some("bg_wat2"),
    Some("bg_jun2"),
    Some("bg_par2"),
    Some("bg_pot2"),
    Some("bg_spa2"),
    Some("bg_ele2"),
    Some("bg_gea2"),
    Some("bg_bub2"),
    Some("bg_bns2"),
    Some("bg_fut2"),
    Some("bg_bow2"),
    Some("bg_tar2"),
    None,                   // 30
    None,                   // 31
    Some("bg_wha2"),
    Some("bg_gol2"),
    Some("bg_pot2"),
    Some("bg_vil2"),
    Some("bg_au_bub2"),
    Some("bg_au_par2"),
    Some("bg_au_gea2"),
    Some("bg_au_wat2"),
    Some("bg_au_tar2"),
    Some("bg_bow2"),
    None,                   // 42
];

pub const CLEAR_COLOUR: Vec4 = Vec4::ONE;

#[derive(Copy, Clone, Debug)]
pub enum BgNameSource {
    /// Used as long as it covers every theme.
    Static(&'static [Option<&'static str>]),
    /// Always read `g_bg_filename_list` out of the module.
    Live,
}

impl Default for BgNameSource {
    fn default() -> Self {
        BgNameSource::Static(&BG_NAME_TABLE)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BgInfo {
    pub file_name: Box<str>,
    pub clear_colour: Vec4,
    pub ambient_colour: Option<Vec3>,
    pub inf_light_colour: Option<Vec3>,
    pub inf_light_rotation_x: Option<i16>,
    pub inf_light_rotation_y: Option<i16>,
}

impl BgInfo {
    pub fn new(file_name: &str, light: Option<&ThemeLight>) -> Self {
        Self {
            file_name: file_name.into(),
            clear_colour: CLEAR_COLOUR,
            ambient_colour: light.map(|l| l.ambient_colour),
            inf_light_colour: light.map(|l| l.inf_light_colour),
            inf_light_rotation_x: light.map(|l| l.rotation_x),
            inf_light_rotation_y: light.map(|l| l.rotation_y),
        }
    }
}

/// `list_address` is only needed when the static table can't be used.
pub fn extract_bg_names(
    rel: &RelFile,
    addressing: &SectionAddressing,
    source: BgNameSource,
    list_address: impl FnOnce() -> Result<u32, ExtractError>,
) -> Result<Box<[Option<String>]>, ExtractError> {
    if let BgNameSource::Static(table) = source {
        if table.len() == BG_NAME_COUNT {
            return Ok(table.iter().map(|n| n.map(str::to_string)).collect());
        }
        log::warn!("static bg table has {} entries, expected {}; reading the module", table.len(), BG_NAME_COUNT);
    }

    let list_address = list_address()?;
    let list_file_offset = addressing.file_offset_of(list_address).ok_or(ExtractError::OutOfBounds {
        offset: list_address as usize,
        width: BG_NAME_COUNT * 4,
        len: addressing.section.size as usize,
    })?;

    let slots = resolve_pointer_table(
        rel.data,
        addressing,
        rel.sections.len(),
        &rel.relocations,
        list_file_offset,
        BG_NAME_COUNT,
    );
    let names = resolve_slot_strings(rel.data, &rel.sections, &slots);

    log::debug!(
        "bg names: {} of {} resolved from the module",
        names.iter().filter(|n| n.is_some()).count(),
        names.len()
    );

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rel::tests::RelBuilder;

    #[test]
    fn static_table_is_preferred() {
        let data = RelBuilder::new(6).build();
        let rel = RelFile::open(&data).unwrap();
        let addressing = SectionAddressing { index: 5, section: rel.sections[5], base: 0 };

        let names = extract_bg_names(&rel, &addressing, BgNameSource::default(), || {
            panic!("module should not be consulted")
        }).unwrap();
        assert_eq!(names.len(), BG_NAME_COUNT);
        assert_eq!(names[6].as_deref(), Some("bg_spa"));
        assert_eq!(names[12], None);
    }

    #[test]
    fn incomplete_static_table_reads_module() {
        const SHORT: &[Option<&str>] = &[None, Some("bg_jun")];
        let base = 0x80001000;

        let mut data5 = vec![0u8; BG_NAME_COUNT * 4 + 0x10];
        data5[BG_NAME_COUNT * 4..BG_NAME_COUNT * 4 + 6].copy_from_slice(b"bg_ice");
        let at = 8 * 4;
        data5[at..at + 4].copy_from_slice(&(base + BG_NAME_COUNT as u32 * 4).to_be_bytes());

        let mut b = RelBuilder::new(6);
        b.sections[5] = Some(data5);
        let data = b.build();
        let rel = RelFile::open(&data).unwrap();
        let addressing = SectionAddressing { index: 5, section: rel.sections[5], base };

        let names = extract_bg_names(&rel, &addressing, BgNameSource::Static(SHORT), || Ok(base)).unwrap();
        assert_eq!(names.len(), BG_NAME_COUNT);
        assert_eq!(names[8].as_deref(), Some("bg_ice"));
        assert_eq!(names.iter().filter(|n| n.is_some()).count(), 1);
    }

    #[test]
    fn list_outside_section_fails() {
        let mut b = RelBuilder::new(6);
        b.sections[5] = Some(vec![0u8; 0x10]);
        let data = b.build();
        let rel = RelFile::open(&data).unwrap();
        let addressing = SectionAddressing { index: 5, section: rel.sections[5], base: 0x1000 };

        let r = extract_bg_names(&rel, &addressing, BgNameSource::Live, || Ok(0x2000));
        assert!(r.is_err());
    }

    #[test]
    fn bg_info_without_light() {
        let bg = BgInfo::new("bg_snd", None);
        assert_eq!(&*bg.file_name, "bg_snd");
        assert_eq!(bg.clear_colour, Vec4::ONE);
        assert!(bg.ambient_colour.is_none() && bg.inf_light_rotation_y.is_none());
    }
}
