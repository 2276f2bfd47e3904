use glam::Vec3;

use crate::rel::SectionAddressing;
use crate::stream::{read_f32_be, read_i16_be};
use crate::ExtractError;

pub const THEME_LIGHT_COUNT: usize = 41;
pub const THEME_LIGHT_SIZE: usize = 0x48;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThemeLight {
    pub ambient_colour: Vec3,
    pub inf_light_colour: Vec3,
    pub rotation_x: i16,
    pub rotation_y: i16,
}

// 16 floats, then two s16 rotations. Only the ambient (floats 1..4) and
// infinite light (floats 13..16) colours are read.
fn read_theme_light(data: &[u8], off: usize) -> Result<ThemeLight, ExtractError> {
    let vec3 = |at: usize| -> Result<Vec3, ExtractError> {
        Ok(Vec3::new(
            read_f32_be(data, off + at)?,
            read_f32_be(data, off + at + 4)?,
            read_f32_be(data, off + at + 8)?,
        ))
    };

    Ok(ThemeLight {
        ambient_colour: vec3(0x04)?,
        inf_light_colour: vec3(0x34)?,
        rotation_x: read_i16_be(data, off + 0x40)?,
        rotation_y: read_i16_be(data, off + 0x42)?,
    })
}

/// One entry per theme; records that can't be read are `None`.
pub fn extract_theme_lights(data: &[u8], addressing: &SectionAddressing, lights_address: u32) -> Box<[Option<ThemeLight>]> {
    let Some(file_offset) = addressing.file_offset_of(lights_address) else {
        log::warn!("theme_lights {:08X} is outside section {}", lights_address, addressing.index);
        return vec![None; THEME_LIGHT_COUNT].into_boxed_slice();
    };

    (0..THEME_LIGHT_COUNT)
        .map(|i| {
            let off = file_offset as usize + i * THEME_LIGHT_SIZE;
            read_theme_light(data, off)
                .map_err(|e| log::warn!("theme light {}: {}", i, e))
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rel::RelSection;

    fn record(seed: f32, rot: (i16, i16)) -> Vec<u8> {
        let mut v = Vec::with_capacity(THEME_LIGHT_SIZE);
        for i in 0..16 {
            v.extend_from_slice(&(seed + i as f32).to_be_bytes());
        }
        v.extend_from_slice(&rot.0.to_be_bytes());
        v.extend_from_slice(&rot.1.to_be_bytes());
        v.resize(THEME_LIGHT_SIZE, 0);
        v
    }

    #[test]
    fn reads_documented_fields() {
        let mut data = vec![0u8; 0x20];
        for i in 0..THEME_LIGHT_COUNT {
            data.extend(record(i as f32 * 100.0, (i as i16, -(i as i16) - 1)));
        }
        let section = RelSection { offset: 0x20, size: data.len() as u32 - 0x20, flags: 0 };
        let addressing = SectionAddressing { index: 5, section, base: 0x80000000 };

        let lights = extract_theme_lights(&data, &addressing, 0x80000000);
        assert_eq!(lights.len(), THEME_LIGHT_COUNT);

        let l = lights[3].unwrap();
        assert_eq!(l.ambient_colour, Vec3::new(301.0, 302.0, 303.0));
        assert_eq!(l.inf_light_colour, Vec3::new(313.0, 314.0, 315.0));
        assert_eq!((l.rotation_x, l.rotation_y), (3, -4));
    }

    #[test]
    fn truncated_table_keeps_readable_records() {
        let mut data = Vec::new();
        for i in 0..10 {
            data.extend(record(i as f32, (0, 0)));
        }
        // cuts into the last record's rotation
        data.truncate(data.len() - 5);
        let section = RelSection { offset: 0, size: 0x10000, flags: 0 };
        let addressing = SectionAddressing { index: 5, section, base: 0x80000000 };

        let lights = extract_theme_lights(&data, &addressing, 0x80000000);
        assert!(lights[..9].iter().all(|l| l.is_some()));
        assert!(lights[9..].iter().all(|l| l.is_none()));
    }

    #[test]
    fn address_outside_section() {
        let data = vec![0u8; 0x100];
        let section = RelSection { offset: 0, size: 0x100, flags: 0 };
        let addressing = SectionAddressing { index: 5, section, base: 0x80000000 };

        let lights = extract_theme_lights(&data, &addressing, 0x7FFFFFF0);
        assert_eq!(lights.len(), THEME_LIGHT_COUNT);
        assert!(lights.iter().all(|l| l.is_none()));
    }
}
