use glam::Vec3;

use crate::lzss;
use crate::stream::{read_f32_be, read_i32_be, read_ptr_be, read_u32_be};
use crate::ExtractError;

// offsets into a decompressed STAGE###.lz
pub const STAGE_FOG_ANIM_PTR: usize = 0xB0;
pub const STAGE_FOG_PTR: usize = 0xBC;

pub const KEYFRAME_SIZE: usize = 0x14;
pub const FOG_SIZE: usize = 0x18;
pub const FOG_ANIM_SIZE: usize = 0x28;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Keyframe {
    /// Stored as an integer easing code.
    pub easing: f32,
    pub time: f32,
    pub value: f32,
    pub tangent_in: f32,
    pub tangent_out: f32,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct FogAnimation {
    pub start: Option<Box<[Keyframe]>>,
    pub end: Option<Box<[Keyframe]>>,
    pub red: Option<Box<[Keyframe]>>,
    pub green: Option<Box<[Keyframe]>>,
    pub blue: Option<Box<[Keyframe]>>,
}

impl FogAnimation {
    pub fn channels(&self) -> [&Option<Box<[Keyframe]>>; 5] {
        [&self.start, &self.end, &self.red, &self.green, &self.blue]
    }

    pub fn is_empty(&self) -> bool {
        self.channels().iter().all(|c| c.is_none())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StageFog {
    pub kind: u32,
    pub start: f32,
    pub end: f32,
    pub colour: Vec3,
    pub animation: Option<FogAnimation>,
}

fn read_keyframe(data: &[u8], off: usize) -> Result<Keyframe, ExtractError> {
    Ok(Keyframe {
        easing: read_i32_be(data, off)? as f32,
        time: read_f32_be(data, off + 0x04)?,
        value: read_f32_be(data, off + 0x08)?,
        tangent_in: read_f32_be(data, off + 0x0C)?,
        tangent_out: read_f32_be(data, off + 0x10)?,
    })
}

/// A zero count or null pointer is an absent channel, never an empty one.
fn read_keyframes(data: &[u8], ptr: Option<usize>, count: u32) -> Option<Box<[Keyframe]>> {
    let ptr = ptr?;
    if count == 0 {
        return None;
    }

    // garbage counts would otherwise allocate before the first failed read
    let size = (count as usize).checked_mul(KEYFRAME_SIZE)?;
    if ptr.checked_add(size)? > data.len() {
        log::warn!("fog keyframes at {:X} (x{}) run past the stage data", ptr, count);
        return None;
    }

    (0..count as usize)
        .map(|i| read_keyframe(data, ptr + i * KEYFRAME_SIZE))
        .collect::<Result<Box<[Keyframe]>, _>>()
        .ok()
}

/// Five `(count, pointer)` pairs: start, end, r, g, b.
pub fn read_fog_animation(data: &[u8], off: usize) -> Result<FogAnimation, ExtractError> {
    let mut channels: [Option<Box<[Keyframe]>>; 5] = Default::default();

    for (i, channel) in channels.iter_mut().enumerate() {
        let at = off + i * 8;
        let count = read_u32_be(data, at)?;
        let ptr = read_ptr_be(data, at + 4);
        *channel = read_keyframes(data, ptr, count);
    }

    let [start, end, red, green, blue] = channels;
    Ok(FogAnimation { start, end, red, green, blue })
}

pub fn read_stage_fog(data: &[u8], fog_off: usize, anim_off: Option<usize>) -> Result<StageFog, ExtractError> {
    let animation = match anim_off {
        Some(off) => read_fog_animation(data, off)
            .map_err(|e| log::warn!("fog animation: {}", e))
            .ok()
            .filter(|a| !a.is_empty()),
        None => None,
    };

    Ok(StageFog {
        kind: read_u32_be(data, fog_off)?,
        start: read_f32_be(data, fog_off + 0x04)?,
        end: read_f32_be(data, fog_off + 0x08)?,
        colour: Vec3::new(
            read_f32_be(data, fog_off + 0x0C)?,
            read_f32_be(data, fog_off + 0x10)?,
            read_f32_be(data, fog_off + 0x14)?,
        ),
        animation,
    })
}

/// Fog of a decompressed stage header. `None` when the stage has none or it can't be read.
pub fn extract_stage_fog(stage: &[u8]) -> Option<StageFog> {
    let anim_off = read_ptr_be(stage, STAGE_FOG_ANIM_PTR);
    let fog_off = read_ptr_be(stage, STAGE_FOG_PTR)?;

    read_stage_fog(stage, fog_off, anim_off)
        .map_err(|e| log::warn!("stage fog at {:X}: {}", fog_off, e))
        .ok()
}

/// Decompresses a `STAGE###.lz` and reads its fog.
pub fn extract_compressed_stage_fog(compressed: &[u8]) -> Option<StageFog> {
    let stage = lzss::decompress(compressed);
    if stage.is_empty() {
        return None;
    }
    extract_stage_fog(&stage)
}
