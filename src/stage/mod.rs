mod themes;
pub use themes::*;

mod bg;
pub use bg::*;

mod lights;
pub use lights::*;

mod fog;
pub use fog::*;

mod names;
pub use names::*;

use crate::config::ExtractConfig;
use crate::rel::{RelFile, SectionAddressing, SYM_BG_FILENAME_LIST, SYM_STAGE_WORLD_THEMES, SYM_THEME_LIGHTS};
use crate::ExtractError;

/// Per-binary tables shared by every stage.
#[derive(Clone, Debug)]
pub struct StageTables {
    pub stage_world_themes: Box<[u8]>,
    pub bg_names: Box<[Option<String>]>,
    pub theme_lights: Box<[Option<ThemeLight>]>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct StageEnv {
    pub bg: Option<BgInfo>,
    pub fog: Option<StageFog>,
}

impl StageEnv {
    pub fn is_empty(&self) -> bool {
        self.bg.is_none() && self.fog.is_none()
    }
}

/// Fails only if the module can't be addressed or the theme table can't be found.
pub fn extract_stage_tables(rel: &RelFile, config: &ExtractConfig) -> Result<StageTables, ExtractError> {
    let section = rel.section(config.data_section)?;

    let themes_offset = locate_stage_world_themes(rel.data, section, config.stage_world_themes_offset)?;
    let themes_address = config.symbols.require(SYM_STAGE_WORLD_THEMES)?;
    let lights_address = config.symbols.require(SYM_THEME_LIGHTS)?;

    let addressing = SectionAddressing::anchored(config.data_section, section, themes_address, themes_offset);

    let stage_world_themes = read_stage_world_themes(rel.data, themes_offset)?;
    let bg_names = extract_bg_names(rel, &addressing, config.bg_names, || {
        config.symbols.require(SYM_BG_FILENAME_LIST)
    })?;
    let theme_lights = extract_theme_lights(rel.data, &addressing, lights_address);

    Ok(StageTables { stage_world_themes, bg_names, theme_lights })
}

impl StageTables {
    pub fn theme(&self, stage_id: u32) -> Option<u8> {
        self.stage_world_themes.get(stage_id as usize).copied()
    }

    /// `None` for stages outside the theme table and themes without a background.
    /// An empty name counts as no background.
    pub fn bg_info(&self, stage_id: u32) -> Option<BgInfo> {
        let theme = self.theme(stage_id)? as usize;
        let name = self.bg_names.get(theme)?.as_deref().filter(|n| !n.is_empty())?;
        let light = self.theme_lights.get(theme).and_then(|l| l.as_ref());
        Some(BgInfo::new(name, light))
    }

    pub fn stage_env(&self, stage_id: u32, compressed_stage: &[u8]) -> StageEnv {
        StageEnv {
            bg: self.bg_info(stage_id),
            fog: extract_compressed_stage_fog(compressed_stage),
        }
    }
}
