use crate::rel::SymbolTable;
use crate::stage::{BgNameSource, DEFAULT_STAGE_WORLD_THEMES_FILE_OFFSET};

/// Section of `mkb2.main_loop.rel` holding the stage tables.
pub const DEFAULT_DATA_SECTION: usize = 5;

/// Fixed for the length of an extraction run.
#[derive(Clone, Debug)]
pub struct ExtractConfig {
    pub symbols: SymbolTable,
    /// Tried before scanning the data section.
    pub stage_world_themes_offset: Option<u32>,
    pub data_section: usize,
    pub bg_names: BgNameSource,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            symbols: SymbolTable::defaults(),
            stage_world_themes_offset: Some(DEFAULT_STAGE_WORLD_THEMES_FILE_OFFSET),
            data_section: DEFAULT_DATA_SECTION,
            bg_names: BgNameSource::default(),
        }
    }
}

impl ExtractConfig {
    /// Symbols missing from `symbols` still fall back to the defaults.
    pub fn with_symbols(symbols: SymbolTable) -> Self {
        Self { symbols, ..Self::default() }
    }

    /// Reads symbols from a linker listing when one is available.
    pub fn from_lst(lst: Option<&str>) -> Self {
        match lst {
            Some(text) => Self::with_symbols(SymbolTable::from_lst(text)),
            None => {
                log::warn!("no symbol listing, using default symbol addresses");
                Self::default()
            }
        }
    }
}
