use ahash::{HashMap, HashMapExt};

use crate::rel::RelSection;
use crate::ExtractError;

pub const SYM_STAGE_WORLD_THEMES: &str = "STAGE_WORLD_THEMES";
pub const SYM_BG_FILENAME_LIST: &str = "g_bg_filename_list";
pub const SYM_THEME_LIGHTS: &str = "theme_lights";

// mkb2.us.lst (NTSC)
pub const DEFAULT_SYMBOLS: &[(&str, u32)] = &[
    (SYM_STAGE_WORLD_THEMES, 0x80474F48),
    (SYM_BG_FILENAME_LIST, 0x80474D44),
    (SYM_THEME_LIGHTS, 0x80455398),
];

/// Symbol name -> absolute runtime address.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    pub symbols: HashMap<Box<str>, u32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defaults() -> Self {
        let mut symbols = HashMap::with_capacity(DEFAULT_SYMBOLS.len());
        for &(name, addr) in DEFAULT_SYMBOLS {
            symbols.insert(name.into(), addr);
        }
        Self { symbols }
    }

    /// Parses a linker listing. Lines look like `80474F48:STAGE_WORLD_THEMES`;
    /// anything else is skipped.
    pub fn from_lst(text: &str) -> Self {
        let mut symbols = HashMap::new();

        for line in text.lines() {
            if let Some((addr, name)) = parse_lst_line(line.trim()) {
                symbols.insert(name.into(), addr);
            }
        }

        Self { symbols }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.symbols.get(name).copied()
    }

    pub fn insert(&mut self, name: &str, addr: u32) {
        self.symbols.insert(name.into(), addr);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Falls back to the built in table before giving up.
    pub fn require(&self, name: &str) -> Result<u32, ExtractError> {
        if let Some(addr) = self.get(name) {
            return Ok(addr);
        }

        let addr = DEFAULT_SYMBOLS.iter()
            .find(|(n, _)| *n == name)
            .map(|(_, addr)| *addr)
            .ok_or_else(|| ExtractError::MissingSymbol(name.to_string()))?;

        log::warn!("symbol {} not supplied, using default {:08X}", name, addr);
        Ok(addr)
    }
}

fn parse_lst_line(line: &str) -> Option<(u32, &str)> {
    let (addr, rest) = line.split_once(':')?;
    if addr.len() != 8 || !addr.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let name = rest.split_whitespace().next()?;
    // the name must follow the colon directly
    if !rest.starts_with(name) {
        return None;
    }

    let addr = u32::from_str_radix(addr, 16).ok()?;
    Some((addr, name))
}

pub fn resolve_section_base(symbol_addr: u32, symbol_file_offset: u32, section: RelSection) -> u32 {
    symbol_addr.wrapping_sub(symbol_file_offset.wrapping_sub(section.offset))
}

/// Runtime addressing of one section, anchored by a symbol at a known file offset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SectionAddressing {
    pub index: usize,
    pub section: RelSection,
    pub base: u32,
}

impl SectionAddressing {
    pub fn anchored(index: usize, section: RelSection, symbol_addr: u32, symbol_file_offset: u32) -> Self {
        let base = resolve_section_base(symbol_addr, symbol_file_offset, section);
        log::debug!("section {} base {:08X} (file offset {:X})", index, base, section.offset);
        Self { index, section, base }
    }

    pub fn contains_address(&self, addr: u32) -> bool {
        addr >= self.base && addr - self.base < self.section.size
    }

    /// Offset of `addr` from the start of the section.
    pub fn section_offset_of(&self, addr: u32) -> Option<u32> {
        self.contains_address(addr).then(|| addr - self.base)
    }

    pub fn file_offset_of(&self, addr: u32) -> Option<u32> {
        self.section_offset_of(addr).map(|o| self.section.offset + o)
    }

    pub fn address_of(&self, file_offset: u32) -> u32 {
        self.base.wrapping_add(file_offset.wrapping_sub(self.section.offset))
    }
}
