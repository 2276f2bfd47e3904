pub mod config;
pub mod lzss;
pub mod rel;
pub mod source;
pub mod stage;
pub mod stream;

use ahash::{HashMap, HashSet, HashMapExt};
use thiserror::Error;

use config::ExtractConfig;
use rel::RelFile;
use source::{RomSource, SourceError};
use stage::{extract_stage_tables, parse_stage_names, stage_ids_from_file_names, StageEnv, StageTables};

pub const MAIN_LOOP_REL: &str = "mkb2.main_loop.rel";
pub const STAGE_DIR: &str = "stage";
pub const STAGE_NAMES: &str = "stgname/usa.str";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("read of {width} bytes at {offset:#X} is past the end of a {len:#X} byte buffer")]
    OutOfBounds { offset: usize, width: usize, len: usize },

    #[error("could not locate {0}")]
    TableNotFound(&'static str),

    #[error("missing symbol {0}")]
    MissingSymbol(String),

    #[error("malformed compressed blob (source size {source_size}, destination size {destination_size})")]
    MalformedCompressedBlob { source_size: u32, destination_size: u32 },

    #[error("module has no section {0}")]
    SectionMissing(usize),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Everything extracted in one run.
#[derive(Clone, Debug)]
pub struct StageEnvSet {
    pub tables: StageTables,
    /// In the order requested.
    pub stages: Vec<(u32, StageEnv)>,
    pub stage_names: HashMap<u32, Box<str>>,
}

impl StageEnvSet {
    pub fn stage(&self, stage_id: u32) -> Option<&StageEnv> {
        self.stages.iter().find(|(id, _)| *id == stage_id).map(|(_, env)| env)
    }

    /// Background files used by at least one stage, sorted.
    pub fn referenced_bgs(&self) -> Vec<&str> {
        let mut bgs: Vec<&str> = self.stages.iter()
            .filter_map(|(_, env)| env.bg.as_ref())
            .map(|bg| &*bg.file_name)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        bgs.sort_unstable();
        bgs
    }
}

pub fn stage_file_name(stage_id: u32) -> String {
    format!("STAGE{:03}.lz", stage_id)
}

/// Fails only when the module itself can't be addressed. A stage with bad
/// data just ends up without fog.
pub fn extract_stage_env<'a>(
    rel_data: &[u8],
    config: &ExtractConfig,
    stages: impl IntoIterator<Item = (u32, &'a [u8])>,
) -> Result<StageEnvSet, ExtractError> {
    let rel = RelFile::open(rel_data)?;
    let tables = extract_stage_tables(&rel, config)?;

    let stages = stages.into_iter()
        .map(|(id, compressed)| (id, tables.stage_env(id, compressed)))
        .collect();

    Ok(StageEnvSet { tables, stages, stage_names: HashMap::new() })
}

pub fn list_stage_ids(source: &impl RomSource) -> Result<Vec<u32>, ExtractError> {
    let names = source.list_files(STAGE_DIR)?;
    Ok(stage_ids_from_file_names(names.iter().map(|s| s.as_str())))
}

/// Reads everything from a disc. With a non-empty `requested`, only those stages that
/// exist are extracted; an empty list extracts every stage.
pub fn load_stage_env(
    source: &mut impl RomSource,
    config: &ExtractConfig,
    requested: Option<&[u32]>,
) -> Result<StageEnvSet, ExtractError> {
    let requested = requested.filter(|ids| !ids.is_empty());
    let rel_data = source.read_file(MAIN_LOOP_REL)?;

    let available = list_stage_ids(&*source)?;
    let stage_ids = match requested {
        Some(requested) => {
            let missing: Vec<u32> = requested.iter().copied().filter(|id| !available.contains(id)).collect();
            if !missing.is_empty() {
                log::warn!("requested stages not on disc: {:?}", missing);
            }
            let mut ids: Vec<u32> = requested.iter().copied().filter(|id| available.contains(id)).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        }
        None => available,
    };

    let mut blobs = Vec::with_capacity(stage_ids.len());
    for &id in stage_ids.iter() {
        let path = format!("{}/{}", STAGE_DIR, stage_file_name(id));
        let blob = source.try_read_file(&path)?.unwrap_or_else(|| {
            log::warn!("missing file: {}", path);
            Vec::new()
        });
        blobs.push((id, blob));
    }

    let mut set = extract_stage_env(
        &rel_data,
        config,
        blobs.iter().map(|(id, blob)| (*id, blob.as_slice())),
    )?;

    match source.try_read_file(STAGE_NAMES)? {
        Some(text) => {
            let names = parse_stage_names(&String::from_utf8_lossy(&text));
            set.stage_names = match requested {
                Some(_) => names.into_iter().filter(|(id, _)| stage_ids.contains(id)).collect(),
                None => names,
            };
        }
        None => log::warn!("missing file: {}", STAGE_NAMES),
    }

    if set.referenced_bgs().is_empty() {
        log::warn!("no backgrounds referenced from stage env data");
    }

    Ok(set)
}
