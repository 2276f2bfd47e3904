use thiserror::Error;
use ahash::{HashMap, HashMapExt};
use std::io::{self, Read, Seek, SeekFrom};
use std::fs::File;
use std::path::PathBuf;

use crate::stream::{read_cstring, read_u32_be};

const OFFSET_FST_OFFSET: u64 = 0x424;
const FST_ENTRY_SIZE: usize = 0xC;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid disc image")]
    InvalidImage,

    #[error("io error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for SourceError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => SourceError::FileNotFound(e.to_string()),
            io::ErrorKind::UnexpectedEof => SourceError::InvalidImage,
            _ => SourceError::Io(e),
        }
    }
}

/// Where game files come from. Paths are `/`-separated and relative to the disc root,
/// e.g. `stage/STAGE001.lz`.
pub trait RomSource {
    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, SourceError>;

    /// Names of the files directly inside `dir`.
    fn list_files(&self, dir: &str) -> Result<Vec<String>, SourceError>;

    fn try_read_file(&mut self, path: &str) -> Result<Option<Vec<u8>>, SourceError> {
        match self.read_file(path) {
            Ok(data) => Ok(Some(data)),
            Err(SourceError::FileNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// An extracted disc.
#[derive(Debug, Clone)]
pub struct RomDir {
    pub root: PathBuf,
}

impl RomDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RomSource for RomDir {
    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, SourceError> {
        std::fs::read(self.root.join(path)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SourceError::FileNotFound(path.to_string()),
            _ => SourceError::Io(e),
        })
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>, SourceError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.root.join(dir))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FileLocation {
    pub start_offset: u64,
    pub size: usize,
}

/// A GameCube disc image, read through its file system table.
#[derive(Debug)]
pub struct IsoRom<R = File> {
    pub iso: R,
    pub files: HashMap<Box<str>, FileLocation>,
}

impl IsoRom<File> {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let path = path.into();
        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SourceError::FileNotFound(path.display().to_string()),
            _ => SourceError::Io(e),
        })?;
        Self::new(file)
    }
}

impl<R: Read + Seek> IsoRom<R> {
    pub fn new(mut iso: R) -> Result<Self, SourceError> {
        iso.seek(SeekFrom::Start(OFFSET_FST_OFFSET))?;
        let mut buf = [0u8; 8];
        iso.read_exact(&mut buf)?;
        let fst_offset = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64;
        let fst_size = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;

        let image_len = iso.seek(SeekFrom::End(0))?;
        if fst_offset + fst_size as u64 > image_len {
            return Err(SourceError::InvalidImage);
        }

        iso.seek(SeekFrom::Start(fst_offset))?;
        let mut fst = vec![0u8; fst_size];
        iso.read_exact(&mut fst)?;

        let files = parse_fst(&fst)?;
        log::debug!("disc: {} files", files.len());

        Ok(Self { iso, files })
    }

    pub fn find_file(&self, path: &str) -> Option<FileLocation> {
        self.files.get(path).copied()
    }
}

impl<R: Read + Seek> RomSource for IsoRom<R> {
    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, SourceError> {
        let loc = self.find_file(path).ok_or_else(|| SourceError::FileNotFound(path.to_string()))?;
        self.iso.seek(SeekFrom::Start(loc.start_offset))?;
        let mut buf = vec![0; loc.size];
        self.iso.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn list_files(&self, dir: &str) -> Result<Vec<String>, SourceError> {
        let dir = dir.trim_matches('/');
        Ok(self.files.keys()
            .filter_map(|path| {
                let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
                (parent == dir).then(|| name.to_string())
            })
            .collect())
    }
}

// Entry: flags (1 byte), name offset (3 bytes), then
//   file: data offset, size
//   dir:  parent index, index one past the last entry in the dir
fn parse_fst(fst: &[u8]) -> Result<HashMap<Box<str>, FileLocation>, SourceError> {
    let invalid = |_| SourceError::InvalidImage;

    let entry_count = read_u32_be(fst, 8).map_err(invalid)? as usize;
    let string_table = entry_count.checked_mul(FST_ENTRY_SIZE)
        .filter(|&end| end <= fst.len())
        .ok_or(SourceError::InvalidImage)?;

    let mut files = HashMap::with_capacity(entry_count);
    // (end index, path prefix) of the directories being walked
    let mut dirs: Vec<(usize, String)> = Vec::new();

    for i in 1..entry_count {
        while dirs.last().is_some_and(|(end, _)| *end <= i) {
            dirs.pop();
        }
        let prefix = dirs.last().map(|(_, p)| p.as_str()).unwrap_or("");

        let at = i * FST_ENTRY_SIZE;
        let word = read_u32_be(fst, at).map_err(invalid)?;
        let is_dir = word >> 24 == 1;
        let name_offset = (word & 0x00FF_FFFF) as usize;
        let name = read_cstring(fst, string_table + name_offset).map_err(invalid)?;

        let a = read_u32_be(fst, at + 4).map_err(invalid)?;
        let b = read_u32_be(fst, at + 8).map_err(invalid)?;

        let path = format!("{}{}", prefix, name);
        if is_dir {
            dirs.push((b as usize, path + "/"));
        } else {
            files.insert(path.into_boxed_str(), FileLocation { start_offset: a as u64, size: b as usize });
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // root/
    //   mkb2.main_loop.rel
    //   stage/
    //     STAGE001.lz
    //     STAGE002.lz
    //   stgname/
    //     usa.str
    fn disc() -> Vec<u8> {
        let names = ["mkb2.main_loop.rel", "stage", "STAGE001.lz", "STAGE002.lz", "stgname", "usa.str"];
        let mut strings = Vec::new();
        let mut name_offsets = Vec::new();
        for n in names {
            name_offsets.push(strings.len() as u32);
            strings.extend_from_slice(n.as_bytes());
            strings.push(0);
        }

        // (is_dir, name, a, b)
        let entries: [(bool, u32, u32, u32); 7] = [
            (true, 0, 0, 7),
            (false, name_offsets[0], 0x800, 4),
            (true, name_offsets[1], 0, 5),
            (false, name_offsets[2], 0x810, 3),
            (false, name_offsets[3], 0x820, 2),
            (true, name_offsets[4], 0, 7),
            (false, name_offsets[5], 0x830, 5),
        ];

        let mut fst = Vec::new();
        for (is_dir, name, a, b) in entries {
            fst.extend_from_slice(&(((is_dir as u32) << 24) | name).to_be_bytes());
            fst.extend_from_slice(&a.to_be_bytes());
            fst.extend_from_slice(&b.to_be_bytes());
        }
        fst.extend_from_slice(&strings);

        let mut iso = vec![0u8; 0x900];
        iso[0x424..0x428].copy_from_slice(&0x500u32.to_be_bytes());
        iso[0x428..0x42C].copy_from_slice(&(fst.len() as u32).to_be_bytes());
        iso[0x500..0x500 + fst.len()].copy_from_slice(&fst);
        iso[0x800..0x804].copy_from_slice(b"REL!");
        iso[0x810..0x813].copy_from_slice(b"one");
        iso[0x820..0x822].copy_from_slice(b"tw");
        iso[0x830..0x834].copy_from_slice(b"-\nA\n");
        iso
    }

    #[test]
    fn walks_directories() {
        let mut rom = IsoRom::new(Cursor::new(disc())).unwrap();
        assert_eq!(rom.files.len(), 4);
        assert_eq!(rom.read_file("mkb2.main_loop.rel").unwrap(), b"REL!");
        assert_eq!(rom.read_file("stage/STAGE001.lz").unwrap(), b"one");
        assert_eq!(rom.read_file("stgname/usa.str").unwrap(), b"-\nA\n\0");
        assert!(matches!(rom.read_file("STAGE001.lz"), Err(SourceError::FileNotFound(_))));
        assert_eq!(rom.try_read_file("stage/STAGE003.lz").unwrap(), None);

        let mut stages = rom.list_files("stage").unwrap();
        stages.sort();
        assert_eq!(stages, vec!["STAGE001.lz", "STAGE002.lz"]);
        assert_eq!(rom.list_files("").unwrap().len(), 1);
    }

    #[test]
    fn truncated_image_is_invalid() {
        let mut iso = disc();
        iso.truncate(0x510);
        assert!(matches!(IsoRom::new(Cursor::new(iso)), Err(SourceError::InvalidImage)));
    }

    #[test]
    fn oversized_fst_is_invalid() {
        let mut iso = disc();
        iso[0x428..0x42C].copy_from_slice(&0xFFFF_FFF0u32.to_be_bytes());
        assert!(matches!(IsoRom::new(Cursor::new(iso)), Err(SourceError::InvalidImage)));

        let mut iso = disc();
        iso[0x424..0x428].copy_from_slice(&0x8F0u32.to_be_bytes());
        assert!(matches!(IsoRom::new(Cursor::new(iso)), Err(SourceError::InvalidImage)));
    }
}
