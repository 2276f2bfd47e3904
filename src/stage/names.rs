use ahash::{HashMap, HashMapExt};

/// `stgname/*.str`: one display name per stage id, by line.
/// Blank lines and `-` mean the stage has no name.
pub fn parse_stage_names(text: &str) -> HashMap<u32, Box<str>> {
    let mut names = HashMap::new();

    for (idx, line) in text.lines().enumerate() {
        let name = line.trim();
        if name.is_empty() || name == "-" {
            continue;
        }
        names.insert(idx as u32, name.into());
    }

    names
}

/// Stage ids from `STAGE###.lz` file names, sorted.
pub fn stage_ids_from_file_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<u32> {
    let mut ids: Vec<u32> = names.into_iter()
        .filter_map(|name| {
            let digits = name.strip_prefix("STAGE")?.strip_suffix(".lz")?;
            if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            digits.parse().ok()
        })
        .collect();

    ids.sort_unstable();
    ids.dedup();
    ids
}
