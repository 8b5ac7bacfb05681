use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use walkdir::WalkDir;

const DEFAULT_PRIORITY: i64 = 9999;
const DEFAULT_RESOLUTION: i64 = 2000;
const DEFAULT_NAME: &str = "default";

/// One `metadata.json` file, as read from disk. Every field is
/// optional so the overlay in [`MetadataRegistry::effective_for`] can
/// tell "unset" apart from "explicitly zero".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryMetadata {
    pub priority: Option<i64>,
    pub name: Option<String>,
    pub resolution: Option<i64>,
    pub date: Option<String>,
    pub dynamic_priority: Option<i64>,
}

impl DirectoryMetadata {
    fn overlay(&mut self, other: &DirectoryMetadata) {
        if other.priority.is_some() {
            self.priority = other.priority;
        }
        if other.name.is_some() {
            self.name = other.name.clone();
        }
        if other.resolution.is_some() {
            self.resolution = other.resolution;
        }
        if other.date.is_some() {
            self.date = other.date.clone();
        }
        if other.dynamic_priority.is_some() {
            self.dynamic_priority = other.dynamic_priority;
        }
    }
}

/// The resolved, per-directory metadata record: every field defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveMetadata {
    pub priority: i64,
    pub name: String,
    pub resolution: i64,
    pub date: Option<NaiveDate>,
    pub dynamic_priority: Option<i64>,
}

impl EffectiveMetadata {
    fn defaults(dir: &Path, data_root: &Path) -> Self {
        let name = if dir == data_root {
            DEFAULT_NAME.to_string()
        } else {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_NAME.to_string())
        };

        Self {
            priority: DEFAULT_PRIORITY,
            name,
            resolution: DEFAULT_RESOLUTION,
            date: None,
            dynamic_priority: None,
        }
    }

    fn apply(&mut self, raw: &DirectoryMetadata) {
        if let Some(p) = raw.priority {
            self.priority = p;
        }
        if let Some(n) = &raw.name {
            self.name = n.clone();
        }
        if let Some(r) = raw.resolution {
            self.resolution = r;
        }
        if let Some(d) = &raw.date {
            self.date = match NaiveDate::parse_from_str(d, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    log::warn!("malformed metadata date '{d}', ignoring");
                    None
                }
            };
        }
        if raw.dynamic_priority.is_some() {
            self.dynamic_priority = raw.dynamic_priority;
        }
    }

    /// `age_in_months = round((today - date) / 30.4375)`. A missing or
    /// unparsable date is treated as 360 months (30 years), matching
    /// the original implementation's default.
    fn age_in_months(&self, today: NaiveDate) -> i64 {
        match self.date {
            Some(date) => {
                let delta_days = (today - date).num_days() as f64;
                (delta_days / 30.4375).round() as i64
            }
            None => 360,
        }
    }

    /// The dynamic priority formula from the original Python
    /// implementation. Returns `base_priority` unchanged when
    /// `dynamic_priority` is absent, regardless of date/resolution.
    pub fn final_priority(&self, today: NaiveDate) -> i64 {
        let Some(dynamic_priority) = self.dynamic_priority else {
            return self.priority;
        };

        let age = self.age_in_months(today);
        self.priority - (1000 - self.resolution) - (360 - age) - dynamic_priority
    }
}

/// Per-directory effective metadata, built once at startup by walking
/// the data root and overlaying ancestor `metadata.json` files
/// nearest-wins.
pub struct MetadataRegistry {
    data_root: PathBuf,
    effective: HashMap<PathBuf, EffectiveMetadata>,
}

impl MetadataRegistry {
    pub fn build(data_root: &Path) -> Self {
        let raw = Self::collect_raw(data_root);
        let mut effective = HashMap::new();

        for dir in raw.keys() {
            let record = Self::resolve(dir, data_root, &raw);
            effective.insert(dir.clone(), record);
        }

        effective
            .entry(data_root.to_path_buf())
            .or_insert_with(|| EffectiveMetadata::defaults(data_root, data_root));

        Self {
            data_root: data_root.to_path_buf(),
            effective,
        }
    }

    /// `true` if no `metadata.json` exists anywhere under the data
    /// root — the engine then runs in the non-priority, nearest-tile
    /// mode (mirrors the original's `check_for_priority_mode`).
    pub fn has_any_metadata(data_root: &Path) -> bool {
        WalkDir::new(data_root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name() == "metadata.json")
    }

    fn collect_raw(data_root: &Path) -> HashMap<PathBuf, DirectoryMetadata> {
        let mut raw = HashMap::new();

        for entry in WalkDir::new(data_root).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            if entry.file_name() != "metadata.json" {
                continue;
            }
            let dir = entry.path().parent().unwrap_or(data_root).to_path_buf();
            match std::fs::read_to_string(entry.path()) {
                Ok(contents) => match serde_json::from_str::<DirectoryMetadata>(&contents) {
                    Ok(meta) => {
                        raw.insert(dir, meta);
                    }
                    Err(e) => log::warn!("failed to parse {}: {e}", entry.path().display()),
                },
                Err(e) => log::warn!("failed to read {}: {e}", entry.path().display()),
            }
        }

        raw
    }

    /// Walks from `dir` up to `data_root`, collecting every ancestor
    /// present in `raw`, and overlays them farthest-to-nearest so the
    /// directory's own metadata wins over its ancestors'.
    fn resolve(dir: &Path, data_root: &Path, raw: &HashMap<PathBuf, DirectoryMetadata>) -> EffectiveMetadata {
        let mut chain = Vec::new();
        let mut cursor = Some(dir.to_path_buf());
        while let Some(current) = cursor {
            if let Some(m) = raw.get(&current) {
                chain.push(m.clone());
            }
            if current == data_root {
                break;
            }
            cursor = current.parent().map(|p| p.to_path_buf());
        }

        let mut merged = DirectoryMetadata::default();
        for ancestor in chain.into_iter().rev() {
            merged.overlay(&ancestor);
        }

        let mut effective = EffectiveMetadata::defaults(dir, data_root);
        effective.apply(&merged);
        effective
    }

    /// Returns the effective metadata for the directory that owns
    /// `tile_path`, walking upward to the first directory present in
    /// the registry. Idempotent: repeated calls on the same path
    /// return byte-identical (here, field-identical) records.
    pub fn metadata_for(&self, tile_path: &Path) -> EffectiveMetadata {
        let mut cursor = tile_path.parent().map(|p| p.to_path_buf());
        while let Some(dir) = cursor {
            if let Some(m) = self.effective.get(&dir) {
                return m.clone();
            }
            if dir == self.data_root {
                break;
            }
            cursor = dir.parent().map(|p| p.to_path_buf());
        }

        self.effective
            .get(&self.data_root)
            .cloned()
            .unwrap_or_else(|| EffectiveMetadata::defaults(&self.data_root, &self.data_root))
    }
}
