//! Stage store: owns the stage folders and the artifact index.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::models::{parse_segment_stem, MediaArtifact, SegmentMetadata, Stage};

/// Per-stage view of what exists on disk.
#[derive(Debug, Default, Clone)]
struct StageIndex {
    /// Stems of artifact files matching the stage's kind.
    stems: HashSet<String>,
    /// Source logical names that have a committed segment sidecar.
    sidecars: HashSet<String>,
}

/// Directory-addressed store of pipeline stages.
///
/// All occupancy questions are answered from an in-memory index built by
/// [`refresh`](StageStore::refresh) at run start and updated by every write
/// that goes through the store. Stage directories self-heal; only an
/// unusable root is an error.
pub struct StageStore {
    root: PathBuf,
    index: RwLock<HashMap<Stage, StageIndex>>,
    claims: Arc<Mutex<HashSet<String>>>,
}

impl StageStore {
    /// Open a store at `root`, creating the root and every stage folder,
    /// then index what is already there.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let store = Self {
            root: root.into(),
            index: RwLock::new(HashMap::new()),
            claims: Arc::new(Mutex::new(HashSet::new())),
        };
        store.ensure_layout()?;
        store.refresh()?;
        Ok(store)
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one stage.
    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.root.join(stage.dir_name())
    }

    /// Create the root and any missing stage directories.
    pub fn ensure_layout(&self) -> io::Result<()> {
        for stage in Stage::all() {
            fs::create_dir_all(self.stage_dir(*stage))?;
        }
        Ok(())
    }

    /// Rebuild the index from disk.
    pub fn refresh(&self) -> io::Result<()> {
        let mut fresh: HashMap<Stage, StageIndex> = HashMap::new();

        for stage in Stage::all() {
            let dir = self.stage_dir(*stage);
            let mut entry = StageIndex::default();

            if dir.is_dir() {
                for dirent in fs::read_dir(&dir)? {
                    let path = dirent?.path();
                    if !path.is_file() {
                        continue;
                    }
                    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                        continue;
                    };
                    if let Some(source) = name.strip_suffix(".meta.json") {
                        entry.sidecars.insert(source.to_string());
                    } else if let Some(artifact) = MediaArtifact::from_stage_file(&path, *stage) {
                        entry.stems.insert(artifact.logical_name);
                    }
                }
            }

            fresh.insert(*stage, entry);
        }

        *self.index.write() = fresh;
        Ok(())
    }

    /// List the artifacts of a stage, sorted by file name.
    ///
    /// Files whose extension does not match the stage's kind (and segment
    /// sidecars) are ignored.
    pub fn list_artifacts(&self, stage: Stage) -> io::Result<Vec<MediaArtifact>> {
        let dir = self.stage_dir(stage);
        let mut artifacts = Vec::new();

        if dir.is_dir() {
            for dirent in fs::read_dir(&dir)? {
                let path = dirent?.path();
                if !path.is_file() {
                    continue;
                }
                if let Some(artifact) = MediaArtifact::from_stage_file(&path, stage) {
                    artifacts.push(artifact);
                }
            }
        }

        artifacts.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(artifacts)
    }

    /// Segment files of one source in a split stage, ordered by segment
    /// index (the zero-padded part suffix sorts with the path).
    pub fn list_segments(&self, stage: Stage, logical: &str) -> io::Result<Vec<MediaArtifact>> {
        let mut segments = self.list_artifacts(stage)?;
        segments.retain(|artifact| {
            parse_segment_stem(&artifact.logical_name)
                .map(|(source, _)| source == logical)
                .unwrap_or(false)
        });
        Ok(segments)
    }

    /// Whether a stage already holds an artifact with this stem.
    pub fn has_output(&self, stage: Stage, name: &str) -> bool {
        self.index
            .read()
            .get(&stage)
            .map(|e| e.stems.contains(name))
            .unwrap_or(false)
    }

    /// Whether a split stage holds the committed sidecar for a source.
    pub fn has_sidecar(&self, stage: Stage, logical: &str) -> bool {
        self.index
            .read()
            .get(&stage)
            .map(|e| e.sidecars.contains(logical))
            .unwrap_or(false)
    }

    /// Number of indexed artifacts in a stage.
    pub fn count(&self, stage: Stage) -> usize {
        self.index
            .read()
            .get(&stage)
            .map(|e| e.stems.len())
            .unwrap_or(0)
    }

    /// Indexed stems of a stage, sorted.
    pub fn names(&self, stage: Stage) -> Vec<String> {
        let mut names: Vec<String> = self
            .index
            .read()
            .get(&stage)
            .map(|e| e.stems.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Record a write that went past the store (external tool output).
    pub fn record_output(&self, stage: Stage, name: &str) {
        self.index
            .write()
            .entry(stage)
            .or_default()
            .stems
            .insert(name.to_string());
    }

    /// Record a committed segment sidecar.
    pub fn record_sidecar(&self, stage: Stage, logical: &str) {
        self.index
            .write()
            .entry(stage)
            .or_default()
            .sidecars
            .insert(logical.to_string());
    }

    /// Classify a freshly written file the same way `refresh` would.
    fn index_file(&self, stage: Stage, file_name: &str) {
        if let Some(logical) = file_name.strip_suffix(".meta.json") {
            self.record_sidecar(stage, logical);
        } else if let Some(stem) = Path::new(file_name).file_stem().and_then(|s| s.to_str()) {
            self.record_output(stage, stem);
        }
    }

    /// Claim exclusivity on a logical name.
    ///
    /// Returns `None` while another worker holds the claim; the returned
    /// guard releases it on drop.
    pub fn claim(&self, logical: &str) -> Option<ClaimGuard> {
        let mut claims = self.claims.lock();
        if !claims.insert(logical.to_string()) {
            return None;
        }
        Some(ClaimGuard {
            claims: Arc::clone(&self.claims),
            name: logical.to_string(),
        })
    }

    /// Write bytes into a stage atomically (temp file + rename) and index
    /// the new artifact.
    pub fn write_bytes(
        &self,
        stage: Stage,
        file_name: &str,
        bytes: &[u8],
    ) -> io::Result<PathBuf> {
        let dir = self.stage_dir(stage);
        fs::create_dir_all(&dir)?;
        let path = dir.join(file_name);

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        self.index_file(stage, file_name);
        tracing::debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Serialize a value as pretty JSON into a stage atomically.
    pub fn write_json<T: Serialize>(
        &self,
        stage: Stage,
        file_name: &str,
        value: &T,
    ) -> io::Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        self.write_bytes(stage, file_name, json.as_bytes())
    }

    /// Move a finished file (typically tool output from the scratch dir)
    /// into a stage and index it. Falls back to copy + remove when a plain
    /// rename is not possible.
    pub fn adopt_file(&self, stage: Stage, src: &Path, file_name: &str) -> io::Result<PathBuf> {
        let dir = self.stage_dir(stage);
        fs::create_dir_all(&dir)?;
        let dest = dir.join(file_name);

        if fs::rename(src, &dest).is_err() {
            fs::copy(src, &dest)?;
            fs::remove_file(src)?;
        }

        self.index_file(stage, file_name);
        tracing::debug!("Adopted {} into {}", file_name, stage);
        Ok(dest)
    }

    /// Remove a source's segment files and sidecar from a split stage,
    /// used before redoing a split under overwrite.
    pub fn clear_segments(&self, stage: Stage, logical: &str) -> io::Result<()> {
        let dir = self.stage_dir(stage);
        if !dir.is_dir() {
            return Ok(());
        }

        for dirent in fs::read_dir(&dir)? {
            let path = dirent?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let matches = if name == SegmentMetadata::file_name(logical) {
                true
            } else {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(parse_segment_stem)
                    .map(|(source, _)| source == logical)
                    .unwrap_or(false)
            };
            if matches {
                fs::remove_file(&path)?;
            }
        }

        let mut index = self.index.write();
        if let Some(entry) = index.get_mut(&stage) {
            entry.sidecars.remove(logical);
            entry
                .stems
                .retain(|stem| parse_segment_stem(stem).map(|(s, _)| s != logical).unwrap_or(true));
        }
        Ok(())
    }
}

/// Exclusivity guard for one logical name, released on drop.
pub struct ClaimGuard {
    claims: Arc<Mutex<HashSet<String>>>,
    name: String,
}

impl ClaimGuard {
    /// The claimed logical name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.claims.lock().remove(&self.name);
    }
}
