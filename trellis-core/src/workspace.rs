//! Transactional file workspace.
//!
//! Generated files are staged in nested transaction frames and only reach the
//! disk when the outermost frame commits. Committing a nested frame merges its
//! changes into the parent; rolling back discards them.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use eyre::{Result, bail, eyre};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::file::{File, WriteResult};

#[derive(Debug, Default)]
struct Frame {
    label: String,
    writes: IndexMap<PathBuf, File>,
    deletes: IndexSet<PathBuf>,
}

impl Frame {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    fn merge(&mut self, child: Frame) {
        for path in child.deletes {
            self.writes.shift_remove(&path);
            self.deletes.insert(path);
        }
        for (path, file) in child.writes {
            self.deletes.shift_remove(&path);
            self.writes.insert(path, file);
        }
    }
}

/// Files touched by the outermost commit of a workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileManifest {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl FileManifest {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.skipped.is_empty() && self.deleted.is_empty()
    }
}

/// A directory that generated files are staged against.
///
/// All methods take `&self`; the frame stack lives behind a mutex so the
/// workspace can be shared through a pipeline context.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    dry_run: bool,
    frames: Mutex<Vec<Frame>>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
            frames: Mutex::new(Vec::new()),
        }
    }

    /// A workspace whose outermost commit reports what it would write
    /// without touching the disk.
    pub fn dry_run(root: impl Into<PathBuf>) -> Self {
        Self {
            dry_run: true,
            ..Self::new(root)
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn frames(&self) -> MutexGuard<'_, Vec<Frame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of open transaction frames.
    pub fn depth(&self) -> usize {
        self.frames().len()
    }

    /// Open a new transaction frame.
    pub fn begin(&self, label: &str) {
        tracing::debug!(label, "workspace transaction started");
        self.frames().push(Frame::new(label));
    }

    /// Stage a file in the innermost frame.
    pub fn write(&self, file: File) -> Result<()> {
        let mut frames = self.frames();
        let Some(frame) = frames.last_mut() else {
            bail!(
                "cannot stage {} outside of a workspace transaction",
                file.path().display()
            );
        };
        let path = file.path().to_path_buf();
        frame.deletes.shift_remove(&path);
        frame.writes.insert(path, file);
        Ok(())
    }

    /// Stage the removal of a file in the innermost frame.
    pub fn delete(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let mut frames = self.frames();
        let Some(frame) = frames.last_mut() else {
            bail!(
                "cannot delete {} outside of a workspace transaction",
                path.display()
            );
        };
        frame.writes.shift_remove(&path);
        frame.deletes.insert(path);
        Ok(())
    }

    /// Read a file, seeing staged changes before the disk.
    pub fn read(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = path.as_ref();
        {
            let frames = self.frames();
            for frame in frames.iter().rev() {
                if let Some(file) = frame.writes.get(path) {
                    return Some(file.render());
                }
                if frame.deletes.contains(path) {
                    return None;
                }
            }
        }
        std::fs::read_to_string(self.root.join(path)).ok()
    }

    /// Paths with staged writes across all open frames, in staging order.
    pub fn staged(&self) -> Vec<PathBuf> {
        let frames = self.frames();
        let mut merged = Frame::default();
        for frame in frames.iter() {
            merged.merge(Frame {
                label: String::new(),
                writes: frame.writes.clone(),
                deletes: frame.deletes.clone(),
            });
        }
        merged.writes.into_keys().collect()
    }

    /// Commit the innermost frame, which must carry `label`.
    ///
    /// A nested frame is merged into its parent and yields an empty manifest.
    /// The outermost frame is flushed to disk.
    pub fn commit(&self, label: &str) -> Result<FileManifest> {
        let frame = self.pop(label)?;
        let mut frames = self.frames();
        if let Some(parent) = frames.last_mut() {
            parent.merge(frame);
            tracing::debug!(label, "workspace transaction merged into parent");
            return Ok(FileManifest::default());
        }
        drop(frames);
        self.flush(frame)
    }

    /// Discard the innermost frame, which must carry `label`.
    pub fn rollback(&self, label: &str) -> Result<()> {
        let frame = self.pop(label)?;
        tracing::debug!(
            label,
            discarded = frame.writes.len() + frame.deletes.len(),
            "workspace transaction rolled back"
        );
        Ok(())
    }

    fn pop(&self, label: &str) -> Result<Frame> {
        let mut frames = self.frames();
        match frames.last() {
            None => Err(eyre!("no open workspace transaction for {label:?}")),
            Some(frame) if frame.label != label => Err(eyre!(
                "workspace transaction {label:?} is not the innermost frame ({:?} is)",
                frame.label
            )),
            Some(_) => frames.pop().ok_or_else(|| eyre!("workspace frame vanished")),
        }
    }

    fn flush(&self, frame: Frame) -> Result<FileManifest> {
        let mut manifest = FileManifest::default();
        for path in frame.deletes {
            let target = self.root.join(&path);
            if !target.exists() {
                continue;
            }
            if !self.dry_run {
                std::fs::remove_file(&target)?;
            }
            manifest.deleted.push(path);
        }
        for (path, file) in frame.writes {
            let result = if self.dry_run {
                if file.rules().overwrite == crate::Overwrite::IfMissing
                    && self.root.join(&path).exists()
                {
                    WriteResult::Skipped
                } else {
                    WriteResult::Written
                }
            } else {
                file.write(&self.root)?
            };
            match result {
                WriteResult::Written => manifest.written.push(path),
                WriteResult::Skipped => manifest.skipped.push(path),
            }
        }
        tracing::debug!(
            written = manifest.written.len(),
            skipped = manifest.skipped.len(),
            deleted = manifest.deleted.len(),
            dry_run = self.dry_run,
            "workspace flushed"
        );
        Ok(manifest)
    }
}
