//! File synchronization between the live configuration root and profile storage.
//!
//! Batch operations ([`copy_overwrite`], [`reconcile_newest`]) check their
//! roots up front and fail before touching any file when a root is unusable.
//! Once iterating they never abort: each file's outcome lands in a
//! [`SyncReport`]. Tree operations ([`mirror_tree`], [`remove_tree`]) stop at
//! the first error.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fileset::ResolvedFileSet;
use crate::fs_utils::{check_path, copy_file, ensure_dir};

/// Which side wins when both copies carry the same modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    Source,
    Target,
}

/// Tie policy used by [`reconcile_newest`].
pub const TIE_BREAK: TieBreak = TieBreak::Source;

/// A file that could not be stat'ed or copied during a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFault {
    /// Path relative to the roots of the batch
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a batch copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files copied from source to target
    pub copied: usize,
    /// Files copied from target back to source (newest-wins only)
    pub copied_back: usize,
    /// Governed files absent on the side being read
    pub skipped: Vec<PathBuf>,
    pub faults: Vec<FileFault>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    /// Turn faults into [`Error::PerFileFailure`].
    pub fn into_result(self) -> Result<Self> {
        if self.faults.is_empty() {
            Ok(self)
        } else {
            Err(Error::PerFileFailure(self.faults))
        }
    }

    fn fault(&mut self, rel: &Path, err: impl std::fmt::Display) {
        warn!("Failed to sync {}: {}", rel.display(), err);
        self.faults.push(FileFault {
            path: rel.to_path_buf(),
            reason: err.to_string(),
        });
    }

    fn skip(&mut self, rel: &Path) {
        debug!("Skipping {} (not present)", rel.display());
        self.skipped.push(rel.to_path_buf());
    }
}

fn check_roots(source_root: &Path, target_root: &Path) -> Result<()> {
    check_path(source_root)?;
    check_path(target_root)?;
    if !source_root.is_dir() {
        return Err(Error::SourceMissing(source_root.to_path_buf()));
    }
    ensure_dir(target_root)
}

/// Copy every governed file from `source_root` over `target_root`.
///
/// Wildcards are expanded against `source_root`. Files absent in the source
/// are skipped; a failed copy is recorded as a fault and the batch continues.
pub fn copy_overwrite(
    source_root: &Path,
    target_root: &Path,
    file_set: &ResolvedFileSet,
) -> Result<SyncReport> {
    check_roots(source_root, target_root)?;

    let mut report = SyncReport::default();
    for rel in file_set.expand(source_root)? {
        let src = source_root.join(&rel);
        if !src.is_file() {
            report.skip(&rel);
            continue;
        }
        match copy_file(&src, &target_root.join(&rel)) {
            Ok(()) => report.copied += 1,
            Err(e) => report.fault(&rel, e),
        }
    }

    info!(
        "Copied {} file(s) {} -> {} ({} skipped, {} failed)",
        report.copied,
        source_root.display(),
        target_root.display(),
        report.skipped.len(),
        report.faults.len()
    );
    Ok(report)
}

/// Two-way newest-wins merge of the governed files, using [`TIE_BREAK`].
pub fn reconcile_newest(
    source_root: &Path,
    target_root: &Path,
    file_set: &ResolvedFileSet,
) -> Result<SyncReport> {
    reconcile_newest_with(source_root, target_root, file_set, TIE_BREAK)
}

/// Two-way newest-wins merge of the governed files.
///
/// Entries are expanded against both roots. A file present on one side only
/// is copied to the other; when both exist, the side with the later
/// modification time overwrites the other, and `tie` decides equal times.
pub fn reconcile_newest_with(
    source_root: &Path,
    target_root: &Path,
    file_set: &ResolvedFileSet,
    tie: TieBreak,
) -> Result<SyncReport> {
    check_roots(source_root, target_root)?;

    let mut report = SyncReport::default();
    for rel in file_set.expand_both(source_root, target_root)? {
        let src = source_root.join(&rel);
        let dst = target_root.join(&rel);

        let forward = match (src.is_file(), dst.is_file()) {
            (false, false) => {
                report.skip(&rel);
                continue;
            }
            (true, false) => true,
            (false, true) => false,
            (true, true) => match newer_side(&src, &dst, tie) {
                Ok(forward) => forward,
                Err(e) => {
                    report.fault(&rel, e);
                    continue;
                }
            },
        };

        let copied = if forward {
            copy_file(&src, &dst)
        } else {
            copy_file(&dst, &src)
        };
        match copied {
            Ok(()) if forward => report.copied += 1,
            Ok(()) => report.copied_back += 1,
            Err(e) => report.fault(&rel, e),
        }
    }

    info!(
        "Reconciled {} <-> {}: {} forward, {} back, {} failed",
        source_root.display(),
        target_root.display(),
        report.copied,
        report.copied_back,
        report.faults.len()
    );
    Ok(report)
}

/// `true` when `src` should overwrite `dst`.
fn newer_side(src: &Path, dst: &Path, tie: TieBreak) -> std::io::Result<bool> {
    let src_time = fs::metadata(src)?.modified()?;
    let dst_time = fs::metadata(dst)?.modified()?;
    Ok(match src_time.cmp(&dst_time) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => tie == TieBreak::Source,
    })
}

/// Recursively copy a whole directory tree, overwriting existing files.
///
/// Fails if either path is malformed or `source_root` does not exist. An error
/// part way through leaves what was already copied in place. Returns the
/// number of files copied.
pub fn mirror_tree(source_root: &Path, target_root: &Path) -> Result<usize> {
    check_path(source_root)?;
    check_path(target_root)?;
    if !source_root.is_dir() {
        return Err(Error::SourceMissing(source_root.to_path_buf()));
    }
    if target_root.starts_with(source_root) {
        return Err(Error::InvalidPath(target_root.to_path_buf()));
    }

    let copied = mirror_dir(source_root, target_root)?;
    info!(
        "Mirrored {} file(s) {} -> {}",
        copied,
        source_root.display(),
        target_root.display()
    );
    Ok(copied)
}

fn mirror_dir(src: &Path, dst: &Path) -> Result<usize> {
    fs::create_dir_all(dst)?;

    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copied += mirror_dir(&src_path, &dst_path)?;
        } else {
            copy_file(&src_path, &dst_path)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Delete a directory tree: files first, then directories bottom-up.
///
/// No-op when `root` does not exist. The first failure aborts and is
/// returned. Returns the number of files removed.
pub fn remove_tree(root: &Path) -> Result<usize> {
    check_path(root)?;
    if !root.exists() {
        debug!("Nothing to remove at {}", root.display());
        return Ok(0);
    }

    let removed = remove_dir(root)?;
    info!("Removed {} file(s) under {}", removed, root.display());
    Ok(removed)
}

fn remove_dir(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            removed += remove_dir(&entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    fs::remove_dir(dir)?;
    Ok(removed)
}
