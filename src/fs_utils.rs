//! Filesystem utility functions
//!
//! Path primitives shared by the sync engine and the registry: validity
//! checks, directory creation, timestamp-preserving copies and tree listings.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Reject paths that contain an empty segment.
///
/// A single leading separator (the filesystem root) and a single trailing
/// separator are allowed. The empty string and a doubled separator anywhere
/// are an [`Error::InvalidPath`]. This runs before any syscall so a malformed
/// path never reaches the filesystem.
pub fn check_path(path: &Path) -> Result<()> {
    let raw = path.to_string_lossy();
    let rest = raw.strip_prefix(std::path::is_separator).unwrap_or(&raw);
    if !raw.is_empty() && rest.is_empty() {
        return Ok(());
    }

    let rest = rest.strip_suffix(std::path::is_separator).unwrap_or(rest);
    if rest.split(std::path::is_separator).any(str::is_empty) {
        return Err(Error::InvalidPath(path.to_path_buf()));
    }
    Ok(())
}

/// Make sure a directory exists, creating parents as needed.
///
/// Returns an error rather than retrying when creation fails.
pub fn ensure_dir(path: &Path) -> Result<()> {
    check_path(path)?;
    if !path.is_dir() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Copy `src` over `dst`, creating `dst`'s parent and stamping `dst` with
/// the modification time of `src`.
pub fn copy_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    let modified = fs::metadata(src)?.modified()?;
    open_for_stamp(dst)?.set_modified(modified)
}

/// Open a file so its timestamps can be set. `fs::copy` has already given
/// `path` the source's permissions, which may be read-only.
#[cfg(unix)]
fn open_for_stamp(path: &Path) -> std::io::Result<File> {
    File::open(path)
}

#[cfg(windows)]
fn open_for_stamp(path: &Path) -> std::io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;
    // FILE_WRITE_ATTRIBUTES
    File::options().access_mode(0x0100).open(path)
}

#[cfg(not(any(unix, windows)))]
fn open_for_stamp(path: &Path) -> std::io::Result<File> {
    File::options().write(true).open(path)
}

/// List every regular file beneath `dir`, as paths relative to `dir`.
///
/// Returns an empty list when `dir` does not exist. Symbolic links are not
/// followed.
pub fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if dir.is_dir() {
        collect_files(dir, Path::new(""), &mut out)?;
    }
    out.sort();
    Ok(out)
}

fn collect_files(dir: &Path, prefix: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let rel = prefix.join(entry.file_name());
        if file_type.is_dir() {
            collect_files(&entry.path(), &rel, out)?;
        } else if file_type.is_file() {
            out.push(rel);
        }
    }
    Ok(())
}

/// Names of the immediate child directories of `dir`, sorted.
pub fn child_dirs(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    if !dir.is_dir() {
        return Ok(names);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Recursively calculate the total size of a directory in bytes
///
/// Symbolic links are not followed.
pub fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            total += metadata.len();
        } else if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_check_path() {
        assert!(check_path(Path::new("/tmp/profiles/work")).is_ok());
        assert!(check_path(Path::new("relative/dir")).is_ok());
        assert!(check_path(Path::new("/")).is_ok());
        assert!(check_path(Path::new("/tmp/profiles/")).is_ok());
        assert!(check_path(&Path::new("vault/.obsidian").join("")).is_ok());

        assert!(matches!(check_path(Path::new("")), Err(Error::InvalidPath(_))));
        assert!(check_path(Path::new("/tmp//work")).is_err());
        assert!(check_path(Path::new("/tmp/profiles//")).is_err());
        assert!(check_path(Path::new("//")).is_err());
    }

    #[test]
    fn test_ensure_dir_creates_parents() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b/c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // second call is a no-op
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn test_copy_file_preserves_mtime() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.json");
        let dst = temp.path().join("deep/dir/dst.json");
        fs::write(&src, "{}").unwrap();
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        File::options().write(true).open(&src).unwrap().set_modified(stamp).unwrap();

        copy_file(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(&dst).unwrap(), "{}");
        assert_eq!(fs::metadata(&dst).unwrap().modified().unwrap(), stamp);
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_file_from_read_only_source() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let src = temp.path().join("theme.css");
        let dst = temp.path().join("copy/theme.css");
        fs::write(&src, "body {}").unwrap();
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_650_000_000);
        File::options().write(true).open(&src).unwrap().set_modified(stamp).unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o444)).unwrap();

        copy_file(&src, &dst).unwrap();

        let meta = fs::metadata(&dst).unwrap();
        assert!(meta.permissions().readonly());
        assert_eq!(meta.modified().unwrap(), stamp);
        assert_eq!(fs::read_to_string(&dst).unwrap(), "body {}");
    }

    #[test]
    fn test_list_files_and_child_dirs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("plugins/alpha")).unwrap();
        fs::create_dir_all(root.join("plugins/beta/sub")).unwrap();
        fs::write(root.join("plugins/alpha/data.json"), "{}").unwrap();
        fs::write(root.join("plugins/beta/sub/x.css"), "").unwrap();

        let files = list_files(&root.join("plugins")).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("alpha/data.json"),
                PathBuf::from("beta/sub/x.css")
            ]
        );
        assert_eq!(child_dirs(&root.join("plugins")).unwrap(), vec!["alpha", "beta"]);
        assert!(list_files(&root.join("missing")).unwrap().is_empty());
    }
}
