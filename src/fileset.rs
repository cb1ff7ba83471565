//! Resolving a profile's toggles into the files and directories it governs.

use std::path::{Path, PathBuf};

use crate::fs_utils::{child_dirs, list_files};
use crate::toggles::Toggles;

/// Wildcard segment meaning "every immediate child directory".
pub const WILDCARD: &str = "*";

/// Abstract set of governed entries, relative to a configuration root.
///
/// Wildcards are left unexpanded here; [`ResolvedFileSet::expand`] turns the
/// set into concrete files against one particular root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFileSet {
    pub files: Vec<String>,
    pub paths: Vec<String>,
    /// Patterns pruned from what `paths` entries expand to
    pub ignore: Vec<String>,
}

/// Compute the governed entries for a set of toggles.
///
/// Walks toggles in declared order and appends each enabled toggle's files and
/// directories in table order. Duplicates are kept; every consumer is
/// idempotent per entry.
pub fn resolve(toggles: &Toggles) -> ResolvedFileSet {
    let mut set = ResolvedFileSet::default();
    for key in toggles.enabled() {
        let spec = key.spec();
        set.files.extend(spec.files.iter().map(|f| f.to_string()));
        set.paths.extend(spec.paths.iter().map(|p| p.to_string()));
        set.ignore.extend(spec.ignore.iter().map(|p| p.to_string()));
    }
    set
}

impl ResolvedFileSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.paths.is_empty()
    }

    /// Concrete relative file paths this set names under `root`.
    ///
    /// Plain file entries are returned whether or not they exist so callers can
    /// report them as skipped. Wildcard entries expand to one candidate per
    /// child directory present under `root`. Directory entries expand to every
    /// file beneath them, minus those matching an ignore pattern. Order
    /// follows the set; duplicates are removed.
    pub fn expand(&self, root: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut out: Vec<PathBuf> = Vec::new();
        for pattern in &self.files {
            for rel in expand_pattern(root, pattern)? {
                push_unique(&mut out, rel);
            }
        }
        for dir in &self.paths {
            for rel in list_files(&root.join(dir))? {
                let rel = Path::new(dir).join(rel);
                if self.is_ignored(&rel) {
                    continue;
                }
                push_unique(&mut out, rel);
            }
        }
        Ok(out)
    }

    fn is_ignored(&self, rel: &Path) -> bool {
        self.ignore.iter().any(|pattern| matches_pattern(pattern, rel))
    }

    /// Union of [`ResolvedFileSet::expand`] over two roots, `first`'s order first.
    pub fn expand_both(&self, first: &Path, second: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut out = self.expand(first)?;
        for rel in self.expand(second)? {
            push_unique(&mut out, rel);
        }
        Ok(out)
    }
}

/// Segment-wise match where `*` stands for exactly one segment.
fn matches_pattern(pattern: &str, rel: &Path) -> bool {
    let mut parts = rel.iter();
    for segment in pattern.split('/') {
        match parts.next() {
            Some(part) if segment == WILDCARD || part.to_str() == Some(segment) => {}
            _ => return false,
        }
    }
    parts.next().is_none()
}

fn expand_pattern(root: &Path, pattern: &str) -> std::io::Result<Vec<PathBuf>> {
    let segments: Vec<&str> = pattern.split('/').collect();
    let Some(star) = segments.iter().position(|s| *s == WILDCARD) else {
        return Ok(vec![PathBuf::from(pattern)]);
    };

    let prefix: PathBuf = segments[..star].iter().collect();
    let suffix: PathBuf = segments[star + 1..].iter().collect();
    Ok(child_dirs(&root.join(&prefix))?
        .into_iter()
        .map(|child| prefix.join(child).join(&suffix))
        .collect())
}

fn push_unique(out: &mut Vec<PathBuf>, rel: PathBuf) {
    if !out.contains(&rel) {
        out.push(rel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toggles::ToggleKey;
    use std::fs;
    use tempfile::TempDir;

    fn toggles(keys: &[(ToggleKey, bool)]) -> Toggles {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_resolve_hotkeys_only() {
        let set = resolve(&toggles(&[(ToggleKey::Hotkeys, true), (ToggleKey::Theme, false)]));
        assert_eq!(set.files, vec!["hotkeys.json"]);
        assert!(set.paths.is_empty());
    }

    #[test]
    fn test_resolve_is_pure_in_toggles() {
        let a = toggles(&[(ToggleKey::Snippets, true), (ToggleKey::App, true)]);
        let b = toggles(&[(ToggleKey::App, true), (ToggleKey::Snippets, true), (ToggleKey::Graph, false)]);
        assert_eq!(resolve(&a), resolve(&b));
        assert_eq!(resolve(&a).files, vec!["app.json"]);
        assert_eq!(resolve(&a).paths, vec!["snippets"]);
    }

    #[test]
    fn test_resolve_nothing_enabled() {
        assert!(resolve(&Toggles::default()).is_empty());
        assert!(!resolve(&Toggles::all(true)).is_empty());
    }

    #[test]
    fn test_expand_wildcards_and_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("plugins/calendar")).unwrap();
        fs::create_dir_all(root.join("plugins/dataview")).unwrap();
        fs::create_dir_all(root.join("snippets/nested")).unwrap();
        fs::write(root.join("snippets/a.css"), "").unwrap();
        fs::write(root.join("snippets/nested/b.css"), "").unwrap();

        let set = resolve(&toggles(&[
            (ToggleKey::Snippets, true),
            (ToggleKey::Hotkeys, true),
            (ToggleKey::PluginData, true),
        ]));
        let files = set.expand(root).unwrap();

        assert_eq!(
            files,
            vec![
                PathBuf::from("hotkeys.json"),
                PathBuf::from("plugins/calendar/data.json"),
                PathBuf::from("plugins/dataview/data.json"),
                PathBuf::from("snippets/a.css"),
                PathBuf::from("snippets/nested/b.css"),
            ]
        );
    }

    #[test]
    fn test_ignore_prunes_directory_entries_only() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for file in ["manifest.json", "main.js", "data.json", "assets/icon.svg"] {
            let path = root.join("plugins/calendar").join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        fs::write(root.join("plugins/stray.json"), "").unwrap();

        let code_only = resolve(&toggles(&[(ToggleKey::CommunityPlugins, true)]));
        assert_eq!(code_only.ignore, vec!["plugins/*/data.json"]);
        assert_eq!(
            code_only.expand(root).unwrap(),
            vec![
                PathBuf::from("community-plugins.json"),
                PathBuf::from("plugins/calendar/assets/icon.svg"),
                PathBuf::from("plugins/calendar/main.js"),
                PathBuf::from("plugins/calendar/manifest.json"),
                PathBuf::from("plugins/stray.json"),
            ]
        );

        // an explicitly listed file is kept even though another toggle ignores it
        let with_data = resolve(&toggles(&[
            (ToggleKey::CommunityPlugins, true),
            (ToggleKey::PluginData, true),
        ]));
        assert!(
            with_data
                .expand(root)
                .unwrap()
                .contains(&PathBuf::from("plugins/calendar/data.json"))
        );
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("plugins/*/data.json", Path::new("plugins/x/data.json")));
        assert!(!matches_pattern("plugins/*/data.json", Path::new("plugins/x/sub/data.json")));
        assert!(!matches_pattern("plugins/*/data.json", Path::new("plugins/data.json")));
        assert!(!matches_pattern("plugins/*/data.json", Path::new("themes/x/data.json")));
    }

    #[test]
    fn test_expand_both_unions_roots() {
        let temp = TempDir::new().unwrap();
        let live = temp.path().join("live");
        let store = temp.path().join("store");
        fs::create_dir_all(live.join("plugins/only-live")).unwrap();
        fs::create_dir_all(store.join("plugins/only-store")).unwrap();

        let set = resolve(&toggles(&[(ToggleKey::PluginData, true)]));
        let files = set.expand_both(&live, &store).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("plugins/only-live/data.json"),
                PathBuf::from("plugins/only-store/data.json"),
            ]
        );
    }
}
