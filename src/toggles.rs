//! The toggle table: which configuration artifacts each profile toggle governs.
//!
//! The table is fixed at compile time. [`ToggleKey::ALL`] is the declared
//! order every resolver walks; it never depends on map or struct iteration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Key that marks a profile as enabled in older settings documents.
///
/// The active flag lives on the profile record, never among its toggles, so
/// this key is dropped whenever toggles are read.
pub const RESERVED_KEY: &str = "enabled";

/// A boolean switch on a profile that enables one group of files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToggleKey {
    App,
    Appearance,
    Theme,
    Snippets,
    Hotkeys,
    CorePlugins,
    CommunityPlugins,
    PluginData,
    Graph,
    Bookmarks,
}

/// Files and directories governed by one toggle, relative to a config root.
///
/// A file entry may contain one `*` segment standing for every immediate
/// child directory at that level. `ignore` patterns (same `*` syntax) prune
/// files that a directory entry would otherwise sweep in; they never remove
/// an explicitly listed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSpec {
    pub files: &'static [&'static str],
    pub paths: &'static [&'static str],
    pub ignore: &'static [&'static str],
}

impl ToggleKey {
    /// Every toggle, in declared order.
    pub const ALL: [ToggleKey; 10] = [
        ToggleKey::App,
        ToggleKey::Appearance,
        ToggleKey::Theme,
        ToggleKey::Snippets,
        ToggleKey::Hotkeys,
        ToggleKey::CorePlugins,
        ToggleKey::CommunityPlugins,
        ToggleKey::PluginData,
        ToggleKey::Graph,
        ToggleKey::Bookmarks,
    ];

    /// The files and directories this toggle governs.
    pub fn spec(&self) -> FileSpec {
        match self {
            ToggleKey::App => FileSpec {
                files: &["app.json"],
                paths: &[],
                ignore: &[],
            },
            ToggleKey::Appearance => FileSpec {
                files: &["appearance.json"],
                paths: &[],
                ignore: &[],
            },
            ToggleKey::Theme => FileSpec {
                files: &[],
                paths: &["themes"],
                ignore: &[],
            },
            ToggleKey::Snippets => FileSpec {
                files: &[],
                paths: &["snippets"],
                ignore: &[],
            },
            ToggleKey::Hotkeys => FileSpec {
                files: &["hotkeys.json"],
                paths: &[],
                ignore: &[],
            },
            ToggleKey::CorePlugins => FileSpec {
                files: &["core-plugins.json", "core-plugins-migration.json"],
                paths: &[],
                ignore: &[],
            },
            ToggleKey::CommunityPlugins => FileSpec {
                files: &["community-plugins.json"],
                paths: &["plugins"],
                ignore: &["plugins/*/data.json"],
            },
            ToggleKey::PluginData => FileSpec {
                files: &["plugins/*/data.json"],
                paths: &[],
                ignore: &[],
            },
            ToggleKey::Graph => FileSpec {
                files: &["graph.json"],
                paths: &[],
                ignore: &[],
            },
            ToggleKey::Bookmarks => FileSpec {
                files: &["bookmarks.json"],
                paths: &[],
                ignore: &[],
            },
        }
    }

    /// Identifier used in the settings document and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleKey::App => "app",
            ToggleKey::Appearance => "appearance",
            ToggleKey::Theme => "theme",
            ToggleKey::Snippets => "snippets",
            ToggleKey::Hotkeys => "hotkeys",
            ToggleKey::CorePlugins => "corePlugins",
            ToggleKey::CommunityPlugins => "communityPlugins",
            ToggleKey::PluginData => "pluginData",
            ToggleKey::Graph => "graph",
            ToggleKey::Bookmarks => "bookmarks",
        }
    }

    /// Get human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            ToggleKey::App => "Editor settings (app.json)",
            ToggleKey::Appearance => "Appearance (appearance.json)",
            ToggleKey::Theme => "Themes (themes/)",
            ToggleKey::Snippets => "CSS snippets (snippets/)",
            ToggleKey::Hotkeys => "Hotkeys (hotkeys.json)",
            ToggleKey::CorePlugins => "Core plugins (core-plugins.json)",
            ToggleKey::CommunityPlugins => "Community plugins (plugins/, without data.json)",
            ToggleKey::PluginData => "Plugin data (plugins/*/data.json)",
            ToggleKey::Graph => "Graph view (graph.json)",
            ToggleKey::Bookmarks => "Bookmarks (bookmarks.json)",
        }
    }
}

impl fmt::Display for ToggleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToggleKey {
    type Err = String;

    /// Parse a key, ignoring case and `-`/`_` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        ToggleKey::ALL
            .into_iter()
            .find(|k| k.as_str().to_ascii_lowercase() == folded)
            .ok_or_else(|| format!("Unknown toggle: {}", s))
    }
}

/// A profile's toggle values.
///
/// Absent keys read as `false`. Serialized as a flat `{ key: bool }` object;
/// unknown keys and [`RESERVED_KEY`] are dropped on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct Toggles(BTreeMap<ToggleKey, bool>);

impl Toggles {
    /// Toggles with every key set to `value`.
    pub fn all(value: bool) -> Self {
        Self(ToggleKey::ALL.into_iter().map(|k| (k, value)).collect())
    }

    pub fn get(&self, key: ToggleKey) -> bool {
        self.0.get(&key).copied().unwrap_or(false)
    }

    pub fn set(&mut self, key: ToggleKey, value: bool) {
        self.0.insert(key, value);
    }

    /// Enabled keys, in declared order.
    pub fn enabled(&self) -> impl Iterator<Item = ToggleKey> + '_ {
        ToggleKey::ALL.into_iter().filter(|k| self.get(*k))
    }
}

impl FromIterator<(ToggleKey, bool)> for Toggles {
    fn from_iter<I: IntoIterator<Item = (ToggleKey, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, bool>> for Toggles {
    fn from(raw: BTreeMap<String, bool>) -> Self {
        let mut toggles = Toggles::default();
        for (key, value) in raw {
            if key == RESERVED_KEY {
                continue;
            }
            match key.parse::<ToggleKey>() {
                Ok(k) => toggles.set(k, value),
                Err(_) => tracing::warn!("Ignoring unknown toggle '{}'", key),
            }
        }
        toggles
    }
}

impl From<Toggles> for BTreeMap<String, bool> {
    fn from(toggles: Toggles) -> Self {
        toggles
            .0
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_order_is_complete() {
        let mut sorted = ToggleKey::ALL.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ToggleKey::ALL.len());
    }

    #[test]
    fn test_toggle_from_str() {
        assert_eq!("hotkeys".parse::<ToggleKey>(), Ok(ToggleKey::Hotkeys));
        assert_eq!("HOTKEYS".parse::<ToggleKey>(), Ok(ToggleKey::Hotkeys));
        assert_eq!("core-plugins".parse::<ToggleKey>(), Ok(ToggleKey::CorePlugins));
        assert_eq!("pluginData".parse::<ToggleKey>(), Ok(ToggleKey::PluginData));
        assert_eq!("plugin_data".parse::<ToggleKey>(), Ok(ToggleKey::PluginData));
        assert!("enabled".parse::<ToggleKey>().is_err());
        assert!("invalid".parse::<ToggleKey>().is_err());
    }

    #[test]
    fn test_wildcards_only_in_files() {
        for key in ToggleKey::ALL {
            let spec = key.spec();
            for pattern in spec.files {
                assert!(pattern.split('/').filter(|s| *s == "*").count() <= 1);
            }
            assert!(spec.paths.iter().all(|p| !p.contains('*')));
            // an ignore pattern only makes sense under one of its own directories
            for pattern in spec.ignore {
                assert!(spec.paths.iter().any(|dir| pattern.starts_with(&format!("{dir}/"))));
            }
        }
    }

    #[test]
    fn test_toggles_drop_reserved_and_unknown_keys() {
        let json = r#"{"enabled": true, "hotkeys": true, "theme": false, "bogus": true}"#;
        let toggles: Toggles = serde_json::from_str(json).unwrap();

        assert!(toggles.get(ToggleKey::Hotkeys));
        assert!(!toggles.get(ToggleKey::Theme));
        assert_eq!(toggles.enabled().collect::<Vec<_>>(), vec![ToggleKey::Hotkeys]);

        let back = serde_json::to_value(&toggles).unwrap();
        assert!(back.get(RESERVED_KEY).is_none());
        assert_eq!(back["hotkeys"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_enabled_follows_declared_order() {
        let toggles: Toggles = [
            (ToggleKey::Bookmarks, true),
            (ToggleKey::App, true),
            (ToggleKey::Hotkeys, true),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            toggles.enabled().collect::<Vec<_>>(),
            vec![ToggleKey::App, ToggleKey::Hotkeys, ToggleKey::Bookmarks]
        );
    }
}
