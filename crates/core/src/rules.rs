use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One subreddit rule as captured at snapshot time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubredditRule {
    pub index: u32,
    pub name: String,
    pub description: String,
    pub created_time: DateTime<Utc>,
}

/// The stored state for a single subreddit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    pub last_updated: DateTime<Utc>,
    pub rules: Vec<SubredditRule>,
}

pub type RuleSnapshots = BTreeMap<String, RuleSnapshot>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("could not read state file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse state file `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("could not write state file `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

impl From<StateError> for crate::errors::BotError {
    fn from(error: StateError) -> Self {
        Self::Internal(error.to_string())
    }
}

/// File-backed store for rule snapshots.
///
/// The file is rewritten atomically on each save (temp file in the same
/// directory, then rename). A missing or empty file reads as "no snapshots
/// yet".
#[derive(Clone, Debug)]
pub struct RuleStore {
    path: PathBuf,
}

impl RuleStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<RuleSnapshots, StateError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RuleSnapshots::new())
            }
            Err(source) => return Err(StateError::Read { path: self.path.clone(), source }),
        };

        if contents.trim().is_empty() {
            return Ok(RuleSnapshots::new());
        }

        serde_json::from_str(&contents)
            .map_err(|source| StateError::Parse { path: self.path.clone(), source })
    }

    pub fn save(&self, snapshots: &RuleSnapshots) -> Result<(), StateError> {
        let rendered = serde_json::to_string_pretty(snapshots).map_err(|source| {
            StateError::Parse { path: self.path.clone(), source }
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|source| StateError::Write { path: self.path.clone(), source })?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, rendered)
            .map_err(|source| StateError::Write { path: temp_path.clone(), source })?;
        fs::rename(&temp_path, &self.path)
            .map_err(|source| StateError::Write { path: self.path.clone(), source })
    }
}

/// A single observed difference between two rule lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleChange {
    Added(SubredditRule),
    Removed(SubredditRule),
    Edited { before: SubredditRule, after: SubredditRule },
}

impl RuleChange {
    /// One-line summary used in chat alerts.
    pub fn summary(&self) -> String {
        match self {
            Self::Added(rule) => format!("added rule {} `{}`", rule.index, rule.name),
            Self::Removed(rule) => format!("removed rule {} `{}`", rule.index, rule.name),
            Self::Edited { before, after } => {
                if before.name == after.name {
                    format!("edited rule {} `{}`", after.index, after.name)
                } else {
                    format!("renamed rule `{}` to `{}`", before.name, after.name)
                }
            }
        }
    }
}

/// Diffs two rule lists. Rules are matched by name; a rule whose index or
/// description changed counts as edited. Renames surface as edits when the
/// rule kept its position, otherwise as remove + add.
pub fn diff_rules(old: &[SubredditRule], new: &[SubredditRule]) -> Vec<RuleChange> {
    let mut changes = Vec::new();

    for new_rule in new {
        match old.iter().find(|rule| rule.name == new_rule.name) {
            None => {
                // Same slot, different name: treat as a rename.
                if let Some(previous) =
                    old.iter().find(|rule| rule.index == new_rule.index && !new.iter().any(|n| n.name == rule.name))
                {
                    changes.push(RuleChange::Edited {
                        before: previous.clone(),
                        after: new_rule.clone(),
                    });
                } else {
                    changes.push(RuleChange::Added(new_rule.clone()));
                }
            }
            Some(previous)
                if previous.description != new_rule.description
                    || previous.index != new_rule.index =>
            {
                changes.push(RuleChange::Edited {
                    before: previous.clone(),
                    after: new_rule.clone(),
                });
            }
            Some(_) => {}
        }
    }

    for old_rule in old {
        let survives = new.iter().any(|rule| rule.name == old_rule.name);
        let renamed = changes.iter().any(|change| {
            matches!(change, RuleChange::Edited { before, .. } if before.name == old_rule.name)
        });
        if !survives && !renamed {
            changes.push(RuleChange::Removed(old_rule.clone()));
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{diff_rules, RuleChange, RuleSnapshot, RuleSnapshots, RuleStore, SubredditRule};

    fn rule(index: u32, name: &str, description: &str) -> SubredditRule {
        SubredditRule {
            index,
            name: name.to_owned(),
            description: description.to_owned(),
            created_time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = RuleStore::open(dir.path().join("rules.json"));
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn empty_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "  \n").expect("write");
        assert!(RuleStore::open(path).load().expect("load").is_empty());
    }

    #[test]
    fn save_then_load_round_trips_and_replaces_the_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = RuleStore::open(dir.path().join("nested/rules.json"));

        let mut snapshots = RuleSnapshots::new();
        snapshots.insert(
            "TranscribersOfReddit".to_owned(),
            RuleSnapshot {
                last_updated: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
                rules: vec![rule(1, "Be nice", "No abuse.")],
            },
        );
        store.save(&snapshots).expect("save");
        assert_eq!(store.load().expect("load"), snapshots);

        // A second save must replace, not append.
        snapshots.get_mut("TranscribersOfReddit").unwrap().rules.clear();
        store.save(&snapshots).expect("second save");
        assert_eq!(store.load().expect("reload"), snapshots);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn unreadable_state_converts_to_an_internal_bot_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "{ not json").expect("write");

        let error = RuleStore::open(path).load().expect_err("parse failure");
        let bot_error: crate::errors::BotError = error.into();
        assert!(matches!(bot_error, crate::errors::BotError::Internal(_)));
        assert!(bot_error.to_string().contains("could not parse state file"));
    }

    #[test]
    fn diff_reports_added_removed_and_edited_rules() {
        let old = vec![rule(1, "Be nice", "No abuse."), rule(2, "Stay on topic", "No memes.")];
        let new = vec![
            rule(1, "Be nice", "No abuse, ever."),
            rule(2, "Format well", "Use the templates."),
        ];

        let changes = diff_rules(&old, &new);
        assert!(changes.iter().any(|change| matches!(
            change,
            RuleChange::Edited { after, .. } if after.name == "Be nice"
        )));
        // Rule 2 kept its slot but changed name: reported as a rename edit.
        assert!(changes.iter().any(|change| matches!(
            change,
            RuleChange::Edited { before, after }
                if before.name == "Stay on topic" && after.name == "Format well"
        )));
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn diff_of_identical_lists_is_empty() {
        let rules = vec![rule(1, "Be nice", "No abuse.")];
        assert!(diff_rules(&rules, &rules).is_empty());
    }

    #[test]
    fn rename_summary_mentions_both_names() {
        let change = RuleChange::Edited {
            before: rule(2, "Old name", "x"),
            after: rule(2, "New name", "x"),
        };
        assert_eq!(change.summary(), "renamed rule `Old name` to `New name`");
    }
}
