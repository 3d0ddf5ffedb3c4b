//! Content flagging settings and the per-team feature status check.
//!
//! Settings are read from a JSON file at startup; absent keys fall back to
//! the defaults below (everything off).

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Reviewer assignment for one team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamReviewerSetting {
    pub enabled: bool,
    pub reviewer_ids: Vec<String>,
}

/// Who reviews flagged posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewerSettings {
    /// One reviewer list shared by every team.
    pub common_reviewers: bool,
    pub common_reviewer_ids: Vec<String>,
    /// Per-team reviewer lists, used when common reviewers are off.
    pub team_reviewers_setting: HashMap<String, TeamReviewerSetting>,
    /// Additional reviewers on top of the configured lists.
    pub team_admins_as_reviewers: bool,
    pub system_admins_as_reviewers: bool,
}

impl ReviewerSettings {
    fn has_additional_reviewers(&self) -> bool {
        self.team_admins_as_reviewers || self.system_admins_as_reviewers
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentFlaggingSettings {
    /// Admin-facing switch.
    pub enable_content_flagging: bool,
    /// Release gate; both switches must be on.
    pub feature_flag: bool,
    pub reviewer_settings: ReviewerSettings,
}

impl ContentFlaggingSettings {
    /// Reads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading content flagging settings from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing content flagging settings in {}", path.display()))
    }

    /// Whether members of `team_id` can flag posts, i.e. whether someone
    /// would be there to review a flag.
    #[must_use]
    pub fn team_post_flagging_enabled(&self, team_id: &str) -> bool {
        if !(self.enable_content_flagging && self.feature_flag) {
            return false;
        }

        let reviewers = &self.reviewer_settings;
        if reviewers.common_reviewers {
            return !reviewers.common_reviewer_ids.is_empty()
                || reviewers.has_additional_reviewers();
        }

        match reviewers.team_reviewers_setting.get(team_id) {
            Some(team) if team.enabled => {
                !team.reviewer_ids.is_empty() || reviewers.has_additional_reviewers()
            }
            _ => false,
        }
    }
}
