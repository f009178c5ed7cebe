// src/services/moderation.rs

//! Word-list moderation of checkin text.
//!
//! Each list is line-delimited. Every non-empty line is matched as an
//! escaped literal, case-insensitively and Unicode-aware, anywhere inside
//! any checkin field.

use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Checkin, ModerationConfig};
use crate::utils::text::strip_html;

/// Which word list to check against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Matching checkins are dropped
    Disallowed,
    /// Matching checkins hide rating and comment from the public
    Moderation,
}

/// The textual fields of a checkin that moderation looks at.
#[derive(Debug, Clone, Default)]
pub struct CheckinText<'a> {
    pub user_name: &'a str,
    pub venue_name: &'a str,
    pub location: &'a str,
    pub comment: &'a str,
    /// The comment with HTML removed, so markup cannot split a word
    pub comment_stripped: String,
    pub beer_label: &'a str,
    pub beer_name: &'a str,
}

impl<'a> CheckinText<'a> {
    pub fn from_checkin(checkin: &'a Checkin) -> Self {
        Self {
            user_name: &checkin.user.name,
            venue_name: &checkin.venue.name,
            location: &checkin.user.location,
            comment: &checkin.comment,
            comment_stripped: strip_html(&checkin.comment),
            beer_label: &checkin.beer.label,
            beer_name: &checkin.beer.name,
        }
    }

    fn fields(&self) -> [&str; 7] {
        [
            self.user_name,
            self.venue_name,
            self.location,
            self.comment,
            self.comment_stripped.as_str(),
            self.beer_label,
            self.beer_name,
        ]
    }
}

/// Compiled word lists.
#[derive(Debug, Clone)]
pub struct ContentModerator {
    disallowed: Option<RegexSet>,
    moderation: Option<RegexSet>,
}

impl ContentModerator {
    /// Compile both lists from configuration.
    pub fn new(config: &ModerationConfig) -> Result<Self> {
        Ok(Self {
            disallowed: compile(&config.disallowed)?,
            moderation: compile(&config.moderation)?,
        })
    }

    /// A moderator with no words, which never matches.
    pub fn empty() -> Self {
        Self {
            disallowed: None,
            moderation: None,
        }
    }

    /// Whether any field matches any word of the given list.
    pub fn classify(&self, kind: ListKind, text: &CheckinText<'_>) -> bool {
        let set = match kind {
            ListKind::Disallowed => &self.disallowed,
            ListKind::Moderation => &self.moderation,
        };
        let Some(set) = set else {
            return false;
        };

        text.fields().iter().any(|field| set.is_match(field))
    }
}

impl Default for ContentModerator {
    fn default() -> Self {
        Self::empty()
    }
}

/// Non-empty trimmed lines of a word list.
pub fn words(list: &str) -> Vec<&str> {
    list.lines()
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .collect()
}

fn compile(list: &str) -> Result<Option<RegexSet>> {
    let patterns: Vec<String> = words(list).into_iter().map(regex::escape).collect();
    if patterns.is_empty() {
        return Ok(None);
    }

    RegexSetBuilder::new(&patterns)
        .case_insensitive(true)
        .unicode(true)
        .build()
        .map(Some)
        .map_err(|e| AppError::config(format!("invalid moderation word: {e}")))
}

/// What a viewer may see of one checkin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Dropped from the feed entirely
    Hidden,
    /// Shown, with or without its rating and comment
    Shown { show_rating: bool },
}

impl Visibility {
    /// Combine both word lists with the viewer's capability.
    ///
    /// `show_ratings_to_admin_only` and the moderation list both hide the
    /// rating from viewers who cannot moderate; moderators always see it.
    pub fn decide(
        moderator: &ContentModerator,
        text: &CheckinText<'_>,
        show_ratings_to_admin_only: bool,
        viewer_can_moderate: bool,
    ) -> Self {
        if moderator.classify(ListKind::Disallowed, text) {
            return Self::Hidden;
        }

        let mut show_rating = !show_ratings_to_admin_only || viewer_can_moderate;
        if moderator.classify(ListKind::Moderation, text) {
            show_rating = viewer_can_moderate;
        }

        Self::Shown { show_rating }
    }
}
