//! Match adapters.
//!
//! This module provides:
//! - Template matching over a capture ([`template`])
//! - OCR line matching ([`text`])
//! - Candidate ordering and duplicate suppression ([`rank`])

pub mod rank;
pub mod template;
pub mod text;

pub use rank::{Candidate, Deduplicator, GreedyClusterDedup, SortRule};
pub use template::{load_gray, locate, locate_best};
pub use text::{filter_letters_digits_cjk, match_lines, TextQuery};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::input::ActSpec;

/// A template lookup. Also the entry type of race and alert-clearing lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PicQuery {
    /// Logical template name; the file is `<name>_<os>_<w>x<h>.{png,jpg,jpeg}`
    pub name: String,
    /// Similarity threshold; the session default when unset
    #[serde(default)]
    pub threshold: Option<f32>,
    /// Template base directory; `<root>/template_pic` when unset
    #[serde(default)]
    pub sub_path: Option<PathBuf>,
    #[serde(default)]
    pub subfolder: String,
    /// Collapse adjacent hits of the same target into one
    #[serde(default)]
    pub filter_same: bool,
    #[serde(default)]
    pub sort_rule: SortRule,
    #[serde(flatten)]
    pub act: ActSpec,
}

impl PicQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            threshold: None,
            sub_path: None,
            subfolder: String::new(),
            filter_same: false,
            sort_rule: SortRule::ScoreDesc,
            act: ActSpec::default(),
        }
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn sub_path(mut self, sub_path: impl Into<PathBuf>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    pub fn subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.subfolder = subfolder.into();
        self
    }

    pub fn filter_same(mut self, filter_same: bool) -> Self {
        self.filter_same = filter_same;
        self
    }

    pub fn sort_rule(mut self, rule: SortRule) -> Self {
        self.sort_rule = rule;
        self
    }

    pub fn act(mut self, act: ActSpec) -> Self {
        self.act = act;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use crate::input::ActMode;

    #[test]
    fn test_pic_query_from_json() {
        let json = r#"[
            {"name": "close_btn", "position": "right_top", "mode": "move_on"},
            {"name": "ok_btn", "threshold": 0.9, "subfolder": "alerts", "priority_index": 1}
        ]"#;
        let list: Vec<PicQuery> = serde_json::from_str(json).unwrap();
        assert_eq!(list[0].act.position, Position::RightTop);
        assert_eq!(list[0].act.mode, ActMode::MoveOn);
        assert_eq!(list[0].threshold, None);
        assert_eq!(list[1].threshold, Some(0.9));
        assert_eq!(list[1].subfolder, "alerts");
        assert_eq!(list[1].act.priority_index, 1);
        assert_eq!(list[1].act.mode, ActMode::LeftClick);
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let json = r#"[{"threshold": 0.9}]"#;
        assert!(serde_json::from_str::<Vec<PicQuery>>(json).is_err());
    }
}
