//! OCR text matching adapter.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::rank::{sort_regions, SortRule};
use crate::geometry::{MatchResult, Payload, Region};
use crate::input::ActSpec;
use crate::ocr::OcrLine;

/// Everything except ASCII letters, digits and CJK unified ideographs.
const SPECIAL_CHARS_PATTERN: &str = r"[^A-Za-z0-9\x{4E00}-\x{9FA5}]";

/// A text lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextQuery {
    pub text: String,
    /// Require the recognized line to equal `text` instead of containing it
    #[serde(default)]
    pub exact: bool,
    /// Strip everything but letters, digits and CJK before comparing
    #[serde(default)]
    pub filter_special_chars: bool,
    #[serde(default)]
    pub sort_rule: SortRule,
    #[serde(flatten)]
    pub act: ActSpec,
}

impl TextQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exact: false,
            filter_special_chars: false,
            sort_rule: SortRule::ScoreDesc,
            act: ActSpec::default(),
        }
    }

    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn filter_special_chars(mut self, filter: bool) -> Self {
        self.filter_special_chars = filter;
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

/// Keeps only ASCII letters, digits and CJK ideographs.
pub fn filter_letters_digits_cjk(text: &str) -> Result<String> {
    let re = Regex::new(SPECIAL_CHARS_PATTERN)?;
    Ok(re.replace_all(text, "").into_owned())
}

/// Selects the OCR lines matching `query`, in recognition order.
///
/// When filtering is on, the stored region text is the filtered text.
pub fn match_lines(lines: &[OcrLine], query: &TextQuery) -> Result<MatchResult> {
    let special = if query.filter_special_chars {
        Some(Regex::new(SPECIAL_CHARS_PATTERN)?)
    } else {
        None
    };

    let mut regions = Vec::new();
    for line in lines {
        let text = match &special {
            Some(re) => re.replace_all(&line.text, "").into_owned(),
            None => line.text.clone(),
        };
        let hit = if query.exact {
            text == query.text
        } else {
            text.contains(&query.text)
        };
        if hit {
            regions.push(Region::from_quad(&line.quad, Payload::Text(text)));
        }
    }

    sort_regions(&mut regions, query.sort_rule);
    Ok(MatchResult::new(regions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn line(x: f64, y: f64, text: &str) -> OcrLine {
        OcrLine::from_box(Point::new(x, y), Point::new(x + 40.0, y + 10.0), text)
    }

    #[test]
    fn test_filter_letters_digits_cjk() {
        assert_eq!(filter_letters_digits_cjk("发送 (Send)! #2").unwrap(), "发送Send2");
        assert_eq!(filter_letters_digits_cjk("…—·").unwrap(), "");
    }

    #[test]
    fn test_substring_vs_exact() {
        let lines = vec![line(0.0, 0.0, "12abc34"), line(0.0, 20.0, "2abc3"), line(0.0, 40.0, "abc34")];

        let loose = match_lines(&lines, &TextQuery::new("2abc3")).unwrap();
        let texts: Vec<&str> = loose.regions.iter().filter_map(|r| r.text()).collect();
        assert_eq!(texts, vec!["12abc34", "2abc3"]);

        let exact = match_lines(&lines, &TextQuery::new("2abc3").exact(true)).unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact.regions[0].center(), Point::new(20.0, 25.0));
    }

    #[test]
    fn test_filter_before_compare() {
        let lines = vec![line(0.0, 0.0, "消息: 已读")];
        assert!(!match_lines(&lines, &TextQuery::new("消息已读")).unwrap().found());

        let filtered = match_lines(&lines, &TextQuery::new("消息已读").filter_special_chars(true)).unwrap();
        assert_eq!(filtered.regions[0].text(), Some("消息已读"));
    }

    #[test]
    fn test_reading_order() {
        let lines = vec![line(100.0, 50.0, "ok"), line(10.0, 50.0, "ok"), line(300.0, 5.0, "ok")];
        let result = match_lines(&lines, &TextQuery::new("ok").sort_rule(SortRule::ReadingOrder)).unwrap();
        let xs: Vec<f64> = result
            .regions
            .iter()
            .map(|r| r.point(crate::geometry::Position::LeftTop).x)
            .collect();
        assert_eq!(xs, vec![300.0, 10.0, 100.0]);
    }
}
