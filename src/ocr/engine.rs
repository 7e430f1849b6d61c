use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;
use crate::geometry::Point;

/// One recognized text line with its quadrilateral (lt, rt, rb, lb).
#[derive(Debug, Clone, PartialEq)]
pub struct OcrLine {
    pub quad: [Point; 4],
    pub text: String,
}

impl OcrLine {
    /// Builds an axis-aligned line from its bounding box.
    pub fn from_box(top_left: Point, bottom_right: Point, text: impl Into<String>) -> Self {
        Self {
            quad: [
                top_left,
                Point::new(bottom_right.x, top_left.y),
                bottom_right,
                Point::new(top_left.x, bottom_right.y),
            ],
            text: text.into(),
        }
    }
}

/// Recognizes text lines in an image file.
pub trait OcrEngine {
    fn recognize(&self, image: &Path) -> Result<Vec<OcrLine>>;
}

/// OCR through the tesseract command line tool.
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: PathBuf,
    languages: String,
}

impl TesseractEngine {
    pub fn new(paths: TesseractPaths, languages: impl Into<String>) -> Self {
        Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
            languages: languages.into(),
        }
    }
}

impl OcrEngine for TesseractEngine {
    /// Runs Tesseract with TSV output and folds the words into lines.
    fn recognize(&self, image: &Path) -> Result<Vec<OcrLine>> {
        // Create temporary output file (Tesseract adds .tsv extension)
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let output = Command::new(&self.executable)
            .arg(image)
            .arg(&output_base)
            .arg("--tessdata-dir")
            .arg(&self.tessdata)
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg("11") // Sparse text: UI screens have scattered labels
            .arg("tsv")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;

        let _ = std::fs::remove_file(&tsv_path);

        let lines = parse_tsv_output(&tsv_content);
        crate::log(&format!(
            "OCR: {} lines in {}",
            lines.len(),
            image.display()
        ));
        Ok(lines)
    }
}

struct LineBuilder {
    key: (i32, i32, i32, i32),
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    text: String,
}

impl LineBuilder {
    fn finish(self) -> OcrLine {
        OcrLine::from_box(
            Point::new(self.left, self.top),
            Point::new(self.right, self.bottom),
            self.text,
        )
    }
}

fn is_cjk(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c) || ('\u{3000}'..='\u{303F}').contains(&c)
}

/// Appends a word, with a space unless both sides of the join are CJK.
fn push_word(text: &mut String, word: &str) {
    let needs_space = match (text.chars().last(), word.chars().next()) {
        (Some(prev), Some(next)) => !(is_cjk(prev) && is_cjk(next)),
        _ => false,
    };
    if needs_space {
        text.push(' ');
    }
    text.push_str(word);
}

/// Parses Tesseract TSV output into lines with a union bounding box.
fn parse_tsv_output(tsv: &str) -> Vec<OcrLine> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current: Option<LineBuilder> = None;

    for row in tsv.lines().skip(1) {
        // Skip header
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let num = |i: usize| fields[i].trim().parse::<i32>().unwrap_or(-1);
        let level = num(0);
        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        let text = fields[11].trim();

        // Level 5 = word
        if level != 5 || text.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (num(1), num(2), num(3), num(4));
        let (left, top) = (num(6) as f64, num(7) as f64);
        let (right, bottom) = (left + num(8) as f64, top + num(9) as f64);

        match current.as_mut() {
            Some(line) if line.key == key => {
                line.left = line.left.min(left);
                line.top = line.top.min(top);
                line.right = line.right.max(right);
                line.bottom = line.bottom.max(bottom);
                push_word(&mut line.text, text);
            }
            _ => {
                if let Some(done) = current.take() {
                    lines.push(done.finish());
                }
                current = Some(LineBuilder {
                    key,
                    left,
                    top,
                    right,
                    bottom,
                    text: text.to_string(),
                });
            }
        }
    }

    // Don't forget the last line
    if let Some(done) = current {
        lines.push(done.finish());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv_groups_words_into_lines() {
        let tsv = format!(
            "{}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t\n\
             4\t1\t1\t1\t1\t0\t10\t10\t200\t20\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t12\t50\t18\t91.5\tHello\n\
             5\t1\t1\t1\t1\t2\t70\t10\t60\t20\t90.1\tWorld\n\
             5\t1\t2\t1\t1\t1\t300\t400\t20\t20\t88.0\t发送\n\
             5\t1\t2\t1\t1\t2\t322\t401\t20\t20\t87.0\t消息\n\
             5\t1\t2\t1\t1\t3\t350\t401\t20\t20\t-1\t \n",
            HEADER
        );
        let lines = parse_tsv_output(&tsv);
        assert_eq!(lines.len(), 2);

        assert_eq!(lines[0].text, "Hello World");
        assert_eq!(lines[0].quad[0], Point::new(10.0, 10.0));
        assert_eq!(lines[0].quad[2], Point::new(130.0, 30.0));

        assert_eq!(lines[1].text, "发送消息");
        assert_eq!(lines[1].quad[0], Point::new(300.0, 400.0));
        assert_eq!(lines[1].quad[2], Point::new(342.0, 421.0));
    }

    #[test]
    fn test_parse_tsv_ignores_short_rows() {
        let tsv = format!("{}\n5\t1\t1\n", HEADER);
        assert!(parse_tsv_output(&tsv).is_empty());
    }

    #[test]
    fn test_push_word_spacing() {
        let mut text = String::from("发送");
        push_word(&mut text, "OK");
        push_word(&mut text, "按钮");
        assert_eq!(text, "发送 OK 按钮");
    }
}
