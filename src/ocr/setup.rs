use anyhow::{anyhow, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::OcrConfig;
use crate::log;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the per-user directory for downloaded tessdata
pub fn get_tessdata_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dtclient-autotest")
        .join("tessdata")
}

/// Splits a language spec such as "chi_sim+eng".
fn language_list(languages: &str) -> Vec<&str> {
    languages
        .split('+')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

fn has_all_languages(dir: &Path, languages: &str) -> bool {
    language_list(languages)
        .iter()
        .all(|lang| dir.join(format!("{}.traineddata", lang)).exists())
}

/// Finds the Tesseract executable: explicit override, then PATH, then common install paths.
pub fn find_tesseract_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(anyhow!(
            "Configured tesseract executable does not exist: {}",
            path.display()
        ));
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    // Check common paths
    let common_paths = [
        r"C:\Program Files\Tesseract-OCR\tesseract.exe",
        r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
        "/opt/homebrew/bin/tesseract",
        "/usr/local/bin/tesseract",
    ];

    for path in &common_paths {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

/// Finds an installed tessdata directory holding every requested language.
pub fn find_tessdata_dir(languages: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = vec![get_tessdata_dir()];

    // Check TESSDATA_PREFIX environment variable
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        candidates.push(PathBuf::from(&prefix));
        candidates.push(PathBuf::from(&prefix).join("tessdata"));
    }

    let system_paths = [
        r"C:\Program Files\Tesseract-OCR\tessdata",
        r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
        "/opt/homebrew/share/tessdata",
        "/usr/local/share/tessdata",
    ];
    candidates.extend(system_paths.iter().map(PathBuf::from));

    candidates
        .into_iter()
        .find(|dir| has_all_languages(dir, languages))
}

/// Ensures Tesseract and its language data are available. Downloads missing data.
pub fn ensure_tesseract(config: &OcrConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config.tesseract_path.as_deref())?;

    let tessdata = match &config.tessdata_dir {
        Some(dir) => {
            download_missing_languages(dir, &config.languages)?;
            dir.clone()
        }
        None => match find_tessdata_dir(&config.languages) {
            Some(dir) => dir,
            None => {
                let dir = get_tessdata_dir();
                download_missing_languages(&dir, &config.languages)?;
                dir
            }
        },
    };

    log(&format!(
        "Tesseract ready: {} (tessdata {}, languages {})",
        executable.display(),
        tessdata.display(),
        config.languages
    ));

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

fn download_missing_languages(tessdata_dir: &Path, languages: &str) -> Result<()> {
    fs::create_dir_all(tessdata_dir)?;
    for lang in language_list(languages) {
        let path = tessdata_dir.join(format!("{}.traineddata", lang));
        if !path.exists() {
            download_tessdata(lang, &path)?;
        }
    }
    Ok(())
}

/// Downloads one language's trained data from the tessdata repository
fn download_tessdata(lang: &str, dest: &Path) -> Result<()> {
    let url = format!("{}/{}.traineddata", TESSDATA_REPO, lang);

    log(&format!("Downloading {}.traineddata...", lang));

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "dtclient-autotest")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}.traineddata: HTTP {}",
            lang,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(dest)?;
    file.write_all(&bytes)?;

    log(&format!(
        "Downloaded {}.traineddata ({} bytes)",
        lang,
        bytes.len()
    ));

    Ok(())
}
