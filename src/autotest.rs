//! The session facade test authors drive.
//!
//! An [`Autotest`] owns the configuration, the device, and the three
//! collaborators (screen capture, OCR, pointer). Direct lookups take an
//! existing capture; the `loop_*` variants capture on every attempt and
//! delete the capture afterwards.

use anyhow::{anyhow, Result};
use image::GrayImage;
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use crate::cache::{self, CacheQuery, CachedLookup};
use crate::capture::{screenshot_name, CaptureFile, PrimaryMonitor, ScreenCapture};
use crate::config::{check_threshold, load_config, AutotestConfig};
use crate::device::Device;
use crate::geometry::{Bounds, MatchResult, Point};
use crate::input::{self, ActSpec, PointerDriver};
use crate::matching::{self, Deduplicator, GreedyClusterDedup, PicQuery, TextQuery};
use crate::ocr::{self, OcrEngine};
use crate::paths::{
    find_template, require_template, resolution_qualified_name, with_subfolder, AssetPaths,
};
use crate::poll::{self, seconds, PollOverrides, RaceHit};
use crate::preview::save_preview;

const LOG_FILE_NAME: &str = "dtclient_autotest.log";

/// A template loaded once and matched against many captures.
struct LoadedTemplate<'q> {
    query: &'q PicQuery,
    image: GrayImage,
    threshold: f32,
}

pub struct Autotest {
    config: AutotestConfig,
    paths: AssetPaths,
    device: Device,
    screen: Box<dyn ScreenCapture>,
    ocr: Box<dyn OcrEngine>,
    pointer: Box<dyn PointerDriver>,
    dedup: Box<dyn Deduplicator>,
    resolution: OnceCell<(u32, u32)>,
}

impl Autotest {
    /// Builds a session on the real screen, Tesseract, and OS pointer.
    pub fn new(config: AutotestConfig) -> Result<Self> {
        config.validate()?;
        let device = Device::detect(config.device_id_path.as_deref(), &config.device_scales)?;
        let ocr = ocr::tesseract_from_config(&config.ocr)?;
        let pointer = input::platform_pointer()?;
        Self::with_collaborators(config, device, Box::new(PrimaryMonitor), Box::new(ocr), pointer)
    }

    /// Loads the configuration file (falling back to defaults) and builds a session.
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Self::new(load_config(path))
    }

    /// Builds a session around explicit collaborators.
    pub fn with_collaborators(
        config: AutotestConfig,
        device: Device,
        screen: Box<dyn ScreenCapture>,
        ocr: Box<dyn OcrEngine>,
        pointer: Box<dyn PointerDriver>,
    ) -> Result<Self> {
        config.validate()?;
        let paths = AssetPaths::new(config.root_path.clone());
        paths.ensure_directories()?;
        if config.log_to_file {
            crate::set_log_file(Some(paths.logs_dir().join(LOG_FILE_NAME)));
        }
        crate::log(&format!(
            "Session ready: root={}, os={}, scale={}",
            paths.root().display(),
            device.os,
            device.scale()
        ));

        Ok(Self {
            config,
            paths,
            device,
            screen,
            ocr,
            pointer,
            dedup: Box::new(GreedyClusterDedup),
            resolution: OnceCell::new(),
        })
    }

    /// Replaces the duplicate suppression used when `filter_same` is set.
    pub fn with_deduplicator(mut self, dedup: Box<dyn Deduplicator>) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn config(&self) -> &AutotestConfig {
        &self.config
    }

    pub fn paths(&self) -> &AssetPaths {
        &self.paths
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    // ---- capture ----

    /// Takes a screenshot to `<dir>/<name>.png`.
    ///
    /// Defaults to a timestamped unique name under the screenshot directory.
    pub fn screenshot(&self, name: Option<&str>, dir: Option<&Path>) -> Result<PathBuf> {
        let dir = dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.paths.screenshot_dir());
        std::fs::create_dir_all(&dir)?;
        let name = name.map(str::to_string).unwrap_or_else(screenshot_name);
        let path = dir.join(format!("{}.png", name));
        self.screen.capture_to(&path)?;
        Ok(path)
    }

    fn capture_temp(&self) -> Result<CaptureFile> {
        Ok(CaptureFile::new(self.screenshot(None, None)?))
    }

    /// Screen resolution in capture pixels. Measured once per session.
    pub fn screenshot_resolution(&self) -> Result<(u32, u32)> {
        if let Some(resolution) = self.resolution.get() {
            return Ok(*resolution);
        }
        let capture = self.capture_temp()?;
        let resolution = image::image_dimensions(capture.path())?;
        crate::log(&format!("Screenshot resolution: {}x{}", resolution.0, resolution.1));
        let _ = self.resolution.set(resolution);
        Ok(resolution)
    }

    /// `name_<os>_<w>x<h>` for the current device.
    pub fn template_full_name(&self, name: &str) -> Result<String> {
        Ok(resolution_qualified_name(
            name,
            self.device.os,
            self.screenshot_resolution()?,
        ))
    }

    // ---- direct lookups ----

    fn template_dir(&self, query: &PicQuery) -> PathBuf {
        let base = query
            .sub_path
            .clone()
            .unwrap_or_else(|| self.paths.template_dir());
        with_subfolder(&base, &query.subfolder)
    }

    fn template_exists(&self, query: &PicQuery) -> Result<bool> {
        let qualified = self.template_full_name(&query.name)?;
        Ok(find_template(&self.template_dir(query), &qualified).is_some())
    }

    fn load_template<'q>(&self, query: &'q PicQuery) -> Result<LoadedTemplate<'q>> {
        let threshold = query.threshold.unwrap_or(self.config.threshold);
        check_threshold("threshold", threshold)?;
        let qualified = self.template_full_name(&query.name)?;
        let path = require_template(&self.template_dir(query), &qualified)?;
        Ok(LoadedTemplate {
            query,
            image: matching::load_gray(&path)?,
            threshold,
        })
    }

    fn match_loaded(&self, template: &LoadedTemplate, capture: &GrayImage) -> MatchResult {
        let dedup = if template.query.filter_same {
            Some(self.dedup.as_ref())
        } else {
            None
        };
        matching::locate(
            capture,
            &template.image,
            template.threshold,
            dedup,
            template.query.sort_rule,
        )
    }

    fn match_text(&self, query: &TextQuery, capture: &Path) -> Result<MatchResult> {
        let lines = self.ocr.recognize(capture)?;
        matching::match_lines(&lines, query)
    }

    fn maybe_preview(&self, capture: &Path, result: &MatchResult, label: &str) -> Result<()> {
        if !self.config.preview {
            return Ok(());
        }
        let stem = capture
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(screenshot_name);
        let dest = self
            .paths
            .preview_dir()
            .join(format!("{}_{}.png", stem, label));
        save_preview(capture, result, &dest)
    }

    /// Finds every placement of a template in an existing capture.
    pub fn exist_pic(&self, query: &PicQuery, capture: &Path) -> Result<MatchResult> {
        let template = self.load_template(query)?;
        let result = self.match_loaded(&template, &matching::load_gray(capture)?);
        crate::log(&format!(
            "exist_pic[{}]: {} regions",
            query.name,
            result.len()
        ));
        self.maybe_preview(capture, &result, &query.name)?;
        Ok(result)
    }

    /// Finds every OCR line matching `query` in an existing capture.
    pub fn exist_text(&self, query: &TextQuery, capture: &Path) -> Result<MatchResult> {
        let result = self.match_text(query, capture)?;
        crate::log(&format!(
            "exist_text[{}]: {} regions",
            query.text,
            result.len()
        ));
        self.maybe_preview(capture, &result, "text")?;
        Ok(result)
    }

    /// Keeps the regions whose center lies inside `bounds`; open sides span the screen.
    pub fn filter_by_bounds(&self, result: &MatchResult, bounds: Bounds) -> Result<MatchResult> {
        Ok(result.filter_by_bounds(bounds, self.screenshot_resolution()?))
    }

    // ---- interaction ----

    /// Performs `spec` on `result` and returns the pointer coordinate used.
    pub fn act_point(&mut self, result: &MatchResult, spec: ActSpec) -> Result<Point> {
        let pause = std::time::Duration::from_millis(self.config.double_click_pause_ms);
        input::act(self.pointer.as_mut(), &self.device, result, spec, pause)
    }

    /// [`exist_pic`](Self::exist_pic), then acts; not finding the template is an error.
    pub fn act_pic(&mut self, query: &PicQuery, capture: &Path) -> Result<(MatchResult, Point)> {
        let result = self.exist_pic(query, capture)?;
        if !result.found() {
            return Err(anyhow!(
                "Template not found: name={}, capture={}",
                query.name,
                capture.display()
            ));
        }
        let point = self.act_point(&result, query.act)?;
        Ok((result, point))
    }

    /// [`exist_text`](Self::exist_text), then acts; not finding the text is an error.
    pub fn act_text(&mut self, query: &TextQuery, capture: &Path) -> Result<(MatchResult, Point)> {
        let result = self.exist_text(query, capture)?;
        if !result.found() {
            return Err(anyhow!(
                "Text not found: text={:?}, exact={}, capture={}",
                query.text,
                query.exact,
                capture.display()
            ));
        }
        let point = self.act_point(&result, query.act)?;
        Ok((result, point))
    }

    /// Moves the pointer to the top-left corner so it stays out of captures.
    pub fn move_mouse_to_edge(&mut self) -> Result<()> {
        self.pointer.move_to(Point::new(0.0, 0.0))
    }

    // ---- polls ----

    /// Polls for a template on fresh captures.
    pub fn loop_exist_pic(
        &self,
        query: &PicQuery,
        overrides: &PollOverrides,
    ) -> Result<MatchResult> {
        let timing = overrides.resolve(&self.config.pic_poll)?;
        let template = self.load_template(query)?;
        let label = format!("loop_exist_pic[{}]", query.name);
        let polled = poll::poll(timing, &label, || {
            let capture = self.capture_temp()?;
            Ok(self.match_loaded(&template, &matching::load_gray(capture.path())?))
        })?;
        Ok(polled.value)
    }

    /// Polls for text on fresh captures.
    pub fn loop_exist_text(
        &self,
        query: &TextQuery,
        overrides: &PollOverrides,
    ) -> Result<MatchResult> {
        let timing = overrides.resolve(&self.config.text_poll)?;
        let label = format!("loop_exist_text[{}]", query.text);
        let polled = poll::poll(timing, &label, || {
            let capture = self.capture_temp()?;
            self.match_text(query, capture.path())
        })?;
        Ok(polled.value)
    }

    /// Like [`loop_exist_text`](Self::loop_exist_text), but hands back the
    /// capture that produced a hit. Captures without a hit are deleted.
    pub fn loop_exist_text_retaining(
        &self,
        query: &TextQuery,
        overrides: &PollOverrides,
    ) -> Result<(MatchResult, Option<CaptureFile>)> {
        let timing = overrides.resolve(&self.config.text_poll)?;
        let label = format!("loop_exist_text[{}]", query.text);
        let polled = poll::poll(timing, &label, || {
            let capture = self.capture_temp()?;
            let result = self.match_text(query, capture.path())?;
            let retained = result.found().then_some(capture);
            Ok((result, retained))
        })?;
        Ok(polled.value)
    }

    /// Races a list of templates; the first entry (in list order) to match on
    /// a capture wins. `None` when nothing matched before the timeout.
    ///
    /// The timeout defaults to the configured per-entry budget times the list length.
    pub fn loop_exist_pic_list(
        &self,
        list: &[PicQuery],
        timeout: Option<f64>,
    ) -> Result<Option<RaceHit>> {
        validate_list(list)?;
        let timeout = seconds(
            "timeout",
            timeout.unwrap_or(self.config.race_timeout_per_config * list.len() as f64),
        )?;
        let templates = list
            .iter()
            .map(|q| self.load_template(q))
            .collect::<Result<Vec<_>>>()?;

        poll::race(timeout, || {
            let capture = self.capture_temp()?;
            let screen = matching::load_gray(capture.path())?;
            poll::first_hit(&templates, |t| Ok(self.match_loaded(t, &screen)))
        })
    }

    /// Text lookup with the image-cache fast path.
    ///
    /// A cached crop for the key is tried first with a single-best template
    /// poll; a miss deletes it and falls back to an OCR poll, whose hit is
    /// cropped at `query.text.act.priority_index` and stored for next time.
    pub fn loop_exist_text_by_pic_cache(&self, query: &CacheQuery) -> Result<CachedLookup> {
        let threshold = query.threshold.unwrap_or(self.config.cache_threshold);
        check_threshold("cache threshold", threshold)?;
        let base = query
            .sub_path
            .clone()
            .unwrap_or_else(|| self.paths.cache_dir());
        let cache_path = cache::cache_file(
            &base,
            &query.subfolder,
            &query.key,
            self.device.os,
            self.screenshot_resolution()?,
        );

        if cache_path.exists() {
            let timing = query.pic_poll.resolve(&self.config.pic_poll)?;
            let cached = matching::load_gray(&cache_path)?;
            let label = format!("cache[{}]", query.key);
            let polled = poll::poll(timing, &label, || {
                let capture = self.capture_temp()?;
                let screen = matching::load_gray(capture.path())?;
                Ok(matching::locate_best(&screen, &cached, threshold))
            })?;
            if polled.value.found() {
                crate::log(&format!("Cache hit for {:?} ({})", query.text.text, query.key));
                return Ok(CachedLookup {
                    result: polled.value,
                    via_cache: true,
                });
            }
            crate::log(&format!("Cache miss for {:?} ({})", query.text.text, query.key));
            cache::invalidate(&cache_path)?;
        }

        let (result, capture) = self.loop_exist_text_retaining(&query.text, &query.text_poll)?;
        if let Some(capture) = capture {
            let region = result.region(query.text.act.priority_index)?;
            cache::store_crop(capture.path(), region, &cache_path)?;
        }
        Ok(CachedLookup {
            result,
            via_cache: false,
        })
    }

    /// Polls for a template, then acts; a miss is an error.
    pub fn loop_act_pic(
        &mut self,
        query: &PicQuery,
        overrides: &PollOverrides,
    ) -> Result<(MatchResult, Point)> {
        let result = self.loop_exist_pic(query, overrides)?;
        if !result.found() {
            return Err(anyhow!(
                "Template not found while polling: name={}, overrides={:?}",
                query.name,
                overrides
            ));
        }
        let point = self.act_point(&result, query.act)?;
        Ok((result, point))
    }

    /// Polls for text, then acts; a miss is an error.
    pub fn loop_act_text(
        &mut self,
        query: &TextQuery,
        overrides: &PollOverrides,
    ) -> Result<(MatchResult, Point)> {
        let result = self.loop_exist_text(query, overrides)?;
        if !result.found() {
            return Err(anyhow!(
                "Text not found while polling: text={:?}, overrides={:?}",
                query.text,
                overrides
            ));
        }
        let point = self.act_point(&result, query.act)?;
        Ok((result, point))
    }

    /// Cached text lookup, then acts; a miss is an error.
    ///
    /// A cache hit carries a single region, so it is always acted on at index 0.
    pub fn loop_act_text_by_pic_cache(
        &mut self,
        query: &CacheQuery,
    ) -> Result<(CachedLookup, Point)> {
        let lookup = self.loop_exist_text_by_pic_cache(query)?;
        if !lookup.result.found() {
            return Err(anyhow!(
                "Text not found via cache or OCR: text={:?}, key={}",
                query.text.text,
                query.key
            ));
        }
        let mut spec = query.text.act;
        if lookup.via_cache {
            spec.priority_index = 0;
        }
        let point = self.act_point(&lookup.result, spec)?;
        Ok((lookup, point))
    }

    /// Dismisses up to `repeat` dialogs from `list`, acting on whichever shows up.
    ///
    /// Entries without a template for this OS and resolution are skipped;
    /// when none remain this returns `false` at once. Returns whether any
    /// dialog was cleared.
    pub fn loop_clear_alert(
        &mut self,
        list: &[PicQuery],
        timeout: Option<f64>,
        repeat: Option<u32>,
    ) -> Result<bool> {
        validate_list(list)?;
        let timeout = seconds("timeout", timeout.unwrap_or(self.config.clear_alert_timeout))?;
        let repeat = repeat.unwrap_or(self.config.clear_alert_repeat);

        let mut applicable = Vec::new();
        for query in list {
            if self.template_exists(query)? {
                applicable.push(self.load_template(query)?);
            }
        }
        if applicable.is_empty() {
            crate::log("loop_clear_alert: no alert templates for this device, skipping");
            return Ok(false);
        }
        crate::log(&format!(
            "loop_clear_alert: {} of {} alert templates apply",
            applicable.len(),
            list.len()
        ));

        poll::clear_alerts(repeat, timeout, || {
            let hit = {
                let capture = self.capture_temp()?;
                let screen = matching::load_gray(capture.path())?;
                poll::first_hit(&applicable, |t| Ok(self.match_loaded(t, &screen)))?
            };
            match hit {
                Some(hit) => {
                    let spec = applicable[hit.index].query.act;
                    Ok(Some(self.act_point(&hit.result, spec)?))
                }
                None => Ok(None),
            }
        })
    }
}

/// Rejects an empty list or an entry with an empty name.
fn validate_list(list: &[PicQuery]) -> Result<()> {
    if list.is_empty() {
        return Err(anyhow!("pic config list must not be empty"));
    }
    if let Some(index) = list.iter().position(|q| q.name.trim().is_empty()) {
        return Err(anyhow!("pic config list entry {} has an empty name", index));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::device::OsFamily;
    use crate::geometry::Position;
    use crate::input::act::tests::{PointerEvent, RecordingPointer};
    use crate::input::{ActMode, MouseButton};
    use crate::matching::template::tests::noise_image;
    use crate::ocr::OcrLine;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const WIDTH: u32 = 200;
    const HEIGHT: u32 = 150;

    /// Serves whatever frame is currently set.
    struct FakeScreen {
        frame: Arc<Mutex<GrayImage>>,
        captures: Arc<AtomicUsize>,
    }

    impl ScreenCapture for FakeScreen {
        fn capture_to(&self, path: &Path) -> Result<()> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            self.frame.lock().unwrap().save(path)?;
            Ok(())
        }
    }

    /// Returns the same lines for every image.
    struct FakeOcr {
        lines: Vec<OcrLine>,
        calls: Arc<AtomicUsize>,
    }

    impl OcrEngine for FakeOcr {
        fn recognize(&self, _image: &Path) -> Result<Vec<OcrLine>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.lines.clone())
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        autotest: Autotest,
        frame: Arc<Mutex<GrayImage>>,
        captures: Arc<AtomicUsize>,
        ocr_calls: Arc<AtomicUsize>,
        pointer: RecordingPointer,
    }

    fn crop(img: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> GrayImage {
        image::imageops::crop_imm(img, x, y, w, h).to_image()
    }

    fn send_line() -> OcrLine {
        OcrLine::from_box(Point::new(40.0, 30.0), Point::new(70.0, 60.0), "Send")
    }

    fn harness(lines: Vec<OcrLine>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let screen = noise_image(WIDTH, HEIGHT, 11);
        let frame = Arc::new(Mutex::new(screen.clone()));
        let captures = Arc::new(AtomicUsize::new(0));
        let ocr_calls = Arc::new(AtomicUsize::new(0));
        let pointer = RecordingPointer::default();

        let config = AutotestConfig {
            root_path: dir.path().to_path_buf(),
            pic_poll: crate::config::PollDefaults::new(0.0, 1.0, 0.0, 0.0),
            text_poll: crate::config::PollDefaults::new(0.0, 1.0, 0.0, 0.0),
            double_click_pause_ms: 0,
            ..Default::default()
        };
        let scales = HashMap::from([("ci".to_string(), 1.0)]);
        let autotest = Autotest::with_collaborators(
            config,
            Device::new(OsFamily::Mac, "ci", &scales),
            Box::new(FakeScreen {
                frame: frame.clone(),
                captures: captures.clone(),
            }),
            Box::new(FakeOcr {
                lines,
                calls: ocr_calls.clone(),
            }),
            Box::new(pointer.clone()),
        )
        .unwrap();

        let templates = autotest.paths().template_dir();
        std::fs::create_dir_all(&templates).unwrap();
        crop(&screen, 40, 30, 30, 30)
            .save(templates.join("button_mac_200x150.png"))
            .unwrap();
        crop(&noise_image(WIDTH, HEIGHT, 99), 10, 10, 30, 30)
            .save(templates.join("absent_mac_200x150.png"))
            .unwrap();

        Harness {
            _dir: dir,
            autotest,
            frame,
            captures,
            ocr_calls,
            pointer,
        }
    }

    fn strict(name: &str) -> PicQuery {
        PicQuery::new(name).threshold(0.95)
    }

    fn screenshot_count(h: &Harness) -> usize {
        std::fs::read_dir(h.autotest.paths().screenshot_dir())
            .unwrap()
            .count()
    }

    #[test]
    fn test_validate_list() {
        assert!(validate_list(&[]).unwrap_err().to_string().contains("empty"));
        let err = validate_list(&[PicQuery::new("ok"), PicQuery::new(" ")]).unwrap_err();
        assert!(err.to_string().contains("entry 1"));
        assert!(validate_list(&[PicQuery::new("ok")]).is_ok());
    }

    #[test]
    fn test_resolution_measured_once() {
        let h = harness(vec![]);
        assert_eq!(h.autotest.screenshot_resolution().unwrap(), (WIDTH, HEIGHT));
        assert_eq!(h.autotest.screenshot_resolution().unwrap(), (WIDTH, HEIGHT));
        assert_eq!(h.captures.load(Ordering::SeqCst), 1);
        assert_eq!(screenshot_count(&h), 0);
        assert_eq!(
            h.autotest.template_full_name("login").unwrap(),
            "login_mac_200x150"
        );
    }

    #[test]
    fn test_exist_pic_on_capture() {
        let h = harness(vec![]);
        let capture = h.autotest.screenshot(Some("manual"), None).unwrap();
        assert!(capture.ends_with("manual.png"));

        let result = h.autotest.exist_pic(&strict("button"), &capture).unwrap();
        assert!(result.found());
        let region = result.region(0).unwrap();
        assert_eq!(region.point(Position::LeftTop), Point::new(40.0, 30.0));
        assert_eq!(region.center(), Point::new(55.0, 45.0));
        assert!(region.score().unwrap() > 0.99);

        let missing = h.autotest.exist_pic(&strict("absent"), &capture).unwrap();
        assert!(!missing.found());
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let h = harness(vec![]);
        let err = h
            .autotest
            .loop_exist_pic(&strict("nowhere"), &PollOverrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("Missing template"));
        assert!(err.to_string().contains("nowhere_mac_200x150"));
    }

    #[test]
    fn test_act_pic_clicks_center() {
        let mut h = harness(vec![]);
        let capture = h.autotest.screenshot(None, None).unwrap();
        let (_, point) = h.autotest.act_pic(&strict("button"), &capture).unwrap();
        assert_eq!(point, Point::new(55.0, 45.0));
        assert_eq!(
            h.pointer.take(),
            vec![
                PointerEvent::Move(Point::new(55.0, 45.0)),
                PointerEvent::Press(MouseButton::Left),
                PointerEvent::Release(MouseButton::Left),
            ]
        );

        let err = h.autotest.act_pic(&strict("absent"), &capture).unwrap_err();
        assert!(err.to_string().contains("Template not found"));
        assert!(h.pointer.take().is_empty());
    }

    #[test]
    fn test_loop_exist_pic_deletes_captures() {
        let h = harness(vec![]);
        let result = h
            .autotest
            .loop_exist_pic(&strict("button"), &PollOverrides::default())
            .unwrap();
        assert!(result.found());
        assert_eq!(screenshot_count(&h), 0);

        let missed = h
            .autotest
            .loop_exist_pic(&strict("absent"), &PollOverrides::timeout(0.0))
            .unwrap();
        assert!(!missed.found());
        assert_eq!(screenshot_count(&h), 0);
    }

    #[test]
    fn test_act_text_with_offset_position() {
        let mut h = harness(vec![send_line()]);
        let spec = ActSpec::new(0, Position::RightBottom, ActMode::MoveOn);
        let query = TextQuery::new("Send").act(spec);
        let (result, point) = h
            .autotest
            .loop_act_text(&query, &PollOverrides::default())
            .unwrap();
        assert_eq!(result.region(0).unwrap().text(), Some("Send"));
        assert_eq!(point, Point::new(70.0, 60.0));
        assert_eq!(h.pointer.take(), vec![PointerEvent::Move(point)]);

        let err = h
            .autotest
            .loop_act_text(&TextQuery::new("Cancel"), &PollOverrides::timeout(0.0))
            .unwrap_err();
        assert!(err.to_string().contains("Text not found"));
    }

    #[test]
    fn test_race_returns_first_matching_entry() {
        let h = harness(vec![]);
        let list = [strict("absent"), strict("button")];
        let hit = h.autotest.loop_exist_pic_list(&list, Some(1.0)).unwrap().unwrap();
        assert_eq!(hit.index, 1);
        assert!(hit.result.found());

        let none = h
            .autotest
            .loop_exist_pic_list(&[strict("absent")], Some(0.0))
            .unwrap();
        assert!(none.is_none());
        assert_eq!(screenshot_count(&h), 0);
    }

    #[test]
    fn test_cache_fast_path_skips_ocr() {
        let h = harness(vec![send_line()]);
        let key = CacheKey::new("send").unwrap();
        let query = CacheQuery::new(TextQuery::new("Send"), key)
            .pic_poll(PollOverrides::timeout(0.0))
            .text_poll(PollOverrides::timeout(1.0));
        let cache_path = h
            .autotest
            .paths()
            .cache_dir()
            .join("default")
            .join("send_mac_200x150.png");

        let first = h.autotest.loop_exist_text_by_pic_cache(&query).unwrap();
        assert!(!first.via_cache);
        assert!(first.result.found());
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 1);
        assert_eq!(image::image_dimensions(&cache_path).unwrap(), (30, 30));

        let second = h.autotest.loop_exist_text_by_pic_cache(&query).unwrap();
        assert!(second.via_cache);
        assert_eq!(second.result.len(), 1);
        assert_eq!(second.result.region(0).unwrap().center(), Point::new(55.0, 45.0));
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 1);
        assert_eq!(screenshot_count(&h), 0);
    }

    #[test]
    fn test_stale_cache_falls_back_to_ocr() {
        let h = harness(vec![send_line()]);
        let query = CacheQuery::new(TextQuery::new("Send"), CacheKey::new("send").unwrap())
            .pic_poll(PollOverrides::timeout(0.0));
        h.autotest.loop_exist_text_by_pic_cache(&query).unwrap();
        let cache_path = h
            .autotest
            .paths()
            .cache_dir()
            .join("default")
            .join("send_mac_200x150.png");
        let stale = image::open(&cache_path).unwrap().to_luma8();

        *h.frame.lock().unwrap() = noise_image(WIDTH, HEIGHT, 12);
        let lookup = h.autotest.loop_exist_text_by_pic_cache(&query).unwrap();
        assert!(!lookup.via_cache);
        assert!(lookup.result.found());
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 2);

        let refreshed = image::open(&cache_path).unwrap().to_luma8();
        assert_ne!(refreshed, stale);
        assert_eq!(refreshed, crop(&noise_image(WIDTH, HEIGHT, 12), 40, 30, 30, 30));
    }

    #[test]
    fn test_cache_hit_acts_on_first_region() {
        let lines = vec![
            OcrLine::from_box(Point::new(100.0, 100.0), Point::new(160.0, 120.0), "Send later"),
            send_line(),
        ];
        let mut h = harness(lines);
        let spec = ActSpec::new(1, Position::Center, ActMode::LeftClick);
        let text = TextQuery::new("Send").act(spec);
        let query = CacheQuery::new(text, CacheKey::new("second_send").unwrap())
            .pic_poll(PollOverrides::timeout(0.0));

        let (first, point) = h.autotest.loop_act_text_by_pic_cache(&query).unwrap();
        assert!(!first.via_cache);
        assert_eq!(point, Point::new(55.0, 45.0));

        let (second, point) = h.autotest.loop_act_text_by_pic_cache(&query).unwrap();
        assert!(second.via_cache);
        assert_eq!(point, Point::new(55.0, 45.0));
        assert_eq!(h.ocr_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_alert_skips_missing_templates() {
        let mut h = harness(vec![]);
        let list = [strict("no_such_dialog"), strict("button")];
        let cleared = h.autotest.loop_clear_alert(&list, Some(0.0), Some(2)).unwrap();
        assert!(cleared);
        let clicks = h
            .pointer
            .take()
            .into_iter()
            .filter(|e| *e == PointerEvent::Press(MouseButton::Left))
            .count();
        assert_eq!(clicks, 2);

        let none = h
            .autotest
            .loop_clear_alert(&[strict("no_such_dialog")], None, None)
            .unwrap();
        assert!(!none);
        assert!(h.pointer.take().is_empty());
    }

    #[test]
    fn test_filter_by_bounds_uses_resolution() {
        let h = harness(vec![]);
        let capture = h.autotest.screenshot(None, None).unwrap();
        let result = h.autotest.exist_pic(&strict("button"), &capture).unwrap();

        let kept = h
            .autotest
            .filter_by_bounds(&result, Bounds { left: Some(50.0), ..Default::default() })
            .unwrap();
        assert_eq!(kept.len(), 1);
        let dropped = h
            .autotest
            .filter_by_bounds(&result, Bounds { bottom: Some(40.0), ..Default::default() })
            .unwrap();
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_preview_written_when_enabled() {
        let mut h = harness(vec![]);
        h.autotest.config.preview = true;
        let capture = h.autotest.screenshot(Some("shot"), None).unwrap();
        h.autotest.exist_pic(&strict("button"), &capture).unwrap();
        assert!(h.autotest.paths().preview_dir().join("shot_button.png").is_file());
    }

    #[test]
    fn test_move_mouse_to_edge() {
        let mut h = harness(vec![]);
        h.autotest.move_mouse_to_edge().unwrap();
        assert_eq!(h.pointer.take(), vec![PointerEvent::Move(Point::new(0.0, 0.0))]);
    }
}
