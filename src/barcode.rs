//! Barcode label rendering and the on-disk label cache
//!
//! A label is a Code 128 symbol with the item code printed underneath. Bars
//! are rasterized from SVG with `resvg` into a scratch PNG, then pasted onto
//! a taller white canvas that receives the caption, and the result is saved
//! as GIF under the cache directory.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tiny_skia::{Color, Pixmap, PixmapPaint, Transform};
use tracing::{debug, warn};
use usvg::fontdb;

use crate::code128::Code128;
use crate::error::BarcodeError;
use crate::types::BarcodeConfig;

const MM_PER_INCH: f64 = 25.4;

/// Produces a labeled barcode image file for an item code.
///
/// The cache calls this only when no image exists yet for the code's key.
pub trait BarcodeRenderer {
    fn render(&self, code: &str, destination: &Path) -> Result<(), BarcodeError>;
}

impl<R: BarcodeRenderer + ?Sized> BarcodeRenderer for &R {
    fn render(&self, code: &str, destination: &Path) -> Result<(), BarcodeError> {
        (**self).render(code, destination)
    }
}

/// Caption font resolved against the font database
struct CaptionFont {
    fontdb: Arc<fontdb::Database>,
    family: String,
}

impl CaptionFont {
    fn load(config: &BarcodeConfig) -> Result<Self, BarcodeError> {
        let mut db = fontdb::Database::new();
        let mut candidates: Vec<String> = Vec::new();

        if let Some(path) = &config.font_file {
            db.load_font_file(path)?;
            for face in db.faces() {
                candidates.extend(face.families.iter().map(|(name, _)| name.clone()));
            }
        }
        db.load_system_fonts();
        candidates.extend(config.font_families.iter().cloned());

        let family = candidates
            .into_iter()
            .find(|name| {
                let query = fontdb::Query {
                    families: &[fontdb::Family::Name(name.as_str())],
                    weight: fontdb::Weight::NORMAL,
                    stretch: fontdb::Stretch::Normal,
                    style: fontdb::Style::Normal,
                };
                db.query(&query).is_some()
            })
            .ok_or_else(|| BarcodeError::FontNotFound(config.font_families.join(", ")))?;

        debug!(family = %family, faces = db.len(), "Caption font resolved");
        Ok(Self {
            fontdb: Arc::new(db),
            family,
        })
    }
}

/// Default renderer: Code 128 bars plus a centered caption
pub struct LabelRenderer {
    config: BarcodeConfig,
    /// Loaded on first render so fully cached runs never touch fonts
    font: OnceCell<CaptionFont>,
}

impl LabelRenderer {
    pub fn new(config: BarcodeConfig) -> Self {
        Self {
            config,
            font: OnceCell::new(),
        }
    }

    fn font(&self) -> Result<&CaptionFont, BarcodeError> {
        if let Some(font) = self.font.get() {
            return Ok(font);
        }
        let loaded = CaptionFont::load(&self.config)?;
        Ok(self.font.get_or_init(|| loaded))
    }

    fn mm_to_px(&self, mm: f64) -> f64 {
        mm * self.config.dpi / MM_PER_INCH
    }

    /// Build the bar-only SVG and return it with its pixel size
    fn bars_svg(&self, symbol: &Code128) -> (String, u32, u32) {
        let module = self.mm_to_px(self.config.module_width_mm);
        let quiet = self.mm_to_px(self.config.quiet_zone_mm);
        let margin = self.mm_to_px(self.config.vertical_margin_mm);
        let bar_height = self.mm_to_px(self.config.module_height_mm);

        let width = (2.0 * quiet + module * f64::from(symbol.module_count())).ceil() as u32;
        let height = (2.0 * margin + bar_height).ceil() as u32;

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" shape-rendering="crispEdges"><rect width="{width}" height="{height}" fill="white"/>"#
        );
        for (start, modules) in symbol.bars() {
            svg.push_str(&format!(
                r#"<rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" fill="black"/>"#,
                quiet + module * f64::from(start),
                margin,
                module * f64::from(modules),
                bar_height
            ));
        }
        svg.push_str("</svg>");
        (svg, width, height)
    }

    /// Caption SVG covering the whole label canvas
    fn caption_svg(&self, code: &str, family: &str, width: u32, height: u32, top: f64) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><text x="{:.1}" y="{:.1}" font-family="{}" font-size="{}" text-anchor="middle" dominant-baseline="text-before-edge" fill="black">{}</text></svg>"#,
            f64::from(width) / 2.0,
            top,
            escape_xml(family),
            self.config.font_size_px,
            escape_xml(code)
        )
    }

    /// Render the bars and write them to the intermediate PNG
    fn write_intermediate(&self, symbol: &Code128) -> Result<(), BarcodeError> {
        let (svg, width, height) = self.bars_svg(symbol);
        let mut pixmap = Pixmap::new(width, height).ok_or(BarcodeError::Pixmap { width, height })?;
        rasterize(&svg, usvg::Options::default(), &mut pixmap)?;

        let path = &self.config.intermediate_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        pixmap
            .save_png(path)
            .map_err(|e| BarcodeError::Encode(format!("{}: {}", path.display(), e)))
    }

    /// Paste the intermediate bars onto a white canvas and draw the caption
    fn compose(&self, code: &str) -> Result<Pixmap, BarcodeError> {
        let path = &self.config.intermediate_path;
        let bars =
            Pixmap::load_png(path).map_err(|_| BarcodeError::Intermediate(path.to_path_buf()))?;

        let width = bars.width();
        let height = bars.height() + self.config.caption_height_px;
        let mut canvas = Pixmap::new(width, height).ok_or(BarcodeError::Pixmap { width, height })?;
        canvas.fill(Color::WHITE);
        canvas.draw_pixmap(
            0,
            0,
            bars.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        let font = self.font()?;
        let top = f64::from(bars.height()) + self.config.caption_offset_px;
        let svg = self.caption_svg(code, &font.family, width, height, top);
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&font.fontdb);
        options.font_family = font.family.clone();
        rasterize(&svg, options, &mut canvas)?;

        Ok(canvas)
    }
}

impl BarcodeRenderer for LabelRenderer {
    fn render(&self, code: &str, destination: &Path) -> Result<(), BarcodeError> {
        let symbol = Code128::encode(code)?;
        self.write_intermediate(&symbol)?;
        let canvas = self.compose(code)?;

        let (width, height) = (canvas.width(), canvas.height());
        let label = image::RgbaImage::from_raw(width, height, canvas.take())
            .ok_or(BarcodeError::Pixmap { width, height })?;
        label.save_with_format(destination, image::ImageFormat::Gif)?;

        debug!(code, width, height, path = %destination.display(), "Rendered barcode label");
        Ok(())
    }
}

/// Parse `svg` and draw it onto `pixmap` at 1:1 scale
fn rasterize(svg: &str, options: usvg::Options, pixmap: &mut Pixmap) -> Result<(), BarcodeError> {
    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| BarcodeError::Svg(format!("SVG parsing failed: {}", e)))?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    Ok(())
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Label images on disk, looked up by cache key before rendering.
///
/// The existence check and the render are not atomic; the cache assumes it
/// is the only writer of its directory.
pub struct BarcodeCache<R> {
    config: BarcodeConfig,
    renderer: R,
    /// Cache key -> first item code seen for it in this run
    seen: HashMap<String, String>,
    rendered: usize,
    reused: usize,
}

impl<R: BarcodeRenderer> BarcodeCache<R> {
    pub fn new(config: BarcodeConfig, renderer: R) -> Self {
        Self {
            config,
            renderer,
            seen: HashMap::new(),
            rendered: 0,
            reused: 0,
        }
    }

    /// Cache file path for an item code
    pub fn path_for(&self, code: &str) -> PathBuf {
        let key = self.config.cache_key.key_for(code);
        self.config.cache_dir.join(format!("{}.gif", key))
    }

    /// Return the label for `code`, rendering it only when the file is absent
    pub fn resolve(&mut self, code: &str) -> Result<PathBuf, BarcodeError> {
        self.note_key(code);
        let path = self.path_for(code);

        if path.exists() {
            self.reused += 1;
            debug!(code, path = %path.display(), "Reusing cached barcode");
            return Ok(path);
        }

        self.renderer.render(code, &path)?;
        self.rendered += 1;
        Ok(path)
    }

    /// Warn once per distinct code that lands on an already-claimed key
    fn note_key(&mut self, code: &str) {
        let key = self.config.cache_key.key_for(code);
        match self.seen.get(key) {
            Some(first) if first != code => {
                warn!(
                    code,
                    other = %first,
                    key,
                    "Item codes share a barcode cache key; the cached image encodes the first one"
                );
            }
            Some(_) => {}
            None => {
                self.seen.insert(key.to_string(), code.to_string());
            }
        }
    }

    pub fn rendered(&self) -> usize {
        self.rendered
    }

    pub fn reused(&self) -> usize {
        self.reused
    }
}

/// Renderer that records calls and writes a tiny placeholder GIF
#[cfg(test)]
#[derive(Default)]
pub(crate) struct CountingRenderer {
    pub(crate) calls: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl BarcodeRenderer for CountingRenderer {
    fn render(&self, code: &str, destination: &Path) -> Result<(), BarcodeError> {
        self.calls.borrow_mut().push(code.to_string());
        let img = image::RgbaImage::from_pixel(8, 4, image::Rgba([255, 255, 255, 255]));
        img.save_with_format(destination, image::ImageFormat::Gif)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CacheKey;

    fn config_in(dir: &Path) -> BarcodeConfig {
        BarcodeConfig {
            cache_dir: dir.join("barcodes"),
            intermediate_path: dir.join("barcode_image.png"),
            ..BarcodeConfig::default()
        }
    }

    #[test]
    fn test_resolve_renders_once_per_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.cache_dir).unwrap();
        let renderer = CountingRenderer::default();
        let mut cache = BarcodeCache::new(config, &renderer);

        let first = cache.resolve("8901001234").unwrap();
        let second = cache.resolve("8901001234").unwrap();
        let collision = cache.resolve("5550001234").unwrap();

        assert_eq!(first, second);
        assert_eq!(first, collision);
        assert!(first.ends_with("1234.gif"));
        assert_eq!(renderer.calls.borrow().as_slice(), &["8901001234".to_string()]);
        assert_eq!(cache.rendered(), 1);
        assert_eq!(cache.reused(), 2);
    }

    #[test]
    fn test_full_code_key_separates_shared_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let config = BarcodeConfig {
            cache_key: CacheKey::FullCode,
            ..config_in(dir.path())
        };
        std::fs::create_dir_all(&config.cache_dir).unwrap();
        let renderer = CountingRenderer::default();
        let mut cache = BarcodeCache::new(config, &renderer);

        let a = cache.resolve("8901001234").unwrap();
        let b = cache.resolve("5550001234").unwrap();

        assert_ne!(a, b);
        assert_eq!(renderer.calls.borrow().len(), 2);
    }

    #[test]
    fn test_existing_file_is_not_touched() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.cache_dir).unwrap();
        let existing = config.cache_dir.join("0042.gif");
        std::fs::write(&existing, b"not really a gif").unwrap();

        let renderer = CountingRenderer::default();
        let mut cache = BarcodeCache::new(config, &renderer);
        let path = cache.resolve("990042").unwrap();

        assert_eq!(path, existing);
        assert!(renderer.calls.borrow().is_empty());
        assert_eq!(std::fs::read(&existing).unwrap(), b"not really a gif");
    }

    #[test]
    fn test_short_codes_key_on_whole_code() {
        assert_eq!(CacheKey::Suffix.key_for("42"), "42");
        assert_eq!(CacheKey::Suffix.key_for("8901234"), "1234");
        assert_eq!(CacheKey::FullCode.key_for("8901234"), "8901234");
    }

    #[test]
    fn test_bars_svg_dimensions() {
        let renderer = LabelRenderer::new(BarcodeConfig::default());
        let symbol = Code128::encode("1234").unwrap();
        let (svg, width, height) = renderer.bars_svg(&symbol);

        // 57 modules at 0.3mm plus 0.1mm quiet zones, 300 dpi
        let expected_width = ((0.2 + 57.0 * 0.3) * 300.0 / 25.4_f64).ceil() as u32;
        assert_eq!(width, expected_width);
        assert_eq!(height, (10.0 * 300.0 / 25.4_f64).ceil() as u32);
        assert_eq!(svg.matches("fill=\"black\"").count(), symbol.bars().len());
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("A&B <\"x\">"), "A&amp;B &lt;&quot;x&quot;&gt;");
    }

    #[test]
    fn test_label_renderer_writes_gif() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(&config.cache_dir).unwrap();
        let renderer = LabelRenderer::new(config.clone());
        let destination = config.cache_dir.join("1234.gif");

        match renderer.render("8901001234", &destination) {
            Ok(()) => {}
            // Hosts without any sans font cannot draw captions
            Err(BarcodeError::FontNotFound(_)) => return,
            Err(e) => panic!("render failed: {e}"),
        }

        let intermediate = image::open(&config.intermediate_path).unwrap();
        let label = image::open(&destination).unwrap();
        assert_eq!(label.width(), intermediate.width());
        assert_eq!(label.height(), intermediate.height() + config.caption_height_px);

        // The caption strip under the bars carries the item code text
        let label = label.to_luma8();
        let caption_ink = label
            .enumerate_pixels()
            .filter(|(_, y, p)| *y >= intermediate.height() && p.0[0] < 128)
            .count();
        assert!(caption_ink > 0, "caption strip is blank");

        // A second render reuses the intermediate path without failing
        let other = config.cache_dir.join("5678.gif");
        renderer.render("5678", &other).unwrap();
        assert!(other.exists());
    }
}
