//! Type definitions for pricetag

use std::path::PathBuf;

/// Header of the column carrying the barcode payload
pub const COL_ITEM_CODE: &str = "Item Code";
pub const COL_SELLING_PRICE: &str = "Selling Price";
pub const COL_PRODUCT_NAME: &str = "Product Name";
pub const COL_MRP: &str = "MRP";
pub const COL_SIZE: &str = "Size";

/// Indian rupee sign
pub const RUPEE_SYMBOL: &str = "\u{20B9}";

/// Represents the detected type of a source cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// One product record, already coerced to the types a tag needs
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    /// Integer item code, rendered as the barcode payload
    pub item_code: i64,
    /// Selling price truncated toward zero
    pub price: i64,
    pub product_name: String,
    pub mrp: String,
    pub size: String,
}

/// How a barcode image is named inside the cache directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKey {
    /// Last four characters of the item code. Distinct codes sharing a
    /// suffix share an image.
    #[default]
    Suffix,
    /// The whole item code
    FullCode,
}

impl CacheKey {
    /// Derive the cache file stem for an item code string
    pub fn key_for<'a>(&self, code: &'a str) -> &'a str {
        match self {
            CacheKey::Suffix => {
                // Codes are ASCII digits (optionally a leading '-')
                let start = code.len().saturating_sub(4);
                code.get(start..).unwrap_or(code)
            }
            CacheKey::FullCode => code,
        }
    }
}

/// Barcode rendering and cache settings
#[derive(Debug, Clone)]
pub struct BarcodeConfig {
    /// Directory holding `<key>.gif` label images, persisted across runs
    pub cache_dir: PathBuf,
    /// Scratch PNG overwritten by every render
    pub intermediate_path: PathBuf,
    pub cache_key: CacheKey,
    pub module_width_mm: f64,
    pub module_height_mm: f64,
    pub quiet_zone_mm: f64,
    /// Blank space above and below the bars
    pub vertical_margin_mm: f64,
    pub dpi: f64,
    /// Extra canvas height below the bars for the caption
    pub caption_height_px: u32,
    /// Distance from the bottom of the bars to the top of the caption
    pub caption_offset_px: f64,
    pub font_size_px: f64,
    /// Caption font families, first installed one wins
    pub font_families: Vec<String>,
    /// Explicit font file loaded ahead of the system fonts
    pub font_file: Option<PathBuf>,
}

impl Default for BarcodeConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("images/barcodes"),
            intermediate_path: PathBuf::from("barcode_image.png"),
            cache_key: CacheKey::Suffix,
            module_width_mm: 0.3,
            module_height_mm: 8.0,
            quiet_zone_mm: 0.1,
            vertical_margin_mm: 1.0,
            dpi: 300.0,
            caption_height_px: 20,
            caption_offset_px: 5.0,
            font_size_px: 25.0,
            font_families: vec![
                "Calibri".to_string(),
                "Carlito".to_string(),
                "Liberation Sans".to_string(),
                "DejaVu Sans".to_string(),
                "Arial".to_string(),
            ],
            font_file: None,
        }
    }
}

/// Geometry and styling of a printed tag block
#[derive(Debug, Clone)]
pub struct TagLayout {
    pub currency_symbol: String,
    pub tags_per_band: u16,
    /// Worksheet rows per band: three tag rows plus a spacer
    pub band_height: u32,
    pub column_width: f64,
    pub price_row_height: f64,
    pub image_row_height: f64,
    pub description_row_height: f64,
    pub price_font_name: String,
    pub price_font_size: f64,
    pub description_font_size: f64,
    /// RGB fill behind the price
    pub price_fill: u32,
    pub image_width_in: f64,
    pub image_height_in: f64,
    pub image_dpi: f64,
    pub sheet_name: String,
}

impl Default for TagLayout {
    fn default() -> Self {
        Self {
            currency_symbol: RUPEE_SYMBOL.to_string(),
            tags_per_band: 7,
            band_height: 4,
            column_width: 26.95,
            price_row_height: 42.0,
            image_row_height: 61.2,
            description_row_height: 80.4,
            price_font_name: "Calibri".to_string(),
            price_font_size: 40.0,
            description_font_size: 11.0,
            price_fill: 0xFFFF00,
            image_width_in: 1.83,
            image_height_in: 0.84,
            image_dpi: 96.0,
            sheet_name: "Sheet".to_string(),
        }
    }
}

impl TagLayout {
    /// Target barcode size on the sheet in pixels, truncated
    pub fn image_size_px(&self) -> (u32, u32) {
        (
            (self.image_width_in * self.image_dpi) as u32,
            (self.image_height_in * self.image_dpi) as u32,
        )
    }
}

/// Everything a run needs; `Default` reproduces the stock paths
#[derive(Debug, Clone)]
pub struct TaggerConfig {
    pub source_path: PathBuf,
    /// Source worksheet, first sheet when unset
    pub sheet_name: Option<String>,
    pub output_path: PathBuf,
    pub barcode: BarcodeConfig,
    pub layout: TagLayout,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/source_sheet.xlsx"),
            sheet_name: None,
            output_path: PathBuf::from("data/tags_output.xlsx"),
            barcode: BarcodeConfig::default(),
            layout: TagLayout::default(),
        }
    }
}

/// Outcome of a tag sheet run
#[derive(Debug, Clone, PartialEq)]
pub struct TagRunSummary {
    pub tags: usize,
    pub barcodes_rendered: usize,
    pub barcodes_reused: usize,
    pub output_path: PathBuf,
}

/// Outcome of a barcode-only run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarcodeRunSummary {
    pub item_codes: usize,
    pub rendered: usize,
}
