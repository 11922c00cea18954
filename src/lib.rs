//! pricetag - printable retail price tags with Code 128 barcodes
//!
//! Reads product rows (item code, selling price, MRP, name, size) from an
//! Excel workbook or CSV file and writes a grid of tag blocks to a new
//! `.xlsx`:
//! - Price cell: currency glyph and integer price on a yellow fill
//! - Barcode cell: a cached GIF label of the item code
//! - Description cell: name, MRP and size on three wrapped lines
//!
//! Seven tags fill a band; bands stack with a blank spacer row between them.
//! Barcode labels are kept in a cache directory and only rendered when
//! missing.

pub mod barcode;
pub mod code128;
mod convert;
pub mod error;
mod parse;
pub mod sheet;
pub mod source;
pub mod types;

pub use barcode::{BarcodeCache, BarcodeRenderer, LabelRenderer};
pub use code128::Code128;
pub use convert::{
    build_tag_sheet, generate_barcodes, generate_barcodes_with, generate_tags, generate_tags_with,
};
pub use error::{BarcodeError, Result, TaggerError};
pub use parse::parse_color;
pub use sheet::{description_text, price_text, GridCursor, TagSheet};
pub use source::SourceTable;
pub use types::{
    BarcodeConfig, BarcodeRunSummary, CacheKey, CellValue, SourceRow, TagLayout, TagRunSummary,
    TaggerConfig,
};
