//! Error types for pricetag

use std::path::PathBuf;

use thiserror::Error;

/// Result type for tag generation
pub type Result<T> = std::result::Result<T, TaggerError>;

/// Errors raised while producing a barcode label image
#[derive(Debug, Error)]
pub enum BarcodeError {
    /// Code 128 carries ASCII only
    #[error("Character {ch:?} at position {position} cannot be encoded in Code 128")]
    UnsupportedCharacter { ch: char, position: usize },

    #[error("Cannot encode an empty barcode payload")]
    EmptyPayload,

    /// None of the configured caption fonts is installed
    #[error("No usable caption font found (tried: {0})")]
    FontNotFound(String),

    #[error("SVG rendering failed: {0}")]
    Svg(String),

    #[error("Failed to allocate a {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("Failed to read intermediate barcode image '{}'", .0.display())]
    Intermediate(PathBuf),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while generating a tag sheet
#[derive(Debug, Error)]
pub enum TaggerError {
    /// A required column is absent from the source header row
    #[error("The '{0}' column does not exist in the source sheet.")]
    MissingColumn(String),

    #[error("Row {row}: item code {value:?} is not an integer")]
    InvalidItemCode { row: usize, value: String },

    #[error("Row {row}: '{column}' value {value:?} is not a number")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Failed to open source '{path}': {message}")]
    SourceOpen { path: String, message: String },

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Source '{0}' has no header row")]
    EmptySheet(String),

    #[error("Unsupported source file type: {0}")]
    UnsupportedSource(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Barcode error: {0}")]
    Barcode(#[from] BarcodeError),

    #[error("Excel write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
