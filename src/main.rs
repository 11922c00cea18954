//! pricetag CLI - Excel/CSV product list to printable price-tag sheet
//!
//! Usage: pricetag [--source data/source_sheet.xlsx] [--output data/tags_output.xlsx]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pricetag::{parse_color, BarcodeConfig, CacheKey, TagLayout, TaggerConfig};

#[derive(Parser, Debug)]
#[command(name = "pricetag")]
#[command(version)]
#[command(about = "Lay out barcode price tags from a product sheet into a printable workbook")]
#[command(
    long_about = "Reads 'Item Code', 'Selling Price', 'Product Name', 'MRP' and 'Size'\n\
    columns and writes one tag per row, seven per band:\n\
    - Price cell with currency glyph on a highlighted fill\n\
    - Code 128 barcode label, cached per item code suffix\n\
    - Description, MRP and size on three lines"
)]
struct Args {
    /// Source workbook (.xlsx, .xls, .xlsb, .ods) or CSV file
    #[arg(long, default_value = "data/source_sheet.xlsx")]
    source: PathBuf,

    /// Output XLSX file path
    #[arg(short, long, default_value = "data/tags_output.xlsx")]
    output: PathBuf,

    /// Source worksheet name (default: first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// Directory holding cached barcode labels
    #[arg(long, default_value = "images/barcodes")]
    cache_dir: PathBuf,

    /// Scratch PNG written by every barcode render
    #[arg(long, default_value = "barcode_image.png")]
    intermediate: PathBuf,

    /// Currency glyph printed before the price
    #[arg(long, default_value = "\u{20B9}")]
    currency: String,

    /// Price cell fill as #RRGGBB or a color name
    #[arg(long, default_value = "#FFFF00")]
    price_fill: String,

    /// Caption font file, tried before system fonts
    #[arg(long)]
    font_file: Option<PathBuf>,

    /// Caption font family; repeat to give fallbacks
    #[arg(long = "font-family")]
    font_families: Vec<String>,

    /// Key cached labels by the whole item code instead of its last 4 digits
    #[arg(long)]
    full_code_key: bool,

    /// Only render missing barcode labels, do not write a tag sheet
    #[arg(long)]
    barcodes_only: bool,

    /// Show progress information
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<TaggerConfig> {
        let price_fill = parse_color(&self.price_fill).map_err(anyhow::Error::msg)?;

        let mut barcode = BarcodeConfig {
            cache_dir: self.cache_dir,
            intermediate_path: self.intermediate,
            font_file: self.font_file,
            ..BarcodeConfig::default()
        };
        if self.full_code_key {
            barcode.cache_key = CacheKey::FullCode;
        }
        if !self.font_families.is_empty() {
            barcode.font_families = self.font_families;
        }

        Ok(TaggerConfig {
            source_path: self.source,
            sheet_name: self.sheet,
            output_path: self.output,
            barcode,
            layout: TagLayout {
                currency_symbol: self.currency,
                price_fill,
                ..TagLayout::default()
            },
        })
    }
}

/// `RUST_LOG` wins when set; otherwise INFO, or DEBUG with `--verbose`
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    match rust_log.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::new(if verbose { "debug" } else { "info" }),
    }
}

fn init_logging(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    let barcodes_only = args.barcodes_only;
    let config = args.into_config()?;

    if barcodes_only {
        let summary = pricetag::generate_barcodes(&config).with_context(|| {
            format!("Failed to generate barcodes from {}", config.source_path.display())
        })?;
        println!(
            "Barcodes ready in {} ({} item codes, {} rendered)",
            config.barcode.cache_dir.display(),
            summary.item_codes,
            summary.rendered
        );
        return Ok(());
    }

    let summary = pricetag::generate_tags(&config).with_context(|| {
        format!("Failed to build tags from {}", config.source_path.display())
    })?;
    println!("Tags saved to {}", summary.output_path.display());
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
