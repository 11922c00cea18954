//! Source-to-tag-sheet pipelines

use tracing::{debug, info};

use crate::barcode::{BarcodeCache, BarcodeRenderer, LabelRenderer};
use crate::error::Result;
use crate::parse::item_code;
use crate::sheet::TagSheet;
use crate::source::{SourceTable, TagColumns};
use crate::types::{BarcodeRunSummary, TagLayout, TagRunSummary, TaggerConfig, COL_ITEM_CODE};

/// Create the cache directory and the output file's parent
fn prepare_directories(config: &TaggerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.barcode.cache_dir)?;
    if let Some(parent) = config
        .output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Load the source and check for the item code column before anything else
fn load_source(config: &TaggerConfig) -> Result<SourceTable> {
    let table = SourceTable::load(&config.source_path, config.sheet_name.as_deref())?;
    table.column(COL_ITEM_CODE)?;
    info!(
        rows = table.len(),
        source = %config.source_path.display(),
        "Loaded source sheet"
    );
    debug!(headers = ?table.headers().collect::<Vec<_>>(), "Source columns");
    Ok(table)
}

/// Lay out one tag per source row, resolving barcodes through `cache`
pub fn build_tag_sheet<R: BarcodeRenderer>(
    table: &SourceTable,
    cache: &mut BarcodeCache<R>,
    layout: &TagLayout,
) -> Result<TagSheet> {
    let mut sheet = TagSheet::new(layout.clone())?;
    if table.is_empty() {
        return Ok(sheet);
    }

    let columns = TagColumns::resolve(table)?;
    for index in 0..table.len() {
        let row = table.source_row(index, &columns)?;
        let barcode = cache.resolve(&row.item_code.to_string())?;
        sheet.add_tag(&row, &barcode)?;
    }
    Ok(sheet)
}

/// Generate the tag sheet described by `config` with the default renderer
pub fn generate_tags(config: &TaggerConfig) -> Result<TagRunSummary> {
    generate_tags_with(config, LabelRenderer::new(config.barcode.clone()))
}

/// Generate the tag sheet described by `config` using `renderer` for new barcodes
pub fn generate_tags_with<R: BarcodeRenderer>(
    config: &TaggerConfig,
    renderer: R,
) -> Result<TagRunSummary> {
    prepare_directories(config)?;
    let table = load_source(config)?;

    let mut cache = BarcodeCache::new(config.barcode.clone(), renderer);
    let sheet = build_tag_sheet(&table, &mut cache, &config.layout)?;
    let tags = sheet.save(&config.output_path)?;

    info!(
        tags,
        rendered = cache.rendered(),
        reused = cache.reused(),
        output = %config.output_path.display(),
        "Tag sheet written"
    );
    Ok(TagRunSummary {
        tags,
        barcodes_rendered: cache.rendered(),
        barcodes_reused: cache.reused(),
        output_path: config.output_path.clone(),
    })
}

/// Render missing barcodes for every item code without writing a tag sheet
pub fn generate_barcodes(config: &TaggerConfig) -> Result<BarcodeRunSummary> {
    generate_barcodes_with(config, LabelRenderer::new(config.barcode.clone()))
}

/// Barcode-only run; rows with an empty item code are skipped
pub fn generate_barcodes_with<R: BarcodeRenderer>(
    config: &TaggerConfig,
    renderer: R,
) -> Result<BarcodeRunSummary> {
    prepare_directories(config)?;
    let table = load_source(config)?;
    let column = table.column(COL_ITEM_CODE)?;

    let mut cache = BarcodeCache::new(config.barcode.clone(), renderer);
    let mut item_codes = 0;
    for index in 0..table.len() {
        let cell = table.cell(index, column);
        if cell.is_empty() {
            continue;
        }
        let code = item_code(cell, table.line(index))?;
        cache.resolve(&code.to_string())?;
        item_codes += 1;
    }

    info!(
        item_codes,
        rendered = cache.rendered(),
        cache_dir = %config.barcode.cache_dir.display(),
        "Barcodes ready"
    );
    Ok(BarcodeRunSummary {
        item_codes,
        rendered: cache.rendered(),
    })
}
