//! Tag sheet layout: grid placement, cell formats and barcode images

use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Image, Workbook, Worksheet};
use tracing::debug;

use crate::error::Result;
use crate::types::{SourceRow, TagLayout};

/// Where the next tag block goes.
///
/// `row` is the 1-based worksheet row of the price cell, `col` the 0-based
/// column. Columns fill left to right and wrap into a new band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCursor {
    pub row: u32,
    pub col: u16,
    tags_per_band: u16,
    band_height: u32,
}

impl GridCursor {
    pub fn new(tags_per_band: u16, band_height: u32) -> Self {
        Self {
            row: 1,
            col: 0,
            tags_per_band: tags_per_band.max(1),
            band_height,
        }
    }

    pub fn advance(&mut self) {
        self.col += 1;
        if self.col == self.tags_per_band {
            self.col = 0;
            self.row += self.band_height;
        }
    }
}

/// Cell formats shared by every tag
struct TagFormats {
    price: Format,
    image: Format,
    description: Format,
}

impl TagFormats {
    fn new(layout: &TagLayout) -> Self {
        let price = Format::new()
            .set_font_name(&layout.price_font_name)
            .set_font_size(layout.price_font_size)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_background_color(Color::RGB(layout.price_fill))
            .set_border(FormatBorder::Medium);

        let image = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Medium);

        let description = Format::new()
            .set_font_size(layout.description_font_size)
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::Top)
            .set_text_wrap()
            .set_border(FormatBorder::Medium);

        Self {
            price,
            image,
            description,
        }
    }
}

/// Price cell text: currency glyph, a space, the integer price
pub fn price_text(currency_symbol: &str, price: i64) -> String {
    format!("{} {}", currency_symbol, price)
}

/// Description cell text, one field per line
pub fn description_text(product_name: &str, mrp: &str, size: &str) -> String {
    format!("Des: {}\nMRP: {}\nSize: {}", product_name, mrp, size)
}

/// Output worksheet under construction
pub struct TagSheet {
    worksheet: Worksheet,
    layout: TagLayout,
    formats: TagFormats,
    cursor: GridCursor,
    tags: usize,
}

impl TagSheet {
    pub fn new(layout: TagLayout) -> Result<Self> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&layout.sheet_name)?;
        let formats = TagFormats::new(&layout);
        let cursor = GridCursor::new(layout.tags_per_band, layout.band_height);

        Ok(Self {
            worksheet,
            layout,
            formats,
            cursor,
            tags: 0,
        })
    }

    /// Write one tag block at the cursor and advance it
    pub fn add_tag(&mut self, tag: &SourceRow, barcode_path: &Path) -> Result<()> {
        // Excel rows are 1-based in the cursor, 0-based in the writer
        let row = self.cursor.row - 1;
        let col = self.cursor.col;

        self.worksheet.set_column_width(col, self.layout.column_width)?;

        let price = price_text(&self.layout.currency_symbol, tag.price);
        self.worksheet
            .write_string_with_format(row, col, &price, &self.formats.price)?;
        self.worksheet
            .set_row_height(row, self.layout.price_row_height)?;

        self.worksheet
            .write_blank(row + 1, col, &self.formats.image)?;
        self.worksheet
            .set_row_height(row + 1, self.layout.image_row_height)?;
        self.insert_barcode(row + 1, col, barcode_path)?;

        let description = description_text(&tag.product_name, &tag.mrp, &tag.size);
        self.worksheet
            .write_string_with_format(row + 2, col, &description, &self.formats.description)?;
        self.worksheet
            .set_row_height(row + 2, self.layout.description_row_height)?;

        debug!(
            item_code = tag.item_code,
            row = self.cursor.row,
            col,
            "Placed tag"
        );
        self.tags += 1;
        self.cursor.advance();
        Ok(())
    }

    /// Anchor the label image at a cell, scaled to the layout's size
    fn insert_barcode(&mut self, row: u32, col: u16, path: &Path) -> Result<()> {
        let (target_width, target_height) = self.layout.image_size_px();
        let mut image = Image::new(path)?;
        if image.width() > 0.0 && image.height() > 0.0 {
            let scale_width = f64::from(target_width) / image.width();
            let scale_height = f64::from(target_height) / image.height();
            image = image
                .set_scale_width(scale_width)
                .set_scale_height(scale_height);
        }
        self.worksheet.insert_image(row, col, &image)?;
        Ok(())
    }

    /// Save the sheet as a single-worksheet workbook
    pub fn save(self, path: &Path) -> Result<usize> {
        let mut workbook = Workbook::new();
        workbook.push_worksheet(self.worksheet);
        workbook.save(path)?;
        Ok(self.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_wraps_every_seven() {
        let mut cursor = GridCursor::new(7, 4);
        for _ in 0..6 {
            cursor.advance();
        }
        assert_eq!((cursor.row, cursor.col), (1, 6));
        cursor.advance();
        assert_eq!((cursor.row, cursor.col), (5, 0));
    }

    #[test]
    fn test_cursor_matches_closed_form() {
        let mut cursor = GridCursor::new(7, 4);
        for n in 0..40 {
            assert_eq!(cursor.col as usize, n % 7, "tag {n}");
            assert_eq!(cursor.row as usize, 1 + 4 * (n / 7));
            cursor.advance();
        }
    }

    #[test]
    fn test_price_text_truncated_integer() {
        assert_eq!(price_text("\u{20B9}", 199), "\u{20B9} 199");
    }

    #[test]
    fn test_description_text_lines() {
        let text = description_text("Widget", "250", "M");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["Des: Widget", "MRP: 250", "Size: M"]);
    }

    #[test]
    fn test_image_size_from_inches() {
        assert_eq!(TagLayout::default().image_size_px(), (175, 80));
    }
}
