//! Source sheet loading for Excel workbooks (calamine) and CSV files

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use indexmap::IndexMap;

use crate::error::{Result, TaggerError};
use crate::parse::{display_text, from_calamine, integer_price, item_code, parse_value};
use crate::types::{
    CellValue, SourceRow, COL_ITEM_CODE, COL_MRP, COL_PRODUCT_NAME, COL_SELLING_PRICE, COL_SIZE,
};

/// Extensions calamine can open
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "xla", "ods"];

/// A data row plus its 1-based row number in the source file
#[derive(Debug, Clone)]
struct TableRow {
    line: usize,
    cells: Vec<CellValue>,
}

/// Header-indexed table read from the first row of a sheet
#[derive(Debug, Clone)]
pub struct SourceTable {
    /// Trimmed header text -> column index, in sheet order
    headers: IndexMap<String, usize>,
    rows: Vec<TableRow>,
}

/// Column indexes of every field a tag uses
#[derive(Debug, Clone, Copy)]
pub struct TagColumns {
    pub item_code: usize,
    pub price: usize,
    pub product_name: usize,
    pub mrp: usize,
    pub size: usize,
}

impl TagColumns {
    pub fn resolve(table: &SourceTable) -> Result<Self> {
        Ok(Self {
            item_code: table.column(COL_ITEM_CODE)?,
            price: table.column(COL_SELLING_PRICE)?,
            product_name: table.column(COL_PRODUCT_NAME)?,
            mrp: table.column(COL_MRP)?,
            size: table.column(COL_SIZE)?,
        })
    }
}

impl SourceTable {
    /// Load a source file, dispatching on its extension
    pub fn load(path: &Path, sheet: Option<&str>) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if extension == "csv" {
            Self::from_csv(path)
        } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
            Self::from_workbook(path, sheet)
        } else {
            Err(TaggerError::UnsupportedSource(path.display().to_string()))
        }
    }

    fn from_csv(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| TaggerError::SourceOpen {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let reader = BufReader::new(file);
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut grid = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            grid.push(record.iter().map(parse_value).collect());
        }

        Self::from_grid(path, grid, 1)
    }

    fn from_workbook(path: &Path, sheet: Option<&str>) -> Result<Self> {
        let mut workbook = open_workbook_auto(path).map_err(|e| TaggerError::SourceOpen {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let range = match sheet {
            Some(name) => workbook
                .worksheet_range(name)
                .map_err(|e| TaggerError::SheetNotFound(format!("{}: {}", name, e)))?,
            None => workbook
                .worksheet_range_at(0)
                .ok_or_else(|| TaggerError::EmptySheet(path.display().to_string()))?
                .map_err(|e| TaggerError::SourceOpen {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?,
        };

        // Ranges start at the first used cell, not necessarily row 1
        let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
        let grid = range
            .rows()
            .map(|row| row.iter().map(from_calamine).collect())
            .collect();

        Self::from_grid(path, grid, first_line)
    }

    /// Split a cell grid into header and data rows, dropping blank rows
    fn from_grid(path: &Path, grid: Vec<Vec<CellValue>>, first_line: usize) -> Result<Self> {
        let mut lines = grid.into_iter().enumerate();
        let (_, header_cells) = lines
            .next()
            .ok_or_else(|| TaggerError::EmptySheet(path.display().to_string()))?;

        let mut headers = IndexMap::new();
        for (idx, cell) in header_cells.iter().enumerate() {
            let name = display_text(cell);
            let name = name.trim_start_matches('\u{feff}').trim();
            if !name.is_empty() {
                // First occurrence wins for duplicate headers
                headers.entry(name.to_string()).or_insert(idx);
            }
        }

        let rows = lines
            .filter(|(_, cells)| !cells.iter().all(CellValue::is_empty))
            .map(|(offset, cells)| TableRow {
                line: first_line + offset,
                cells,
            })
            .collect();

        Ok(Self { headers, rows })
    }

    /// Build a table from in-memory header and rows
    pub fn from_rows(headers: &[&str], rows: Vec<Vec<CellValue>>) -> Self {
        let headers = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(offset, cells)| TableRow {
                line: offset + 2,
                cells,
            })
            .collect();
        Self { headers, rows }
    }

    /// Column index for a header, or the missing-column error
    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .get(name)
            .copied()
            .ok_or_else(|| TaggerError::MissingColumn(name.to_string()))
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at a data row and column; short rows read as empty
    pub fn cell(&self, index: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(index)
            .and_then(|row| row.cells.get(col))
            .unwrap_or(&EMPTY)
    }

    /// 1-based source row number of a data row
    pub fn line(&self, index: usize) -> usize {
        self.rows.get(index).map(|row| row.line).unwrap_or_default()
    }

    /// Coerce a data row into the fields of a tag
    pub fn source_row(&self, index: usize, columns: &TagColumns) -> Result<SourceRow> {
        let line = self.line(index);
        Ok(SourceRow {
            item_code: item_code(self.cell(index, columns.item_code), line)?,
            price: integer_price(self.cell(index, columns.price), COL_SELLING_PRICE, line)?,
            product_name: display_text(self.cell(index, columns.product_name)),
            mrp: display_text(self.cell(index, columns.mrp)),
            size: display_text(self.cell(index, columns.size)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_csv_source_skips_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.csv");
        std::fs::write(
            &path,
            "Item Code, Selling Price ,Product Name,MRP,Size\n\
             8901234,199.0,Widget,250,M\n\
             ,,,,\n\
             8905678,99,Gadget,120.5,L\n",
        )
        .unwrap();

        let table = SourceTable::load(&path, None).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column(COL_SELLING_PRICE).unwrap(), 1);
        assert_eq!(table.line(1), 4);

        let columns = TagColumns::resolve(&table).unwrap();
        let row = table.source_row(1, &columns).unwrap();
        assert_eq!(row.item_code, 8905678);
        assert_eq!(row.price, 99);
        assert_eq!(row.mrp, "120.5");
        assert_eq!(row.size, "L");
    }

    #[test]
    fn test_xlsx_source_reads_first_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.xlsx");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (col, header) in ["Item Code", "Selling Price", "Product Name", "MRP", "Size"]
            .iter()
            .enumerate()
        {
            worksheet.write_string(0, col as u16, *header).unwrap();
        }
        worksheet.write_number(1, 0, 8901001234.0).unwrap();
        worksheet.write_number(1, 1, 199.0).unwrap();
        worksheet.write_string(1, 2, "Widget").unwrap();
        worksheet.write_number(1, 3, 250.0).unwrap();
        worksheet.write_string(1, 4, "M").unwrap();
        workbook.save(&path).unwrap();

        let table = SourceTable::load(&path, None).unwrap();
        let columns = TagColumns::resolve(&table).unwrap();
        let row = table.source_row(0, &columns).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(row.item_code, 8901001234);
        assert_eq!(row.price, 199);
        assert_eq!(row.product_name, "Widget");
        assert_eq!(row.mrp, "250");
        assert_eq!(table.line(0), 2);
    }

    #[test]
    fn test_missing_column_is_reported_by_name() {
        let table = SourceTable::from_rows(&["Code", "MRP"], vec![]);
        match table.column(COL_ITEM_CODE) {
            Err(TaggerError::MissingColumn(name)) => assert_eq!(name, "Item Code"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = SourceTable::load(Path::new("products.json"), None);
        assert!(matches!(result, Err(TaggerError::UnsupportedSource(_))));
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let table = SourceTable::from_rows(
            &["Item Code", "Selling Price", "Product Name", "MRP", "Size"],
            vec![vec![CellValue::Integer(1234), CellValue::Float(10.0)]],
        );
        let columns = TagColumns::resolve(&table).unwrap();
        let row = table.source_row(0, &columns).unwrap();
        assert_eq!(row.product_name, "");
        assert_eq!(row.size, "");
    }
}
