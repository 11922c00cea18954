//! Parsing and coercion of source cell values

use calamine::Data;

use crate::error::{Result, TaggerError};
use crate::types::CellValue;

/// Largest magnitude an f64 holds without losing integer precision (2^53)
const MAX_SAFE_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Parse a CSV field and detect its type
pub(crate) fn parse_value(value: &str) -> CellValue {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return CellValue::Empty;
    }

    if let Ok(int_val) = trimmed.parse::<i64>() {
        return CellValue::Integer(int_val);
    }

    if let Ok(float_val) = trimmed.parse::<f64>() {
        if float_val.is_nan() || float_val.is_infinite() {
            return CellValue::Empty;
        }
        return CellValue::Float(float_val);
    }

    if trimmed.eq_ignore_ascii_case("true") {
        return CellValue::Boolean(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return CellValue::Boolean(false);
    }

    CellValue::String(trimmed.to_string())
}

/// Map a calamine cell onto the crate's value type
pub(crate) fn from_calamine(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) if f.is_finite() => CellValue::Float(*f),
        Data::Float(_) => CellValue::Empty,
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::String(s) => CellValue::String(s.clone()),
        // Serial dates stay numeric, ISO strings stay text
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}

/// Truncate a numeric cell toward zero, accepting numeric text
fn truncate_to_integer(value: &CellValue) -> Option<i64> {
    match value {
        CellValue::Integer(i) => Some(*i),
        CellValue::Float(f) if f.is_finite() && f.abs() < MAX_SAFE_FLOAT => Some(f.trunc() as i64),
        CellValue::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Some(i);
            }
            match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() && f.abs() < MAX_SAFE_FLOAT => Some(f.trunc() as i64),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Derive the integer item code of a source row (1-based `row` for messages)
pub(crate) fn item_code(value: &CellValue, row: usize) -> Result<i64> {
    truncate_to_integer(value).ok_or_else(|| TaggerError::InvalidItemCode {
        row,
        value: display_text(value),
    })
}

/// Derive an integer price, truncating any fractional part
pub(crate) fn integer_price(value: &CellValue, column: &str, row: usize) -> Result<i64> {
    truncate_to_integer(value).ok_or_else(|| TaggerError::InvalidNumber {
        row,
        column: column.to_string(),
        value: display_text(value),
    })
}

/// Render a cell as tag text. Integral floats drop their fractional part.
pub(crate) fn display_text(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Integer(i) => i.to_string(),
        CellValue::Float(f) => {
            if f.fract() == 0.0 && f.abs() < MAX_SAFE_FLOAT {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        CellValue::Boolean(b) => if *b { "True" } else { "False" }.to_string(),
        CellValue::String(s) => s.clone(),
    }
}

/// Parse color string (hex #RRGGBB or named color) to u32
pub fn parse_color(color_str: &str) -> std::result::Result<u32, String> {
    let color = color_str.trim();
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() != 6 {
            return Err(format!(
                "Invalid hex color '{}': expected 6 characters after #, got {}",
                color,
                hex.len()
            ));
        }
        u32::from_str_radix(hex, 16).map_err(|_| format!("Invalid hex color: {}", color))
    } else {
        match color.to_lowercase().as_str() {
            "white" => Ok(0xFFFFFF),
            "yellow" => Ok(0xFFFF00),
            "orange" => Ok(0xFFA500),
            "red" => Ok(0xFF0000),
            "green" => Ok(0x00FF00),
            "cyan" => Ok(0x00FFFF),
            "silver" => Ok(0xC0C0C0),
            "gray" | "grey" => Ok(0x808080),
            _ => Err(format!("Unknown color: {}", color)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_types() {
        assert_eq!(parse_value("8901234"), CellValue::Integer(8901234));
        assert_eq!(parse_value(" 199.5 "), CellValue::Float(199.5));
        assert_eq!(parse_value("TRUE"), CellValue::Boolean(true));
        assert_eq!(parse_value("NaN"), CellValue::Empty);
        assert_eq!(parse_value("   "), CellValue::Empty);
        assert_eq!(
            parse_value("Cotton Shirt"),
            CellValue::String("Cotton Shirt".to_string())
        );
    }

    #[test]
    fn test_item_code_truncates_decimals() {
        assert_eq!(item_code(&CellValue::Float(8901234.0), 2).unwrap(), 8901234);
        assert_eq!(item_code(&CellValue::Float(1234.9), 2).unwrap(), 1234);
        assert_eq!(item_code(&CellValue::Integer(42), 2).unwrap(), 42);
        assert_eq!(
            item_code(&CellValue::String(" 5512.0 ".to_string()), 2).unwrap(),
            5512
        );
    }

    #[test]
    fn test_item_code_rejects_non_numeric() {
        let err = item_code(&CellValue::String("ABC-1".to_string()), 7).unwrap_err();
        match err {
            TaggerError::InvalidItemCode { row, value } => {
                assert_eq!(row, 7);
                assert_eq!(value, "ABC-1");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(item_code(&CellValue::Empty, 3).is_err());
        assert!(item_code(&CellValue::Boolean(true), 3).is_err());
    }

    #[test]
    fn test_integer_price() {
        assert_eq!(integer_price(&CellValue::Float(199.0), "Selling Price", 2).unwrap(), 199);
        assert_eq!(integer_price(&CellValue::Float(199.99), "Selling Price", 2).unwrap(), 199);
        assert!(matches!(
            integer_price(&CellValue::String("free".into()), "Selling Price", 4),
            Err(TaggerError::InvalidNumber { row: 4, .. })
        ));
    }

    #[test]
    fn test_display_text() {
        assert_eq!(display_text(&CellValue::Float(250.0)), "250");
        assert_eq!(display_text(&CellValue::Float(249.5)), "249.5");
        assert_eq!(display_text(&CellValue::Integer(42)), "42");
        assert_eq!(display_text(&CellValue::Empty), "");
        assert_eq!(display_text(&CellValue::String("XL".into())), "XL");
    }

    #[test]
    fn test_from_calamine() {
        assert_eq!(from_calamine(&Data::Float(3.0)), CellValue::Float(3.0));
        assert_eq!(from_calamine(&Data::Int(9)), CellValue::Integer(9));
        assert_eq!(from_calamine(&Data::Empty), CellValue::Empty);
        assert_eq!(
            from_calamine(&Data::String("M".into())),
            CellValue::String("M".into())
        );
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#FFFF00").unwrap(), 0xFFFF00);
        assert_eq!(parse_color("Yellow").unwrap(), 0xFFFF00);
        assert!(parse_color("#FFF").is_err());
        assert!(parse_color("chartreuse").is_err());
    }
}
