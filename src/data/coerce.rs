use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use super::model::{CellValue, ColumnType};

/// A cell as a reader produced it, before the schema's type is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Empty,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Coerce a raw cell to `ty`. Anything that does not fit becomes `Null`.
pub fn coerce(raw: &RawCell, ty: ColumnType) -> CellValue {
    match ty {
        ColumnType::Str => to_text(raw),
        ColumnType::Int => to_int(raw),
        ColumnType::Float => to_float(raw),
        ColumnType::Date => to_date(raw),
    }
}

fn to_text(raw: &RawCell) -> CellValue {
    match raw {
        RawCell::Text(s) if s.trim().is_empty() => CellValue::Null,
        RawCell::Text(s) => CellValue::Str(s.clone()),
        RawCell::Int(i) => CellValue::Str(i.to_string()),
        RawCell::Float(v) if v.fract() == 0.0 && v.is_finite() => {
            CellValue::Str(format!("{v:.0}"))
        }
        RawCell::Float(v) => CellValue::Str(v.to_string()),
        RawCell::Bool(b) => CellValue::Str(b.to_string()),
        RawCell::DateTime(d) => CellValue::Str(format_datetime_text(d)),
        RawCell::Empty => CellValue::Null,
    }
}

/// Spreadsheets store a bare time of day as a datetime on the epoch day.
fn format_datetime_text(d: &NaiveDateTime) -> String {
    let epoch_end = NaiveDate::from_ymd_opt(1900, 1, 2).unwrap_or(NaiveDate::MIN);
    if d.date() < epoch_end {
        d.format("%H:%M:%S").to_string()
    } else if d.time() == NaiveTime::MIN {
        d.format("%Y-%m-%d").to_string()
    } else {
        d.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn to_int(raw: &RawCell) -> CellValue {
    match raw {
        RawCell::Int(i) => CellValue::Int(*i),
        RawCell::Float(v) => float_as_int(*v),
        RawCell::Text(s) => {
            let t = s.trim();
            if let Ok(i) = t.parse::<i64>() {
                CellValue::Int(i)
            } else if let Ok(v) = t.parse::<f64>() {
                float_as_int(v)
            } else {
                CellValue::Null
            }
        }
        RawCell::Bool(_) | RawCell::DateTime(_) | RawCell::Empty => CellValue::Null,
    }
}

fn float_as_int(v: f64) -> CellValue {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        CellValue::Int(v as i64)
    } else {
        CellValue::Null
    }
}

fn to_float(raw: &RawCell) -> CellValue {
    match raw {
        RawCell::Int(i) => CellValue::from(*i as f64),
        RawCell::Float(v) if v.is_finite() => CellValue::from(*v),
        RawCell::Text(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => CellValue::from(v),
            _ => CellValue::Null,
        },
        _ => CellValue::Null,
    }
}

fn to_date(raw: &RawCell) -> CellValue {
    match raw {
        RawCell::DateTime(d) => CellValue::Date(*d),
        RawCell::Text(s) => parse_datetime(s).map(CellValue::Date).unwrap_or(CellValue::Null),
        _ => CellValue::Null,
    }
}

/// Parse the date/timestamp spellings the dashboards' sources use.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(d) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|d| d.naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    #[test]
    fn dates_in_several_spellings() {
        let expected = NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(9, 40, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-07-01 09:40:00"), Some(expected));
        assert_eq!(parse_datetime("2024-07-01T09:40:00.000"), Some(expected));
        assert_eq!(parse_datetime("01/07/2024 09:40"), Some(expected));
        assert_eq!(
            parse_datetime("2024-07-01"),
            Some(expected.date().and_time(NaiveTime::MIN))
        );
        assert_eq!(parse_datetime("not a date"), None);
        assert_eq!(parse_datetime("2024-13-01"), None);
    }

    #[test]
    fn numbers_coerce_or_go_missing() {
        assert_eq!(coerce(&text(" 42 "), ColumnType::Int), CellValue::Int(42));
        assert_eq!(coerce(&text("3.0"), ColumnType::Int), CellValue::Int(3));
        assert_eq!(coerce(&text("3.5"), ColumnType::Int), CellValue::Null);
        assert_eq!(coerce(&text("12.5"), ColumnType::Float), CellValue::Float(12.5));
        assert_eq!(coerce(&text("abc"), ColumnType::Float), CellValue::Null);
        assert_eq!(coerce(&RawCell::Int(7), ColumnType::Float), CellValue::Float(7.0));
        assert_eq!(coerce(&text(""), ColumnType::Float), CellValue::Null);
    }

    #[test]
    fn text_from_other_cells() {
        assert_eq!(coerce(&RawCell::Float(2024.0), ColumnType::Str), CellValue::from("2024"));
        assert_eq!(coerce(&text("   "), ColumnType::Str), CellValue::Null);
        let time_only = NaiveDate::from_ymd_opt(1899, 12, 31)
            .unwrap()
            .and_hms_opt(13, 40, 0)
            .unwrap();
        assert_eq!(
            coerce(&RawCell::DateTime(time_only), ColumnType::Str),
            CellValue::from("13:40:00")
        );
    }
}
