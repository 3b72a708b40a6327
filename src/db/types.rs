//! SQL Server to gateway value mappings.
//!
//! Scalar columns map directly from `ColumnData`. Date and time columns go
//! through tiberius' chrono getters. A cell that cannot be converted is an
//! error; it is never replaced by NULL.

use crate::models::Value;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{ColumnData, FromSql};

/// Failed to convert a single cell.
#[derive(Debug, thiserror::Error)]
#[error("column '{column}': {message}")]
pub struct CellError {
    pub column: String,
    pub message: String,
}

/// Column names from result metadata, in order.
pub(crate) fn column_names(columns: &[tiberius::Column]) -> Vec<String> {
    columns.iter().map(|col| col.name().to_string()).collect()
}

/// Convert every cell of a row, in column order.
pub(crate) fn row_values(row: &tiberius::Row) -> Result<Vec<Value>, CellError> {
    row.cells()
        .map(|(column, data)| {
            convert_cell(data).map_err(|message| CellError {
                column: column.name().to_string(),
                message,
            })
        })
        .collect()
}

/// Convert one cell. NULLs of any type map to `Value::Null`.
pub(crate) fn convert_cell(data: &ColumnData<'static>) -> Result<Value, String> {
    let value = match data {
        ColumnData::Bit(Some(b)) => Value::Bool(*b),
        ColumnData::U8(Some(v)) => Value::Int(i64::from(*v)),
        ColumnData::I16(Some(v)) => Value::Int(i64::from(*v)),
        ColumnData::I32(Some(v)) => Value::Int(i64::from(*v)),
        ColumnData::I64(Some(v)) => Value::Int(*v),
        ColumnData::F32(Some(v)) => Value::Float(f64::from(*v)),
        ColumnData::F64(Some(v)) => Value::Float(*v),
        // Keep exact decimal text rather than rounding through f64
        ColumnData::Numeric(Some(n)) => Value::Decimal(n.to_string()),
        ColumnData::String(Some(s)) => Value::Text(s.to_string()),
        ColumnData::Guid(Some(g)) => Value::Uuid(g.to_string()),
        ColumnData::Binary(Some(b)) => Value::Bytes(b.to_vec()),
        ColumnData::Xml(Some(xml)) => Value::Text(xml.to_string()),
        ColumnData::DateTime(Some(_))
        | ColumnData::SmallDateTime(Some(_))
        | ColumnData::DateTime2(Some(_)) => Value::DateTime(chrono_value::<NaiveDateTime>(data)?),
        ColumnData::DateTimeOffset(Some(_)) => {
            Value::DateTimeOffset(chrono_value::<DateTime<FixedOffset>>(data)?)
        }
        ColumnData::Date(Some(_)) => Value::Date(chrono_value::<NaiveDate>(data)?),
        ColumnData::Time(Some(_)) => Value::Time(chrono_value::<NaiveTime>(data)?),
        _ => Value::Null,
    };
    Ok(value)
}

fn chrono_value<'a, T>(data: &'a ColumnData<'static>) -> Result<T, String>
where
    T: FromSql<'a>,
{
    match T::from_sql(data) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err("unexpected NULL".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_convert_integers_widen_to_i64() {
        assert_eq!(convert_cell(&ColumnData::U8(Some(7))).unwrap(), Value::Int(7));
        assert_eq!(convert_cell(&ColumnData::I16(Some(-3))).unwrap(), Value::Int(-3));
        assert_eq!(
            convert_cell(&ColumnData::I32(Some(i32::MAX))).unwrap(),
            Value::Int(i64::from(i32::MAX))
        );
        assert_eq!(convert_cell(&ColumnData::I64(Some(42))).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_convert_nulls() {
        assert_eq!(convert_cell(&ColumnData::I32(None)).unwrap(), Value::Null);
        assert_eq!(convert_cell(&ColumnData::String(None)).unwrap(), Value::Null);
        assert_eq!(convert_cell(&ColumnData::DateTime2(None)).unwrap(), Value::Null);
    }

    #[test]
    fn test_convert_text_and_binary() {
        assert_eq!(
            convert_cell(&ColumnData::String(Some(Cow::Borrowed("alice")))).unwrap(),
            Value::Text("alice".to_string())
        );
        assert_eq!(
            convert_cell(&ColumnData::Binary(Some(Cow::Owned(vec![0xde, 0xad])))).unwrap(),
            Value::Bytes(vec![0xde, 0xad])
        );
        assert_eq!(
            convert_cell(&ColumnData::Bit(Some(true))).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_convert_numeric_keeps_scale() {
        let n = tiberius::numeric::Numeric::new_with_scale(1250, 2);
        assert_eq!(
            convert_cell(&ColumnData::Numeric(Some(n))).unwrap(),
            Value::Decimal("12.50".to_string())
        );
    }
}
