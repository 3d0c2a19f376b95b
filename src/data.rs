use crate::error::{PlotError, Result};
use serde_json::Value;
use std::fmt;
use std::io::Read;

/// Tabular input with named columns.
///
/// The plot core only asks whether a column exists; renderers read the cell text.
/// Implementations must be read-only: nothing in pipeplot mutates a table.
pub trait DataTable: fmt::Debug + Send + Sync {
    fn column_names(&self) -> Vec<String>;

    fn row_count(&self) -> usize;

    /// Cell values of a column, in row order. `None` if the column does not exist.
    fn column(&self, name: &str) -> Option<Vec<&str>>;

    fn has_column(&self, name: &str) -> bool {
        self.column_names().iter().any(|c| c == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl PlotData {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from `(name, values)` pairs. Shorter columns are padded with empty cells.
    pub fn from_columns<N, V, I>(columns: I) -> Self
    where
        N: Into<String>,
        V: ToString,
        I: IntoIterator<Item = (N, Vec<V>)>,
    {
        let mut headers = Vec::new();
        let mut values: Vec<Vec<String>> = Vec::new();
        for (name, col) in columns {
            headers.push(name.into());
            values.push(col.iter().map(|v| v.to_string()).collect());
        }

        let n_rows = values.iter().map(Vec::len).max().unwrap_or(0);
        let rows = (0..n_rows)
            .map(|r| {
                values
                    .iter()
                    .map(|col| col.get(r).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    /// Read CSV with a header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(PlotError::EmptyData("CSV input has no header row".to_string()));
        }

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            return Err(PlotError::EmptyData(
                "CSV input must contain at least one data row".to_string(),
            ));
        }

        Ok(Self { headers, rows })
    }

    /// Create PlotData from a JSON array of objects
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value.as_array().ok_or_else(|| {
            PlotError::InvalidArgument("input data must be a JSON array of objects".to_string())
        })?;

        let first_obj = array
            .first()
            .ok_or_else(|| PlotError::EmptyData("input data array is empty".to_string()))?
            .as_object()
            .ok_or_else(|| PlotError::InvalidArgument("items in array must be objects".to_string()))?;

        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item.as_object().ok_or_else(|| {
                PlotError::InvalidArgument("items in array must be objects".to_string())
            })?;

            let mut row = Vec::with_capacity(headers.len());
            for header in &headers {
                let cell = match obj.get(header) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Bool(b)) => b.to_string(),
                    Some(Value::Null) | None => String::new(),
                    _ => {
                        return Err(PlotError::InvalidArgument(format!(
                            "unsupported value type for field '{}'",
                            header
                        )))
                    }
                };
                row.push(cell);
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

impl DataTable for PlotData {
    fn column_names(&self) -> Vec<String> {
        self.headers.clone()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.index_of(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    fn has_column(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_csv_reader() {
        let csv = "x, y\n1, 10\n2, 20\n";
        let data = PlotData::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(data.headers, vec!["x", "y"]);
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.column("y").unwrap(), vec!["10", "20"]);
    }

    #[test]
    fn test_from_csv_reader_no_rows() {
        let result = PlotData::from_csv_reader("x,y\n".as_bytes());
        assert!(matches!(result, Err(PlotError::EmptyData(_))));
    }

    #[test]
    fn test_from_columns_pads_short_columns() {
        let data = PlotData::from_columns([("a", vec![1, 2, 3]), ("b", vec![4])]);
        assert_eq!(data.row_count(), 3);
        assert_eq!(data.column("b").unwrap(), vec!["4", "", ""]);
    }

    #[test]
    fn test_from_json() {
        let value = json!([
            {"city": "Oslo", "temp": 3.5},
            {"city": "Rome", "temp": 18}
        ]);
        let data = PlotData::from_json(&value).unwrap();
        assert!(data.has_column("city"));
        assert_eq!(data.column("temp").unwrap(), vec!["3.5", "18"]);
    }

    #[test]
    fn test_from_json_rejects_nested_values() {
        let value = json!([{"a": [1, 2]}]);
        assert!(PlotData::from_json(&value).is_err());
    }

    #[test]
    fn test_missing_column() {
        let data = PlotData::from_columns([("a", vec![1])]);
        assert!(data.column("b").is_none());
        assert!(!data.has_column("b"));
    }
}
