//! Column access, grouping and facet partitioning shared by both adapters.

use crate::config::Facets;
use crate::data::DataTable;
use crate::error::{PlotError, Result};
use std::cmp::Ordering;
use std::collections::HashMap;

pub(crate) fn unknown_column(table: &dyn DataTable, column: &str) -> PlotError {
    PlotError::UnknownColumn {
        column: column.to_string(),
        available: table.column_names().join(", "),
    }
}

/// Cell text of a column.
pub fn text_column(table: &dyn DataTable, column: &str) -> Result<Vec<String>> {
    table
        .column(column)
        .map(|cells| cells.into_iter().map(str::to_string).collect())
        .ok_or_else(|| unknown_column(table, column))
}

/// Numeric values of a column. Empty cells become NaN and are skipped by the renderers.
pub fn numeric_column(table: &dyn DataTable, column: &str) -> Result<Vec<f64>> {
    let cells = table
        .column(column)
        .ok_or_else(|| unknown_column(table, column))?;
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| parse_cell(column, cell, row))
        .collect()
}

fn parse_cell(column: &str, cell: &str, row: usize) -> Result<f64> {
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| PlotError::NonNumeric {
        column: column.to_string(),
        value: cell.to_string(),
        row: row + 1,
    })
}

/// True when every non-empty cell parses as a number.
pub fn is_numeric(cells: &[String]) -> bool {
    let mut any = false;
    for c in cells.iter().filter(|c| !c.is_empty()) {
        if c.parse::<f64>().is_err() {
            return false;
        }
        any = true;
    }
    any
}

/// Distinct values, numerically sorted when they are all numbers, lexically otherwise.
pub fn distinct(cells: &[String]) -> Vec<String> {
    let mut values: Vec<String> = cells.to_vec();
    if is_numeric(&values) {
        values.sort_by(|a, b| {
            let (a, b) = (a.parse::<f64>().unwrap_or(f64::NAN), b.parse::<f64>().unwrap_or(f64::NAN));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        });
    } else {
        values.sort();
    }
    values.dedup();
    values
}

/// Row indices grouped by the value of `cells`, in [`distinct`] order.
pub fn group_rows(cells: &[String], rows: &[usize]) -> Vec<(String, Vec<usize>)> {
    let mut by_key: HashMap<&str, Vec<usize>> = HashMap::new();
    for &r in rows {
        if let Some(cell) = cells.get(r) {
            by_key.entry(cell.as_str()).or_default().push(r);
        }
    }
    let present: Vec<String> = rows.iter().filter_map(|&r| cells.get(r).cloned()).collect();
    distinct(&present)
        .into_iter()
        .filter_map(|key| {
            let idx = by_key.remove(key.as_str())?;
            Some((key, idx))
        })
        .collect()
}

/// One small multiple: its grid position, strip label and the rows it draws.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetPanel {
    pub row: usize,
    pub col: usize,
    pub label: Option<String>,
    pub rows: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FacetGrid {
    pub nrow: usize,
    pub ncol: usize,
    pub panels: Vec<FacetPanel>,
}

impl FacetGrid {
    fn single(n_rows: usize) -> Self {
        FacetGrid {
            nrow: 1,
            ncol: 1,
            panels: vec![FacetPanel {
                row: 0,
                col: 0,
                label: None,
                rows: (0..n_rows).collect(),
            }],
        }
    }
}

/// Square-ish grid for `n` wrapped panels.
pub fn wrap_dimensions(n: usize) -> (usize, usize) {
    if n == 0 {
        return (1, 1);
    }
    let ncol = (n as f64).sqrt().ceil() as usize;
    let nrow = (n as f64 / ncol as f64).ceil() as usize;
    (nrow, ncol)
}

/// Split the table's rows into facet panels.
pub fn partition(table: &dyn DataTable, facets: &Facets) -> Result<FacetGrid> {
    let all: Vec<usize> = (0..table.row_count()).collect();

    if let Some(wrap) = &facets.wrap {
        let cells = text_column(table, wrap)?;
        let groups = group_rows(&cells, &all);
        let (nrow, ncol) = wrap_dimensions(groups.len());
        let panels = groups
            .into_iter()
            .enumerate()
            .map(|(i, (key, rows))| FacetPanel {
                row: i / ncol,
                col: i % ncol,
                label: Some(format!("{} = {}", wrap, key)),
                rows,
            })
            .collect();
        return Ok(FacetGrid { nrow, ncol, panels });
    }

    if facets.rows.is_none() && facets.cols.is_none() {
        return Ok(FacetGrid::single(all.len()));
    }

    let row_groups = match &facets.rows {
        Some(c) => group_rows(&text_column(table, c)?, &all),
        None => vec![(String::new(), all.clone())],
    };
    let col_groups = match &facets.cols {
        Some(c) => group_rows(&text_column(table, c)?, &all),
        None => vec![(String::new(), all.clone())],
    };

    let mut panels = Vec::with_capacity(row_groups.len() * col_groups.len());
    for (r, (row_key, row_idx)) in row_groups.iter().enumerate() {
        for (c, (col_key, col_idx)) in col_groups.iter().enumerate() {
            let rows: Vec<usize> = row_idx
                .iter()
                .copied()
                .filter(|i| col_idx.binary_search(i).is_ok())
                .collect();
            let label = match (&facets.rows, &facets.cols) {
                (Some(_), Some(_)) => format!("{} | {}", row_key, col_key),
                (Some(_), None) => row_key.clone(),
                _ => col_key.clone(),
            };
            panels.push(FacetPanel {
                row: r,
                col: c,
                label: Some(label),
                rows,
            });
        }
    }

    Ok(FacetGrid {
        nrow: row_groups.len(),
        ncol: col_groups.len(),
        panels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PlotData;

    fn table() -> PlotData {
        PlotData::from_columns([
            ("x", vec!["1", "2", "3", "4"]),
            ("g", vec!["b", "a", "b", "a"]),
            ("h", vec!["u", "u", "v", "v"]),
            ("bad", vec!["1", "oops", "", "2"]),
        ])
    }

    #[test]
    fn test_numeric_column() {
        let t = table();
        assert_eq!(numeric_column(&t, "x").unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_numeric_column_reports_row() {
        let t = table();
        match numeric_column(&t, "bad").unwrap_err() {
            PlotError::NonNumeric { value, row, .. } => {
                assert_eq!(value, "oops");
                assert_eq!(row, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_column_lists_available() {
        let t = table();
        match text_column(&t, "nope").unwrap_err() {
            PlotError::UnknownColumn { column, available } => {
                assert_eq!(column, "nope");
                assert_eq!(available, "x, g, h, bad");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_distinct_numeric_order() {
        let cells: Vec<String> = ["10", "9", "10", "100"].iter().map(|s| s.to_string()).collect();
        assert_eq!(distinct(&cells), vec!["9", "10", "100"]);
    }

    #[test]
    fn test_group_rows() {
        let t = table();
        let cells = text_column(&t, "g").unwrap();
        let groups = group_rows(&cells, &[0, 1, 2, 3]);
        assert_eq!(groups, vec![("a".to_string(), vec![1, 3]), ("b".to_string(), vec![0, 2])]);
    }

    #[test]
    fn test_partition_wrap() {
        let t = table();
        let grid = partition(&t, &Facets { wrap: Some("g".into()), ..Facets::default() }).unwrap();
        assert_eq!((grid.nrow, grid.ncol), (1, 2));
        assert_eq!(grid.panels[0].label.as_deref(), Some("g = a"));
        assert_eq!(grid.panels[1].rows, vec![0, 2]);
    }

    #[test]
    fn test_partition_grid() {
        let t = table();
        let facets = Facets {
            rows: Some("g".into()),
            cols: Some("h".into()),
            wrap: None,
        };
        let grid = partition(&t, &facets).unwrap();
        assert_eq!((grid.nrow, grid.ncol), (2, 2));
        assert_eq!(grid.panels.len(), 4);
        assert_eq!(grid.panels[0].label.as_deref(), Some("a | u"));
        assert_eq!(grid.panels[0].rows, vec![1]);
    }

    #[test]
    fn test_partition_none() {
        let t = table();
        let grid = partition(&t, &Facets::default()).unwrap();
        assert_eq!(grid.panels.len(), 1);
        assert_eq!(grid.panels[0].rows.len(), 4);
    }

    #[test]
    fn test_wrap_dimensions() {
        assert_eq!(wrap_dimensions(1), (1, 1));
        assert_eq!(wrap_dimensions(3), (2, 2));
        assert_eq!(wrap_dimensions(5), (2, 3));
    }
}
