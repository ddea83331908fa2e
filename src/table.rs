//! Flat tabular records with a fixed column set, written as `;`-delimited text.
//!
//! Rows are built as ordered name/value pairs; a table unions the columns of
//! all its rows in first-seen order. A cell missing from a row (the feeds
//! attach different stat keys to different players) materializes as `0`.

use std::path::Path;

use anyhow::{Context, Result};

/// A single cell value. Distinct from raw strings so numeric defaults render
/// as `0` / `0.0` rather than "".
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn render(&self) -> String {
        match self {
            Cell::Int(v) => v.to_string(),
            Cell::Float(v) => v.to_string(),
            Cell::Text(v) => v.clone(),
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

/// One record: ordered (column, cell) pairs.
#[derive(Debug, Clone, Default)]
pub struct Row {
    fields: Vec<(String, Cell)>,
}

impl Row {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Cell>) {
        self.fields.push((column.into(), value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }
}

/// An ordered sequence of uniformly-shaped records.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table from rows, unioning column names in first-seen order.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for (name, _) in &row.fields {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.clone());
                }
            }
        }
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Prefix a constant-valued column (league/season identifiers go first).
    pub fn insert_front(&mut self, column: impl Into<String>, value: impl Into<Cell>) {
        let column = column.into();
        let value = value.into();
        self.columns.insert(0, column.clone());
        for row in &mut self.rows {
            row.fields.insert(0, (column.clone(), value.clone()));
        }
    }

    /// Stack tables describing disjoint entities; columns are unioned.
    pub fn concat(tables: Vec<Table>) -> Table {
        let rows = tables.into_iter().flat_map(|t| t.rows).collect();
        Table::from_rows(rows)
    }

    /// Inner join on a key column: a row of `self` survives only when `other`
    /// has a row with an equal key, and gains that row's remaining columns.
    /// Rows present on one side only are dropped, never padded.
    pub fn inner_join(&self, other: &Table, on: &str) -> Table {
        let mut rows = Vec::new();
        for left in &self.rows {
            let Some(key) = left.get(on) else { continue };
            let Some(right) = other.rows.iter().find(|r| r.get(on) == Some(key)) else {
                continue;
            };
            let mut joined = left.clone();
            for (name, cell) in &right.fields {
                if name != on {
                    joined.fields.push((name.clone(), cell.clone()));
                }
            }
            rows.push(joined);
        }
        Table::from_rows(rows)
    }

    /// Sort rows ascending by an integer column; rows missing it sort first.
    pub fn sort_by_int(&mut self, column: &str) {
        self.rows.sort_by_key(|row| match row.get(column) {
            Some(Cell::Int(v)) => *v,
            _ => 0,
        });
    }

    /// Write the table as `;`-separated text with a header row.
    pub fn write_delimited(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|col| row.get(col).map(Cell::render).unwrap_or_else(|| "0".into()))
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Cell)]) -> Row {
        let mut r = Row::new();
        for (name, cell) in pairs {
            r.push(*name, cell.clone());
        }
        r
    }

    #[test]
    fn column_union_preserves_first_seen_order() {
        let t = Table::from_rows(vec![
            row(&[("a", 1.into()), ("b", 2.into())]),
            row(&[("a", 3.into()), ("c", 4.into())]),
        ]);
        assert_eq!(t.columns(), ["a", "b", "c"]);
    }

    #[test]
    fn missing_cells_render_as_zero() {
        let t = Table::from_rows(vec![
            row(&[("a", 1.into()), ("b", 2.into())]),
            row(&[("a", 3.into())]),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        t.write_delimited(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "a;b\n1;2\n3;0\n");
    }

    #[test]
    fn inner_join_drops_unmatched_teams() {
        let left = Table::from_rows(vec![
            row(&[("team", "X".into()), ("pts", 10.into())]),
            row(&[("team", "Y".into()), ("pts", 8.into())]),
        ]);
        let right = Table::from_rows(vec![row(&[("team", "Y".into()), ("home_pts", 5.into())])]);
        let joined = left.inner_join(&right, "team");
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.rows()[0].get("team"), Some(&Cell::Text("Y".into())));
        assert_eq!(joined.rows()[0].get("home_pts"), Some(&Cell::Int(5)));
    }

    #[test]
    fn inner_join_full_match_keeps_all_rows() {
        let names = ["A", "B", "C"];
        let left = Table::from_rows(
            names
                .iter()
                .map(|n| row(&[("team", (*n).into()), ("pts", 1.into())]))
                .collect(),
        );
        let right = Table::from_rows(
            names
                .iter()
                .map(|n| row(&[("team", (*n).into()), ("extra", 2.into())]))
                .collect(),
        );
        assert_eq!(left.inner_join(&right, "team").len(), 3);
    }

    #[test]
    fn insert_front_prefixes_every_row() {
        let mut t = Table::from_rows(vec![row(&[("a", 1.into())])]);
        t.insert_front("season", "2425");
        t.insert_front("league", Cell::Int(73));
        assert_eq!(t.columns(), ["league", "season", "a"]);
        assert_eq!(t.rows()[0].get("league"), Some(&Cell::Int(73)));
    }

    #[test]
    fn concat_stacks_rows() {
        let a = Table::from_rows(vec![row(&[("side", "home".into())])]);
        let b = Table::from_rows(vec![row(&[("side", "away".into())])]);
        assert_eq!(Table::concat(vec![a, b]).len(), 2);
    }

    #[test]
    fn sort_orders_by_position() {
        let mut t = Table::from_rows(vec![
            row(&[("pos", 3.into())]),
            row(&[("pos", 1.into())]),
            row(&[("pos", 2.into())]),
        ]);
        t.sort_by_int("pos");
        let order: Vec<_> = t.rows().iter().map(|r| r.get("pos").cloned()).collect();
        assert_eq!(
            order,
            vec![Some(Cell::Int(1)), Some(Cell::Int(2)), Some(Cell::Int(3))]
        );
    }
}
