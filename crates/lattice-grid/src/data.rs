//! Data providers: the leaf data sources a layer stack is built on.
//!
//! A [`DataProvider`] answers by column and row *index*. The innermost
//! [`DataLayer`](crate::layer::DataLayer) is the only layer that talks to it;
//! every other layer reaches data through position translation.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// A cell value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    /// No data.
    #[default]
    Empty,
    /// Text data.
    Text(String),
    /// Integer data.
    Int(i64),
    /// Floating point data.
    Float(f64),
    /// Boolean data.
    Bool(bool),
}

impl CellValue {
    /// Returns `true` if this is `CellValue::Empty`.
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Attempts to get the value as a string slice.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to get the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CellValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Int(n) => write!(f, "{n}"),
            CellValue::Float(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Int(n as i64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Float(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// The leaf data source of a layer stack.
///
/// Implementations use interior mutability; a provider is shared between the
/// data layer and the host that owns the data.
pub trait DataProvider: Send + Sync {
    /// Number of columns.
    fn column_count(&self) -> usize;

    /// Number of rows.
    fn row_count(&self) -> usize;

    /// Value at the given indices, `None` when out of range.
    fn data_value(&self, column_index: usize, row_index: usize) -> Option<CellValue>;

    /// Stores a value. Returns `false` if the provider rejected it.
    fn set_data_value(&self, column_index: usize, row_index: usize, value: CellValue) -> bool;
}

/// A row-major, in-memory provider.
pub struct VecDataProvider {
    column_count: usize,
    rows: RwLock<Vec<Vec<CellValue>>>,
}

impl VecDataProvider {
    /// Creates a provider; rows shorter than `column_count` read as empty.
    pub fn new(column_count: usize, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            column_count,
            rows: RwLock::new(rows),
        }
    }

    /// Inserts a row at `index` (clamped to the row count) and returns where it went.
    pub fn insert_row(&self, index: usize, row: Vec<CellValue>) -> usize {
        let mut rows = self.rows.write();
        let index = index.min(rows.len());
        rows.insert(index, row);
        index
    }

    /// Removes the row at `index`.
    pub fn remove_row(&self, index: usize) -> Option<Vec<CellValue>> {
        let mut rows = self.rows.write();
        (index < rows.len()).then(|| rows.remove(index))
    }
}

impl DataProvider for VecDataProvider {
    fn column_count(&self) -> usize {
        self.column_count
    }

    fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    fn data_value(&self, column_index: usize, row_index: usize) -> Option<CellValue> {
        if column_index >= self.column_count {
            return None;
        }
        let rows = self.rows.read();
        let row = rows.get(row_index)?;
        Some(row.get(column_index).cloned().unwrap_or_default())
    }

    fn set_data_value(&self, column_index: usize, row_index: usize, value: CellValue) -> bool {
        if column_index >= self.column_count {
            return false;
        }
        let mut rows = self.rows.write();
        let Some(row) = rows.get_mut(row_index) else {
            return false;
        };
        if row.len() <= column_index {
            row.resize(column_index + 1, CellValue::Empty);
        }
        row[column_index] = value;
        true
    }
}

/// A read-only provider whose values are `"column, row"`.
#[derive(Debug, Clone, Copy)]
pub struct DummyDataProvider {
    column_count: usize,
    row_count: usize,
}

impl DummyDataProvider {
    /// Creates a provider of the given dimensions.
    pub fn new(column_count: usize, row_count: usize) -> Self {
        Self {
            column_count,
            row_count,
        }
    }
}

impl DataProvider for DummyDataProvider {
    fn column_count(&self) -> usize {
        self.column_count
    }

    fn row_count(&self) -> usize {
        self.row_count
    }

    fn data_value(&self, column_index: usize, row_index: usize) -> Option<CellValue> {
        (column_index < self.column_count && row_index < self.row_count)
            .then(|| CellValue::Text(format!("{column_index}, {row_index}")))
    }

    fn set_data_value(&self, _column_index: usize, _row_index: usize, _value: CellValue) -> bool {
        false
    }
}

/// One header row naming the columns of a body provider.
///
/// Columns without an explicit name are numbered from 1.
pub struct ColumnHeaderDataProvider {
    body: Arc<dyn DataProvider>,
    names: RwLock<Vec<String>>,
}

impl ColumnHeaderDataProvider {
    /// Creates a header over `body` with the given names.
    pub fn new(body: Arc<dyn DataProvider>, names: Vec<String>) -> Self {
        Self {
            body,
            names: RwLock::new(names),
        }
    }
}

impl DataProvider for ColumnHeaderDataProvider {
    fn column_count(&self) -> usize {
        self.body.column_count()
    }

    fn row_count(&self) -> usize {
        1
    }

    fn data_value(&self, column_index: usize, row_index: usize) -> Option<CellValue> {
        if row_index != 0 || column_index >= self.column_count() {
            return None;
        }
        let name = self
            .names
            .read()
            .get(column_index)
            .cloned()
            .unwrap_or_else(|| format!("Column {}", column_index + 1));
        Some(CellValue::Text(name))
    }

    fn set_data_value(&self, column_index: usize, row_index: usize, value: CellValue) -> bool {
        if row_index != 0 || column_index >= self.column_count() {
            return false;
        }
        let mut names = self.names.write();
        if names.len() <= column_index {
            let start = names.len();
            names.extend((start..=column_index).map(|i| format!("Column {}", i + 1)));
        }
        names[column_index] = value.to_string();
        true
    }
}

/// One header column numbering the rows of a body provider from 1.
pub struct RowHeaderDataProvider {
    body: Arc<dyn DataProvider>,
}

impl RowHeaderDataProvider {
    /// Creates a header over `body`.
    pub fn new(body: Arc<dyn DataProvider>) -> Self {
        Self { body }
    }
}

impl DataProvider for RowHeaderDataProvider {
    fn column_count(&self) -> usize {
        1
    }

    fn row_count(&self) -> usize {
        self.body.row_count()
    }

    fn data_value(&self, column_index: usize, row_index: usize) -> Option<CellValue> {
        (column_index == 0 && row_index < self.row_count())
            .then(|| CellValue::Int(row_index as i64 + 1))
    }

    fn set_data_value(&self, _column_index: usize, _row_index: usize, _value: CellValue) -> bool {
        false
    }
}

/// The single empty corner cell of a grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct CornerDataProvider;

impl DataProvider for CornerDataProvider {
    fn column_count(&self) -> usize {
        1
    }

    fn row_count(&self) -> usize {
        1
    }

    fn data_value(&self, column_index: usize, row_index: usize) -> Option<CellValue> {
        (column_index == 0 && row_index == 0).then_some(CellValue::Empty)
    }

    fn set_data_value(&self, _column_index: usize, _row_index: usize, _value: CellValue) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_provider_reads_and_writes() {
        let provider = VecDataProvider::new(
            2,
            vec![vec!["a".into(), 1.into()], vec!["b".into()]],
        );
        assert_eq!(provider.row_count(), 2);
        assert_eq!(provider.data_value(1, 0), Some(CellValue::Int(1)));
        assert_eq!(provider.data_value(1, 1), Some(CellValue::Empty));
        assert_eq!(provider.data_value(2, 0), None);

        assert!(provider.set_data_value(1, 1, true.into()));
        assert_eq!(provider.data_value(1, 1), Some(CellValue::Bool(true)));
        assert!(!provider.set_data_value(0, 5, "x".into()));
    }

    #[test]
    fn test_vec_provider_row_edits() {
        let provider = VecDataProvider::new(1, vec![vec![1.into()], vec![3.into()]]);
        assert_eq!(provider.insert_row(1, vec![2.into()]), 1);
        assert_eq!(provider.data_value(0, 1), Some(CellValue::Int(2)));
        assert_eq!(provider.remove_row(0), Some(vec![CellValue::Int(1)]));
        assert_eq!(provider.remove_row(7), None);
        assert_eq!(provider.row_count(), 2);
    }

    #[test]
    fn test_dummy_provider() {
        let provider = DummyDataProvider::new(3, 2);
        assert_eq!(provider.data_value(2, 1), Some(CellValue::from("2, 1")));
        assert_eq!(provider.data_value(3, 1), None);
        assert!(!provider.set_data_value(0, 0, CellValue::Empty));
    }

    #[test]
    fn test_header_providers_follow_body() {
        let body: Arc<dyn DataProvider> = Arc::new(DummyDataProvider::new(3, 4));
        let columns = ColumnHeaderDataProvider::new(body.clone(), vec!["Name".into()]);
        assert_eq!(columns.column_count(), 3);
        assert_eq!(columns.data_value(0, 0), Some(CellValue::from("Name")));
        assert_eq!(columns.data_value(2, 0), Some(CellValue::from("Column 3")));
        assert!(columns.set_data_value(2, 0, "Total".into()));
        assert_eq!(columns.data_value(2, 0), Some(CellValue::from("Total")));

        let rows = RowHeaderDataProvider::new(body);
        assert_eq!(rows.row_count(), 4);
        assert_eq!(rows.data_value(0, 3), Some(CellValue::Int(4)));
        assert_eq!(CornerDataProvider.data_value(0, 0), Some(CellValue::Empty));
    }
}
