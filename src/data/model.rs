use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Value – a single cell in a table column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common DataFrame dtypes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDateTime),
    /// Missing entry.
    Null,
}

impl fmt::Display for Value {
    /// Renders the value the way it is written to text outputs; `Null`
    /// renders as the empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) if d.time().num_seconds_from_midnight() == 0 && d.nanosecond() == 0 => {
                write!(f, "{}", d.format("%Y-%m-%d"))
            }
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::Null => Ok(()),
        }
    }
}

impl Value {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `Null`, or a float that is NaN or infinite. Imputation treats both
    /// as gaps.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(v) => !v.is_finite(),
            _ => false,
        }
    }

    /// Short dtype name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Null => "null",
        }
    }

    /// Infer a typed value from a text cell: empty or an NA marker → `Null`,
    /// then integer, float, boolean, falling back to string.
    pub fn infer(s: &str) -> Value {
        if s.is_empty() || NA_TOKENS.contains(&s) {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::String(s.to_string())
    }
}

/// Cell spellings read as missing, matching the usual DataFrame defaults.
pub const NA_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "#N/A", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>",
];

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Column – one named vector of cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of missing cells.
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

// ---------------------------------------------------------------------------
// Table – the pipeline's common data currency
// ---------------------------------------------------------------------------

/// Ordered columns of equal length, indexed by name.
///
/// Every column holds exactly `n_rows` cells; constructors and mutators
/// reject anything that would break this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    index: BTreeMap<String, usize>,
    n_rows: usize,
}

impl Table {
    /// A table with the given columns and no rows.
    pub fn with_columns<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        Self::from_columns(
            names
                .iter()
                .map(|n| Column::new(n.as_ref(), Vec::new()))
                .collect(),
        )
    }

    /// Build a table from whole columns.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, Column::len);
        let mut index = BTreeMap::new();
        for (i, col) in columns.iter().enumerate() {
            if col.len() != n_rows {
                return Err(Error::Format(format!(
                    "column '{}' has {} rows, expected {n_rows}",
                    col.name,
                    col.len()
                )));
            }
            if index.insert(col.name.clone(), i).is_some() {
                return Err(Error::Format(format!("duplicate column '{}'", col.name)));
            }
        }
        Ok(Self {
            columns,
            index,
            n_rows,
        })
    }

    /// Build a table from a header and row-major records.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|h| Column::new(h, Vec::with_capacity(rows.len())))
            .collect();
        for (row_no, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::Format(format!(
                    "row {row_no} has {} fields, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            for (col, value) in columns.iter_mut().zip(row) {
                col.values.push(value);
            }
        }
        Self::from_columns(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.index
            .get(name)
            .map(|&i| &self.columns[i])
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Mutable access to a column's cells. The slice cannot change length.
    pub fn values_mut(&mut self, name: &str) -> Result<&mut [Value]> {
        match self.index.get(name) {
            Some(&i) => Ok(self.columns[i].values.as_mut_slice()),
            None => Err(Error::ColumnNotFound(name.to_string())),
        }
    }

    /// Fail with `ColumnNotFound` on the first absent column.
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        match names.iter().find(|n| !self.has_column(n.as_ref())) {
            Some(missing) => Err(Error::ColumnNotFound(missing.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// Add a column, replacing any existing column with the same name.
    pub fn set_column(&mut self, column: Column) -> Result<()> {
        if column.len() != self.n_rows && !self.columns.is_empty() {
            return Err(Error::Format(format!(
                "column '{}' has {} rows, table has {}",
                column.name,
                column.len(),
                self.n_rows
            )));
        }
        match self.index.get(&column.name) {
            Some(&i) => self.columns[i] = column,
            None => {
                if self.columns.is_empty() {
                    self.n_rows = column.len();
                }
                self.index.insert(column.name.clone(), self.columns.len());
                self.columns.push(column);
            }
        }
        Ok(())
    }

    /// Keep only rows whose `keep` flag is set.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.n_rows);
        for col in &mut self.columns {
            let mut flags = keep.iter();
            col.values.retain(|_| *flags.next().unwrap_or(&false));
        }
        self.n_rows = keep.iter().filter(|k| **k).count();
    }

    /// Project the named columns, in the given order, into a new table.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|n| self.column(n.as_ref()).cloned())
            .collect::<Result<Vec<_>>>()?;
        Table::from_columns(columns)
    }

    /// Cells of one row, in column order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(move |c| &c.values[i])
    }
}
