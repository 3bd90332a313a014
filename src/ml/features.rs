use std::fmt;

use crate::data::model::{Table, Value};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// FeatureMatrix – X
// ---------------------------------------------------------------------------

/// Named feature columns projected out of a table, in a fixed order.
///
/// Cells keep their original dtype; numeric conversion happens only when a
/// model consumes the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    /// Column-major cells, `columns[j][i]` is row `i` of feature `j`.
    columns: Vec<Vec<Value>>,
    n_rows: usize,
}

impl FeatureMatrix {
    /// Project `names` out of `table`, preserving their order.
    pub fn from_table<S: AsRef<str>>(table: &Table, names: &[S]) -> Result<Self> {
        let mut seen: Vec<&str> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if seen.contains(&name) {
                return Err(Error::DuplicateColumn(name.to_string()));
            }
            seen.push(name);
        }
        table.require_columns(names)?;

        let columns = seen
            .iter()
            .map(|n| table.column(n).map(|c| c.values.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            names: seen.into_iter().map(String::from).collect(),
            columns,
            n_rows: table.n_rows(),
        })
    }

    /// Feature column names, in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Row-major numeric view. Fails on the first missing or non-numeric cell.
    pub fn numeric_rows(&self) -> std::result::Result<Vec<Vec<f64>>, NonNumeric> {
        let mut rows = vec![Vec::with_capacity(self.n_features()); self.n_rows];
        for (name, column) in self.names.iter().zip(&self.columns) {
            for (i, cell) in column.iter().enumerate() {
                rows[i].push(numeric_cell(name, i, cell)?);
            }
        }
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Target – y
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub name: String,
    pub values: Vec<Value>,
}

impl Target {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn numeric(&self) -> std::result::Result<Vec<f64>, NonNumeric> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| numeric_cell(&self.name, i, v))
            .collect()
    }
}

/// A feature/target split produced once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSplit {
    pub features: FeatureMatrix,
    pub target: Target,
}

/// Project `feature_columns` into X and `target_column` into y.
///
/// Feature order is preserved and duplicates are rejected. Columns are not
/// checked for numeric content here.
pub fn prepare<S: AsRef<str>>(
    table: &Table,
    target_column: &str,
    feature_columns: &[S],
) -> Result<FeatureSplit> {
    let target = Target {
        name: target_column.to_string(),
        values: table.column(target_column)?.values.clone(),
    };
    let features = FeatureMatrix::from_table(table, feature_columns)?;
    log::debug!(
        "prepared {} rows x {} features, target '{target_column}'",
        features.n_rows(),
        features.n_features()
    );
    Ok(FeatureSplit { features, target })
}

// ---------------------------------------------------------------------------
// Numeric conversion
// ---------------------------------------------------------------------------

/// A cell that cannot feed a numeric model.
#[derive(Debug, Clone, PartialEq)]
pub struct NonNumeric {
    pub column: String,
    pub row: usize,
    pub found: &'static str,
}

impl fmt::Display for NonNumeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column '{}', row {}: expected a number, found {}",
            self.column, self.row, self.found
        )
    }
}

fn numeric_cell(column: &str, row: usize, cell: &Value) -> std::result::Result<f64, NonNumeric> {
    cell.as_f64().ok_or_else(|| NonNumeric {
        column: column.to_string(),
        row,
        found: cell.type_name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;
    use pretty_assertions::assert_eq;

    fn inventory() -> Table {
        Table::from_columns(vec![
            Column::new("stock_level", vec![50i64.into(), 35.0.into()]),
            Column::new("sales", vec![10i64.into(), 20i64.into()]),
            Column::new("product_category", vec!["food".into(), "food".into()]),
            Column::new("future_demand", vec![12i64.into(), 18i64.into()]),
        ])
        .unwrap()
    }

    #[test]
    fn prepare_projects_in_requested_order() {
        let split = prepare(&inventory(), "future_demand", &["sales", "stock_level"]).unwrap();
        assert_eq!(split.features.names(), &["sales", "stock_level"]);
        assert_eq!(split.features.n_rows(), 2);
        assert_eq!(split.target.len(), 2);
        assert_eq!(
            split.features.numeric_rows().unwrap(),
            vec![vec![10.0, 50.0], vec![20.0, 35.0]]
        );
        assert_eq!(split.target.numeric().unwrap(), vec![12.0, 18.0]);
    }

    #[test]
    fn absent_columns_are_reported() {
        let err = prepare(&inventory(), "demand", &["sales"]).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(c) if c == "demand"));

        let err = prepare(&inventory(), "future_demand", &["sales", "price"]).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(c) if c == "price"));
    }

    #[test]
    fn duplicate_features_are_rejected() {
        let err = prepare(&inventory(), "future_demand", &["sales", "sales"]).unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn(c) if c == "sales"));
    }

    #[test]
    fn text_features_pass_prepare_but_not_numeric_view() {
        let split = prepare(&inventory(), "future_demand", &["product_category"]).unwrap();
        let err = split.features.numeric_rows().unwrap_err();
        assert_eq!(err.column, "product_category");
        assert_eq!(err.found, "string");
    }
}
