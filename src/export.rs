use std::path::Path;

use crate::data::model::Table;
use crate::data::writer::write_file;
use crate::error::Result;

/// Columns a reporting dashboard consumes, in output order.
pub const DASHBOARD_COLUMNS: [&str; 5] = [
    "product_id",
    "product_category",
    "stock_level",
    "predicted_demand",
    "last_updated",
];

/// Write the dashboard projection of `table` to `path` and return the
/// number of rows written. The format follows the extension of `path`.
pub fn export_dashboard(table: &Table, path: &Path) -> Result<usize> {
    let projected = table.select(&DASHBOARD_COLUMNS)?;
    write_file(&projected, path)?;
    log::info!(
        "exported {} rows for dashboards to {}",
        projected.n_rows(),
        path.display()
    );
    Ok(projected.n_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, Value};
    use crate::error::Error;

    fn final_table() -> Table {
        let col = |name: &str, v: Value| Column::new(name, vec![v]);
        Table::from_columns(vec![
            col("last_updated", "2024-01-05".into()),
            col("product_id", 1i64.into()),
            col("sales", 10i64.into()),
            col("product_category", "food".into()),
            col("stock_level", 50i64.into()),
            col("predicted_demand", 12.5.into()),
        ])
        .unwrap()
    }

    #[test]
    fn projection_is_fixed_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.csv");
        assert_eq!(export_dashboard(&final_table(), &path).unwrap(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "product_id,product_category,stock_level,predicted_demand,last_updated\n\
             1,food,50,12.5,2024-01-05\n"
        );
    }

    #[test]
    fn missing_prediction_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = final_table();
        table = table
            .select(&["product_id", "product_category", "stock_level", "last_updated"])
            .unwrap();
        let err = export_dashboard(&table, &dir.path().join("d.csv")).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(c) if c == "predicted_demand"));
    }
}
