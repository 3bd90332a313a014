use super::features::FeatureMatrix;
use super::trainer::TrainedModel;
use crate::data::model::{Column, Value};
use crate::error::{Error, Result};

/// One prediction per input row, in input row order.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub values: Vec<f64>,
}

impl PredictionResult {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Turn the predictions into a float column named `name`.
    pub fn into_column(self, name: &str) -> Column {
        Column::new(name, self.values.into_iter().map(Value::Float).collect())
    }
}

/// Apply `model` to every row of `x`.
///
/// `x` must carry exactly the model's feature columns in fit order;
/// anything else is a [`Error::SchemaMismatch`].
pub fn predict(model: &TrainedModel, x: &FeatureMatrix) -> Result<PredictionResult> {
    if x.names() != model.feature_columns() {
        return Err(Error::SchemaMismatch {
            expected: model.feature_columns().to_vec(),
            actual: x.names().to_vec(),
        });
    }

    let rows = x
        .numeric_rows()
        .map_err(|e| Error::type_error(&e.column, e.to_string()))?;
    let forest = model.forest();
    let values = rows.iter().map(|row| forest.predict_row(row)).collect();
    Ok(PredictionResult { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Table;
    use crate::ml::features::prepare;
    use crate::ml::forest::ForestParams;
    use crate::ml::trainer::{train, TrainerConfig};
    use proptest::prelude::*;

    fn training_table() -> Table {
        let n = 20;
        Table::from_columns(vec![
            Column::new("stock_level", (0..n).map(|i| Value::Integer(i * 2)).collect()),
            Column::new("sales", (0..n).map(|i| Value::Integer(40 - i)).collect()),
            Column::new("future_demand", (0..n).map(|i| Value::Float(i as f64)).collect()),
        ])
        .unwrap()
    }

    fn model() -> TrainedModel {
        let split = prepare(&training_table(), "future_demand", &["stock_level", "sales"]).unwrap();
        let config = TrainerConfig {
            forest: ForestParams {
                n_estimators: 8,
                ..ForestParams::default()
            },
            ..TrainerConfig::default()
        };
        train(&split.features, &split.target, &config).unwrap().0
    }

    fn matrix(columns: Vec<Column>, names: &[&str]) -> FeatureMatrix {
        FeatureMatrix::from_table(&Table::from_columns(columns).unwrap(), names).unwrap()
    }

    #[test]
    fn reordered_columns_are_a_schema_mismatch() {
        let x = matrix(
            vec![
                Column::new("sales", vec![1i64.into()]),
                Column::new("stock_level", vec![2i64.into()]),
            ],
            &["sales", "stock_level"],
        );
        match predict(&model(), &x) {
            Err(Error::SchemaMismatch { expected, actual }) => {
                assert_eq!(expected, vec!["stock_level", "sales"]);
                assert_eq!(actual, vec!["sales", "stock_level"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_feature_is_a_schema_mismatch() {
        let x = matrix(vec![Column::new("stock_level", vec![2i64.into()])], &["stock_level"]);
        assert!(matches!(
            predict(&model(), &x),
            Err(Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn non_numeric_cells_are_a_type_error() {
        let x = matrix(
            vec![
                Column::new("stock_level", vec![Value::Null]),
                Column::new("sales", vec![1i64.into()]),
            ],
            &["stock_level", "sales"],
        );
        assert!(matches!(predict(&model(), &x), Err(Error::Type { .. })));
    }

    #[test]
    fn into_column_keeps_row_order() {
        let col = PredictionResult {
            values: vec![1.5, 2.5],
        }
        .into_column("predicted_demand");
        assert_eq!(col.name, "predicted_demand");
        assert_eq!(col.values, vec![Value::Float(1.5), Value::Float(2.5)]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn one_prediction_per_row(
            rows in prop::collection::vec((0i64..100, -50i64..50), 1..30)
        ) {
            let x = matrix(
                vec![
                    Column::new("stock_level", rows.iter().map(|r| Value::Integer(r.0)).collect()),
                    Column::new("sales", rows.iter().map(|r| Value::Integer(r.1)).collect()),
                ],
                &["stock_level", "sales"],
            );
            let result = predict(&model(), &x).unwrap();
            prop_assert_eq!(result.len(), rows.len());
            prop_assert!(result.values.iter().all(|v| (0.0..=19.0).contains(v)));
        }
    }
}
