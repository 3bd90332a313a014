use std::fmt;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::model::{Table, Value};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Missing-value imputation
// ---------------------------------------------------------------------------

/// How missing cells in a set of columns are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Fill with the column mean of the non-missing values.
    #[default]
    Mean,
    /// Fill with the column median of the non-missing values.
    Median,
    /// Remove every row with a missing value in any scoped column.
    Drop,
}

impl FromStr for MissingValuePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "drop" => Ok(Self::Drop),
            _ => Err(Error::InvalidPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for MissingValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Drop => "drop",
        })
    }
}

/// Apply `policy` to `columns`.
///
/// Fill statistics are computed per column over its non-missing cells as
/// they are when this transform runs; NaN and infinite floats count as
/// missing. A column with no non-missing cells has no statistic and is left
/// as is. Non-missing cells are never modified.
pub fn impute<S: AsRef<str>>(
    mut table: Table,
    policy: MissingValuePolicy,
    columns: &[S],
) -> Result<Table> {
    table.require_columns(columns)?;

    let fill_value: fn(Vec<f64>) -> Option<f64> = match policy {
        MissingValuePolicy::Drop => {
            let mut keep = vec![true; table.n_rows()];
            for name in columns {
                for (flag, value) in keep.iter_mut().zip(&table.column(name.as_ref())?.values) {
                    *flag &= !value.is_missing();
                }
            }
            let before = table.n_rows();
            table.retain_rows(&keep);
            log::debug!("dropped {} rows with missing values", before - table.n_rows());
            return Ok(table);
        }
        MissingValuePolicy::Mean => |observed: Vec<f64>| mean(&observed),
        MissingValuePolicy::Median => median,
    };

    for name in columns {
        let name = name.as_ref();
        let Some(fill) = fill_value(numeric_values(&table, name)?) else {
            log::warn!("column '{name}' has no values to compute a {policy} from");
            continue;
        };
        let mut filled = 0usize;
        for cell in table.values_mut(name)?.iter_mut().filter(|v| v.is_missing()) {
            *cell = Value::Float(fill);
            filled += 1;
        }
        log::debug!("filled {filled} cells in '{name}' with {policy} {fill}");
    }
    Ok(table)
}

/// Non-missing cells of a column as floats; any other dtype is a type error.
fn numeric_values(table: &Table, name: &str) -> Result<Vec<f64>> {
    table
        .column(name)?
        .values
        .iter()
        .filter(|v| !v.is_missing())
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                Error::type_error(name, format!("cannot impute over {} value '{v}'", v.type_name()))
            })
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    Some(if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    })
}

// ---------------------------------------------------------------------------
// Date normalisation
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Slash dates are read month first; two-digit years are tried before
/// four-digit ones so `12/31/24` lands in 2024.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%b %d %Y",
    "%d %b %Y",
    "%B %d, %Y",
];

/// Best-effort interpretation of a text cell as a date/time.
///
/// Years below 100 are rejected: they only arise from a short year read by
/// a four-digit pattern.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    let plausible = |dt: &NaiveDateTime| dt.year() >= 100;
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local()).filter(plausible);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok().filter(plausible))
        .or_else(|| {
            DATE_FORMATS.iter().find_map(|f| {
                NaiveDate::parse_from_str(s, f)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .filter(plausible)
            })
        })
}

/// Re-render every cell of `column` in `target_format` (strftime syntax).
///
/// All cells are parsed before any is rewritten: one unparseable value fails
/// the whole transform. Missing cells stay missing.
pub fn normalize_dates(mut table: Table, column: &str, target_format: &str) -> Result<Table> {
    let items: Vec<Item<'_>> = StrftimeItems::new(target_format).collect();
    if items.is_empty() || items.iter().any(|i| matches!(i, Item::Error)) {
        return Err(Error::DateParse {
            column: column.to_string(),
            row: 0,
            reason: format!("invalid target format '{target_format}'"),
        });
    }

    let parsed = table
        .column(column)?
        .values
        .iter()
        .enumerate()
        .map(|(row, v)| {
            let parsed = match v {
                Value::Null => return Ok(None),
                Value::Date(d) => Some(*d),
                Value::String(s) => parse_datetime(s),
                Value::Integer(i) => parse_datetime(&i.to_string()),
                _ => None,
            };
            parsed.map(Some).ok_or_else(|| Error::DateParse {
                column: column.to_string(),
                row,
                reason: format!("'{v}' is not a recognisable date"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    for (cell, dt) in table.values_mut(column)?.iter_mut().zip(parsed) {
        if let Some(dt) = dt {
            *cell = Value::String(dt.format_with_items(items.iter()).to_string());
        }
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Category normalisation
// ---------------------------------------------------------------------------

/// Trim and lower-case every string cell of `column`.
pub fn normalize_category(mut table: Table, column: &str) -> Result<Table> {
    for cell in table.values_mut(column)?.iter_mut() {
        match cell {
            Value::String(s) => *s = s.trim().to_lowercase(),
            Value::Null => {}
            other => {
                return Err(Error::type_error(
                    column,
                    format!("expected text, found {} value '{other}'", other.type_name()),
                ))
            }
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn table(columns: Vec<Column>) -> Table {
        Table::from_columns(columns).unwrap()
    }

    fn stock(values: Vec<Value>) -> Table {
        table(vec![Column::new("stock_level", values)])
    }

    #[test]
    fn policy_parses_known_names_only() {
        assert_eq!("Median".parse::<MissingValuePolicy>().unwrap(), MissingValuePolicy::Median);
        let err = "mode".parse::<MissingValuePolicy>().unwrap_err();
        assert!(matches!(err, Error::InvalidPolicy(p) if p == "mode"));
    }

    #[test]
    fn mean_fills_only_missing_cells() {
        let t = stock(vec![50i64.into(), Value::Null, 20i64.into()]);
        let t = impute(t, MissingValuePolicy::Mean, &["stock_level"]).unwrap();
        assert_eq!(
            t.column("stock_level").unwrap().values,
            vec![Value::Integer(50), Value::Float(35.0), Value::Integer(20)]
        );
    }

    #[test]
    fn nan_cells_are_gaps_not_observations() {
        let t = stock(vec![
            50i64.into(),
            Value::Float(f64::NAN),
            Value::Null,
            20i64.into(),
        ]);
        let t = impute(t, MissingValuePolicy::Mean, &["stock_level"]).unwrap();
        assert_eq!(
            t.column("stock_level").unwrap().values,
            vec![
                Value::Integer(50),
                Value::Float(35.0),
                Value::Float(35.0),
                Value::Integer(20)
            ]
        );

        let t = stock(vec![1i64.into(), Value::Float(f64::INFINITY)]);
        let t = impute(t, MissingValuePolicy::Drop, &["stock_level"]).unwrap();
        assert_eq!(t.n_rows(), 1);
    }

    #[test]
    fn median_of_even_count_averages_the_middle() {
        let t = stock(vec![1.0.into(), 9.0.into(), Value::Null, 3.0.into(), 4.0.into()]);
        let t = impute(t, MissingValuePolicy::Median, &["stock_level"]).unwrap();
        assert_eq!(t.column("stock_level").unwrap().values[2], Value::Float(3.5));
    }

    #[test]
    fn drop_removes_rows_missing_any_scoped_column() {
        let t = table(vec![
            Column::new("a", vec![1i64.into(), Value::Null, 3i64.into()]),
            Column::new("b", vec![Value::Null, 2i64.into(), 3i64.into()]),
            Column::new("c", vec![Value::Null, Value::Null, Value::Null]),
        ]);
        let t = impute(t, MissingValuePolicy::Drop, &["a", "b"]).unwrap();
        assert_eq!(t.n_rows(), 1);
        assert_eq!(t.column("a").unwrap().values, vec![Value::Integer(3)]);
    }

    #[test]
    fn all_missing_column_is_left_alone() {
        let t = stock(vec![Value::Null, Value::Null]);
        let t = impute(t, MissingValuePolicy::Mean, &["stock_level"]).unwrap();
        assert_eq!(t.column("stock_level").unwrap().null_count(), 2);
    }

    #[test]
    fn impute_rejects_absent_and_textual_columns() {
        let err = impute(stock(vec![]), MissingValuePolicy::Mean, &["price"]).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(c) if c == "price"));

        let t = stock(vec!["high".into(), Value::Null]);
        let err = impute(t, MissingValuePolicy::Mean, &["stock_level"]).unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
    }

    #[test]
    fn dates_in_mixed_layouts_are_unified() {
        let t = table(vec![Column::new(
            "last_updated",
            vec!["2024-01-05".into(), "01/06/2024".into(), "2024-1-7".into(), Value::Null],
        )]);
        let t = normalize_dates(t, "last_updated", "%Y-%m-%d").unwrap();
        assert_eq!(
            t.column("last_updated").unwrap().values,
            vec![
                Value::from("2024-01-05"),
                Value::from("2024-01-06"),
                Value::from("2024-01-07"),
                Value::Null,
            ]
        );
    }

    #[test]
    fn two_digit_years_land_in_this_century() {
        let t = table(vec![Column::new(
            "last_updated",
            vec!["12/31/24".into(), "01/06/2024".into(), "3/2/24 14:30".into()],
        )]);
        let t = normalize_dates(t, "last_updated", "%Y-%m-%d").unwrap();
        assert_eq!(
            t.column("last_updated").unwrap().values,
            vec![
                Value::from("2024-12-31"),
                Value::from("2024-01-06"),
                Value::from("2024-03-02"),
            ]
        );
        assert_eq!(parse_datetime("0024-12-31"), None);
    }

    #[test]
    fn datetimes_and_date_cells_render_in_target_format() {
        let d = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let t = table(vec![Column::new(
            "ts",
            vec!["2024-02-03T10:11:12Z".into(), Value::Date(d), 20240105i64.into()],
        )]);
        let t = normalize_dates(t, "ts", "%d/%m/%Y").unwrap();
        assert_eq!(
            t.column("ts").unwrap().values,
            vec![Value::from("03/02/2024"), Value::from("31/12/2023"), Value::from("05/01/2024")]
        );
    }

    #[test]
    fn one_bad_date_aborts_the_whole_column() {
        let t = table(vec![Column::new(
            "last_updated",
            vec!["2024-01-05".into(), "next tuesday".into()],
        )]);
        match normalize_dates(t, "last_updated", "%Y-%m-%d") {
            Err(Error::DateParse { row, .. }) => assert_eq!(row, 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_target_format_is_rejected() {
        let t = table(vec![Column::new("d", vec!["2024-01-05".into()])]);
        assert!(matches!(
            normalize_dates(t, "d", "%Y-%"),
            Err(Error::DateParse { .. })
        ));
    }

    #[test]
    fn categories_are_trimmed_and_lowercased() {
        let t = table(vec![Column::new(
            "product_category",
            vec!["Food".into(), "FOOD".into(), " food".into(), Value::Null],
        )]);
        let t = normalize_category(t, "product_category").unwrap();
        assert_eq!(
            t.column("product_category").unwrap().values,
            vec!["food".into(), "food".into(), "food".into(), Value::Null]
        );
    }

    #[test]
    fn numeric_category_is_a_type_error() {
        let t = table(vec![Column::new("product_category", vec![7i64.into()])]);
        assert!(matches!(
            normalize_category(t, "product_category"),
            Err(Error::Type { .. })
        ));
        let t = table(vec![Column::new("other", vec![])]);
        assert!(matches!(
            normalize_category(t, "product_category"),
            Err(Error::ColumnNotFound(_))
        ));
    }

    proptest! {
        #[test]
        fn mean_fill_matches_observed_mean(
            cells in prop::collection::vec(prop::option::of(-1.0e6f64..1.0e6), 1..40)
        ) {
            let values: Vec<Value> = cells.iter().copied().map(Value::from).collect();
            let observed: Vec<f64> = cells.iter().flatten().copied().collect();
            let t = impute(stock(values), MissingValuePolicy::Mean, &["stock_level"]).unwrap();
            let out = &t.column("stock_level").unwrap().values;

            for (before, after) in cells.iter().zip(out) {
                match before {
                    Some(v) => prop_assert_eq!(after, &Value::Float(*v)),
                    None if observed.is_empty() => prop_assert!(after.is_null()),
                    None => {
                        let expected = observed.iter().sum::<f64>() / observed.len() as f64;
                        let got = after.as_f64().unwrap();
                        prop_assert!((got - expected).abs() <= 1e-9 * expected.abs().max(1.0));
                    }
                }
            }
        }

        #[test]
        fn category_normalisation_is_idempotent(
            cells in prop::collection::vec(prop::option::of("[ a-zA-Z]{0,12}"), 0..20)
        ) {
            let values: Vec<Value> = cells
                .iter()
                .map(|c| c.as_deref().map_or(Value::Null, Value::from))
                .collect();
            let once = normalize_category(stock(values), "stock_level").unwrap();
            let twice = normalize_category(once.clone(), "stock_level").unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
