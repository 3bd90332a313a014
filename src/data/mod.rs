/// Data layer: tabular model, ingestion, cleaning, and output.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet        sqlite:/// + query
///        │                               │
///        ▼                               ▼
///   ┌──────────┐                    ┌─────────┐
///   │  loader   │                    │  query   │
///   └──────────┘                    └─────────┘
///        └──────────────┬────────────────┘
///                       ▼
///                ┌─────────────┐
///                │ loader::merge│  union of columns, rows in input order
///                └─────────────┘
///                       │
///                       ▼
///                ┌─────────────┐
///                │    clean     │  impute → normalize_dates → normalize_category
///                └─────────────┘
///                       │
///                       ▼
///                ┌─────────────┐
///                │   writer     │  Table → .csv / .json / .parquet
///                └─────────────┘
/// ```

pub mod clean;
pub mod loader;
pub mod model;
pub mod query;
pub mod writer;

pub use clean::{impute, normalize_category, normalize_dates, MissingValuePolicy};
pub use loader::{load_file, merge};
pub use model::{Column, Table, Value};
pub use query::load_query;
pub use writer::write_file;
