use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection};

const CATEGORIES: [&str; 4] = ["Food", " electronics", "TOYS ", "Garden"];

struct Record {
    product_id: i64,
    stock_level: Option<f64>,
    sales: i64,
    reorder_point: i64,
    last_updated: String,
    product_category: String,
    future_demand: f64,
}

/// Demand grows with sales and shrinks with stock on hand, plus noise.
fn record(rng: &mut StdRng, product_id: i64) -> Record {
    let stock = rng.gen_range(0.0..200.0_f64).round();
    let sales: i64 = rng.gen_range(0..60);
    let reorder_point: i64 = rng.gen_range(5..40);
    let noise: f64 = rng.gen_range(-3.0..3.0);
    let future_demand =
        (1.5 * sales as f64 + 0.4 * reorder_point as f64 - 0.05 * stock + noise).max(0.0);

    let day = rng.gen_range(1..=28);
    // Mixed date spellings, as exported by different store systems.
    let last_updated = match rng.gen_range(0..3) {
        0 => format!("2024-03-{day:02}"),
        1 => format!("03/{day:02}/2024"),
        _ => format!("2024-3-{day}"),
    };

    Record {
        product_id,
        // Roughly one row in ten is missing its stock count.
        stock_level: (!rng.gen_bool(0.1)).then_some(stock),
        sales,
        reorder_point,
        last_updated,
        product_category: CATEGORIES[rng.gen_range(0..CATEGORIES.len())].to_string(),
        future_demand: (future_demand * 100.0).round() / 100.0,
    }
}

fn write_csv(path: &PathBuf, records: &[Record]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "product_id",
        "stock_level",
        "sales",
        "reorder_point",
        "last_updated",
        "product_category",
        "future_demand",
    ])?;
    for r in records {
        writer.write_record([
            r.product_id.to_string(),
            r.stock_level.map(|s| s.to_string()).unwrap_or_default(),
            r.sales.to_string(),
            r.reorder_point.to_string(),
            r.last_updated.clone(),
            r.product_category.clone(),
            r.future_demand.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_db(path: &PathBuf, records: &[Record]) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path).with_context(|| format!("replacing {}", path.display()))?;
    }
    let mut conn = Connection::open(path)?;
    conn.execute_batch(
        "CREATE TABLE inventory (
            product_id INTEGER PRIMARY KEY,
            stock_level REAL,
            sales INTEGER,
            reorder_point INTEGER,
            last_updated TEXT,
            product_category TEXT,
            future_demand REAL
        );",
    )?;
    let tx = conn.transaction()?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO inventory VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for r in records {
            insert.execute(params![
                r.product_id,
                r.stock_level,
                r.sales,
                r.reorder_point,
                r.last_updated,
                r.product_category,
                r.future_demand,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);

    let csv_rows: Vec<Record> = (0..120).map(|id| record(&mut rng, id)).collect();
    let db_rows: Vec<Record> = (120..200).map(|id| record(&mut rng, id)).collect();

    let csv_path = PathBuf::from("inventory.csv");
    let db_path = PathBuf::from("inventory.db");
    write_csv(&csv_path, &csv_rows)?;
    write_db(&db_path, &db_rows)?;

    println!(
        "Wrote {} rows to {} and {} rows to {} (table `inventory`)",
        csv_rows.len(),
        csv_path.display(),
        db_rows.len(),
        db_path.display()
    );
    Ok(())
}
