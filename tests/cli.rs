//! Exit status of the `stock-forecast` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

struct Workspace {
    dir: tempfile::TempDir,
    csv: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("inventory.csv");
        let mut body = String::from(
            "product_id,stock_level,sales,reorder_point,last_updated,product_category,future_demand\n",
        );
        for i in 0..12 {
            let stock = if i == 3 { String::new() } else { (30 + i).to_string() };
            body.push_str(&format!(
                "{i},{stock},{},{},01/{:02}/2024, Food,{}\n",
                4 + i,
                2 + i % 3,
                1 + i,
                15 + 3 * i
            ));
        }
        fs::write(&csv, body).unwrap();
        Self { dir, csv }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, target: &str, output: &Path, dashboard: Option<&Path>) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_stock-forecast"));
        cmd.env("RUST_LOG", "error")
            .arg("--file")
            .arg(&self.csv)
            .args(["--db-uri", "sqlite::memory:"])
            .args(["--query", "SELECT 1 AS product_id WHERE 0"])
            .args(["--features", "stock_level,sales,reorder_point"])
            .args(["--target", target])
            .arg("--output")
            .arg(output);
        if let Some(path) = dashboard {
            cmd.arg("--dashboard").arg(path);
        }
        cmd.output().unwrap()
    }
}

#[test]
fn successful_run_exits_zero() {
    let ws = Workspace::new();
    let output = ws.path("processed.csv");
    let result = ws.run("future_demand", &output, None);

    assert_eq!(result.status.code(), Some(0), "{result:?}");
    assert!(output.exists());
    let summary: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(summary["rows"], 12);
    assert_eq!(summary["report"]["test_rows"], 3);
}

#[test]
fn pipeline_failure_exits_one_and_writes_nothing() {
    let ws = Workspace::new();
    let output = ws.path("processed.csv");
    let result = ws.run("no_such_column", &output, None);

    assert_eq!(result.status.code(), Some(1), "{result:?}");
    assert!(!output.exists());
    assert!(result.stdout.is_empty());
}

#[test]
fn dashboard_failure_exits_two_and_keeps_the_output() {
    let ws = Workspace::new();
    let output = ws.path("processed.csv");
    let dashboard = ws.path("dashboard.xlsx");
    let result = ws.run("future_demand", &output, Some(&dashboard));

    assert_eq!(result.status.code(), Some(2), "{result:?}");
    assert!(output.exists());
    assert!(!dashboard.exists());
}
