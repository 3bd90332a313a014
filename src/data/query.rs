use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use super::model::{Table, Value};
use crate::error::{Error, Result};

/// Run `query` against the store named by `connection_uri` and materialise
/// every result row.
///
/// Accepted URIs follow the SQLAlchemy convention:
/// * `sqlite:///inventory.db`      – relative path
/// * `sqlite:////var/data/inv.db`  – absolute path
/// * `sqlite://` or `sqlite::memory:` – private in-memory database
///
/// Database files are opened read-only, so a missing file is reported as a
/// connection failure instead of silently creating an empty database.
pub fn load_query(connection_uri: &str, query: &str) -> Result<Table> {
    let conn = connect(connection_uri)?;
    let table = run_query(&conn, query);
    // Dropping the connection closes it on both the success and error path.
    drop(conn);
    let table = table?;
    log::debug!(
        "query returned {} rows x {} columns",
        table.n_rows(),
        table.n_cols()
    );
    Ok(table)
}

fn connect(uri: &str) -> Result<Connection> {
    let fail = |reason: String| Error::Connection {
        uri: uri.to_string(),
        reason,
    };

    if uri == "sqlite://" || uri == "sqlite::memory:" {
        return Connection::open_in_memory().map_err(|e| fail(e.to_string()));
    }
    let Some(path) = uri.strip_prefix("sqlite:///") else {
        return Err(fail("unsupported scheme, expected sqlite:///<path>".into()));
    };
    if path.is_empty() {
        return Err(fail("empty database path".into()));
    }

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| fail(e.to_string()))
}

fn run_query(conn: &Connection, query: &str) -> Result<Table> {
    let query_err = |e: rusqlite::Error| Error::Query(e.to_string());

    let mut stmt = conn.prepare(query).map_err(query_err)?;
    let headers: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let n_cols = headers.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(query_err)?;
    while let Some(row) = cursor.next().map_err(query_err)? {
        let mut values = Vec::with_capacity(n_cols);
        for i in 0..n_cols {
            let cell = row.get_ref(i).map_err(query_err)?;
            values.push(sql_to_value(cell, &headers[i])?);
        }
        rows.push(values);
    }

    Table::from_rows(headers, rows)
}

fn sql_to_value(cell: ValueRef<'_>, column: &str) -> Result<Value> {
    Ok(match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::String(
            std::str::from_utf8(bytes)
                .map_err(|e| Error::Query(format!("column '{column}': {e}")))?
                .to_string(),
        ),
        ValueRef::Blob(b) => {
            return Err(Error::Query(format!(
                "column '{column}': binary value of {} bytes is not tabular",
                b.len()
            )))
        }
    })
}
