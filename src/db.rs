use std::fs;
use std::path::Path;

use rusqlite::{params, Connection};

use crate::catalog::Product;
use crate::error::EtlError;

const DB_PATH: &str = "data/stock.sqlite";

pub fn connect() -> Result<Connection, EtlError> {
    if let Some(dir) = Path::new(DB_PATH).parent() {
        fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

/// Create the three tables if they are not already present. Safe to call
/// on a populated store.
pub fn init_schema(conn: &Connection) -> Result<(), EtlError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS products (
            id          TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            stock       INTEGER NOT NULL CHECK(stock >= 0),
            price       REAL NOT NULL,
            currency    TEXT NOT NULL CHECK(length(currency) = 1)
        );

        CREATE TABLE IF NOT EXISTS locations (
            id     TEXT PRIMARY KEY,
            number TEXT NOT NULL,
            street TEXT NOT NULL,
            city   TEXT NOT NULL,
            state  TEXT NOT NULL
        );

        -- A product may be stocked at many locations, or at the same
        -- location more than once; no uniqueness here.
        CREATE TABLE IF NOT EXISTS relations (
            product  TEXT NOT NULL,
            location TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_relations_product ON relations(product);
        CREATE INDEX IF NOT EXISTS idx_relations_location ON relations(location);
        ",
    )?;
    Ok(())
}

/// Run `f` against the store either in autocommit mode (each insert
/// commits on its own, so a crash leaves a prefix of committed records)
/// or inside a single transaction when `batch` is set.
pub fn with_commit_mode<T>(
    conn: &Connection,
    batch: bool,
    f: impl FnOnce(&Connection) -> Result<T, EtlError>,
) -> Result<T, EtlError> {
    if batch {
        let tx = conn.unchecked_transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    } else {
        f(conn)
    }
}

// ── Inserts ──

pub fn insert_relation(conn: &Connection, product: &str, location: &str) -> Result<(), EtlError> {
    conn.execute(
        "INSERT INTO relations (product, location) VALUES (?1, ?2)",
        params![product, location],
    )?;
    Ok(())
}

pub fn insert_location(
    conn: &Connection,
    id: &str,
    number: &str,
    street: &str,
    city: &str,
    state: &str,
) -> Result<(), EtlError> {
    conn.execute(
        "INSERT INTO locations (id, number, street, city, state) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, number, street, city, state],
    )?;
    Ok(())
}

pub fn insert_product(conn: &Connection, product: &Product) -> Result<(), EtlError> {
    conn.execute(
        "INSERT INTO products (id, description, stock, price, currency)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            product.id,
            product.description,
            product.stock,
            product.price,
            product.currency.to_string(),
        ],
    )?;
    Ok(())
}

// ── Report query ──

pub struct ReportRow {
    pub description: String,
    pub price: f64,
    pub currency: String,
    pub stock: i64,
    pub location: String,
}

/// Three-way join: one row per relation whose product and location both
/// resolve, cheapest first.
pub fn fetch_report_rows(conn: &Connection) -> Result<Vec<ReportRow>, EtlError> {
    let mut stmt = conn.prepare(
        "SELECT p.description, p.price, p.currency, p.stock,
                l.number || ', ' || l.street || ', ' || l.city || ', ' || l.state
         FROM relations r
         JOIN products p ON r.product = p.id
         JOIN locations l ON r.location = l.id
         ORDER BY p.price ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ReportRow {
                description: row.get(0)?,
                price: row.get(1)?,
                currency: row.get(2)?,
                stock: row.get(3)?,
                location: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub products: usize,
    pub locations: usize,
    pub relations: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats, EtlError> {
    let products: usize = conn.query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0))?;
    let locations: usize = conn.query_row("SELECT COUNT(*) FROM locations", [], |r| r.get(0))?;
    let relations: usize = conn.query_row("SELECT COUNT(*) FROM relations", [], |r| r.get(0))?;
    Ok(Stats {
        products,
        locations,
        relations,
    })
}

// ── Tests ──
