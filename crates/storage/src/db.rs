use caixa_core::{CategoryCatalogue, Direction, EntryStatus, LedgerEntry, Money, DEFAULT_CATEGORIES, DEFAULT_UNITS};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },
}

pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    tracing::debug!(path = %path.display(), "database ready");
    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            direction TEXT NOT NULL,
            position INTEGER NOT NULL,
            UNIQUE (name, direction)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            position INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ledger_entries (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            amount TEXT NOT NULL,
            direction TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            unit TEXT,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            external_ref TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ledger_entries_date ON ledger_entries(date)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Seeds the default catalogue and unit list. Existing rows are kept.
pub async fn seed_defaults(pool: &DbPool) -> Result<(), StorageError> {
    for (position, (name, direction)) in DEFAULT_CATEGORIES.iter().enumerate() {
        sqlx::query(
            "INSERT OR IGNORE INTO categories (name, direction, position) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(direction.to_string())
        .bind(position as i64)
        .execute(pool)
        .await?;
    }

    for (position, name) in DEFAULT_UNITS.iter().enumerate() {
        sqlx::query("INSERT OR IGNORE INTO units (name, position) VALUES (?, ?)")
            .bind(name)
            .bind(position as i64)
            .execute(pool)
            .await?;
    }

    Ok(())
}

pub async fn load_catalogue(pool: &DbPool) -> Result<CategoryCatalogue, StorageError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT name, direction FROM categories ORDER BY position, id",
    )
    .fetch_all(pool)
    .await?;

    let mut catalogue = CategoryCatalogue::default();
    for (name, direction) in rows {
        match parse_direction(&direction, "categories")? {
            Direction::Inflow => catalogue.inflow.push(name),
            Direction::Outflow => catalogue.outflow.push(name),
        }
    }
    Ok(catalogue)
}

/// Appends a category at the end of its direction's list. Returns `false` if it
/// already existed.
pub async fn add_category(pool: &DbPool, name: &str, direction: Direction) -> Result<bool, StorageError> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO categories (name, direction, position)
        VALUES (?, ?, (SELECT COALESCE(MAX(position), -1) + 1 FROM categories))
        "#,
    )
    .bind(name)
    .bind(direction.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn load_units(pool: &DbPool) -> Result<Vec<String>, StorageError> {
    let rows = sqlx::query_as::<_, (String,)>("SELECT name FROM units ORDER BY position, id")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn add_unit(pool: &DbPool, name: &str) -> Result<bool, StorageError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO units (name, position) VALUES (?, (SELECT COALESCE(MAX(position), -1) + 1 FROM units))",
    )
    .bind(name)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Writes a whole commit in one transaction: either every entry is stored or none.
pub async fn insert_ledger_entries(pool: &DbPool, entries: &[LedgerEntry]) -> Result<usize, StorageError> {
    let mut tx = pool.begin().await?;

    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (id, date, amount, direction, description, category, unit, status, created_at, external_ref)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.date)
        .bind(entry.amount.as_decimal().to_string())
        .bind(entry.direction.to_string())
        .bind(&entry.description)
        .bind(&entry.category)
        .bind(&entry.unit)
        .bind(entry.status.to_string())
        .bind(entry.created_at.to_rfc3339())
        .bind(&entry.external_ref)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(count = entries.len(), "ledger entries stored");
    Ok(entries.len())
}

type EntryRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    Option<String>,
);

/// Stored entries ordered by date, optionally limited to an inclusive ISO date range.
pub async fn get_ledger_entries(
    pool: &DbPool,
    range: Option<(&str, &str)>,
) -> Result<Vec<LedgerEntry>, StorageError> {
    const COLUMNS: &str = "SELECT id, date, amount, direction, description, category, unit, status, created_at, external_ref FROM ledger_entries";

    let rows = match range {
        Some((start, end)) => {
            sqlx::query_as::<_, EntryRow>(&format!(
                "{COLUMNS} WHERE date >= ? AND date <= ? ORDER BY date, created_at, rowid"
            ))
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, EntryRow>(&format!("{COLUMNS} ORDER BY date, created_at, rowid"))
                .fetch_all(pool)
                .await?
        }
    };

    rows.into_iter().map(entry_from_row).collect()
}

fn entry_from_row(r: EntryRow) -> Result<LedgerEntry, StorageError> {
    let corrupt = |detail: String| StorageError::Corrupt {
        table: "ledger_entries",
        detail,
    };

    let id = Uuid::parse_str(&r.0).map_err(|e| corrupt(format!("id '{}': {e}", r.0)))?;
    let amount = Decimal::from_str(&r.2).map_err(|e| corrupt(format!("amount '{}': {e}", r.2)))?;
    let status = EntryStatus::from_str(&r.7).map_err(corrupt)?;
    let created_at = DateTime::parse_from_rfc3339(&r.8)
        .map_err(|e| corrupt(format!("created_at '{}': {e}", r.8)))?
        .with_timezone(&Utc);

    Ok(LedgerEntry {
        id,
        date: r.1,
        amount: Money::from_decimal(amount),
        direction: parse_direction(&r.3, "ledger_entries")?,
        description: r.4,
        category: r.5,
        unit: r.6,
        status,
        created_at,
        external_ref: r.9,
    })
}

fn parse_direction(s: &str, table: &'static str) -> Result<Direction, StorageError> {
    Direction::from_str(s).map_err(|detail| StorageError::Corrupt {
        table,
        detail,
    })
}
