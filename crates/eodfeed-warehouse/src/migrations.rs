use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_cache_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_key TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    row_count BIGINT NOT NULL,
    written_at_us BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS exchanges (
    cache_key TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    country TEXT,
    currency TEXT,
    suffix TEXT,
    timezone TEXT NOT NULL,
    is_intraday BOOLEAN NOT NULL,
    intraday_start_us BIGINT,
    last_trade_us BIGINT,
    advances BIGINT,
    declines BIGINT
);

CREATE TABLE IF NOT EXISTS symbols (
    cache_key TEXT NOT NULL,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    long_name TEXT
);

CREATE TABLE IF NOT EXISTS bars (
    cache_key TEXT NOT NULL,
    ts_us BIGINT NOT NULL,
    open DOUBLE NOT NULL,
    high DOUBLE NOT NULL,
    low DOUBLE NOT NULL,
    close DOUBLE NOT NULL,
    volume BIGINT NOT NULL,
    open_interest BIGINT
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_cache_entries_kind ON cache_entries(kind);
CREATE INDEX IF NOT EXISTS idx_exchanges_key ON exchanges(cache_key);
CREATE INDEX IF NOT EXISTS idx_symbols_key ON symbols(cache_key);
CREATE INDEX IF NOT EXISTS idx_bars_key_ts ON bars(cache_key, ts_us);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
        }
    }

    Ok(())
}
