use anyhow::Context;
use rusqlite::Connection;

/// Ordered, named migrations. Embedded so an `:memory:` database gets the
/// full schema; applied migrations are recorded and skipped on restart.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_courts",
        "CREATE TABLE courts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            location TEXT NOT NULL,
            hourly_price INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    ),
    (
        "002_bookings",
        // Bookings reference courts by id only; historical bookings survive
        // court deletion, so no foreign key.
        "CREATE TABLE bookings (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            court_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            status TEXT NOT NULL,
            code TEXT NOT NULL UNIQUE,
            qr_ref TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX uq_bookings_slot
            ON bookings (court_id, date, start_time)
            WHERE status IN ('pending', 'confirmed', 'realized');
        CREATE INDEX idx_bookings_user ON bookings (user_id, date);",
    ),
    (
        "003_void_records",
        "CREATE TABLE void_records (
            booking_id TEXT PRIMARY KEY,
            reason TEXT NOT NULL,
            refund_required INTEGER NOT NULL,
            refund_amount INTEGER,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    ),
    (
        "004_revenue_entries",
        // Append-only ledger; (booking_id, kind) unique so a replayed void
        // cannot double-reverse revenue.
        "CREATE TABLE revenue_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            booking_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            count_delta INTEGER NOT NULL,
            amount_delta INTEGER NOT NULL,
            period TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (booking_id, kind)
        );
        CREATE INDEX idx_revenue_period ON revenue_entries (period);",
    ),
    (
        "005_payments",
        "CREATE TABLE payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            booking_id TEXT NOT NULL UNIQUE,
            amount INTEGER NOT NULL,
            method TEXT NOT NULL,
            status TEXT NOT NULL,
            transaction_ref TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    ),
    (
        "006_notifications",
        "CREATE TABLE notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    ),
];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}
