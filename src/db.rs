use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Result, params};

use crate::models::{Expense, ExpensePatch, Income, NewExpense, NewIncome};

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn init_db(path: &Path) -> DbPool {
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::new(manager).expect("db pool");
    {
        let conn = pool.get().expect("db connection");
        run_migrations(&conn).expect("db migrations");
    }
    pool
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            token TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS incomes (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('salary', 'extra')),
            description TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            date TEXT NOT NULL,
            month TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('fixed', 'variable')),
            category TEXT NOT NULL,
            description TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            paid INTEGER NOT NULL DEFAULT 0,
            date TEXT NOT NULL,
            month TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_incomes_owner_month ON incomes(user_id, month);
        CREATE INDEX IF NOT EXISTS idx_expenses_owner_month ON expenses(user_id, month);
        ",
    )?;
    Ok(())
}

pub fn insert_user(
    conn: &Connection,
    email: &str,
    password_hash: &str,
    created_at: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
        params![email, password_hash, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn user_credentials(conn: &Connection, email: &str) -> Result<Option<(i64, String)>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, password_hash
        FROM users
        WHERE email = ?1
        ",
    )?;
    let mut rows = stmt.query(params![email])?;
    if let Some(row) = rows.next()? {
        Ok(Some((row.get(0)?, row.get(1)?)))
    } else {
        Ok(None)
    }
}

pub fn update_password(conn: &Connection, user_id: i64, password_hash: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, user_id],
    )?;
    Ok(())
}

pub fn create_session(
    conn: &Connection,
    user_id: i64,
    token: &str,
    created_at: &str,
    expires_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (user_id, token, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, token, created_at, expires_at],
    )?;
    Ok(())
}

/// Owner id, email and expiry for a session token, if the token is known.
pub fn session_claims(conn: &Connection, token: &str) -> Result<Option<(i64, String, String)>> {
    let mut stmt = conn.prepare(
        "
        SELECT u.id, u.email, s.expires_at
        FROM sessions s
        JOIN users u ON s.user_id = u.id
        WHERE s.token = ?1
        ",
    )?;
    let mut rows = stmt.query(params![token])?;
    if let Some(row) = rows.next()? {
        Ok(Some((row.get(0)?, row.get(1)?, row.get(2)?)))
    } else {
        Ok(None)
    }
}

pub fn delete_session(conn: &Connection, token: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

pub fn delete_sessions_for_user(conn: &Connection, user_id: i64) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
    Ok(())
}

pub fn session_count(conn: &Connection, user_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

pub fn prune_sessions(conn: &Connection, user_id: i64, keep: i64) -> Result<()> {
    conn.execute(
        "
        DELETE FROM sessions
        WHERE user_id = ?1
          AND id NOT IN (
            SELECT id
            FROM sessions
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
          )
        ",
        params![user_id, keep],
    )?;
    Ok(())
}

pub fn insert_income(
    conn: &Connection,
    user_id: i64,
    draft: &NewIncome,
    month: &str,
) -> Result<i64> {
    conn.execute(
        "
        INSERT INTO incomes (user_id, kind, description, amount_cents, date, month)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
        params![
            user_id,
            draft.kind.as_str(),
            draft.description,
            draft.amount_cents,
            draft.date,
            month
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_incomes(conn: &Connection, user_id: i64, month: Option<&str>) -> Result<Vec<Income>> {
    let mut params: Vec<&dyn rusqlite::ToSql> = vec![&user_id];
    let query = if let Some(ref month) = month {
        params.push(month);
        "
            SELECT id, user_id, kind, description, amount_cents, date, month
            FROM incomes
            WHERE user_id = ?1 AND month = ?2
            ORDER BY date DESC, id DESC
            "
    } else {
        "
            SELECT id, user_id, kind, description, amount_cents, date, month
            FROM incomes
            WHERE user_id = ?1
            ORDER BY date DESC, id DESC
            "
    };

    let mut stmt = conn.prepare(query)?;
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok(Income {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            description: row.get(3)?,
            amount_cents: row.get(4)?,
            date: row.get(5)?,
            month: row.get(6)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn insert_expense(
    conn: &Connection,
    user_id: i64,
    draft: &NewExpense,
    month: &str,
) -> Result<i64> {
    conn.execute(
        "
        INSERT INTO expenses (user_id, kind, category, description, amount_cents, paid, date, month)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ",
        params![
            user_id,
            draft.kind.as_str(),
            draft.category.as_str(),
            draft.description,
            draft.amount_cents,
            draft.paid,
            draft.date,
            month
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_expenses(conn: &Connection, user_id: i64, month: Option<&str>) -> Result<Vec<Expense>> {
    let mut params: Vec<&dyn rusqlite::ToSql> = vec![&user_id];
    let query = if let Some(ref month) = month {
        params.push(month);
        "
            SELECT id, user_id, kind, category, description, amount_cents, paid, date, month
            FROM expenses
            WHERE user_id = ?1 AND month = ?2
            ORDER BY date DESC, id DESC
            "
    } else {
        "
            SELECT id, user_id, kind, category, description, amount_cents, paid, date, month
            FROM expenses
            WHERE user_id = ?1
            ORDER BY date DESC, id DESC
            "
    };

    let mut stmt = conn.prepare(query)?;
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok(Expense {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            category: row.get(3)?,
            description: row.get(4)?,
            amount_cents: row.get(5)?,
            paid: row.get(6)?,
            date: row.get(7)?,
            month: row.get(8)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Flips only the `paid` column. Returns the number of matched rows.
pub fn update_expense_paid(
    conn: &Connection,
    user_id: i64,
    expense_id: i64,
    paid: bool,
) -> Result<usize> {
    conn.execute(
        "UPDATE expenses SET paid = ?3 WHERE id = ?1 AND user_id = ?2",
        params![expense_id, user_id, paid],
    )
}

/// Partial field update; absent patch fields keep their stored values.
pub fn update_expense_fields(
    conn: &Connection,
    user_id: i64,
    expense_id: i64,
    patch: &ExpensePatch,
) -> Result<usize> {
    conn.execute(
        "
        UPDATE expenses
        SET kind = COALESCE(?3, kind),
            category = COALESCE(?4, category),
            description = COALESCE(?5, description),
            amount_cents = COALESCE(?6, amount_cents)
        WHERE id = ?1 AND user_id = ?2
        ",
        params![
            expense_id,
            user_id,
            patch.kind.map(|k| k.as_str()),
            patch.category.map(|c| c.as_str()),
            patch.description,
            patch.amount_cents
        ],
    )
}

pub fn delete_expense(conn: &Connection, user_id: i64, expense_id: i64) -> Result<usize> {
    conn.execute(
        "DELETE FROM expenses WHERE id = ?1 AND user_id = ?2",
        params![expense_id, user_id],
    )
}

/// Distinct month buckets across both collections, newest first.
pub fn record_months(conn: &Connection, user_id: i64, limit: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "
        SELECT month FROM (
            SELECT month FROM incomes WHERE user_id = ?1
            UNION
            SELECT month FROM expenses WHERE user_id = ?1
        )
        ORDER BY month DESC
        LIMIT ?2
        ",
    )?;
    let rows = stmt.query_map(params![user_id, limit], |row| row.get(0))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
