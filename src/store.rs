use log::warn;
use rocket::tokio::task::spawn_blocking;
use rusqlite::Connection;

use crate::db::{self, DbPool};
use crate::errors::LedgerError;
use crate::models::{Expense, ExpensePatch, Income, NewExpense, NewIncome, month_bucket};

/// Entry point to the per-user record collections.
#[derive(Clone)]
pub struct RecordStore {
    pool: DbPool,
}

impl RecordStore {
    pub fn new(pool: DbPool) -> Self {
        RecordStore { pool }
    }

    /// Scopes every subsequent operation to one owner. The handle is the
    /// only way to reach records, so a query that crosses users cannot be
    /// expressed.
    pub fn for_user(&self, user_id: i64) -> UserRecords {
        UserRecords {
            pool: self.pool.clone(),
            user_id,
        }
    }
}

/// One user's view of the record store.
#[derive(Clone)]
pub struct UserRecords {
    pool: DbPool,
    user_id: i64,
}

impl UserRecords {
    /// Runs one store operation on the blocking pool, mapping pool and SQL
    /// failures through `wrap`.
    async fn run<T, F>(&self, wrap: fn(String) -> LedgerError, op: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&Connection, i64) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let user_id = self.user_id;
        spawn_blocking(move || {
            let conn = pool.get().map_err(|e| wrap(e.to_string()))?;
            op(&conn, user_id).map_err(|e| {
                warn!("store operation failed for user {user_id}: {e}");
                wrap(e.to_string())
            })
        })
        .await
        .map_err(|e| wrap(e.to_string()))?
    }

    /// Stores a new income under this owner and returns its id. The month
    /// bucket is derived from the draft's date here; the adapter does not
    /// validate description or amount. A negative amount is stored as-is,
    /// sign checks belong to the form layer.
    pub async fn add_income(&self, draft: NewIncome) -> Result<i64, LedgerError> {
        let month = month_bucket(draft.date);
        self.run(LedgerError::StoreWrite, move |conn, user_id| {
            db::insert_income(conn, user_id, &draft, &month)
        })
        .await
    }

    pub async fn add_expense(&self, draft: NewExpense) -> Result<i64, LedgerError> {
        let month = month_bucket(draft.date);
        self.run(LedgerError::StoreWrite, move |conn, user_id| {
            db::insert_expense(conn, user_id, &draft, &month)
        })
        .await
    }

    /// All incomes for this owner, optionally narrowed to one month bucket,
    /// most recent date first (ties by insertion recency). No matches is an
    /// empty vec, not an error.
    pub async fn incomes(&self, month: Option<String>) -> Result<Vec<Income>, LedgerError> {
        self.run(LedgerError::StoreRead, move |conn, user_id| {
            db::list_incomes(conn, user_id, month.as_deref())
        })
        .await
    }

    pub async fn expenses(&self, month: Option<String>) -> Result<Vec<Expense>, LedgerError> {
        self.run(LedgerError::StoreRead, move |conn, user_id| {
            db::list_expenses(conn, user_id, month.as_deref())
        })
        .await
    }

    /// Sets only the `paid` flag; every other field keeps its prior value.
    pub async fn set_expense_paid(&self, expense_id: i64, paid: bool) -> Result<(), LedgerError> {
        let rows = self
            .run(LedgerError::StoreWrite, move |conn, user_id| {
                db::update_expense_paid(conn, user_id, expense_id, paid)
            })
            .await?;
        if rows == 0 {
            return Err(LedgerError::NotFound {
                kind: "expense",
                id: expense_id,
            });
        }
        Ok(())
    }

    pub async fn update_expense(
        &self,
        expense_id: i64,
        patch: ExpensePatch,
    ) -> Result<(), LedgerError> {
        let rows = self
            .run(LedgerError::StoreWrite, move |conn, user_id| {
                db::update_expense_fields(conn, user_id, expense_id, &patch)
            })
            .await?;
        if rows == 0 {
            return Err(LedgerError::NotFound {
                kind: "expense",
                id: expense_id,
            });
        }
        Ok(())
    }

    /// Idempotent: deleting an id that does not exist (or was already
    /// deleted) succeeds.
    pub async fn delete_expense(&self, expense_id: i64) -> Result<(), LedgerError> {
        self.run(LedgerError::StoreWrite, move |conn, user_id| {
            db::delete_expense(conn, user_id, expense_id)
        })
        .await?;
        Ok(())
    }

    /// Distinct month buckets this owner has records in, newest first.
    pub async fn months(&self, limit: i64) -> Result<Vec<String>, LedgerError> {
        self.run(LedgerError::StoreRead, move |conn, user_id| {
            db::record_months(conn, user_id, limit)
        })
        .await
    }
}
