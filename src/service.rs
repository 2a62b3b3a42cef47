use log::info;
use rocket::tokio::try_join;

use crate::errors::LedgerError;
use crate::models::{
    Expense, ExpensePatch, Income, MonthlySummary, NewExpense, NewIncome, month_bucket,
};
use crate::store::RecordStore;
use crate::summary::summarize;

/// The refreshed view handed back after every fetch or mutation.
#[derive(Debug)]
pub struct MonthData {
    pub incomes: Vec<Income>,
    pub expenses: Vec<Expense>,
    pub summary: MonthlySummary,
}

/// Fetches one month's incomes and expenses concurrently and reduces them.
/// Either read failing fails the whole call; there is no partial result.
pub async fn month_data(
    store: &RecordStore,
    user_id: Option<i64>,
    month: &str,
) -> Result<MonthData, LedgerError> {
    let user_id = user_id.ok_or(LedgerError::Unauthenticated)?;
    let records = store.for_user(user_id);
    let (incomes, expenses) = try_join!(
        records.incomes(Some(month.to_string())),
        records.expenses(Some(month.to_string())),
    )?;
    let summary = summarize(&incomes, &expenses);
    Ok(MonthData {
        incomes,
        expenses,
        summary,
    })
}

/// Stores a new income and returns the refreshed view of its month.
pub async fn record_income(
    store: &RecordStore,
    user_id: Option<i64>,
    draft: NewIncome,
) -> Result<MonthData, LedgerError> {
    let user_id = user_id.ok_or(LedgerError::Unauthenticated)?;
    let month = month_bucket(draft.date);
    let id = store.for_user(user_id).add_income(draft).await?;
    info!("user {user_id} recorded income {id} in {month}");
    month_data(store, Some(user_id), &month).await
}

pub async fn record_expense(
    store: &RecordStore,
    user_id: Option<i64>,
    draft: NewExpense,
) -> Result<MonthData, LedgerError> {
    let user_id = user_id.ok_or(LedgerError::Unauthenticated)?;
    let month = month_bucket(draft.date);
    let id = store.for_user(user_id).add_expense(draft).await?;
    info!("user {user_id} recorded expense {id} in {month}");
    month_data(store, Some(user_id), &month).await
}

/// Toggles an expense's paid flag; `month` is the caller's current view,
/// re-fetched after the write.
pub async fn set_expense_paid(
    store: &RecordStore,
    user_id: Option<i64>,
    expense_id: i64,
    paid: bool,
    month: &str,
) -> Result<MonthData, LedgerError> {
    let user_id = user_id.ok_or(LedgerError::Unauthenticated)?;
    store
        .for_user(user_id)
        .set_expense_paid(expense_id, paid)
        .await?;
    month_data(store, Some(user_id), month).await
}

pub async fn edit_expense(
    store: &RecordStore,
    user_id: Option<i64>,
    expense_id: i64,
    patch: ExpensePatch,
    month: &str,
) -> Result<MonthData, LedgerError> {
    let user_id = user_id.ok_or(LedgerError::Unauthenticated)?;
    if !patch.is_empty() {
        store
            .for_user(user_id)
            .update_expense(expense_id, patch)
            .await?;
    }
    month_data(store, Some(user_id), month).await
}

pub async fn remove_expense(
    store: &RecordStore,
    user_id: Option<i64>,
    expense_id: i64,
    month: &str,
) -> Result<MonthData, LedgerError> {
    let user_id = user_id.ok_or(LedgerError::Unauthenticated)?;
    store.for_user(user_id).delete_expense(expense_id).await?;
    info!("user {user_id} deleted expense {expense_id}");
    month_data(store, Some(user_id), month).await
}
