use std::str::FromStr;

use chrono::NaiveDate;
use rocket::FromFormField;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::Serialize;
use thiserror::Error;

/// Truncates a calendar date to its `YYYY-MM` bucket. This is the only
/// place a month key is ever derived; drafts never carry a caller-supplied
/// month.
pub fn month_bucket(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[derive(Debug, Error)]
#[error("unrecognized stored value: {0}")]
pub struct ParseKindError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum IncomeKind {
    Salary,
    Extra,
}

impl IncomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeKind::Salary => "salary",
            IncomeKind::Extra => "extra",
        }
    }
}

impl FromStr for IncomeKind {
    type Err = ParseKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "salary" => Ok(IncomeKind::Salary),
            "extra" => Ok(IncomeKind::Extra),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

impl FromSql for IncomeKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: ParseKindError| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum ExpenseKind {
    Fixed,
    Variable,
}

impl ExpenseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseKind::Fixed => "fixed",
            ExpenseKind::Variable => "variable",
        }
    }
}

impl FromStr for ExpenseKind {
    type Err = ParseKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fixed" => Ok(ExpenseKind::Fixed),
            "variable" => Ok(ExpenseKind::Variable),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

impl FromSql for ExpenseKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: ParseKindError| FromSqlError::Other(Box::new(e)))
    }
}

/// Closed category set. Widening it is a data migration, not a screen-level
/// edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum ExpenseCategory {
    Housing,
    Transportation,
    Food,
    Utilities,
    Entertainment,
    Health,
    Education,
    Clothing,
    Savings,
    Investments,
    Others,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 11] = [
        ExpenseCategory::Housing,
        ExpenseCategory::Transportation,
        ExpenseCategory::Food,
        ExpenseCategory::Utilities,
        ExpenseCategory::Entertainment,
        ExpenseCategory::Health,
        ExpenseCategory::Education,
        ExpenseCategory::Clothing,
        ExpenseCategory::Savings,
        ExpenseCategory::Investments,
        ExpenseCategory::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Housing => "Housing",
            ExpenseCategory::Transportation => "Transportation",
            ExpenseCategory::Food => "Food",
            ExpenseCategory::Utilities => "Utilities",
            ExpenseCategory::Entertainment => "Entertainment",
            ExpenseCategory::Health => "Health",
            ExpenseCategory::Education => "Education",
            ExpenseCategory::Clothing => "Clothing",
            ExpenseCategory::Savings => "Savings",
            ExpenseCategory::Investments => "Investments",
            ExpenseCategory::Others => "Others",
        }
    }
}

impl FromStr for ExpenseCategory {
    type Err = ParseKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ExpenseCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| ParseKindError(value.to_string()))
    }
}

impl FromSql for ExpenseCategory {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: ParseKindError| FromSqlError::Other(Box::new(e)))
    }
}

/// A stored income record. `month` always equals the truncation of `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct Income {
    pub id: i64,
    pub user_id: i64,
    pub kind: IncomeKind,
    pub description: String,
    pub amount_cents: i64,
    pub date: NaiveDate,
    pub month: String,
}

/// A stored expense record. Same month invariant as [`Income`].
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub kind: ExpenseKind,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount_cents: i64,
    pub paid: bool,
    pub date: NaiveDate,
    pub month: String,
}

/// Draft income as submitted by a caller. The store assigns id, owner and
/// month.
#[derive(Debug, Clone)]
pub struct NewIncome {
    pub kind: IncomeKind,
    pub description: String,
    pub amount_cents: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub kind: ExpenseKind,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount_cents: i64,
    pub paid: bool,
    pub date: NaiveDate,
}

/// Field-level partial update for an expense. `date`, `month` and `paid`
/// are deliberately absent: dates are immutable after creation and the paid
/// flag has its own operation.
#[derive(Debug, Clone, Default)]
pub struct ExpensePatch {
    pub kind: Option<ExpenseKind>,
    pub category: Option<ExpenseCategory>,
    pub description: Option<String>,
    pub amount_cents: Option<i64>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.amount_cents.is_none()
    }
}

/// Derived per-month rollup. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: String,
    pub total_income_cents: i64,
    pub total_expenses_cents: i64,
    pub total_paid_expenses_cents: i64,
    pub available_cents: i64,
    pub spent_percentage: f64,
}
