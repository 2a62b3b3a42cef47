use chrono::{Local, NaiveDate};

use crate::models::{Expense, Income, MonthlySummary, month_bucket};

/// Reduces one month's records to a [`MonthlySummary`].
///
/// Total expenses count every record regardless of paid status; `available`
/// and `spent_percentage` therefore reflect committed obligation, not cash
/// already out the door. The percentage floors to zero when there is no
/// income. The month is taken from the first income, then the first
/// expense, and falls back to the current calendar month when both inputs
/// are empty.
pub fn summarize(incomes: &[Income], expenses: &[Expense]) -> MonthlySummary {
    let total_income_cents: i64 = incomes.iter().map(|i| i.amount_cents).sum();
    let total_expenses_cents: i64 = expenses.iter().map(|e| e.amount_cents).sum();
    let total_paid_expenses_cents: i64 = expenses
        .iter()
        .filter(|e| e.paid)
        .map(|e| e.amount_cents)
        .sum();

    let spent_percentage = if total_income_cents > 0 {
        (total_expenses_cents as f64 / total_income_cents as f64) * 100.0
    } else {
        0.0
    };

    let month = incomes
        .first()
        .map(|i| i.month.clone())
        .or_else(|| expenses.first().map(|e| e.month.clone()))
        .unwrap_or_else(current_month);

    MonthlySummary {
        month,
        total_income_cents,
        total_expenses_cents,
        total_paid_expenses_cents,
        available_cents: total_income_cents - total_expenses_cents,
        spent_percentage,
    }
}

pub fn current_month() -> String {
    month_bucket(Local::now().date_naive())
}

pub fn selected_month(month: Option<String>) -> String {
    month
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(current_month)
}

/// "2024-01" -> "January 2024". Falls back to the bucket itself on
/// malformed input.
pub fn month_label(month: &str) -> String {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map(|date| date.format("%B %Y").to_string())
        .unwrap_or_else(|_| month.to_string())
}
