//! Expense analytics - grand total and per-category totals

use crate::store;
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseSummary {
    pub total: f64,
    pub by_category: Vec<CategoryTotal>,
}

/// Sum all stored expense amounts, overall and per category.
/// Categories keep first-seen order so repeated calls return the same shape.
pub async fn expense_summary(pool: &SqlitePool) -> Result<ExpenseSummary, sqlx::Error> {
    let items = store::list_expenses(pool).await?;

    let mut total = 0.0;
    let mut by_category: Vec<CategoryTotal> = Vec::new();

    for item in &items {
        total += item.amount;
        match by_category.iter_mut().find(|c| c.name == item.category) {
            Some(entry) => entry.value += item.amount,
            None => by_category.push(CategoryTotal {
                name: item.category.clone(),
                value: item.amount,
            }),
        }
    }

    Ok(ExpenseSummary { total, by_category })
}
