//! Demo groups and categories for a fresh in-memory store.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::repository::Store;
use crate::schemas::{Category, Currency, Expense, Group, Scope};

fn date(s: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| LedgerError::InvalidDate(s.to_string()))
}

fn expense(
    id: &str,
    description: &str,
    amount: i64,
    payer: &str,
    day: &str,
    note: &str,
    settled: &[&str],
) -> LedgerResult<Expense> {
    Ok(Expense {
        id: id.to_string(),
        description: description.to_string(),
        amount: Decimal::from(amount),
        payer: payer.to_string(),
        date: date(day)?,
        note: note.to_string(),
        settled_members: settled.iter().map(|m| m.to_string()).collect(),
    })
}

fn group(id: &str, name: &str, members: &[&str]) -> Group {
    Group {
        id: id.to_string(),
        name: name.to_string(),
        members: members.iter().map(|m| m.to_string()).collect(),
        currency: Currency::PHP,
    }
}

fn category(
    id: &str,
    name: &str,
    scope: Scope,
    budget: i64,
    expenses: Vec<Expense>,
) -> LedgerResult<Category> {
    let mut category = Category::new(id.to_string(), name.to_string(), scope, Decimal::from(budget));
    for expense in expenses {
        category.add_expense(expense)?;
    }
    Ok(category)
}

pub fn demo_groups() -> Vec<Group> {
    vec![
        group("1", "Family Budget", &["You", "Maria", "John", "Luis"]),
        group("2", "Roommate Expenses", &["You", "Ana", "Carlo"]),
        group("3", "Project Team", &["You", "Bea", "Dan", "Eli", "Faye"]),
    ]
}

pub fn demo_categories() -> LedgerResult<Vec<Category>> {
    let family = || Scope::Group {
        group_id: "1".to_string(),
    };
    Ok(vec![
        category(
            "1",
            "Food & Dining",
            Scope::Personal,
            2000,
            vec![
                expense("t1", "Burger King", 399, "You", "2025-05-01", "Lunch with friends", &[])?,
                expense("t2", "Jollibee", 78, "You", "2025-05-02", "", &[])?,
                expense("t3", "Starbucks", 200, "You", "2025-05-03", "Morning coffee", &[])?,
                expense("t4", "Burger King", 399, "You", "2025-05-04", "", &[])?,
                expense("t5", "Jollibee", 78, "You", "2025-05-05", "", &[])?,
                expense("t6", "Starbucks", 200, "You", "2025-05-06", "", &[])?,
            ],
        )?,
        category("2", "Groceries", Scope::Personal, 1000, Vec::new())?,
        category("3", "Entertainment", Scope::Personal, 1000, Vec::new())?,
        category(
            "g1",
            "Groceries",
            family(),
            10000,
            vec![
                expense("exp1", "Weekly groceries", 2500, "You", "2023-05-15", "", &["John"])?,
                expense("exp2", "Snacks", 2000, "Maria", "2023-05-12", "", &[])?,
                expense("exp3", "Fruits", 2050, "Maria", "2023-05-11", "", &[])?,
                expense("exp4", "Drinks", 1500, "John", "2023-05-10", "", &[])?,
            ],
        )?,
    ])
}

pub async fn load_demo(store: &dyn Store) -> LedgerResult<()> {
    let groups = demo_groups();
    let categories = demo_categories()?;
    info!(groups = groups.len(), categories = categories.len(), "loading demo data");
    for group in groups {
        store.insert_group(group).await?;
    }
    for category in categories {
        store.insert_category(category).await?;
    }
    Ok(())
}
