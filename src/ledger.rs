//! Keeps a category's totals in step with its expense records.
//!
//! `total_spent` and `remaining_balance` are only written from `totals`,
//! which re-sums the live records with checked arithmetic and refuses any
//! result where `remaining_balance + total_spent == budget` would not hold
//! exactly. A refused change leaves the category untouched.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::error::{LedgerError, LedgerResult};
use crate::schemas::{Category, Expense, ExpensePatch, Scope};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageLevel {
    Healthy,
    Caution,
    Critical,
    Overspent,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BudgetUsage {
    pub percent_used: Decimal,
    pub level: UsageLevel,
}

/// `(total_spent, remaining_balance)` for a set of amounts and a budget.
fn totals<I>(amounts: I, budget: Decimal) -> LedgerResult<(Decimal, Decimal)>
where
    I: IntoIterator<Item = Decimal>,
{
    let spent = amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(amount))
        .ok_or_else(|| LedgerError::InvalidAmount("total spent out of range".to_string()))?;
    let remaining = budget
        .checked_sub(spent)
        .filter(|remaining| remaining.checked_add(spent) == Some(budget))
        .ok_or_else(|| {
            LedgerError::InvalidAmount(format!("budget {} against spent {}", budget, spent))
        })?;
    Ok((spent, remaining))
}

impl Category {
    pub fn new(id: String, name: String, scope: Scope, budget: Decimal) -> Self {
        Category {
            id,
            name,
            scope,
            budget,
            total_spent: Decimal::ZERO,
            remaining_balance: budget,
            expenses: Vec::new(),
        }
    }

    fn apply_totals(&mut self, (spent, remaining): (Decimal, Decimal)) {
        self.total_spent = spent;
        self.remaining_balance = remaining;
        if remaining < Decimal::ZERO {
            let overspent = -remaining;
            warn!(category = %self.id, %overspent, "category over budget");
        }
    }

    /// True when the stored totals agree with the records and the budget.
    pub fn check_invariant(&self) -> bool {
        match totals(self.expenses.iter().map(|e| e.amount), self.budget) {
            Ok((spent, remaining)) => {
                self.total_spent == spent && self.remaining_balance == remaining
            }
            Err(_) => false,
        }
    }

    pub fn expense(&self, id: &str) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    pub fn expense_mut(&mut self, id: &str) -> Option<&mut Expense> {
        self.expenses.iter_mut().find(|e| e.id == id)
    }

    pub fn add_expense(&mut self, expense: Expense) -> LedgerResult<&Expense> {
        if expense.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(expense.amount.to_string()));
        }
        let amounts = self.expenses.iter().map(|e| e.amount);
        let next = totals(amounts.chain(Some(expense.amount)), self.budget)?;
        self.expenses.push(expense);
        self.apply_totals(next);
        Ok(&self.expenses[self.expenses.len() - 1])
    }

    pub fn edit_expense(&mut self, id: &str, patch: ExpensePatch) -> LedgerResult<&Expense> {
        if let Some(amount) = patch.amount {
            if amount <= Decimal::ZERO {
                return Err(LedgerError::InvalidAmount(amount.to_string()));
            }
        }
        let index = self
            .expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| LedgerError::not_found("expense", id))?;
        let amounts = self.expenses.iter().enumerate().map(|(i, e)| match patch.amount {
            Some(amount) if i == index => amount,
            _ => e.amount,
        });
        let next = totals(amounts, self.budget)?;
        let expense = &mut self.expenses[index];
        if let Some(description) = patch.description {
            expense.description = description;
        }
        if let Some(amount) = patch.amount {
            expense.amount = amount;
        }
        if let Some(date) = patch.date {
            expense.date = date;
        }
        if let Some(note) = patch.note {
            expense.note = note;
        }
        self.apply_totals(next);
        Ok(&self.expenses[index])
    }

    pub fn delete_expense(&mut self, id: &str) -> LedgerResult<Expense> {
        let index = self
            .expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| LedgerError::not_found("expense", id))?;
        let amounts = self
            .expenses
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, e)| e.amount);
        let next = totals(amounts, self.budget)?;
        let removed = self.expenses.remove(index);
        self.apply_totals(next);
        Ok(removed)
    }

    /// Removes every listed record that exists and returns how many went.
    pub fn bulk_delete<S: AsRef<str>>(&mut self, ids: &[S]) -> LedgerResult<usize> {
        if ids.is_empty() {
            return Err(LedgerError::EmptySelection);
        }
        let wanted: HashSet<&str> = ids.iter().map(|id| id.as_ref()).collect();
        let kept = self
            .expenses
            .iter()
            .filter(|e| !wanted.contains(e.id.as_str()));
        let removed = self.expenses.len() - kept.clone().count();
        if removed == 0 {
            return Err(LedgerError::not_found("expense", ids[0].as_ref()));
        }
        let next = totals(kept.map(|e| e.amount), self.budget)?;
        self.expenses.retain(|e| !wanted.contains(e.id.as_str()));
        self.apply_totals(next);
        Ok(removed)
    }

    pub fn adjust_budget(&mut self, delta: Decimal) -> LedgerResult<()> {
        if delta <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(delta.to_string()));
        }
        let budget = self
            .budget
            .checked_add(delta)
            .ok_or_else(|| LedgerError::InvalidAmount(delta.to_string()))?;
        self.replace_budget(budget)
    }

    pub fn set_budget(&mut self, value: Decimal) -> LedgerResult<()> {
        if value < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(value.to_string()));
        }
        self.replace_budget(value)
    }

    fn replace_budget(&mut self, budget: Decimal) -> LedgerResult<()> {
        let next = totals(self.expenses.iter().map(|e| e.amount), budget)?;
        self.budget = budget;
        self.apply_totals(next);
        Ok(())
    }

    pub fn usage(&self) -> LedgerResult<BudgetUsage> {
        if self.budget.is_zero() {
            let level = if self.total_spent.is_zero() {
                UsageLevel::Healthy
            } else {
                UsageLevel::Overspent
            };
            return Ok(BudgetUsage {
                percent_used: Decimal::ZERO,
                level,
            });
        }
        let percent_used = self
            .total_spent
            .checked_div(self.budget)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(|| LedgerError::InvalidAmount(self.budget.to_string()))?;
        let level = if self.total_spent > self.budget {
            UsageLevel::Overspent
        } else if percent_used > Decimal::from(80) {
            UsageLevel::Critical
        } else if percent_used > Decimal::from(50) {
            UsageLevel::Caution
        } else {
            UsageLevel::Healthy
        };
        Ok(BudgetUsage {
            percent_used,
            level,
        })
    }

    /// List view order. Records on the same date keep insertion order reversed.
    pub fn expenses_newest_first(&self) -> Vec<&Expense> {
        let mut expenses: Vec<&Expense> = self.expenses.iter().rev().collect();
        expenses.sort_by(|a, b| b.date.cmp(&a.date));
        expenses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn expense(id: &str, amount: i64, day: u32) -> Expense {
        Expense {
            id: id.into(),
            description: id.into(),
            amount: Decimal::from(amount),
            payer: "You".into(),
            date: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
            note: String::new(),
            settled_members: Default::default(),
        }
    }

    fn food_and_dining() -> Category {
        let mut category = Category::new(
            "1".into(),
            "Food & Dining".into(),
            Scope::Personal,
            Decimal::from(2000),
        );
        for (i, amount) in [399, 78, 200, 399, 78, 200].into_iter().enumerate() {
            category
                .add_expense(expense(&format!("t{}", i + 1), amount, i as u32 + 1))
                .unwrap();
        }
        category
    }

    #[test]
    fn editing_an_amount_moves_both_totals() {
        let mut category = Category::new(
            "1".into(),
            "Food & Dining".into(),
            Scope::Personal,
            Decimal::from(2000),
        );
        for (i, amount) in [399, 78, 200].into_iter().enumerate() {
            category
                .add_expense(expense(&format!("t{}", i + 1), amount, i as u32 + 1))
                .unwrap();
        }
        assert_eq!(category.total_spent, Decimal::from(677));

        category
            .edit_expense(
                "t1",
                ExpensePatch {
                    amount: Some(Decimal::from(450)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(category.total_spent, Decimal::from(728));
        assert_eq!(category.remaining_balance, Decimal::from(1272));
        assert!(category.check_invariant());
    }

    #[test]
    fn totals_follow_every_record() {
        let category = food_and_dining();
        assert_eq!(category.total_spent, Decimal::from(1354));
        assert_eq!(category.remaining_balance, Decimal::from(646));
        assert!(category.check_invariant());
    }

    #[test]
    fn delete_subtracts_once() {
        let mut category = food_and_dining();
        let before = category.total_spent;
        category.delete_expense("t1").unwrap();
        assert_eq!(category.total_spent, before - Decimal::from(399));
        assert_eq!(
            category.delete_expense("t1"),
            Err(LedgerError::not_found("expense", "t1"))
        );
        assert_eq!(category.total_spent, before - Decimal::from(399));
    }

    #[test]
    fn bulk_delete_resums_what_is_left() {
        let mut category = Category::new(
            "g1".into(),
            "Groceries".into(),
            Scope::Group {
                group_id: "1".into(),
            },
            Decimal::from(10000),
        );
        for (id, amount) in [("exp1", 2500), ("exp2", 2000), ("exp3", 2050), ("exp4", 1500)] {
            category.add_expense(expense(id, amount, 10)).unwrap();
        }
        assert_eq!(category.bulk_delete(&["exp2", "exp3", "exp3"]).unwrap(), 2);
        assert_eq!(category.total_spent, Decimal::from(4000));
        assert_eq!(category.remaining_balance, Decimal::from(6000));
        assert_eq!(
            category.bulk_delete(&["exp2"]),
            Err(LedgerError::not_found("expense", "exp2"))
        );
        assert_eq!(
            category.bulk_delete::<&str>(&[]),
            Err(LedgerError::EmptySelection)
        );
    }

    #[test]
    fn budget_top_up_and_overwrite() {
        let mut category = Category::new(
            "2".into(),
            "Transport".into(),
            Scope::Personal,
            Decimal::from(1000),
        );
        category.adjust_budget(Decimal::from(500)).unwrap();
        assert_eq!(category.budget, Decimal::from(1500));
        assert_eq!(category.remaining_balance, Decimal::from(1500));
        assert!(category.adjust_budget(Decimal::ZERO).is_err());

        category.add_expense(expense("t1", 300, 1)).unwrap();
        category.set_budget(Decimal::from(200)).unwrap();
        assert_eq!(category.remaining_balance, Decimal::from(-100));
        assert!(category.check_invariant());
        assert!(category.set_budget(Decimal::from(-1)).is_err());
        assert_eq!(category.budget, Decimal::from(200));
    }

    #[test]
    fn usage_levels() {
        let mut category = Category::new(
            "3".into(),
            "Fun".into(),
            Scope::Personal,
            Decimal::from(100),
        );
        assert_eq!(category.usage().unwrap().level, UsageLevel::Healthy);
        category.add_expense(expense("a", 50, 1)).unwrap();
        assert_eq!(category.usage().unwrap().level, UsageLevel::Healthy);
        category.add_expense(expense("b", 1, 2)).unwrap();
        assert_eq!(category.usage().unwrap().level, UsageLevel::Caution);
        category.add_expense(expense("c", 30, 3)).unwrap();
        assert_eq!(category.usage().unwrap().level, UsageLevel::Critical);
        category.add_expense(expense("d", 20, 4)).unwrap();
        assert_eq!(category.usage().unwrap().level, UsageLevel::Overspent);
        assert_eq!(category.usage().unwrap().percent_used, Decimal::from(101));

        category.set_budget(Decimal::ZERO).unwrap();
        assert_eq!(category.usage().unwrap().level, UsageLevel::Overspent);
    }

    #[test]
    fn overflowing_totals_are_refused() {
        let mut category = Category::new(
            "4".into(),
            "Big".into(),
            Scope::Personal,
            Decimal::ZERO,
        );
        let mut huge = expense("a", 0, 1);
        huge.amount = Decimal::from_i128_with_scale(50_000_000_000_000_000_000_000_000_000, 0);
        category.add_expense(huge.clone()).unwrap();
        huge.id = "b".into();
        assert!(matches!(
            category.add_expense(huge),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert_eq!(category.expenses.len(), 1);
        assert!(category.check_invariant());
        assert!(category.adjust_budget(Decimal::MAX).is_ok());
        assert!(category.adjust_budget(Decimal::MAX).is_err());
    }

    #[test]
    fn inexact_remaining_balance_is_refused() {
        let mut category = Category::new(
            "5".into(),
            "Tiny".into(),
            Scope::Personal,
            Decimal::new(1, 27),
        );
        assert!(matches!(
            category.add_expense(expense("a", 100, 1)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(category.expenses.is_empty());
        assert_eq!(category.remaining_balance, Decimal::new(1, 27));
        assert!(category.check_invariant());
    }

    #[test]
    fn usage_out_of_range_is_an_error() {
        let mut category = Category::new(
            "6".into(),
            "Tiny".into(),
            Scope::Personal,
            Decimal::new(1, 26),
        );
        category.add_expense(expense("a", 100, 1)).unwrap();
        assert!(category.check_invariant());
        assert!(matches!(
            category.usage(),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn list_order_is_newest_first() {
        let category = food_and_dining();
        let ids: Vec<&str> = category
            .expenses_newest_first()
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["t6", "t5", "t4", "t3", "t2", "t1"]);
    }
}
