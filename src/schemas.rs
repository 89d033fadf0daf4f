use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type UserNick = String;

/// Conventional identifier of the person using the app.
pub const LOCAL_MEMBER: &str = "You";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum Currency {
    #[default]
    PHP,
    USD,
    EUR,
    GBP,
    JPY,
}

impl Currency {
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::PHP => "₱",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
        }
    }

    /// Formats an amount the way list views show it: symbol plus two decimals.
    pub fn format(self, amount: Decimal) -> String {
        format!("{}{:.2}", self.symbol(), amount)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Currency::PHP => "PHP",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
        };
        f.write_str(code)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub members: Vec<UserNick>,
    #[serde(default)]
    pub currency: Currency,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Personal,
    Group { group_id: String },
}

impl Scope {
    pub fn group_id(&self) -> Option<&str> {
        match self {
            Scope::Personal => None,
            Scope::Group { group_id } => Some(group_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: Decimal,
    pub payer: UserNick,
    pub date: NaiveDate,
    /// Empty when the member left no note.
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub settled_members: BTreeSet<UserNick>,
}

impl Expense {
    pub fn is_settled_by(&self, member: &str) -> bool {
        self.settled_members.contains(member)
    }
}

/// A budget envelope. `total_spent` and `remaining_balance` are derived
/// from `expenses` and `budget` and only ever written by the ledger.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub scope: Scope,
    pub budget: Decimal,
    pub total_spent: Decimal,
    pub remaining_balance: Decimal,
    pub expenses: Vec<Expense>,
}

/// Validated input for a new expense record.
#[derive(Clone, Debug, PartialEq)]
pub struct NewExpense {
    pub description: String,
    pub amount: Decimal,
    pub payer: UserNick,
    pub date: NaiveDate,
    pub note: String,
}

/// Validated partial edit. `None` leaves the field as it is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpensePatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub note: Option<String>,
}

/// Raw text as typed into the add-expense form.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ExpenseForm {
    pub description: String,
    pub amount: String,
    /// Defaults to the local member when absent.
    #[serde(default)]
    pub payer: Option<UserNick>,
    pub date: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ExpensePatchForm {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CategoryForm {
    pub name: String,
    pub budget: String,
    #[serde(default)]
    pub group_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GroupForm {
    pub name: String,
    pub members: Vec<UserNick>,
    #[serde(default)]
    pub currency: Currency,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub currency: Currency,
    pub member_count: usize,
    pub total_budget: Decimal,
    pub total_spent: Decimal,
    pub remaining: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let expense: Expense = serde_json::from_str(
            r#"{"id":"exp2","description":"Snacks","amount":"2000","payer":"Maria","date":"2023-05-12"}"#,
        )
        .unwrap();
        assert!(expense.note.is_empty());
        assert!(expense.settled_members.is_empty());
        assert!(!expense.is_settled_by("You"));
    }

    #[test]
    fn currency_formats_with_symbol() {
        assert_eq!(Currency::PHP.format(Decimal::new(62500, 2)), "₱625.00");
        assert_eq!(Currency::EUR.to_string(), "EUR");
    }

    #[test]
    fn scope_serializes_tagged() {
        let scope = Scope::Group {
            group_id: "1".to_string(),
        };
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, r#"{"kind":"group","group_id":"1"}"#);
        assert_eq!(scope.group_id(), Some("1"));
    }
}
