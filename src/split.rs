//! Equal split of an expense between the members of its group.
//!
//! Shares are `amount / members` cut down to whole cents, with no remainder
//! redistribution, so three shares of 100 are 33.33 each and add up to 99.99.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::schemas::{Expense, UserNick};

pub fn per_member_share(amount: Decimal, member_count: usize) -> LedgerResult<Decimal> {
    if member_count == 0 {
        return Err(LedgerError::DivisionByZero);
    }
    amount
        .checked_div(Decimal::from(member_count))
        .map(|share| share.round_dp_with_strategy(2, RoundingStrategy::ToZero))
        .ok_or(LedgerError::DivisionByZero)
}

/// What an expense means for one viewer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Obligation {
    /// The viewer paid; `count` members still owe `share` each.
    OthersOwe { share: Decimal, count: usize },
    YouOwe { share: Decimal },
    Settled,
}

/// Members other than the payer who have not settled yet, in group order.
pub fn unsettled_members<'a>(expense: &'a Expense, members: &'a [UserNick]) -> Vec<&'a UserNick> {
    members
        .iter()
        .filter(|m| **m != expense.payer && !expense.is_settled_by(m))
        .collect()
}

pub fn obligation(
    expense: &Expense,
    members: &[UserNick],
    viewer: &str,
) -> LedgerResult<Obligation> {
    let share = per_member_share(expense.amount, members.len())?;
    if expense.payer != viewer && !members.iter().any(|m| m == viewer) {
        return Err(LedgerError::NotSplitMember {
            member: viewer.to_string(),
        });
    }
    if expense.payer == viewer {
        return Ok(Obligation::OthersOwe {
            share,
            count: unsettled_members(expense, members).len(),
        });
    }
    if expense.is_settled_by(viewer) {
        Ok(Obligation::Settled)
    } else {
        Ok(Obligation::YouOwe { share })
    }
}

/// Everything the expense detail view shows about the split.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExpenseSplit {
    pub expense_id: String,
    pub member_count: usize,
    pub share: Decimal,
    pub settled_count: usize,
    pub unsettled: Vec<UserNick>,
    pub obligation: Obligation,
}

pub fn split_summary(
    expense: &Expense,
    members: &[UserNick],
    viewer: &str,
) -> LedgerResult<ExpenseSplit> {
    Ok(ExpenseSplit {
        expense_id: expense.id.clone(),
        member_count: members.len(),
        share: per_member_share(expense.amount, members.len())?,
        settled_count: expense.settled_members.len(),
        unsettled: unsettled_members(expense, members)
            .into_iter()
            .cloned()
            .collect(),
        obligation: obligation(expense, members, viewer)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn members() -> Vec<UserNick> {
        ["You", "Maria", "John", "Luis"]
            .iter()
            .map(|m| m.to_string())
            .collect()
    }

    fn groceries(settled: &[&str]) -> Expense {
        Expense {
            id: "exp1".into(),
            description: "Weekly groceries".into(),
            amount: Decimal::from(2500),
            payer: "You".into(),
            date: NaiveDate::from_ymd_opt(2023, 5, 15).unwrap(),
            note: String::new(),
            settled_members: settled.iter().map(|m| m.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn share_is_amount_over_members() {
        assert_eq!(
            per_member_share(Decimal::from(2500), 4).unwrap(),
            Decimal::from(625)
        );
        assert_eq!(
            per_member_share(Decimal::ONE, 0),
            Err(LedgerError::DivisionByZero)
        );
    }

    #[test]
    fn shares_are_not_rebalanced() {
        let share = per_member_share(Decimal::from(100), 3).unwrap();
        assert_eq!(share, Decimal::new(3333, 2));
        assert_eq!(share * Decimal::from(3), Decimal::new(9999, 2));
        assert_eq!(
            per_member_share(Decimal::new(200, 2), 3).unwrap(),
            Decimal::new(66, 2)
        );
    }

    #[test]
    fn payer_sees_who_still_owes() {
        let expense = groceries(&["Maria", "John"]);
        assert_eq!(
            obligation(&expense, &members(), "You").unwrap(),
            Obligation::OthersOwe {
                share: Decimal::from(625),
                count: 1
            }
        );
        let members = members();
        let unsettled = unsettled_members(&expense, &members);
        assert_eq!(unsettled, vec!["Luis"]);
    }

    #[test]
    fn other_members_owe_until_settled() {
        let expense = groceries(&["John"]);
        assert_eq!(
            obligation(&expense, &members(), "Maria").unwrap(),
            Obligation::YouOwe {
                share: Decimal::from(625)
            }
        );
        assert_eq!(
            obligation(&expense, &members(), "John").unwrap(),
            Obligation::Settled
        );
    }

    #[test]
    fn outsiders_have_no_share() {
        let expense = groceries(&[]);
        assert_eq!(
            obligation(&expense, &members(), "Zoe"),
            Err(LedgerError::NotSplitMember {
                member: "Zoe".into()
            })
        );
        assert!(split_summary(&expense, &members(), "Zoe").is_err());
    }

    #[test]
    fn summary_counts_settled_members() {
        let summary = split_summary(&groceries(&["John"]), &members(), "You").unwrap();
        assert_eq!(summary.member_count, 4);
        assert_eq!(summary.settled_count, 1);
        assert_eq!(summary.unsettled, vec!["Maria", "Luis"]);
    }
}
