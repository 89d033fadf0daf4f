use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::LedgerResult;
use crate::schemas::{Expense, UserNick};
use crate::split::{per_member_share, unsettled_members};

/// Positive: the member is owed money. Negative: the member owes.
pub type Balance = BTreeMap<UserNick, Decimal>;

/// Nets the outstanding shares of `expenses`, all split between `members`.
/// Settled shares and the payer's own share don't count.
pub fn compute_balance<'a, I>(expenses: I, members: &[UserNick]) -> LedgerResult<Balance>
where
    I: IntoIterator<Item = &'a Expense>,
{
    let mut balance = Balance::new();
    add_to_balance(&mut balance, expenses, members)?;
    Ok(balance)
}

/// Same as [`compute_balance`] but accumulates into an existing balance, so
/// several categories of one group can be rolled up together.
pub fn add_to_balance<'a, I>(
    balance: &mut Balance,
    expenses: I,
    members: &[UserNick],
) -> LedgerResult<()>
where
    I: IntoIterator<Item = &'a Expense>,
{
    for expense in expenses {
        let share = per_member_share(expense.amount, members.len())?;
        for debtor in unsettled_members(expense, members) {
            balance
                .entry(expense.payer.clone())
                .and_modify(|v| *v += share)
                .or_insert(share);
            balance
                .entry(debtor.clone())
                .and_modify(|v| *v -= share)
                .or_insert(-share);
        }
    }
    Ok(())
}
