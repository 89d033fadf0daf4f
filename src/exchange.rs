use std::collections::BTreeMap;
use std::mem::swap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::balance::Balance;
use crate::error::LedgerResult;
use crate::schemas::{Expense, UserNick};
use crate::split::{per_member_share, unsettled_members};

#[derive(Clone, Debug)]
pub struct PersonalBalance {
    pub id: UserNick,
    pub balance: Decimal,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct UserPair {
    pub user1: UserNick,
    pub user2: UserNick,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Exchange {
    pub payer: UserNick,
    pub receiver: UserNick,
    pub amount: Decimal,
}

// The exchanges that will be made if no simplification happens
fn get_naive_exchanges<'a, I>(expenses: I, members: &[UserNick]) -> LedgerResult<Vec<Exchange>>
where
    I: IntoIterator<Item = &'a Expense>,
{
    let mut balances_between_people: BTreeMap<UserPair, Decimal> = BTreeMap::new();

    for expense in expenses {
        let share = per_member_share(expense.amount, members.len())?;
        for debtor in unsettled_members(expense, members) {
            let mut pair = UserPair {
                user1: expense.payer.clone(),
                user2: debtor.clone(),
            };
            let mut amount = share;

            // Alphabetical order keeps every debt between the same two
            // people in the same entry
            if pair.user1 > pair.user2 {
                swap(&mut pair.user1, &mut pair.user2);
                amount = -amount;
            }

            balances_between_people
                .entry(pair)
                .and_modify(|balance| *balance += amount)
                .or_insert(amount);
        }
    }

    // Whoever was paid for now pays back
    let mut exchanges = Vec::new();
    for (people_pair, balance) in balances_between_people {
        let balance = round_to_2_decimals(balance);
        if balance.is_zero() {
            continue;
        }
        let mut payer = people_pair.user2;
        let mut receiver = people_pair.user1;
        if balance < Decimal::ZERO {
            swap(&mut payer, &mut receiver);
        }
        exchanges.push(Exchange {
            payer,
            receiver,
            amount: balance.abs(),
        });
    }

    Ok(exchanges)
}

// Greedily matches the largest debt against the largest credit
fn get_simplified_balances(
    mut payers: Vec<PersonalBalance>,
    mut receivers: Vec<PersonalBalance>,
) -> Vec<Exchange> {
    payers.sort_by(|a, b| a.balance.cmp(&b.balance));
    receivers.sort_by(|a, b| a.balance.cmp(&b.balance));

    let mut exchanges: Vec<Exchange> = Vec::new();

    while let (Some(payer), Some(receiver)) = (payers.last_mut(), receivers.last_mut()) {
        let mut exchange = Exchange {
            payer: payer.id.clone(),
            receiver: receiver.id.clone(),
            amount: Decimal::ZERO,
        };
        if receiver.balance == payer.balance {
            exchange.amount = payer.balance;
            payers.pop();
            receivers.pop();
        } else if receiver.balance > payer.balance {
            exchange.amount = payer.balance;
            receiver.balance = round_to_2_decimals(receiver.balance - payer.balance);
            payers.pop();
        } else {
            exchange.amount = receiver.balance;
            payer.balance = round_to_2_decimals(payer.balance - receiver.balance);
            receivers.pop();
        }
        exchanges.push(exchange);
    }
    exchanges
}

fn round_to_2_decimals(n: Decimal) -> Decimal {
    n.round_dp(2)
}

/// Transfers that clear `balance`, computed from the same `expenses`.
/// Falls back to the pairwise list when simplifying doesn't save anything.
pub fn get_exchanges<'a, I>(
    balance: &Balance,
    expenses: I,
    members: &[UserNick],
) -> LedgerResult<Vec<Exchange>>
where
    I: IntoIterator<Item = &'a Expense>,
{
    // Divide people into payers and receivers
    let mut payers = Vec::new();
    let mut receivers = Vec::new();

    for (id, amount) in balance {
        let amount = round_to_2_decimals(*amount);
        if amount.is_zero() {
            continue;
        }
        let person = PersonalBalance {
            id: id.clone(),
            balance: amount.abs(),
        };
        if amount < Decimal::ZERO {
            payers.push(person);
        } else {
            receivers.push(person);
        }
    }

    let naive_exchanges = get_naive_exchanges(expenses, members)?;
    let simplified_exchanges = get_simplified_balances(payers, receivers);

    // We ensure the simplification didn't accidentally end up being
    // more complicated than the naive exchanges
    if simplified_exchanges.len() < naive_exchanges.len() {
        Ok(simplified_exchanges)
    } else {
        Ok(naive_exchanges)
    }
}
