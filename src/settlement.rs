//! Who has paid back their share of an expense.
//!
//! A member may settle their own share; only the payer may settle on
//! someone else's behalf or take a settlement back.

use serde::Serialize;
use tracing::warn;

use crate::error::{LedgerError, LedgerResult};
use crate::schemas::{Expense, UserNick};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementState {
    Unsettled,
    Settled,
}

fn check_member(expense: &Expense, members: &[UserNick], member: &str) -> LedgerResult<()> {
    if member == expense.payer || !members.iter().any(|m| m == member) {
        return Err(LedgerError::NotSplitMember {
            member: member.to_string(),
        });
    }
    Ok(())
}

fn denied(actor: &str, member: &str) -> LedgerError {
    warn!(actor, member, "settlement change refused");
    LedgerError::PermissionDenied {
        actor: actor.to_string(),
        member: member.to_string(),
    }
}

/// Adds `member` to the settled set. Settling twice is a no-op.
pub fn mark_settled(
    expense: &mut Expense,
    members: &[UserNick],
    actor: &str,
    member: &str,
) -> LedgerResult<()> {
    check_member(expense, members, member)?;
    if actor != member && actor != expense.payer {
        return Err(denied(actor, member));
    }
    expense.settled_members.insert(member.to_string());
    Ok(())
}

/// Payer-only switch used by the edit view.
pub fn toggle_settled(
    expense: &mut Expense,
    members: &[UserNick],
    actor: &str,
    member: &str,
) -> LedgerResult<SettlementState> {
    if actor != expense.payer {
        return Err(denied(actor, member));
    }
    check_member(expense, members, member)?;
    if expense.settled_members.remove(member) {
        Ok(SettlementState::Unsettled)
    } else {
        expense.settled_members.insert(member.to_string());
        Ok(SettlementState::Settled)
    }
}
