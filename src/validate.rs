//! Turns raw form text into typed values.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::schemas::{ExpenseForm, ExpensePatch, ExpensePatchForm, NewExpense, UserNick};

pub fn required_text(value: &str, field: &'static str) -> LedgerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::EmptyRequiredField { field });
    }
    Ok(trimmed.to_string())
}

/// Amounts are kept to the minor currency unit.
pub const MAX_DECIMAL_PLACES: u32 = 2;

/// Largest amount or budget accepted from a form.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

fn parse_decimal(input: &str) -> LedgerResult<Decimal> {
    let amount = Decimal::from_str(input.trim())
        .map_err(|_| LedgerError::InvalidAmount(input.to_string()))?;
    let too_fine = amount.normalize().scale() > MAX_DECIMAL_PLACES;
    if too_fine || amount.abs() > Decimal::from(MAX_AMOUNT) {
        return Err(LedgerError::InvalidAmount(input.to_string()));
    }
    Ok(amount)
}

/// Strictly positive amount, as required for expenses and budget top-ups.
pub fn positive_amount(input: &str) -> LedgerResult<Decimal> {
    let amount = parse_decimal(input)?;
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(input.to_string()));
    }
    Ok(amount)
}

/// Zero or more, as accepted when a budget is overwritten.
pub fn non_negative_amount(input: &str) -> LedgerResult<Decimal> {
    let amount = parse_decimal(input)?;
    if amount < Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(input.to_string()));
    }
    Ok(amount)
}

/// Dates must be written `YYYY-MM-DD`, zero padded.
pub fn date(input: &str) -> LedgerResult<NaiveDate> {
    let input = input.trim();
    let shaped = input.len() == 10
        && input.char_indices().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        });
    if !shaped {
        return Err(LedgerError::InvalidDate(input.to_string()));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| LedgerError::InvalidDate(input.to_string()))
}

pub fn expense_form(form: ExpenseForm, local_member: &str) -> LedgerResult<NewExpense> {
    let description = required_text(&form.description, "description")?;
    let amount = positive_amount(&form.amount)?;
    let date = date(&form.date)?;
    let payer: UserNick = match form.payer {
        Some(payer) => required_text(&payer, "payer")?,
        None => local_member.to_string(),
    };
    Ok(NewExpense {
        description,
        amount,
        payer,
        date,
        note: form.note.map(|n| n.trim().to_string()).unwrap_or_default(),
    })
}

pub fn expense_patch(form: ExpensePatchForm) -> LedgerResult<ExpensePatch> {
    Ok(ExpensePatch {
        description: form
            .description
            .map(|d| required_text(&d, "description"))
            .transpose()?,
        amount: form.amount.map(|a| positive_amount(&a)).transpose()?,
        date: form.date.map(|d| date(&d)).transpose()?,
        note: form.note.map(|n| n.trim().to_string()),
    })
}
