use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::schemas::{Category, Expense, Group, Scope};
use crate::split::{obligation, Obligation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryFilter {
    #[default]
    All,
    Group,
    Personal,
    YouOwe,
}

impl FromStr for HistoryFilter {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "" => Ok(HistoryFilter::All),
            "group" => Ok(HistoryFilter::Group),
            "personal" => Ok(HistoryFilter::Personal),
            "youowe" | "you_owe" => Ok(HistoryFilter::YouOwe),
            _ => Err(LedgerError::UnknownFilter(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Group,
    Personal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub expense: Expense,
    pub category_id: String,
    pub category_name: String,
    pub source: Source,
    /// Only group expenses carry an obligation.
    pub obligation: Option<Obligation>,
}

/// Every expense the viewer can see, newest first.
pub fn history(
    categories: &[Category],
    groups: &[Group],
    viewer: &str,
    filter: HistoryFilter,
) -> LedgerResult<Vec<HistoryEntry>> {
    let mut entries = Vec::new();
    for category in categories {
        let (source, members) = match &category.scope {
            Scope::Personal => (Source::Personal, None),
            Scope::Group { group_id } => match groups.iter().find(|g| &g.id == group_id) {
                Some(group) => (Source::Group, Some(&group.members)),
                None => continue,
            },
        };
        for expense in &category.expenses {
            let obligation = match members {
                Some(members) => {
                    let visible =
                        members.iter().any(|m| m == viewer) || expense.payer == viewer;
                    if !visible {
                        continue;
                    }
                    Some(obligation(expense, members, viewer)?)
                }
                None => None,
            };
            entries.push(HistoryEntry {
                expense: expense.clone(),
                category_id: category.id.clone(),
                category_name: category.name.clone(),
                source,
                obligation,
            });
        }
    }

    entries.retain(|entry| match filter {
        HistoryFilter::All => true,
        HistoryFilter::Group => entry.source == Source::Group,
        HistoryFilter::Personal => entry.source == Source::Personal,
        HistoryFilter::YouOwe => matches!(entry.obligation, Some(Obligation::YouOwe { .. })),
    });
    entries.sort_by(|a, b| b.expense.date.cmp(&a.expense.date));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::Currency;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn expense(id: &str, payer: &str, date: &str, settled: &[&str]) -> Expense {
        Expense {
            id: id.into(),
            description: id.into(),
            amount: Decimal::from(1000),
            payer: payer.into(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            note: String::new(),
            settled_members: settled.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn fixture() -> (Vec<Category>, Vec<Group>) {
        let group = Group {
            id: "1".into(),
            name: "Family Budget".into(),
            members: vec!["You".into(), "Maria".into(), "John".into()],
            currency: Currency::PHP,
        };
        let mut groceries = Category::new(
            "g1".into(),
            "Groceries".into(),
            Scope::Group {
                group_id: "1".into(),
            },
            Decimal::from(10000),
        );
        groceries.expenses = vec![
            expense("exp1", "You", "2023-05-15", &[]),
            expense("exp2", "Maria", "2023-05-12", &[]),
            expense("exp3", "Maria", "2023-05-11", &["You"]),
        ];
        let mut food = Category::new(
            "p1".into(),
            "Food & Dining".into(),
            Scope::Personal,
            Decimal::from(2000),
        );
        food.expenses = vec![expense("t1", "You", "2023-05-13", &[])];
        (vec![groceries, food], vec![group])
    }

    fn ids(entries: &[HistoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.expense.id.as_str()).collect()
    }

    #[test]
    fn all_entries_newest_first() {
        let (categories, groups) = fixture();
        let entries = history(&categories, &groups, "You", HistoryFilter::All).unwrap();
        assert_eq!(ids(&entries), vec!["exp1", "t1", "exp2", "exp3"]);
        assert_eq!(entries[1].source, Source::Personal);
        assert!(entries[1].obligation.is_none());
    }

    #[test]
    fn you_owe_keeps_unsettled_foreign_expenses() {
        let (categories, groups) = fixture();
        let entries = history(&categories, &groups, "You", HistoryFilter::YouOwe).unwrap();
        assert_eq!(ids(&entries), vec!["exp2"]);
    }

    #[test]
    fn outsiders_do_not_see_group_entries() {
        let (categories, groups) = fixture();
        let entries = history(&categories, &groups, "Zoe", HistoryFilter::All).unwrap();
        assert_eq!(ids(&entries), vec!["t1"]);
    }

    #[test]
    fn filter_parses_from_query_text() {
        assert_eq!("youOwe".parse::<HistoryFilter>().unwrap(), HistoryFilter::YouOwe);
        assert_eq!("Group".parse::<HistoryFilter>().unwrap(), HistoryFilter::Group);
        assert!("weekly".parse::<HistoryFilter>().is_err());
    }
}
