//! The API the presentation layer calls. Every mutation is a
//! load, change, save cycle against one category, serialized by `writes`.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::balance::{add_to_balance, compute_balance, Balance};
use crate::error::{LedgerError, LedgerResult};
use crate::exchange::{get_exchanges, Exchange};
use crate::history::{history, HistoryEntry, HistoryFilter};
use crate::repository::Store;
use crate::schemas::{
    Category, CategoryForm, Expense, ExpenseForm, ExpensePatchForm, Group, GroupForm,
    GroupSummary, Scope, UserNick,
};
use crate::settlement::{self, SettlementState};
use crate::split::{split_summary, ExpenseSplit};
use crate::validate;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Settlements {
    pub balance: Balance,
    pub exchanges: Vec<Exchange>,
}

pub struct BudgetService {
    store: Arc<dyn Store>,
    local_member: UserNick,
    writes: Mutex<()>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl BudgetService {
    pub fn new(store: Arc<dyn Store>, local_member: impl Into<UserNick>) -> Self {
        BudgetService {
            store,
            local_member: local_member.into(),
            writes: Mutex::new(()),
        }
    }

    pub fn local_member(&self) -> &str {
        &self.local_member
    }

    async fn load_category(&self, id: &str) -> LedgerResult<Category> {
        self.store
            .get_category(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("category", id))
    }

    async fn load_group(&self, id: &str) -> LedgerResult<Group> {
        self.store
            .get_group(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("group", id))
    }

    async fn locate_expense(&self, expense_id: &str) -> LedgerResult<Category> {
        let category_id = self
            .store
            .category_of_expense(expense_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("expense", expense_id))?;
        self.load_category(&category_id).await
    }

    /// Who an expense in `category` is split between.
    async fn members_of(&self, category: &Category) -> LedgerResult<Vec<UserNick>> {
        match &category.scope {
            Scope::Personal => Ok(vec![self.local_member.clone()]),
            Scope::Group { group_id } => Ok(self.load_group(group_id).await?.members),
        }
    }

    pub async fn get_category(&self, id: &str) -> LedgerResult<Category> {
        debug!(category = id, "get category");
        self.load_category(id).await
    }

    /// All categories, or only those of one group.
    pub async fn list_categories(&self, group_id: Option<&str>) -> LedgerResult<Vec<Category>> {
        let categories = self.store.list_categories().await?;
        Ok(match group_id {
            Some(group_id) => categories
                .into_iter()
                .filter(|c| c.scope.group_id() == Some(group_id))
                .collect(),
            None => categories,
        })
    }

    pub async fn create_category(&self, form: CategoryForm) -> LedgerResult<Category> {
        let name = validate::required_text(&form.name, "name")?;
        let budget = validate::non_negative_amount(&form.budget)?;
        let scope = match form.group_id {
            Some(group_id) => {
                self.load_group(&group_id).await?;
                Scope::Group { group_id }
            }
            None => Scope::Personal,
        };
        let category = Category::new(new_id(), name, scope, budget);
        self.store.insert_category(category.clone()).await?;
        info!(category = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn delete_category(&self, id: &str) -> LedgerResult<()> {
        let _guard = self.writes.lock().await;
        if !self.store.remove_category(id).await? {
            return Err(LedgerError::not_found("category", id));
        }
        info!(category = id, "category deleted");
        Ok(())
    }

    pub async fn add_expense(&self, category_id: &str, form: ExpenseForm) -> LedgerResult<Expense> {
        let new = validate::expense_form(form, &self.local_member)?;
        let _guard = self.writes.lock().await;
        let mut category = self.load_category(category_id).await?;
        let members = self.members_of(&category).await?;
        if !members.contains(&new.payer) {
            return Err(LedgerError::NotSplitMember { member: new.payer });
        }
        let expense = Expense {
            id: new_id(),
            description: new.description,
            amount: new.amount,
            payer: new.payer,
            date: new.date,
            note: new.note,
            settled_members: Default::default(),
        };
        let expense = category.add_expense(expense)?.clone();
        self.store.save_category(category.clone()).await?;
        info!(
            category = category_id,
            expense = %expense.id,
            amount = %expense.amount,
            total_spent = %category.total_spent,
            "expense added"
        );
        Ok(expense)
    }

    pub async fn edit_expense(
        &self,
        expense_id: &str,
        form: ExpensePatchForm,
    ) -> LedgerResult<Expense> {
        let patch = validate::expense_patch(form)?;
        let _guard = self.writes.lock().await;
        let mut category = self.locate_expense(expense_id).await?;
        let expense = category.edit_expense(expense_id, patch)?.clone();
        self.store.save_category(category.clone()).await?;
        info!(
            category = %category.id,
            expense = expense_id,
            total_spent = %category.total_spent,
            "expense edited"
        );
        Ok(expense)
    }

    pub async fn delete_expense(&self, expense_id: &str) -> LedgerResult<()> {
        let _guard = self.writes.lock().await;
        let mut category = self.locate_expense(expense_id).await?;
        category.delete_expense(expense_id)?;
        self.store.save_category(category.clone()).await?;
        info!(category = %category.id, expense = expense_id, "expense deleted");
        Ok(())
    }

    /// Ids may span categories. Unknown ids are skipped as long as at least
    /// one listed expense exists. Every affected category is changed in
    /// memory before anything is saved, and categories already saved are
    /// restored when a later save fails.
    pub async fn bulk_delete_expenses(&self, expense_ids: &[String]) -> LedgerResult<usize> {
        if expense_ids.is_empty() {
            return Err(LedgerError::EmptySelection);
        }
        let _guard = self.writes.lock().await;
        let mut by_category: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for id in expense_ids {
            if let Some(category_id) = self.store.category_of_expense(id).await? {
                by_category.entry(category_id).or_default().push(id);
            }
        }
        if by_category.is_empty() {
            return Err(LedgerError::not_found("expense", expense_ids[0].as_str()));
        }

        let mut changes = Vec::with_capacity(by_category.len());
        let mut removed = 0;
        for (category_id, ids) in by_category {
            let original = self.load_category(&category_id).await?;
            let mut updated = original.clone();
            removed += updated.bulk_delete(&ids)?;
            changes.push((original, updated));
        }

        for (index, (_, updated)) in changes.iter().enumerate() {
            if let Err(err) = self.store.save_category(updated.clone()).await {
                warn!(category = %updated.id, %err, "bulk delete failed, restoring");
                for (original, _) in &changes[..index] {
                    self.store.save_category(original.clone()).await?;
                }
                return Err(err);
            }
        }
        info!(removed, "expenses bulk deleted");
        Ok(removed)
    }

    pub async fn settle_share(&self, actor: &str, expense_id: &str, member: &str) -> LedgerResult<()> {
        let _guard = self.writes.lock().await;
        let mut category = self.locate_expense(expense_id).await?;
        let members = self.members_of(&category).await?;
        let expense = category
            .expense_mut(expense_id)
            .ok_or_else(|| LedgerError::not_found("expense", expense_id))?;
        settlement::mark_settled(expense, &members, actor, member)?;
        self.store.save_category(category).await?;
        info!(expense = expense_id, actor, member, "share settled");
        Ok(())
    }

    pub async fn toggle_settled(
        &self,
        actor: &str,
        expense_id: &str,
        member: &str,
    ) -> LedgerResult<SettlementState> {
        let _guard = self.writes.lock().await;
        let mut category = self.locate_expense(expense_id).await?;
        let members = self.members_of(&category).await?;
        let expense = category
            .expense_mut(expense_id)
            .ok_or_else(|| LedgerError::not_found("expense", expense_id))?;
        let state = settlement::toggle_settled(expense, &members, actor, member)?;
        self.store.save_category(category).await?;
        info!(expense = expense_id, member, ?state, "settlement toggled");
        Ok(state)
    }

    pub async fn adjust_budget(&self, category_id: &str, delta: &str) -> LedgerResult<Category> {
        let delta = validate::positive_amount(delta)?;
        self.update_budget(category_id, |category| category.adjust_budget(delta))
            .await
    }

    pub async fn set_budget(&self, category_id: &str, value: &str) -> LedgerResult<Category> {
        let value = validate::non_negative_amount(value)?;
        self.update_budget(category_id, |category| category.set_budget(value))
            .await
    }

    async fn update_budget<F>(&self, category_id: &str, change: F) -> LedgerResult<Category>
    where
        F: FnOnce(&mut Category) -> LedgerResult<()>,
    {
        let _guard = self.writes.lock().await;
        let mut category = self.load_category(category_id).await?;
        change(&mut category)?;
        self.store.save_category(category.clone()).await?;
        info!(
            category = category_id,
            budget = %category.budget,
            remaining = %category.remaining_balance,
            "budget updated"
        );
        Ok(category)
    }

    pub async fn expense_split(&self, expense_id: &str, viewer: &str) -> LedgerResult<ExpenseSplit> {
        let category = self.locate_expense(expense_id).await?;
        let members = self.members_of(&category).await?;
        let expense = category
            .expense(expense_id)
            .ok_or_else(|| LedgerError::not_found("expense", expense_id))?;
        split_summary(expense, &members, viewer)
    }

    /// The local member is always part of a group they create.
    pub async fn create_group(&self, form: GroupForm) -> LedgerResult<Group> {
        let name = validate::required_text(&form.name, "name")?;
        let mut members: Vec<UserNick> = Vec::with_capacity(form.members.len() + 1);
        for member in &form.members {
            let member = validate::required_text(member, "member")?;
            if members.contains(&member) {
                return Err(LedgerError::DuplicateMember(member));
            }
            members.push(member);
        }
        if !members.contains(&self.local_member) {
            members.insert(0, self.local_member.clone());
        }
        let group = Group {
            id: new_id(),
            name,
            members,
            currency: form.currency,
        };
        self.store.insert_group(group.clone()).await?;
        info!(group = %group.id, members = group.members.len(), "group created");
        Ok(group)
    }

    pub async fn get_group(&self, id: &str) -> LedgerResult<Group> {
        self.load_group(id).await
    }

    pub async fn list_groups(&self) -> LedgerResult<Vec<Group>> {
        self.store.list_groups().await
    }

    pub async fn group_summary(&self, id: &str) -> LedgerResult<GroupSummary> {
        let group = self.load_group(id).await?;
        let categories = self.list_categories(Some(id)).await?;
        let total_budget: Decimal = categories.iter().map(|c| c.budget).sum();
        let total_spent: Decimal = categories.iter().map(|c| c.total_spent).sum();
        debug!(
            group = id,
            spent = %group.currency.format(total_spent),
            "group summary"
        );
        Ok(GroupSummary {
            id: group.id,
            name: group.name,
            currency: group.currency,
            member_count: group.members.len(),
            total_budget,
            total_spent,
            remaining: total_budget - total_spent,
        })
    }

    pub async fn category_settlements(&self, category_id: &str) -> LedgerResult<Settlements> {
        let category = self.load_category(category_id).await?;
        let members = self.members_of(&category).await?;
        let balance = compute_balance(&category.expenses, &members)?;
        let exchanges = get_exchanges(&balance, &category.expenses, &members)?;
        Ok(Settlements { balance, exchanges })
    }

    /// Nets outstanding shares across every category of the group.
    pub async fn group_settlements(&self, group_id: &str) -> LedgerResult<Settlements> {
        let group = self.load_group(group_id).await?;
        let categories = self.list_categories(Some(group_id)).await?;
        let mut balance = Balance::new();
        for category in &categories {
            add_to_balance(&mut balance, &category.expenses, &group.members)?;
        }
        let expenses = categories.iter().flat_map(|c| c.expenses.iter());
        let exchanges = get_exchanges(&balance, expenses, &group.members)?;
        Ok(Settlements { balance, exchanges })
    }

    pub async fn history(
        &self,
        viewer: &str,
        filter: HistoryFilter,
    ) -> LedgerResult<Vec<HistoryEntry>> {
        let categories = self.store.list_categories().await?;
        let groups = self.store.list_groups().await?;
        history(&categories, &groups, viewer, filter)
    }
}
