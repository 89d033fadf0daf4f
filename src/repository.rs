//! Storage seams. The service only talks to these traits, so the in-memory
//! store and the MongoDB store are interchangeable.

use async_trait::async_trait;

use crate::error::LedgerResult;
use crate::schemas::{Category, Group};

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn get_group(&self, id: &str) -> LedgerResult<Option<Group>>;
    async fn list_groups(&self) -> LedgerResult<Vec<Group>>;
    async fn insert_group(&self, group: Group) -> LedgerResult<()>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn get_category(&self, id: &str) -> LedgerResult<Option<Category>>;
    /// Categories in creation order.
    async fn list_categories(&self) -> LedgerResult<Vec<Category>>;
    async fn insert_category(&self, category: Category) -> LedgerResult<()>;
    /// Replaces the stored category with the same id.
    async fn save_category(&self, category: Category) -> LedgerResult<()>;
    /// Returns false when there was nothing to remove.
    async fn remove_category(&self, id: &str) -> LedgerResult<bool>;
}

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// Id of the category that owns the expense.
    async fn category_of_expense(&self, expense_id: &str) -> LedgerResult<Option<String>>;
}

/// Everything the service needs from a store.
pub trait Store: GroupRepository + CategoryRepository + ExpenseRepository {}

impl<T> Store for T where T: GroupRepository + CategoryRepository + ExpenseRepository {}
