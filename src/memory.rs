use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::repository::{CategoryRepository, ExpenseRepository, GroupRepository};
use crate::schemas::{Category, Group};

/// Process-lifetime store. Everything is lost on restart.
///
/// `latency` delays every call to stand in for a network round trip.
#[derive(Default)]
pub struct InMemoryStore {
    groups: RwLock<Vec<Group>>,
    categories: RwLock<Vec<Category>>,
    latency: Duration,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        InMemoryStore {
            latency,
            ..Self::default()
        }
    }

    async fn round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl GroupRepository for InMemoryStore {
    async fn get_group(&self, id: &str) -> LedgerResult<Option<Group>> {
        self.round_trip().await;
        Ok(self.groups.read().await.iter().find(|g| g.id == id).cloned())
    }

    async fn list_groups(&self) -> LedgerResult<Vec<Group>> {
        self.round_trip().await;
        Ok(self.groups.read().await.clone())
    }

    async fn insert_group(&self, group: Group) -> LedgerResult<()> {
        self.round_trip().await;
        let mut groups = self.groups.write().await;
        if groups.iter().any(|g| g.id == group.id) {
            return Err(LedgerError::Storage(format!("group {} already exists", group.id)));
        }
        debug!(group = %group.id, "group stored");
        groups.push(group);
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn get_category(&self, id: &str) -> LedgerResult<Option<Category>> {
        self.round_trip().await;
        Ok(self
            .categories
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn list_categories(&self) -> LedgerResult<Vec<Category>> {
        self.round_trip().await;
        Ok(self.categories.read().await.clone())
    }

    async fn insert_category(&self, category: Category) -> LedgerResult<()> {
        self.round_trip().await;
        let mut categories = self.categories.write().await;
        if categories.iter().any(|c| c.id == category.id) {
            return Err(LedgerError::Storage(format!(
                "category {} already exists",
                category.id
            )));
        }
        debug!(category = %category.id, "category stored");
        categories.push(category);
        Ok(())
    }

    async fn save_category(&self, category: Category) -> LedgerResult<()> {
        self.round_trip().await;
        let mut categories = self.categories.write().await;
        match categories.iter_mut().find(|c| c.id == category.id) {
            Some(stored) => {
                *stored = category;
                Ok(())
            }
            None => Err(LedgerError::not_found("category", category.id)),
        }
    }

    async fn remove_category(&self, id: &str) -> LedgerResult<bool> {
        self.round_trip().await;
        let mut categories = self.categories.write().await;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        Ok(categories.len() != before)
    }
}

#[async_trait]
impl ExpenseRepository for InMemoryStore {
    async fn category_of_expense(&self, expense_id: &str) -> LedgerResult<Option<String>> {
        self.round_trip().await;
        Ok(self
            .categories
            .read()
            .await
            .iter()
            .find(|c| c.expense(expense_id).is_some())
            .map(|c| c.id.clone()))
    }
}
