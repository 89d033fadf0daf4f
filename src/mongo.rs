//! MongoDB-backed store. One document per category with its expenses
//! embedded, one document per group.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection};
use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::repository::{CategoryRepository, ExpenseRepository, GroupRepository};
use crate::schemas::{Category, Group};

pub struct MongoStore {
    groups: Collection<Group>,
    categories: Collection<Category>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> LedgerResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        info!(database, "connected to MongoDB");
        Ok(Self::from_client(&client, database))
    }

    pub fn from_client(client: &Client, database: &str) -> Self {
        let db = client.database(database);
        MongoStore {
            groups: db.collection("Groups"),
            categories: db.collection("Categories"),
        }
    }
}

#[async_trait]
impl GroupRepository for MongoStore {
    async fn get_group(&self, id: &str) -> LedgerResult<Option<Group>> {
        Ok(self.groups.find_one(doc! { "id": id }, None).await?)
    }

    async fn list_groups(&self) -> LedgerResult<Vec<Group>> {
        let cursor = self.groups.find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_group(&self, group: Group) -> LedgerResult<()> {
        self.groups.insert_one(group, None).await?;
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MongoStore {
    async fn get_category(&self, id: &str) -> LedgerResult<Option<Category>> {
        Ok(self.categories.find_one(doc! { "id": id }, None).await?)
    }

    async fn list_categories(&self) -> LedgerResult<Vec<Category>> {
        let cursor = self.categories.find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_category(&self, category: Category) -> LedgerResult<()> {
        self.categories.insert_one(category, None).await?;
        Ok(())
    }

    async fn save_category(&self, category: Category) -> LedgerResult<()> {
        let id = category.id.clone();
        let result = self
            .categories
            .replace_one(doc! { "id": &id }, category, None)
            .await?;
        if result.matched_count == 0 {
            return Err(LedgerError::not_found("category", id));
        }
        Ok(())
    }

    async fn remove_category(&self, id: &str) -> LedgerResult<bool> {
        let result = self.categories.delete_one(doc! { "id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl ExpenseRepository for MongoStore {
    async fn category_of_expense(&self, expense_id: &str) -> LedgerResult<Option<String>> {
        let category = self
            .categories
            .find_one(doc! { "expenses.id": expense_id }, None)
            .await?;
        Ok(category.map(|c| c.id))
    }
}
