//! Client repository for client database operations.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use uuid::Uuid;

use crate::entities::clients;

/// Error types for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Client not found.
    #[error("Client not found: {0}")]
    NotFound(String),

    /// A client with this tax id already exists.
    #[error("A client with tax id {0} already exists")]
    DuplicateTaxId(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a client.
#[derive(Debug, Clone)]
pub struct CreateClientInput {
    /// Tax id, unique per client.
    pub tax_id: String,
    /// Display name.
    pub name: String,
    /// Postal address.
    pub address: String,
    /// Contact email.
    pub email: String,
}

/// Input for updating a client. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateClientInput {
    /// New display name.
    pub name: Option<String>,
    /// New postal address.
    pub address: Option<String>,
    /// New contact email.
    pub email: Option<String>,
}

/// Client repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    db: DatabaseConnection,
}

impl ClientRepository {
    /// Creates a new client repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DuplicateTaxId`] if a client with the same tax
    /// id already exists.
    pub async fn create(&self, input: CreateClientInput) -> Result<clients::Model, ClientError> {
        let existing = clients::Entity::find()
            .filter(clients::Column::TaxId.eq(&input.tax_id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(ClientError::DuplicateTaxId(input.tax_id));
        }

        let now = Utc::now().into();
        let client = clients::ActiveModel {
            id: Set(Uuid::new_v4()),
            tax_id: Set(input.tax_id),
            name: Set(input.name),
            address: Set(input.address),
            email: Set(input.email),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(client.insert(&self.db).await?)
    }

    /// Lists all clients, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list(&self) -> Result<Vec<clients::Model>, ClientError> {
        Ok(clients::Entity::find()
            .order_by_asc(clients::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// Finds a client by tax id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if no client has this tax id.
    pub async fn get_by_tax_id(&self, tax_id: &str) -> Result<clients::Model, ClientError> {
        clients::Entity::find()
            .filter(clients::Column::TaxId.eq(tax_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| ClientError::NotFound(tax_id.to_owned()))
    }

    /// Updates a client's mutable fields. The tax id itself is immutable.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if no client has this tax id.
    pub async fn update(
        &self,
        tax_id: &str,
        input: UpdateClientInput,
    ) -> Result<clients::Model, ClientError> {
        let client = self.get_by_tax_id(tax_id).await?;

        let mut active: clients::ActiveModel = client.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(address) = input.address {
            active.address = Set(address);
        }
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        active.updated_at = Set(Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Deletes a client by tax id.
    ///
    /// Payables referencing the tax id are kept; their owner name resolves to
    /// null from then on.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] if no client has this tax id.
    pub async fn delete(&self, tax_id: &str) -> Result<(), ClientError> {
        let client = self.get_by_tax_id(tax_id).await?;
        clients::Entity::delete_by_id(client.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
