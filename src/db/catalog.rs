use async_trait::async_trait;
use mongodb::IndexModel;

use crate::db::models::{AppUser, CollectionSpec, IndexSpec, RoleGrant};
use crate::error::BootstrapError;

/// Schema-catalog operations the bootstrap needs from the database.
///
/// This trait allows mocking the database layer in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Create the user with its password and role grants.
    async fn create_user(&self, user: &AppUser) -> Result<(), BootstrapError>;

    /// Create a collection. Fails if it already exists.
    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), BootstrapError>;

    /// Create one index and return the name the server assigned to it.
    async fn create_index(&self, collection: &str, index: &IndexSpec)
        -> Result<String, BootstrapError>;

    /// List the indexes of a collection as reported by the server.
    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexModel>, BootstrapError>;

    /// List the names of all collections in the database.
    async fn list_collection_names(&self) -> Result<Vec<String>, BootstrapError>;

    /// Whether an existing collection is capped.
    async fn is_capped(&self, collection: &str) -> Result<bool, BootstrapError>;

    /// Roles granted to a user of this database, or `None` if the user does not exist.
    async fn user_roles(&self, username: &str) -> Result<Option<Vec<RoleGrant>>, BootstrapError>;
}

/// MongoDB implementation of the SchemaCatalog, bound to one database.
pub struct MongoSchemaCatalog {
    db: mongodb::Database,
}

impl MongoSchemaCatalog {
    pub fn new(db: &mongodb::Database) -> Self {
        Self { db: db.clone() }
    }
}

#[async_trait]
impl SchemaCatalog for MongoSchemaCatalog {
    async fn create_user(&self, user: &AppUser) -> Result<(), BootstrapError> {
        self.db
            .run_command(user.create_command())
            .await
            .map_err(|e| BootstrapError::from_driver(e, &user.name))?;

        Ok(())
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), BootstrapError> {
        use mongodb::options::CreateCollectionOptions;

        let options = CreateCollectionOptions::builder()
            .capped(spec.capped)
            .build();

        self.db
            .create_collection(&spec.name)
            .with_options(options)
            .await
            .map_err(|e| BootstrapError::from_driver(e, &spec.name))
    }

    async fn create_index(
        &self,
        collection: &str,
        index: &IndexSpec,
    ) -> Result<String, BootstrapError> {
        use mongodb::bson::Document;

        let result = self
            .db
            .collection::<Document>(collection)
            .create_index(index.to_index_model())
            .await
            .map_err(|e| BootstrapError::Database(e.to_string()))?;

        Ok(result.index_name)
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexModel>, BootstrapError> {
        use futures::TryStreamExt;
        use mongodb::bson::Document;

        let mut cursor = self
            .db
            .collection::<Document>(collection)
            .list_indexes()
            .await
            .map_err(|e| BootstrapError::Database(e.to_string()))?;

        let mut indexes = Vec::new();
        while let Some(index) = cursor
            .try_next()
            .await
            .map_err(|e| BootstrapError::Database(e.to_string()))?
        {
            indexes.push(index);
        }

        Ok(indexes)
    }

    async fn list_collection_names(&self) -> Result<Vec<String>, BootstrapError> {
        self.db
            .list_collection_names()
            .await
            .map_err(|e| BootstrapError::Database(e.to_string()))
    }

    async fn is_capped(&self, collection: &str) -> Result<bool, BootstrapError> {
        use futures::TryStreamExt;
        use mongodb::bson::doc;

        let mut cursor = self
            .db
            .list_collections()
            .filter(doc! { "name": collection })
            .await
            .map_err(|e| BootstrapError::Database(e.to_string()))?;

        let spec = cursor
            .try_next()
            .await
            .map_err(|e| BootstrapError::Database(e.to_string()))?
            .ok_or_else(|| {
                BootstrapError::Database(format!("Collection '{}' not found", collection))
            })?;

        Ok(spec.options.capped.unwrap_or(false))
    }

    async fn user_roles(&self, username: &str) -> Result<Option<Vec<RoleGrant>>, BootstrapError> {
        use mongodb::bson::{doc, from_bson, Bson};

        let response = self
            .db
            .run_command(doc! {
                "usersInfo": { "user": username, "db": self.db.name() }
            })
            .await
            .map_err(|e| BootstrapError::Database(e.to_string()))?;

        let users = response
            .get_array("users")
            .map_err(|e| BootstrapError::Database(e.to_string()))?;

        let Some(Bson::Document(user)) = users.first() else {
            return Ok(None);
        };

        let roles = user
            .get_array("roles")
            .map_err(|e| BootstrapError::Database(e.to_string()))?
            .iter()
            .map(|role| {
                from_bson::<RoleGrant>(role.clone())
                    .map_err(|e| BootstrapError::Database(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(roles))
    }
}
