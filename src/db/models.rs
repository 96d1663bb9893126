use std::fmt;
use std::time::Duration;

use bson::{doc, Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;
use serde::{Deserialize, Serialize};

/// Database the application user is scoped to.
pub const DEFAULT_DATABASE: &str = "factory";
/// Application user created by the bootstrap.
pub const DEFAULT_APP_USER: &str = "factory_app";
/// Development password of the application user.
pub const DEFAULT_APP_PASSWORD: &str = "factory_app_dev";
/// The single role granted to the application user.
pub const READ_WRITE_ROLE: &str = "readWrite";

/// 30 days.
pub const APPLICATION_LOG_TTL_SECS: u64 = 30 * 24 * 60 * 60;
/// 90 days.
pub const USER_ACTIVITY_LOG_TTL_SECS: u64 = 90 * 24 * 60 * 60;
/// 180 days.
pub const ERROR_LOG_TTL_SECS: u64 = 180 * 24 * 60 * 60;

/// Direction or type of a single index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKey {
    Ascending,
    Descending,
    Text,
}

impl IndexKey {
    /// The value used for this key in an index key document.
    pub fn to_bson(self) -> Bson {
        match self {
            IndexKey::Ascending => Bson::Int32(1),
            IndexKey::Descending => Bson::Int32(-1),
            IndexKey::Text => Bson::String("text".to_string()),
        }
    }

    /// Parse a key value as reported by `listIndexes`.
    ///
    /// Numeric directions may come back as int32, int64 or double depending
    /// on how the index was declared.
    pub fn from_bson(value: &Bson) -> Option<Self> {
        let direction = match value {
            Bson::Int32(v) => *v as f64,
            Bson::Int64(v) => *v as f64,
            Bson::Double(v) => *v,
            Bson::String(s) if s == "text" => return Some(IndexKey::Text),
            _ => return None,
        };

        if direction > 0.0 {
            Some(IndexKey::Ascending)
        } else if direction < 0.0 {
            Some(IndexKey::Descending)
        } else {
            None
        }
    }
}

/// A declared index: ordered keys plus the options the bootstrap sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Ordered `(field, key)` pairs.
    pub keys: Vec<(String, IndexKey)>,
    /// Whether the index enforces uniqueness.
    #[serde(default)]
    pub unique: bool,
    /// TTL window, in seconds, measured from the indexed timestamp field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_after_seconds: Option<u64>,
}

impl IndexSpec {
    pub fn ascending(field: &str) -> Self {
        Self::compound(&[(field, IndexKey::Ascending)])
    }

    pub fn descending(field: &str) -> Self {
        Self::compound(&[(field, IndexKey::Descending)])
    }

    /// A text index spanning `fields`.
    pub fn text(fields: &[&str]) -> Self {
        Self {
            keys: fields
                .iter()
                .map(|field| (field.to_string(), IndexKey::Text))
                .collect(),
            unique: false,
            expire_after_seconds: None,
        }
    }

    pub fn compound(keys: &[(&str, IndexKey)]) -> Self {
        Self {
            keys: keys
                .iter()
                .map(|(field, key)| (field.to_string(), *key))
                .collect(),
            unique: false,
            expire_after_seconds: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn expire_after_secs(mut self, seconds: u64) -> Self {
        self.expire_after_seconds = Some(seconds);
        self
    }

    /// The key document passed to `createIndexes`, in declaration order.
    pub fn keys_document(&self) -> Document {
        let mut keys = Document::new();
        for (field, key) in &self.keys {
            keys.insert(field.clone(), key.to_bson());
        }
        keys
    }

    pub fn expire_after(&self) -> Option<Duration> {
        self.expire_after_seconds.map(Duration::from_secs)
    }

    pub fn is_text(&self) -> bool {
        self.keys.iter().any(|(_, key)| *key == IndexKey::Text)
    }

    /// Fields covered by the text part of this index.
    pub fn text_fields(&self) -> Vec<&str> {
        self.keys
            .iter()
            .filter(|(_, key)| *key == IndexKey::Text)
            .map(|(field, _)| field.as_str())
            .collect()
    }

    /// Build the driver model. Options are only attached when the spec sets any,
    /// so plain indexes are declared exactly like `createIndex({ field: 1 })`.
    pub fn to_index_model(&self) -> IndexModel {
        if !self.unique && self.expire_after_seconds.is_none() {
            return IndexModel::builder().keys(self.keys_document()).build();
        }

        let options = IndexOptions::builder()
            .unique(self.unique.then_some(true))
            .expire_after(self.expire_after())
            .build();

        IndexModel::builder()
            .keys(self.keys_document())
            .options(options)
            .build()
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keys_document())?;
        if self.unique {
            write!(f, " unique")?;
        }
        if let Some(seconds) = self.expire_after_seconds {
            write!(f, " expireAfterSeconds={}", seconds)?;
        }
        Ok(())
    }
}

/// Which heading a collection's indexes are listed under in the console report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportGroup {
    News,
    Logs,
}

impl ReportGroup {
    /// Groups in the order they are reported.
    pub const REPORT_ORDER: [ReportGroup; 2] = [ReportGroup::News, ReportGroup::Logs];

    pub fn heading(self) -> &'static str {
        match self {
            ReportGroup::News => "Created indexes for news collections:",
            ReportGroup::Logs => "Created indexes for log collections:",
        }
    }
}

/// A collection and the indexes declared on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub group: ReportGroup,
    /// Always false: every bootstrap collection is explicitly uncapped.
    pub capped: bool,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn new(name: &str, group: ReportGroup, indexes: Vec<IndexSpec>) -> Self {
        Self {
            name: name.to_string(),
            group,
            capped: false,
            indexes,
        }
    }
}

/// A role granted on a specific database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

/// The application user. The password is never serialized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUser {
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub roles: Vec<RoleGrant>,
}

impl fmt::Debug for AppUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppUser")
            .field("name", &self.name)
            .field("password", &"****")
            .field("roles", &self.roles)
            .finish()
    }
}

impl AppUser {
    /// The `createUser` command document.
    pub fn create_command(&self) -> Document {
        let roles: Vec<Document> = self
            .roles
            .iter()
            .map(|grant| doc! { "role": &grant.role, "db": &grant.db })
            .collect();

        doc! {
            "createUser": &self.name,
            "pwd": &self.password,
            "roles": roles,
        }
    }
}

/// Everything the bootstrap creates, in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapPlan {
    pub database: String,
    pub user: AppUser,
    pub collections: Vec<CollectionSpec>,
}

impl BootstrapPlan {
    /// The fixed factory schema: one read-write user, three TTL log
    /// collections and four news collections.
    pub fn factory(database: &str, user: &str, password: &str) -> Self {
        let collections = vec![
            CollectionSpec::new(
                "application_logs",
                ReportGroup::Logs,
                vec![IndexSpec::ascending("createdAt").expire_after_secs(APPLICATION_LOG_TTL_SECS)],
            ),
            CollectionSpec::new(
                "user_activity_logs",
                ReportGroup::Logs,
                vec![IndexSpec::ascending("timestamp").expire_after_secs(USER_ACTIVITY_LOG_TTL_SECS)],
            ),
            CollectionSpec::new(
                "error_logs",
                ReportGroup::Logs,
                vec![IndexSpec::ascending("occurredAt").expire_after_secs(ERROR_LOG_TTL_SECS)],
            ),
            CollectionSpec::new(
                "news_articles",
                ReportGroup::News,
                vec![
                    IndexSpec::text(&["title", "content", "summary"]),
                    IndexSpec::descending("publishedAt"),
                    IndexSpec::ascending("category"),
                    IndexSpec::ascending("source"),
                    IndexSpec::ascending("url").unique(),
                ],
            ),
            CollectionSpec::new(
                "media_outlets",
                ReportGroup::News,
                vec![
                    IndexSpec::ascending("name").unique(),
                    IndexSpec::ascending("domain").unique(),
                ],
            ),
            CollectionSpec::new(
                "journalists",
                ReportGroup::News,
                vec![
                    IndexSpec::ascending("name"),
                    IndexSpec::ascending("mediaOutletId"),
                ],
            ),
            CollectionSpec::new(
                "crawling_metadata",
                ReportGroup::News,
                vec![IndexSpec::compound(&[
                    ("source", IndexKey::Ascending),
                    ("lastCrawledAt", IndexKey::Descending),
                ])],
            ),
        ];

        Self {
            database: database.to_string(),
            user: AppUser {
                name: user.to_string(),
                password: password.to_string(),
                roles: vec![RoleGrant {
                    role: READ_WRITE_ROLE.to_string(),
                    db: database.to_string(),
                }],
            },
            collections,
        }
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Collections of one report group, in creation order.
    pub fn collections_in(&self, group: ReportGroup) -> impl Iterator<Item = &CollectionSpec> {
        self.collections.iter().filter(move |c| c.group == group)
    }

    pub fn collection_names(&self) -> Vec<&str> {
        self.collections.iter().map(|c| c.name.as_str()).collect()
    }
}

impl Default for BootstrapPlan {
    fn default() -> Self {
        Self::factory(DEFAULT_DATABASE, DEFAULT_APP_USER, DEFAULT_APP_PASSWORD)
    }
}
