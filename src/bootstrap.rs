use mongodb::bson::{self, Bson};
use mongodb::IndexModel;
use serde::Serialize;

use crate::db::catalog::SchemaCatalog;
use crate::db::models::{BootstrapPlan, ReportGroup};
use crate::error::BootstrapError;

/// Printed once every statement of the bootstrap has succeeded.
pub const COMPLETION_MESSAGE: &str = "MongoDB initialization completed successfully!";

/// What a successful bootstrap run created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapSummary {
    pub user: String,
    pub collections: Vec<String>,
    /// `(collection, index name)` pairs in creation order.
    pub indexes: Vec<(String, String)>,
}

impl std::fmt::Display for BootstrapSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "user '{}', {} collections, {} indexes",
            self.user,
            self.collections.len(),
            self.indexes.len()
        )
    }
}

/// Execute the plan against a fresh database.
///
/// Statements run strictly in plan order: the user first, then each collection
/// followed by its indexes. The first failure aborts everything after it and is
/// returned as-is; nothing already created is rolled back, and running this
/// twice against the same database fails on the duplicate user.
pub async fn run_bootstrap(
    catalog: &dyn SchemaCatalog,
    plan: &BootstrapPlan,
) -> Result<BootstrapSummary, BootstrapError> {
    tracing::info!(database = %plan.database, "Starting bootstrap...");

    catalog.create_user(&plan.user).await?;
    tracing::info!(
        "Created user '{}' with roles {:?}",
        plan.user.name,
        plan.user.roles
    );

    let mut summary = BootstrapSummary {
        user: plan.user.name.clone(),
        ..Default::default()
    };

    for collection in &plan.collections {
        catalog.create_collection(collection).await?;
        tracing::info!("Created collection '{}'", collection.name);
        summary.collections.push(collection.name.clone());

        for index in &collection.indexes {
            let name = catalog.create_index(&collection.name, index).await?;
            tracing::debug!("Created index '{}' on '{}': {}", name, collection.name, index);
            summary.indexes.push((collection.name.clone(), name));
        }
    }

    Ok(summary)
}

/// Indexes of one report group, collection by collection.
#[derive(Debug, Clone)]
pub struct ReportSection {
    pub group: ReportGroup,
    pub collections: Vec<(String, Vec<IndexModel>)>,
}

/// The console confirmation listing every index the server now holds.
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub sections: Vec<ReportSection>,
}

impl IndexReport {
    /// Render the report: a heading per group followed by one pretty-printed
    /// JSON document per index.
    pub fn render(&self) -> Result<String, BootstrapError> {
        let mut out = String::new();

        for section in &self.sections {
            out.push_str(section.group.heading());
            out.push('\n');

            for (_, indexes) in &section.collections {
                for index in indexes {
                    out.push_str(&index_to_json(index)?);
                    out.push('\n');
                }
            }
        }

        Ok(out)
    }
}

/// Relaxed extended JSON of an index, the shape `listIndexes` returns it in.
pub fn index_to_json(index: &IndexModel) -> Result<String, BootstrapError> {
    let document =
        bson::to_document(index).map_err(|e| BootstrapError::Internal(e.to_string()))?;

    serde_json::to_string_pretty(&Bson::Document(document).into_relaxed_extjson())
        .map_err(|e| BootstrapError::Internal(e.to_string()))
}

/// Read back the indexes of every planned collection, news collections first.
pub async fn collect_report(
    catalog: &dyn SchemaCatalog,
    plan: &BootstrapPlan,
) -> Result<IndexReport, BootstrapError> {
    let mut sections = Vec::new();

    for group in ReportGroup::REPORT_ORDER {
        let mut collections = Vec::new();
        for collection in plan.collections_in(group) {
            let indexes = catalog.list_indexes(&collection.name).await?;
            collections.push((collection.name.clone(), indexes));
        }
        sections.push(ReportSection { group, collections });
    }

    Ok(IndexReport { sections })
}
