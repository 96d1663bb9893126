use std::collections::BTreeSet;
use std::fmt;

use mongodb::bson::Bson;
use mongodb::IndexModel;

use crate::db::catalog::SchemaCatalog;
use crate::db::models::{BootstrapPlan, IndexKey, IndexSpec, RoleGrant};
use crate::error::BootstrapError;

/// Name of the index the server creates on `_id` for every collection.
const ID_INDEX_NAME: &str = "_id_";

/// One way the live database differs from the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    MissingCollection(String),
    UnexpectedCollection(String),
    CappedMismatch { collection: String, expected: bool },
    MissingIndex { collection: String, index: String },
    UnexpectedIndex { collection: String, name: String },
    MissingUser(String),
    RoleMismatch {
        user: String,
        expected: Vec<RoleGrant>,
        actual: Vec<RoleGrant>,
    },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::MissingCollection(name) => write!(f, "collection '{}' is missing", name),
            Discrepancy::UnexpectedCollection(name) => {
                write!(f, "collection '{}' is not part of the schema", name)
            }
            Discrepancy::CappedMismatch {
                collection,
                expected,
            } => {
                let should = if *expected { "should" } else { "should not" };
                write!(f, "collection '{}' {} be capped", collection, should)
            }
            Discrepancy::MissingIndex { collection, index } => {
                write!(f, "index {} is missing on '{}'", index, collection)
            }
            Discrepancy::UnexpectedIndex { collection, name } => {
                write!(f, "index '{}' on '{}' is not part of the schema", name, collection)
            }
            Discrepancy::MissingUser(name) => write!(f, "user '{}' does not exist", name),
            Discrepancy::RoleMismatch {
                user,
                expected,
                actual,
            } => write!(
                f,
                "user '{}' has roles {} instead of {}",
                user,
                format_roles(actual),
                format_roles(expected)
            ),
        }
    }
}

fn format_roles(roles: &[RoleGrant]) -> String {
    let roles: Vec<String> = roles
        .iter()
        .map(|grant| format!("{}@{}", grant.role, grant.db))
        .collect();
    format!("[{}]", roles.join(", "))
}

/// Result of comparing the live catalog with the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub discrepancies: Vec<Discrepancy>,
}

impl VerificationReport {
    pub fn is_ok(&self) -> bool {
        self.discrepancies.is_empty()
    }

    /// Turn a failed report into an error carrying every discrepancy.
    pub fn into_result(self) -> Result<(), BootstrapError> {
        if self.is_ok() {
            return Ok(());
        }

        let details: Vec<String> = self.discrepancies.iter().map(ToString::to_string).collect();
        Err(BootstrapError::Verification(details.join("; ")))
    }
}

/// Whether a server-reported index is the one `spec` declares.
///
/// Text indexes are reported under the synthetic `_fts`/`_ftsx` keys with the
/// covered fields in `weights`, so they are matched on those instead.
pub fn index_matches(spec: &IndexSpec, model: &IndexModel) -> bool {
    let options = model.options.as_ref();

    let unique = options.and_then(|o| o.unique).unwrap_or(false);
    if unique != spec.unique {
        return false;
    }

    let expire_after = options.and_then(|o| o.expire_after);
    if expire_after != spec.expire_after() {
        return false;
    }

    if spec.is_text() {
        let is_text = matches!(model.keys.get("_fts"), Some(Bson::String(s)) if s == "text");
        let weighted: BTreeSet<&str> = options
            .and_then(|o| o.weights.as_ref())
            .map(|weights| weights.keys().map(String::as_str).collect())
            .unwrap_or_default();
        let expected: BTreeSet<&str> = spec.text_fields().into_iter().collect();
        return is_text && weighted == expected;
    }

    if model.keys.len() != spec.keys.len() {
        return false;
    }

    model
        .keys
        .iter()
        .zip(&spec.keys)
        .all(|((field, value), (expected_field, expected_key))| {
            field == expected_field && IndexKey::from_bson(value) == Some(*expected_key)
        })
}

fn index_name(model: &IndexModel) -> String {
    model
        .options
        .as_ref()
        .and_then(|o| o.name.clone())
        .unwrap_or_else(|| model.keys.to_string())
}

/// Compare the live catalog against the plan without modifying anything.
pub async fn verify(
    catalog: &dyn SchemaCatalog,
    plan: &BootstrapPlan,
) -> Result<VerificationReport, BootstrapError> {
    let mut report = VerificationReport::default();

    let existing: BTreeSet<String> = catalog
        .list_collection_names()
        .await?
        .into_iter()
        .filter(|name| !name.starts_with("system."))
        .collect();
    let planned: BTreeSet<&str> = plan.collection_names().into_iter().collect();

    for name in &existing {
        if !planned.contains(name.as_str()) {
            report
                .discrepancies
                .push(Discrepancy::UnexpectedCollection(name.clone()));
        }
    }

    for collection in &plan.collections {
        if !existing.contains(&collection.name) {
            report
                .discrepancies
                .push(Discrepancy::MissingCollection(collection.name.clone()));
            continue;
        }

        if catalog.is_capped(&collection.name).await? != collection.capped {
            report.discrepancies.push(Discrepancy::CappedMismatch {
                collection: collection.name.clone(),
                expected: collection.capped,
            });
        }

        let indexes = catalog.list_indexes(&collection.name).await?;

        for spec in &collection.indexes {
            if !indexes.iter().any(|model| index_matches(spec, model)) {
                report.discrepancies.push(Discrepancy::MissingIndex {
                    collection: collection.name.clone(),
                    index: spec.to_string(),
                });
            }
        }

        for model in &indexes {
            let name = index_name(model);
            if name == ID_INDEX_NAME {
                continue;
            }
            if !collection.indexes.iter().any(|spec| index_matches(spec, model)) {
                report.discrepancies.push(Discrepancy::UnexpectedIndex {
                    collection: collection.name.clone(),
                    name,
                });
            }
        }
    }

    match catalog.user_roles(&plan.user.name).await? {
        None => report
            .discrepancies
            .push(Discrepancy::MissingUser(plan.user.name.clone())),
        Some(actual) => {
            let expected = &plan.user.roles;
            let same = actual.len() == expected.len()
                && expected.iter().all(|grant| actual.contains(grant));
            if !same {
                report.discrepancies.push(Discrepancy::RoleMismatch {
                    user: plan.user.name.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }
    }

    if report.is_ok() {
        tracing::info!("Database '{}' matches the bootstrap schema", plan.database);
    } else {
        tracing::warn!(
            "Database '{}' differs from the bootstrap schema in {} place(s)",
            plan.database,
            report.discrepancies.len()
        );
    }

    Ok(report)
}
