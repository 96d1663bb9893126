use std::sync::Arc;

use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mongo::Mongo;

use factory_db_init::db::catalog::{MongoSchemaCatalog, SchemaCatalog};
use factory_db_init::db::models::BootstrapPlan;

pub const TEST_DATABASE: &str = "factory_test";

/// Holds a running MongoDB container and a catalog bound to a test database.
///
/// The container is kept alive for as long as this struct lives. When dropped,
/// it is stopped and cleaned up automatically.
pub struct TestEnv {
    _mongo: ContainerAsync<Mongo>,
    pub uri: String,
    pub db: mongodb::Database,
    pub catalog: Arc<dyn SchemaCatalog>,
    pub plan: BootstrapPlan,
}

impl TestEnv {
    /// Spin up MongoDB and bind a catalog to an empty database.
    pub async fn start() -> Self {
        let mongo_container = Mongo::default()
            .start()
            .await
            .expect("Failed to start MongoDB container");

        let mongo_port = mongo_container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");
        let uri = format!("mongodb://127.0.0.1:{}", mongo_port);
        let client = mongodb::Client::with_uri_str(&uri)
            .await
            .expect("Failed to connect to MongoDB");
        let db = client.database(TEST_DATABASE);
        let catalog: Arc<dyn SchemaCatalog> = Arc::new(MongoSchemaCatalog::new(&db));

        Self {
            _mongo: mongo_container,
            uri,
            db,
            catalog,
            plan: BootstrapPlan::factory(TEST_DATABASE, "factory_app", "factory_app_dev"),
        }
    }

    /// Start and run the bootstrap once.
    pub async fn bootstrapped() -> Self {
        let env = Self::start().await;
        factory_db_init::bootstrap::run_bootstrap(env.catalog.as_ref(), &env.plan)
            .await
            .expect("Bootstrap failed on a clean database");
        env
    }

    /// Indexes of a collection, keyed by server index name.
    pub async fn index_names(&self, collection: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .catalog
            .list_indexes(collection)
            .await
            .expect("Failed to list indexes")
            .into_iter()
            .filter_map(|index| index.options.and_then(|o| o.name))
            .collect();
        names.sort();
        names
    }
}
