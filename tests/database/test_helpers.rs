use bracket_rating::database::db::DbClient;
use lazy_static::lazy_static;
use std::sync::Arc;
use testcontainers::{clients::Cli, Container};
use testcontainers_modules::postgres::Postgres;

pub struct TestDatabase {
    pub connection_string: String,
    _container: Container<'static, Postgres>
}

impl TestDatabase {
    /// Starts an empty PostgreSQL container. The schema is left to
    /// [`DbClient::apply_schema`] so that it is exercised as well.
    pub fn new() -> Self {
        lazy_static! {
            static ref DOCKER: Arc<Cli> = Arc::new(Cli::default());
        }

        let container = DOCKER.run(Postgres::default());
        let port = container.get_host_port_ipv4(5432);

        let connection_string = format!(
            "host=localhost port={} user=postgres password=postgres dbname=postgres",
            port
        );

        TestDatabase {
            connection_string,
            _container: container
        }
    }

    /// A connected client with the schema applied.
    pub async fn client(&self) -> DbClient {
        let db = DbClient::connect(&self.connection_string)
            .await
            .expect("Failed to connect");
        db.apply_schema().await.expect("Failed to apply schema");
        db
    }
}
