use crate::backend::{Connection, Connector, NULL_TEXT, QueryResult};
use crate::config::{ConnectionSettings, SslMode};
use crate::error::CollectorError;
use secrecy::ExposeSecret;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::debug;

pub struct PostgresConnector {
    settings: ConnectionSettings,
}

impl PostgresConnector {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    fn config(&self, target: &str) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(target)
            .port(self.settings.port)
            .user(&self.settings.user)
            .dbname(&self.settings.database)
            .ssl_mode(match self.settings.ssl_mode {
                SslMode::Disable => tokio_postgres::config::SslMode::Disable,
                SslMode::Prefer => tokio_postgres::config::SslMode::Prefer,
            });
        if let Some(ref password) = self.settings.password {
            config.password(password.expose_secret());
        }
        config
    }
}

impl Connector for PostgresConnector {
    type Conn = PostgresConnection;

    async fn connect(&self, target: &str) -> Result<PostgresConnection, CollectorError> {
        let (client, connection) =
            self.config(target)
                .connect(NoTls)
                .await
                .map_err(|e| CollectorError::Connect {
                    target: target.to_string(),
                    message: format!(
                        "failed to connect to database {}: {}",
                        self.settings.database, e
                    ),
                })?;

        // The connection object drives the socket; it finishes once the client is dropped.
        let host = target.to_string();
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(host = %host, error = %e, "postgres connection ended with error");
            }
        });

        Ok(PostgresConnection {
            target: target.to_string(),
            client: Some(client),
            driver: Some(driver),
        })
    }
}

pub struct PostgresConnection {
    target: String,
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
}

impl Connection for PostgresConnection {
    async fn execute(&mut self, sql: &str) -> Result<QueryResult, CollectorError> {
        let Some(client) = self.client.as_ref() else {
            return Err(CollectorError::Query {
                target: self.target.clone(),
                message: "connection already closed".to_string(),
            });
        };

        let messages = client
            .simple_query(sql)
            .await
            .map_err(|e| CollectorError::Query {
                target: self.target.clone(),
                message: format!("query execution failed: {e}"),
            })?;

        Ok(first_result_set(messages))
    }

    async fn close(&mut self) {
        drop(self.client.take());
        if let Some(driver) = self.driver.take()
            && let Err(e) = driver.await
        {
            debug!(host = %self.target, error = %e, "postgres driver task failed");
        }
    }
}

/// Collect the columns and text rows of the first result set in a simple-query response.
fn first_result_set(messages: Vec<SimpleQueryMessage>) -> QueryResult {
    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(desc) => {
                if columns.is_some() {
                    break;
                }
                columns = Some(desc.iter().map(|c| c.name().to_string()).collect());
            }
            SimpleQueryMessage::Row(row) => {
                if columns.is_none() {
                    columns = Some(row.columns().iter().map(|c| c.name().to_string()).collect());
                }
                rows.push(
                    (0..row.len())
                        .map(|i| row.get(i).unwrap_or(NULL_TEXT).to_string())
                        .collect(),
                );
            }
            SimpleQueryMessage::CommandComplete(_) => {
                if columns.is_some() {
                    break;
                }
            }
            _ => {}
        }
    }

    QueryResult {
        columns: columns.unwrap_or_default(),
        rows,
    }
}
