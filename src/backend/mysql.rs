use crate::backend::{Connection, Connector, NULL_TEXT, QueryResult};
use crate::config::ConnectionSettings;
use crate::error::CollectorError;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, Row, Value};
use secrecy::ExposeSecret;
use tracing::debug;

pub struct MySqlConnector {
    settings: ConnectionSettings,
}

impl MySqlConnector {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    fn opts(&self, target: &str) -> OptsBuilder {
        OptsBuilder::default()
            .ip_or_hostname(target)
            .tcp_port(self.settings.port)
            .user(Some(self.settings.user.clone()))
            .pass(
                self.settings
                    .password
                    .as_ref()
                    .map(|p| p.expose_secret().to_string()),
            )
            .db_name(Some(self.settings.database.clone()))
    }
}

impl Connector for MySqlConnector {
    type Conn = MySqlConnection;

    async fn connect(&self, target: &str) -> Result<MySqlConnection, CollectorError> {
        let conn = Conn::new(self.opts(target))
            .await
            .map_err(|e| CollectorError::Connect {
                target: target.to_string(),
                message: format!(
                    "failed to connect to database {}: {}",
                    self.settings.database, e
                ),
            })?;

        Ok(MySqlConnection {
            target: target.to_string(),
            conn: Some(conn),
        })
    }
}

pub struct MySqlConnection {
    target: String,
    conn: Option<Conn>,
}

impl Connection for MySqlConnection {
    async fn execute(&mut self, sql: &str) -> Result<QueryResult, CollectorError> {
        let target = self.target.clone();
        let Some(conn) = self.conn.as_mut() else {
            return Err(CollectorError::Query {
                target,
                message: "connection already closed".to_string(),
            });
        };

        let outcome = async {
            let mut result = conn.query_iter(sql).await?;
            let columns = result
                .columns_ref()
                .iter()
                .map(|c| c.name_str().into_owned())
                .collect::<Vec<_>>();
            let raw_rows: Vec<Row> = result.collect().await?;
            // Only the first result set is returned; drain the rest.
            result.drop_result().await?;

            let rows = raw_rows.iter().map(row_to_text).collect();
            Ok::<_, mysql_async::Error>(QueryResult { columns, rows })
        }
        .await;

        outcome.map_err(|e| CollectorError::Query {
            target,
            message: format!("query execution failed: {e}"),
        })
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take()
            && let Err(e) = conn.disconnect().await
        {
            debug!(host = %self.target, error = %e, "error while disconnecting");
        }
    }
}

fn row_to_text(row: &Row) -> Vec<String> {
    (0..row.len())
        .map(|i| row.as_ref(i).map_or_else(|| NULL_TEXT.to_string(), value_to_text))
        .collect()
}

/// Render a MySQL value as output text.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::NULL => NULL_TEXT.to_string(),
        Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let mut s = format!(
                "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            );
            if *micros > 0 {
                s.push_str(&format!(".{micros:06}"));
            }
            s
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let mut s = String::new();
            if *negative {
                s.push('-');
            }
            if *days > 0 {
                s.push_str(&format!("{days} "));
            }
            s.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
            if *micros > 0 {
                s.push_str(&format!(".{micros:06}"));
            }
            s
        }
    }
}
