pub mod mysql;
pub mod postgres;

use crate::error::CollectorError;

/// SQL NULL as written to the output.
pub const NULL_TEXT: &str = "NULL";

/// Column names and text rows returned by one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Opens connections to individual target hosts.
///
/// One connector is shared by every worker task; each call to `connect` yields a
/// connection owned exclusively by the caller.
pub trait Connector: Send + Sync + 'static {
    type Conn: Connection;

    fn connect(
        &self,
        target: &str,
    ) -> impl std::future::Future<Output = Result<Self::Conn, CollectorError>> + Send;
}

/// A live connection to one target.
pub trait Connection: Send + 'static {
    fn execute(
        &mut self,
        sql: &str,
    ) -> impl std::future::Future<Output = Result<QueryResult, CollectorError>> + Send;

    /// Release the connection. Safe to call more than once.
    fn close(&mut self) -> impl std::future::Future<Output = ()> + Send;
}
