//! Roscoe Storage - Executor and Source Seams
//!
//! Everything that talks to a database lives here:
//!
//! - [`RemoteExecutor`]: the sole read/write path to the replicated store.
//!   [`D1Client`] speaks the Cloudflare D1 HTTP API, [`SqliteExecutor`]
//!   runs the same statements against an embedded SQLite database.
//! - [`SourceReader`]: pulls the full flag dataset from the primary store.
//!   [`PostgresSource`] is the production implementation.
//! - [`schema`]: the DDL shared by the sync pipeline and the API server.

pub mod d1;
pub mod executor;
pub mod schema;
pub mod source;
pub mod sqlite;

pub use d1::{D1Client, D1Config};
pub use executor::{
    row_bool, row_f32, row_i64, row_opt_string, row_string, row_u64, RemoteExecutor, Row,
    SqlParam,
};
pub use source::{PostgresSource, SourceReader};
pub use sqlite::SqliteExecutor;
