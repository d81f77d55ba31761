//! # sql-commenter
//!
//! Annotates outgoing SQL with a machine-parsable comment carrying request
//! and trace metadata, so database query logs can be tied back to the
//! request that issued them.
//!
//! A wrapped driver rewrites each statement just before it reaches the real
//! connection:
//!
//! ```text
//! SELECT * FROM users WHERE id = $1/*db_driver=postgres,route=%2Fusers%2F%3Aid,traceparent=00-...-01*/;
//! ```
//!
//! Everything else (connection lifecycle, transactions, result sets, errors)
//! is forwarded unchanged, and each proxy exposes exactly the optional
//! capabilities of the object it wraps.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sql_commenter::prelude::*;
//!
//! sql_commenter::register("postgres", Arc::new(MyPostgresDriver))?;
//!
//! let db = sql_commenter::open_with_options(
//!     "postgres",
//!     "postgres://localhost/mydb",
//!     CommenterOptions::new().with_config(CommenterConfig::all()),
//! )?;
//!
//! let ctx = Context::current().with_route("/users/:id").with_action("show");
//! let conn = db.connect(&ctx).await?;
//! let rows = conn.query(&ctx, "SELECT * FROM users WHERE id = $1", &[Value::from(42_i64)]).await?;
//! ```
//!
//! SeaORM users wrap their `DatabaseConnection` instead:
//!
//! ```rust,ignore
//! let db = Database::connect("postgres://localhost/mydb").await?.with_comments();
//! let users = Users::find().all(&db.with_context(ctx)).await?;
//! ```
//!
//! ## Tags
//!
//! | Key | Source | Default |
//! |-----|--------|---------|
//! | `action` | request context | off |
//! | `application` | resolved once per driver | off |
//! | `controller` | request context | off |
//! | `db_driver` | registered driver name | on |
//! | `framework` | request context | off |
//! | `route` | request context | off |
//! | `traceparent` | OpenTelemetry context | on |
//!
//! Keys are sorted and values percent-encoded; [`parse_comment`] reverses it.

mod application;
mod assembler;
mod config;
mod connection;
pub mod context;
mod database;
pub mod driver;
mod encoder;
mod error;
mod proxy;

pub use application::ApplicationIdentity;
pub use assembler::Commenter;
pub use config::{CommenterConfig, CommenterOptions, Tags};
pub use connection::{CommentedConnection, CommenterExt};
pub use context::Context;
pub use database::{open, open_with_options, register, Connection, Database, DsnConnector, Registry};
pub use encoder::{decode_comment, encode_comment, parse_comment};
pub use error::{BoxError, Error, Result};
pub use proxy::{CommenterConn, CommenterConnector, CommenterDriver};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::driver::{Conn, Connector, Driver, Value};
    pub use crate::{
        CommentedConnection, CommenterConfig, CommenterExt, CommenterOptions, Context, Tags,
    };
}
