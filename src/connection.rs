//! Commenting wrapper around a SeaORM `DatabaseConnection`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    ExecResult, IsolationLevel, QueryResult, Statement, StreamTrait, TransactionError,
    TransactionTrait,
};

use crate::assembler::Commenter;
use crate::config::CommenterOptions;
use crate::context::Context;

/// A SeaORM connection that annotates every statement it runs.
///
/// Implements `ConnectionTrait`, `StreamTrait` and `TransactionTrait`, so it
/// can stand in for `DatabaseConnection`. The request context is attached
/// with [`CommentedConnection::with_context`], typically once per request:
///
/// ```rust,ignore
/// use sea_orm::Database;
/// use sql_commenter::prelude::*;
///
/// let db = Database::connect("postgres://localhost/mydb").await?.with_comments();
///
/// // in a handler
/// let db = db.with_context(Context::current().with_route("/users"));
/// let users = Users::find().all(&db).await?;
/// ```
///
/// Statements run on a `DatabaseTransaction` returned by `begin` go straight
/// to SeaORM and are not annotated.
#[derive(Debug, Clone)]
pub struct CommentedConnection {
    inner: Arc<DatabaseConnection>,
    commenter: Arc<Commenter>,
    context: Context,
}

impl CommentedConnection {
    /// Wrap a connection. An empty driver name tag becomes the backend name.
    pub fn new(connection: DatabaseConnection, mut options: CommenterOptions) -> Self {
        if options.tags.driver_name.is_empty() {
            options.tags.driver_name = db_system(connection.get_database_backend()).to_string();
        }
        Self {
            inner: Arc::new(connection),
            commenter: Arc::new(Commenter::new(&options)),
            context: Context::background(),
        }
    }

    /// Wrap a connection with the default options.
    pub fn wrap(connection: DatabaseConnection) -> Self {
        Self::new(connection, CommenterOptions::default())
    }

    /// A handle on the same connection that reads tags from `context`.
    pub fn with_context(&self, context: Context) -> Self {
        Self {
            inner: self.inner.clone(),
            commenter: self.commenter.clone(),
            context,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn inner(&self) -> &DatabaseConnection {
        &self.inner
    }

    pub fn commenter(&self) -> &Commenter {
        &self.commenter
    }

    /// The shared connection; other handles from `with_context` may hold it too.
    pub fn into_inner(self) -> Arc<DatabaseConnection> {
        self.inner
    }

    fn annotate(&self, mut stmt: Statement) -> Statement {
        stmt.sql = self.commenter.with_comment(&self.context, &stmt.sql);
        stmt
    }
}

fn db_system(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => "postgresql",
        DbBackend::MySql => "mysql",
        DbBackend::Sqlite => "sqlite",
    }
}

impl From<DatabaseConnection> for CommentedConnection {
    fn from(connection: DatabaseConnection) -> Self {
        Self::wrap(connection)
    }
}

impl AsRef<DatabaseConnection> for CommentedConnection {
    fn as_ref(&self) -> &DatabaseConnection {
        self.inner.as_ref()
    }
}

#[async_trait]
impl ConnectionTrait for CommentedConnection {
    fn get_database_backend(&self) -> DbBackend {
        self.inner.get_database_backend()
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        self.inner.execute(self.annotate(stmt)).await
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        let sql = self.commenter.with_comment(&self.context, sql);
        self.inner.execute_unprepared(&sql).await
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        self.inner.query_one(self.annotate(stmt)).await
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        self.inner.query_all(self.annotate(stmt)).await
    }

    fn support_returning(&self) -> bool {
        self.inner.support_returning()
    }

    fn is_mock_connection(&self) -> bool {
        self.inner.is_mock_connection()
    }
}

#[async_trait]
impl StreamTrait for CommentedConnection {
    type Stream<'a> = <DatabaseConnection as StreamTrait>::Stream<'a>;

    fn stream<'a>(
        &'a self,
        stmt: Statement,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Stream<'a>, DbErr>> + 'a + Send>> {
        self.inner.stream(self.annotate(stmt))
    }
}

#[async_trait]
impl TransactionTrait for CommentedConnection {
    async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        self.inner.begin().await
    }

    async fn begin_with_config(
        &self,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<DatabaseTransaction, DbErr> {
        self.inner
            .begin_with_config(isolation_level, access_mode)
            .await
    }

    async fn transaction<F, T, E>(&self, callback: F) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        self.inner.transaction(callback).await
    }

    async fn transaction_with_config<F, T, E>(
        &self,
        callback: F,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        self.inner
            .transaction_with_config(callback, isolation_level, access_mode)
            .await
    }
}

/// Extension trait for easy wrapping of database connections.
pub trait CommenterExt {
    /// Annotate statements with the default options.
    fn with_comments(self) -> CommentedConnection;

    /// Annotate statements with custom options.
    fn with_comments_options(self, options: CommenterOptions) -> CommentedConnection;
}

impl CommenterExt for DatabaseConnection {
    fn with_comments(self) -> CommentedConnection {
        CommentedConnection::wrap(self)
    }

    fn with_comments_options(self, options: CommenterOptions) -> CommentedConnection {
        CommentedConnection::new(self, options)
    }
}
