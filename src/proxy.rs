//! Commenting proxies for drivers, connectors and connections.
//!
//! Each proxy forwards to the object it wraps and reports exactly the
//! capabilities of that object. Only the query and exec paths are rewritten;
//! everything else, errors included, passes through untouched.

use std::sync::Arc;

use async_trait::async_trait;

use crate::assembler::Commenter;
use crate::config::CommenterOptions;
use crate::context::Context;
use crate::driver::{
    Capabilities, Capability, Conn, Connector, Driver, ExecResult, NamedValue, Rows, Stmt, Tx,
    TxOptions,
};
use crate::error::{Error, Result};

/// A connection whose statements are annotated before dispatch.
///
/// The capability set of the wrapped connection is read once, when the proxy
/// is built. A capability missing from that set answers [`Error::Skip`]
/// without reaching the wrapped connection.
pub struct CommenterConn {
    inner: Box<dyn Conn>,
    capabilities: Capabilities,
    commenter: Arc<Commenter>,
}

impl CommenterConn {
    pub fn new(inner: Box<dyn Conn>, commenter: Arc<Commenter>) -> Self {
        let capabilities = inner.capabilities();
        tracing::debug!(capabilities = ?capabilities, "Wrapped connection");
        Self {
            inner,
            capabilities,
            commenter,
        }
    }

    /// The wrapped connection.
    pub fn raw(&self) -> &dyn Conn {
        self.inner.as_ref()
    }

    pub fn into_raw(self) -> Box<dyn Conn> {
        self.inner
    }

    pub fn commenter(&self) -> &Commenter {
        &self.commenter
    }

    fn require(&self, capability: Capability) -> Result<()> {
        if self.capabilities.contains(capability) {
            Ok(())
        } else {
            tracing::debug!(capability = %capability, "Wrapped connection lacks capability");
            Err(Error::Skip)
        }
    }
}

impl std::fmt::Debug for CommenterConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommenterConn")
            .field("capabilities", &self.capabilities)
            .field("commenter", &self.commenter)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Conn for CommenterConn {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn raw_conn(&self) -> Option<&dyn Conn> {
        Some(self.inner.as_ref())
    }

    async fn prepare(&self, query: &str) -> Result<Box<dyn Stmt>> {
        self.inner.prepare(query).await
    }

    async fn begin(&self) -> Result<Box<dyn Tx>> {
        self.inner.begin().await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    async fn query_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        self.require(Capability::QueryContext)?;
        let query = self.commenter.with_comment(ctx, query);
        self.inner.query_context(ctx, &query, args).await
    }

    async fn exec_context(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<ExecResult> {
        self.require(Capability::ExecContext)?;
        let query = self.commenter.with_comment(ctx, query);
        self.inner.exec_context(ctx, &query, args).await
    }

    async fn query(&self, query: &str, args: &[NamedValue]) -> Result<Box<dyn Rows>> {
        self.require(Capability::Query)?;
        let query = self.commenter.with_comment(&Context::background(), query);
        self.inner.query(&query, args).await
    }

    async fn exec(&self, query: &str, args: &[NamedValue]) -> Result<ExecResult> {
        self.require(Capability::Exec)?;
        let query = self.commenter.with_comment(&Context::background(), query);
        self.inner.exec(&query, args).await
    }

    async fn prepare_context(&self, ctx: &Context, query: &str) -> Result<Box<dyn Stmt>> {
        self.require(Capability::PrepareContext)?;
        self.inner.prepare_context(ctx, query).await
    }

    async fn begin_tx(&self, ctx: &Context, options: TxOptions) -> Result<Box<dyn Tx>> {
        self.require(Capability::BeginTx)?;
        self.inner.begin_tx(ctx, options).await
    }

    async fn ping(&self, ctx: &Context) -> Result<()> {
        self.require(Capability::Ping)?;
        self.inner.ping(ctx).await
    }

    async fn reset_session(&self, ctx: &Context) -> Result<()> {
        self.require(Capability::ResetSession)?;
        self.inner.reset_session(ctx).await
    }
}

/// A driver whose connections are all wrapped in [`CommenterConn`].
///
/// Supports connector acquisition if and only if the wrapped driver does.
pub struct CommenterDriver {
    inner: Arc<dyn Driver>,
    commenter: Arc<Commenter>,
}

impl CommenterDriver {
    pub fn new(inner: Arc<dyn Driver>, options: &CommenterOptions) -> Self {
        Self::with_commenter(inner, Arc::new(Commenter::new(options)))
    }

    pub fn with_commenter(inner: Arc<dyn Driver>, commenter: Arc<Commenter>) -> Self {
        tracing::debug!(
            driver = %commenter.driver_name(),
            connector = inner.supports_connector(),
            "Wrapped driver"
        );
        Self { inner, commenter }
    }

    /// The wrapped driver.
    pub fn raw(&self) -> &Arc<dyn Driver> {
        &self.inner
    }

    pub fn commenter(&self) -> &Arc<Commenter> {
        &self.commenter
    }
}

impl std::fmt::Debug for CommenterDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommenterDriver")
            .field("commenter", &self.commenter)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Driver for CommenterDriver {
    async fn open(&self, name: &str) -> Result<Box<dyn Conn>> {
        let conn = self.inner.open(name).await?;
        Ok(Box::new(CommenterConn::new(conn, self.commenter.clone())))
    }

    fn supports_connector(&self) -> bool {
        self.inner.supports_connector()
    }

    fn open_connector(self: Arc<Self>, name: &str) -> Result<Arc<dyn Connector>> {
        if !self.inner.supports_connector() {
            return Err(Error::Skip);
        }
        let connector = self.inner.clone().open_connector(name)?;
        Ok(Arc::new(CommenterConnector::new(connector, self)))
    }
}

/// A connector whose connections are wrapped in [`CommenterConn`].
///
/// Reports the owning [`CommenterDriver`] as its driver, not the wrapped one.
pub struct CommenterConnector {
    inner: Arc<dyn Connector>,
    driver: Arc<CommenterDriver>,
}

impl CommenterConnector {
    pub fn new(inner: Arc<dyn Connector>, driver: Arc<CommenterDriver>) -> Self {
        tracing::debug!(driver = %driver.commenter.driver_name(), "Wrapped connector");
        Self { inner, driver }
    }

    /// The wrapped connector.
    pub fn raw(&self) -> &Arc<dyn Connector> {
        &self.inner
    }
}

impl std::fmt::Debug for CommenterConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommenterConnector")
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for CommenterConnector {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Conn>> {
        let conn = self.inner.connect(ctx).await?;
        Ok(Box::new(CommenterConn::new(conn, self.driver.commenter.clone())))
    }

    fn driver(&self) -> Arc<dyn Driver> {
        self.driver.clone()
    }
}
