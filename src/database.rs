//! Driver registry, the `open` entry points and the database handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::config::CommenterOptions;
use crate::context::Context;
use crate::driver::{
    Capabilities, Capability, Conn, Connector, Driver, ExecResult, NamedValue, Rows, Stmt, Tx,
    TxOptions, Value,
};
use crate::error::{Error, Result};
use crate::proxy::CommenterDriver;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Drivers known by name.
#[derive(Default)]
pub struct Registry {
    drivers: RwLock<HashMap<String, Arc<dyn Driver>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`register`] and [`open`].
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Make a driver available under `name`. Names are unique.
    pub fn register(&self, name: impl Into<String>, driver: Arc<dyn Driver>) -> Result<()> {
        let name = name.into();
        let mut drivers = self.drivers.write().unwrap_or_else(|e| e.into_inner());
        if drivers.contains_key(&name) {
            return Err(Error::DuplicateDriver(name));
        }
        tracing::debug!(driver = %name, "Registered driver");
        drivers.insert(name, driver);
        Ok(())
    }

    pub fn driver(&self, name: &str) -> Result<Arc<dyn Driver>> {
        self.drivers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownDriver(name.to_string()))
    }

    /// Registered driver names, sorted.
    pub fn drivers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .drivers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Open a handle on the registered driver without annotation.
    pub fn open_raw(&self, driver_name: &str, data_source_name: &str) -> Result<Database> {
        let driver = self.driver(driver_name)?;
        open_database(driver, data_source_name)
    }

    /// Open an annotating handle with the default options.
    pub fn open(&self, driver_name: &str, data_source_name: &str) -> Result<Database> {
        self.open_with_options(driver_name, data_source_name, CommenterOptions::default())
    }

    /// Open an annotating handle on the registered driver.
    ///
    /// Fails exactly when [`Registry::open_raw`] would. An empty driver name
    /// tag is replaced by `driver_name`.
    pub fn open_with_options(
        &self,
        driver_name: &str,
        data_source_name: &str,
        mut options: CommenterOptions,
    ) -> Result<Database> {
        let driver = self.driver(driver_name)?;
        if options.tags.driver_name.is_empty() {
            options.tags.driver_name = driver_name.to_string();
        }
        let driver: Arc<dyn Driver> = Arc::new(CommenterDriver::new(driver, &options));
        open_database(driver, data_source_name)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("drivers", &self.drivers())
            .finish()
    }
}

/// Register a driver in the process-wide registry.
pub fn register(name: impl Into<String>, driver: Arc<dyn Driver>) -> Result<()> {
    Registry::global().register(name, driver)
}

/// Open an annotating handle on a globally registered driver with default options.
pub fn open(driver_name: &str, data_source_name: &str) -> Result<Database> {
    Registry::global().open(driver_name, data_source_name)
}

/// Open an annotating handle on a globally registered driver.
pub fn open_with_options(
    driver_name: &str,
    data_source_name: &str,
    options: CommenterOptions,
) -> Result<Database> {
    Registry::global().open_with_options(driver_name, data_source_name, options)
}

fn open_database(driver: Arc<dyn Driver>, data_source_name: &str) -> Result<Database> {
    if driver.supports_connector() {
        let connector = driver.open_connector(data_source_name)?;
        return Ok(Database::from_connector(connector));
    }
    Ok(Database::from_connector(Arc::new(DsnConnector::new(
        data_source_name,
        driver,
    ))))
}

/// Connector for drivers without their own: opens with the stored DSN.
pub struct DsnConnector {
    dsn: String,
    driver: Arc<dyn Driver>,
}

impl DsnConnector {
    pub fn new(dsn: impl Into<String>, driver: Arc<dyn Driver>) -> Self {
        Self {
            dsn: dsn.into(),
            driver,
        }
    }
}

impl fmt::Debug for DsnConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DsnConnector").finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for DsnConnector {
    async fn connect(&self, _ctx: &Context) -> Result<Box<dyn Conn>> {
        self.driver.open(&self.dsn).await
    }

    fn driver(&self) -> Arc<dyn Driver> {
        self.driver.clone()
    }
}

/// Handle on a data source.
///
/// No pooling: every [`Database::connect`] acquires a new physical
/// connection from the connector.
#[derive(Clone)]
pub struct Database {
    connector: Arc<dyn Connector>,
}

impl Database {
    pub fn from_connector(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    pub fn driver(&self) -> Arc<dyn Driver> {
        self.connector.driver()
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    pub async fn connect(&self, ctx: &Context) -> Result<Connection> {
        let conn = self.connector.connect(ctx).await?;
        Ok(Connection::new(conn))
    }

    /// Connect, ping and close.
    pub async fn ping(&self, ctx: &Context) -> Result<()> {
        let conn = self.connect(ctx).await?;
        let result = conn.ping(ctx).await;
        let closed = conn.close().await;
        operation_first(result, closed)
    }

    /// Run one statement on a fresh connection and close it.
    pub async fn exec(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<ExecResult> {
        let conn = self.connect(ctx).await?;
        let result = conn.exec(ctx, query, args).await;
        let closed = conn.close().await;
        operation_first(result, closed)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

/// One acquired connection.
///
/// Query and exec try the context-aware capability first, then the legacy
/// one, then a prepared statement; [`Error::Skip`] moves on to the next.
pub struct Connection {
    conn: Box<dyn Conn>,
    capabilities: Capabilities,
}

impl Connection {
    fn new(conn: Box<dyn Conn>) -> Self {
        let capabilities = conn.capabilities();
        Self { conn, capabilities }
    }

    /// The driver connection, possibly a commenting proxy.
    pub fn driver_conn(&self) -> &dyn Conn {
        self.conn.as_ref()
    }

    /// The innermost driver connection, beneath any wrapper.
    pub fn raw(&self) -> &dyn Conn {
        let mut conn = self.conn.as_ref();
        while let Some(inner) = conn.raw_conn() {
            conn = inner;
        }
        conn
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub async fn query(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<Box<dyn Rows>> {
        let args = NamedValue::positional(args.iter().cloned());

        if self.capabilities.contains(Capability::QueryContext) {
            match self.conn.query_context(ctx, query, &args).await {
                Err(Error::Skip) => {}
                result => return result,
            }
        }
        if self.capabilities.contains(Capability::Query) {
            match self.conn.query(query, &args).await {
                Err(Error::Skip) => {}
                result => return result,
            }
        }

        let stmt = self.prepare(ctx, query).await?;
        match stmt.query(ctx, &args).await {
            Ok(rows) => Ok(Box::new(StmtRows { rows, stmt })),
            Err(e) => {
                if let Err(close_err) = stmt.close().await {
                    tracing::debug!(error = %close_err, "Closing statement after failed query");
                }
                Err(e)
            }
        }
    }

    pub async fn exec(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<ExecResult> {
        let args = NamedValue::positional(args.iter().cloned());

        if self.capabilities.contains(Capability::ExecContext) {
            match self.conn.exec_context(ctx, query, &args).await {
                Err(Error::Skip) => {}
                result => return result,
            }
        }
        if self.capabilities.contains(Capability::Exec) {
            match self.conn.exec(query, &args).await {
                Err(Error::Skip) => {}
                result => return result,
            }
        }

        let stmt = self.prepare(ctx, query).await?;
        let result = stmt.exec(ctx, &args).await;
        let closed = stmt.close().await;
        operation_first(result, closed)
    }

    pub async fn prepare(&self, ctx: &Context, query: &str) -> Result<Box<dyn Stmt>> {
        if self.capabilities.contains(Capability::PrepareContext) {
            match self.conn.prepare_context(ctx, query).await {
                Err(Error::Skip) => {}
                result => return result,
            }
        }
        self.conn.prepare(query).await
    }

    pub async fn begin(&self, ctx: &Context, options: TxOptions) -> Result<Box<dyn Tx>> {
        if self.capabilities.contains(Capability::BeginTx) {
            match self.conn.begin_tx(ctx, options).await {
                Err(Error::Skip) => {}
                result => return result,
            }
        }
        self.conn.begin().await
    }

    /// Ping if the driver supports it; otherwise the connection is assumed alive.
    pub async fn ping(&self, ctx: &Context) -> Result<()> {
        if !self.capabilities.contains(Capability::Ping) {
            return Ok(());
        }
        match self.conn.ping(ctx).await {
            Err(Error::Skip) => Ok(()),
            result => result,
        }
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

// The operation's own error wins over a cleanup error.
fn operation_first<T>(result: Result<T>, cleanup: Result<()>) -> Result<T> {
    let value = result?;
    cleanup?;
    Ok(value)
}

// Rows read through a prepared statement; closing them closes the statement.
struct StmtRows {
    rows: Box<dyn Rows>,
    stmt: Box<dyn Stmt>,
}

#[async_trait]
impl Rows for StmtRows {
    fn columns(&self) -> Vec<String> {
        self.rows.columns()
    }

    async fn next(&mut self) -> Result<Option<Vec<Value>>> {
        self.rows.next().await
    }

    async fn close(&mut self) -> Result<()> {
        self.rows.close().await?;
        self.stmt.close().await
    }
}
