//! Driver seams: the traits a database driver implements and the proxies wrap.
//!
//! The shape follows the usual split between a [`Driver`] (opens connections
//! from a data source name), an optional [`Connector`] (context-aware
//! connection factory) and a [`Conn`] (one physical connection).
//!
//! Beyond the mandatory methods, a connection may implement any subset of
//! the optional capabilities listed in [`Capability`]. It reports that subset
//! through [`Conn::capabilities`], and every optional method it leaves alone
//! answers [`Error::Skip`] so the caller falls back to the next mechanism.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::{Error, Result};

/// A value bound to a statement parameter or read from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A statement argument with its 1-based position and optional name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    pub name: Option<String>,
    pub ordinal: usize,
    pub value: Value,
}

impl NamedValue {
    /// Number positional arguments starting at 1.
    pub fn positional<I, V>(values: I) -> Vec<NamedValue>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| NamedValue {
                name: None,
                ordinal: i + 1,
                value: value.into(),
            })
            .collect()
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub last_insert_id: Option<i64>,
    pub rows_affected: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

/// A result set being read.
#[async_trait]
pub trait Rows: Send {
    fn columns(&self) -> Vec<String>;

    /// The next row, or `None` once exhausted.
    async fn next(&mut self) -> Result<Option<Vec<Value>>>;

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A prepared statement bound to one connection.
#[async_trait]
pub trait Stmt: Send + Sync {
    /// Number of placeholders, if the driver knows it.
    fn num_input(&self) -> Option<usize> {
        None
    }

    async fn exec(&self, ctx: &Context, args: &[NamedValue]) -> Result<ExecResult>;

    async fn query(&self, ctx: &Context, args: &[NamedValue]) -> Result<Box<dyn Rows>>;

    async fn close(&self) -> Result<()>;
}

/// An open transaction.
#[async_trait]
pub trait Tx: Send {
    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}

/// Optional connection capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// [`Conn::query_context`]
    QueryContext,
    /// [`Conn::exec_context`]
    ExecContext,
    /// [`Conn::query`]
    Query,
    /// [`Conn::exec`]
    Exec,
    /// [`Conn::prepare_context`]
    PrepareContext,
    /// [`Conn::begin_tx`]
    BeginTx,
    /// [`Conn::ping`]
    Ping,
    /// [`Conn::reset_session`]
    ResetSession,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::QueryContext,
        Capability::ExecContext,
        Capability::Query,
        Capability::Exec,
        Capability::PrepareContext,
        Capability::BeginTx,
        Capability::Ping,
        Capability::ResetSession,
    ];

    fn bit(self) -> u16 {
        1 << self as u16
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::QueryContext => "query_context",
            Capability::ExecContext => "exec_context",
            Capability::Query => "query",
            Capability::Exec => "exec",
            Capability::PrepareContext => "prepare_context",
            Capability::BeginTx => "begin_tx",
            Capability::Ping => "ping",
            Capability::ResetSession => "reset_session",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A set of [`Capability`] values.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities(u16);

impl Capabilities {
    pub const fn empty() -> Self {
        Capabilities(0)
    }

    pub fn all() -> Self {
        Self::from_iter(Capability::ALL)
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.0 |= capability.bit();
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Capabilities::empty(), Capabilities::with)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// One physical connection.
///
/// Optional methods default to [`Error::Skip`]. An implementation that
/// overrides one should also list it in [`Conn::capabilities`].
#[async_trait]
pub trait Conn: Send + Sync {
    /// Optional capabilities this connection implements.
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// The connection underneath a wrapper, if this is one.
    fn raw_conn(&self) -> Option<&dyn Conn> {
        None
    }

    async fn prepare(&self, query: &str) -> Result<Box<dyn Stmt>>;

    async fn begin(&self) -> Result<Box<dyn Tx>>;

    async fn close(&self) -> Result<()>;

    async fn query_context(
        &self,
        _ctx: &Context,
        _query: &str,
        _args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        Err(Error::Skip)
    }

    async fn exec_context(
        &self,
        _ctx: &Context,
        _query: &str,
        _args: &[NamedValue],
    ) -> Result<ExecResult> {
        Err(Error::Skip)
    }

    async fn query(&self, _query: &str, _args: &[NamedValue]) -> Result<Box<dyn Rows>> {
        Err(Error::Skip)
    }

    async fn exec(&self, _query: &str, _args: &[NamedValue]) -> Result<ExecResult> {
        Err(Error::Skip)
    }

    async fn prepare_context(&self, _ctx: &Context, _query: &str) -> Result<Box<dyn Stmt>> {
        Err(Error::Skip)
    }

    async fn begin_tx(&self, _ctx: &Context, _options: TxOptions) -> Result<Box<dyn Tx>> {
        Err(Error::Skip)
    }

    async fn ping(&self, _ctx: &Context) -> Result<()> {
        Err(Error::Skip)
    }

    async fn reset_session(&self, _ctx: &Context) -> Result<()> {
        Err(Error::Skip)
    }
}

/// Context-aware connection factory bound to one data source.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Conn>>;

    /// The driver this connector belongs to.
    fn driver(&self) -> Arc<dyn Driver>;
}

/// A database driver.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a connection from a data source name.
    async fn open(&self, name: &str) -> Result<Box<dyn Conn>>;

    /// Whether [`Driver::open_connector`] is implemented.
    fn supports_connector(&self) -> bool {
        false
    }

    /// Parse the data source name once and return a connector for it.
    fn open_connector(self: Arc<Self>, _name: &str) -> Result<Arc<dyn Connector>> {
        Err(Error::Skip)
    }
}
