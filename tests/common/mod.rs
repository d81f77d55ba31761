//! In-memory driver that records every call it receives.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sql_commenter::driver::{
    Capabilities, Conn, Connector, Driver, ExecResult, NamedValue, Rows, Stmt, Tx, TxOptions,
    Value,
};
use sql_commenter::{Context, Error, Result};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open(String),
    Connect(String),
    QueryContext(String, Vec<NamedValue>),
    ExecContext(String, Vec<NamedValue>),
    Query(String, Vec<NamedValue>),
    Exec(String, Vec<NamedValue>),
    Prepare(String),
    PrepareContext(String),
    StmtQuery(String),
    StmtExec(String),
    StmtClose,
    Begin,
    BeginTx(TxOptions),
    Ping,
    ResetSession,
    Close,
}

#[derive(Debug, Clone, Default)]
pub struct Log(Arc<Mutex<Vec<Call>>>);

impl Log {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    /// SQL text of every query/exec call, in order.
    pub fn statements(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::QueryContext(sql, _)
                | Call::ExecContext(sql, _)
                | Call::Query(sql, _)
                | Call::Exec(sql, _)
                | Call::Prepare(sql)
                | Call::PrepareContext(sql) => Some(sql),
                _ => None,
            })
            .collect()
    }
}

/// Driver whose connections implement `capabilities`.
pub struct FakeDriver {
    capabilities: Capabilities,
    connector: bool,
    fail_with: Option<&'static str>,
    reject_with: Option<&'static str>,
    close_fails: bool,
    log: Log,
}

impl FakeDriver {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            connector: false,
            fail_with: None,
            reject_with: None,
            close_fails: false,
            log: Log::default(),
        }
    }

    pub fn with_connector(mut self) -> Self {
        self.connector = true;
        self
    }

    /// Every open, connector acquisition and statement fails with `message`.
    pub fn failing(mut self, message: &'static str) -> Self {
        self.fail_with = Some(message);
        self
    }

    /// Connections open, but every statement and ping fails with `message`.
    pub fn rejecting(mut self, message: &'static str) -> Self {
        self.reject_with = Some(message);
        self
    }

    /// Closing a connection reports `Error::BadConn`.
    pub fn failing_close(mut self) -> Self {
        self.close_fails = true;
        self
    }

    pub fn log(&self) -> Log {
        self.log.clone()
    }

    pub fn conn(&self) -> FakeConn {
        FakeConn {
            capabilities: self.capabilities,
            fail_with: self.fail_with.or(self.reject_with),
            close_fails: self.close_fails,
            log: self.log.clone(),
        }
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn open(&self, name: &str) -> Result<Box<dyn Conn>> {
        if let Some(message) = self.fail_with {
            return Err(Error::driver(message));
        }
        self.log.push(Call::Open(name.to_string()));
        Ok(Box::new(self.conn()))
    }

    fn supports_connector(&self) -> bool {
        self.connector
    }

    fn open_connector(self: Arc<Self>, name: &str) -> Result<Arc<dyn Connector>> {
        if !self.connector {
            return Err(Error::Skip);
        }
        if let Some(message) = self.fail_with {
            return Err(Error::driver(message));
        }
        Ok(Arc::new(FakeConnector {
            dsn: name.to_string(),
            driver: self,
        }))
    }
}

pub struct FakeConnector {
    dsn: String,
    driver: Arc<FakeDriver>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _ctx: &Context) -> Result<Box<dyn Conn>> {
        self.driver.log.push(Call::Connect(self.dsn.clone()));
        Ok(Box::new(self.driver.conn()))
    }

    fn driver(&self) -> Arc<dyn Driver> {
        self.driver.clone()
    }
}

/// Overrides every optional method; only `capabilities` says which are real.
pub struct FakeConn {
    capabilities: Capabilities,
    fail_with: Option<&'static str>,
    close_fails: bool,
    log: Log,
}

impl FakeConn {
    fn outcome(&self) -> Result<()> {
        match self.fail_with {
            Some(message) => Err(Error::driver(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Conn for FakeConn {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn prepare(&self, query: &str) -> Result<Box<dyn Stmt>> {
        self.log.push(Call::Prepare(query.to_string()));
        Ok(Box::new(FakeStmt {
            query: query.to_string(),
            log: self.log.clone(),
        }))
    }

    async fn begin(&self) -> Result<Box<dyn Tx>> {
        self.log.push(Call::Begin);
        Ok(Box::new(FakeTx))
    }

    async fn close(&self) -> Result<()> {
        self.log.push(Call::Close);
        if self.close_fails {
            return Err(Error::BadConn);
        }
        Ok(())
    }

    async fn query_context(
        &self,
        _ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        self.log.push(Call::QueryContext(query.to_string(), args.to_vec()));
        self.outcome()?;
        Ok(Box::new(FakeRows::one()))
    }

    async fn exec_context(
        &self,
        _ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<ExecResult> {
        self.log.push(Call::ExecContext(query.to_string(), args.to_vec()));
        self.outcome()?;
        Ok(ExecResult {
            last_insert_id: None,
            rows_affected: 1,
        })
    }

    async fn query(&self, query: &str, args: &[NamedValue]) -> Result<Box<dyn Rows>> {
        self.log.push(Call::Query(query.to_string(), args.to_vec()));
        self.outcome()?;
        Ok(Box::new(FakeRows::one()))
    }

    async fn exec(&self, query: &str, args: &[NamedValue]) -> Result<ExecResult> {
        self.log.push(Call::Exec(query.to_string(), args.to_vec()));
        self.outcome()?;
        Ok(ExecResult {
            last_insert_id: Some(7),
            rows_affected: 1,
        })
    }

    async fn prepare_context(&self, _ctx: &Context, query: &str) -> Result<Box<dyn Stmt>> {
        self.log.push(Call::PrepareContext(query.to_string()));
        Ok(Box::new(FakeStmt {
            query: query.to_string(),
            log: self.log.clone(),
        }))
    }

    async fn begin_tx(&self, _ctx: &Context, options: TxOptions) -> Result<Box<dyn Tx>> {
        self.log.push(Call::BeginTx(options));
        Ok(Box::new(FakeTx))
    }

    async fn ping(&self, _ctx: &Context) -> Result<()> {
        self.log.push(Call::Ping);
        self.outcome()
    }

    async fn reset_session(&self, _ctx: &Context) -> Result<()> {
        self.log.push(Call::ResetSession);
        Ok(())
    }
}

/// Implements nothing beyond the mandatory methods.
pub struct MinimalConn {
    pub log: Log,
}

#[async_trait]
impl Conn for MinimalConn {
    async fn prepare(&self, query: &str) -> Result<Box<dyn Stmt>> {
        self.log.push(Call::Prepare(query.to_string()));
        Ok(Box::new(FakeStmt {
            query: query.to_string(),
            log: self.log.clone(),
        }))
    }

    async fn begin(&self) -> Result<Box<dyn Tx>> {
        self.log.push(Call::Begin);
        Ok(Box::new(FakeTx))
    }

    async fn close(&self) -> Result<()> {
        self.log.push(Call::Close);
        Ok(())
    }
}

pub struct FakeStmt {
    query: String,
    log: Log,
}

#[async_trait]
impl Stmt for FakeStmt {
    async fn exec(&self, _ctx: &Context, _args: &[NamedValue]) -> Result<ExecResult> {
        self.log.push(Call::StmtExec(self.query.clone()));
        Ok(ExecResult::default())
    }

    async fn query(&self, _ctx: &Context, _args: &[NamedValue]) -> Result<Box<dyn Rows>> {
        self.log.push(Call::StmtQuery(self.query.clone()));
        Ok(Box::new(FakeRows::one()))
    }

    async fn close(&self) -> Result<()> {
        self.log.push(Call::StmtClose);
        Ok(())
    }
}

pub struct FakeTx;

#[async_trait]
impl Tx for FakeTx {
    async fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct FakeRows {
    rows: Vec<Vec<Value>>,
}

impl FakeRows {
    fn one() -> Self {
        Self {
            rows: vec![vec![Value::Int(1)]],
        }
    }
}

#[async_trait]
impl Rows for FakeRows {
    fn columns(&self) -> Vec<String> {
        vec!["n".to_string()]
    }

    async fn next(&mut self) -> Result<Option<Vec<Value>>> {
        Ok(if self.rows.is_empty() {
            None
        } else {
            Some(self.rows.remove(0))
        })
    }
}
