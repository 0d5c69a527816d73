//! 테스트용 기록 드라이버
//!
//! 모든 호출을 [`MockEvent`]로 기록하며, 주소별로 기능과 실패를 설정할 수 있습니다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::context::Context;
use super::delegate::{
    Connection, ConnectionCapabilities, Driver, Rows, Statement, StatementCapabilities,
    Transaction,
};
use super::error::{DriverError, DriverResult};
use super::transaction::TransactionOptions;
use super::types::{ExecResult, NamedValue, Value};

/// 기록된 호출
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Opened { address: String, conn: String },
    Closed { conn: String },
    Pinged { conn: String },
    Prepared { conn: String, query: String },
    Executed { conn: String, query: String },
    Queried { conn: String, query: String },
    StatementExec { conn: String, query: String, with_context: bool },
    StatementQuery { conn: String, query: String, with_context: bool },
    StatementClosed { conn: String, query: String },
    Began { conn: String, with_options: bool, read_only: bool },
    Committed { conn: String },
    RolledBack { conn: String },
}

/// 기록된 호출 목록
#[derive(Debug, Clone, Default)]
pub struct MockEvents(pub Vec<MockEvent>);

impl MockEvents {
    /// 열린 주소 목록 (순서 유지)
    pub fn opened(&self) -> Vec<String> {
        self.0
            .iter()
            .filter_map(|e| match e {
                MockEvent::Opened { address, .. } => Some(address.clone()),
                _ => None,
            })
            .collect()
    }

    /// 닫힌 연결 이름 목록
    pub fn closed(&self) -> Vec<String> {
        self.0
            .iter()
            .filter_map(|e| match e {
                MockEvent::Closed { conn } => Some(conn.clone()),
                _ => None,
            })
            .collect()
    }

    /// 조건에 맞는 이벤트 수
    pub fn count(&self, pred: impl Fn(&MockEvent) -> bool) -> usize {
        self.0.iter().filter(|e| pred(e)).count()
    }

    /// 이벤트 포함 여부
    pub fn contains(&self, event: &MockEvent) -> bool {
        self.0.contains(event)
    }
}

#[derive(Default)]
struct MockState {
    events: Vec<MockEvent>,
    opened: usize,
    default_capabilities: ConnectionCapabilities,
    capabilities: HashMap<String, ConnectionCapabilities>,
    statement_capabilities: StatementCapabilities,
    num_input: Option<usize>,
    fail_open: HashSet<String>,
    fail_close: HashSet<String>,
    fail_begin: HashSet<String>,
    fail_commit: HashSet<String>,
    fail_ping: HashSet<String>,
    fail_statement_close: HashSet<String>,
}

/// 기록 드라이버
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// 필수 기능만 지원하는 드라이버
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 연결의 기본 기능 설정
    pub fn with_capabilities(self, capabilities: ConnectionCapabilities) -> Self {
        self.state.lock().default_capabilities = capabilities;
        self
    }

    /// 특정 주소의 기능 설정
    pub fn set_capabilities(&self, address: &str, capabilities: ConnectionCapabilities) {
        self.state
            .lock()
            .capabilities
            .insert(address.to_string(), capabilities);
    }

    /// 스테이트먼트 기능 설정
    pub fn set_statement_capabilities(&self, capabilities: StatementCapabilities) {
        self.state.lock().statement_capabilities = capabilities;
    }

    /// 스테이트먼트 플레이스홀더 수 설정
    pub fn set_num_input(&self, num_input: Option<usize>) {
        self.state.lock().num_input = num_input;
    }

    pub fn fail_open(&self, address: &str) {
        self.state.lock().fail_open.insert(address.to_string());
    }

    pub fn fail_close(&self, address: &str) {
        self.state.lock().fail_close.insert(address.to_string());
    }

    pub fn fail_begin(&self, address: &str) {
        self.state.lock().fail_begin.insert(address.to_string());
    }

    pub fn fail_commit(&self, address: &str) {
        self.state.lock().fail_commit.insert(address.to_string());
    }

    pub fn fail_ping(&self, address: &str) {
        self.state.lock().fail_ping.insert(address.to_string());
    }

    /// 연결 이름(`주소#n`) 단위로 스테이트먼트 종료 실패 설정
    pub fn fail_statement_close(&self, conn: &str) {
        self.state
            .lock()
            .fail_statement_close
            .insert(conn.to_string());
    }

    /// 지금까지 기록된 호출
    pub fn events(&self) -> MockEvents {
        MockEvents(self.state.lock().events.clone())
    }

    fn record(&self, event: MockEvent) {
        self.state.lock().events.push(event);
    }
}

impl Driver for MockDriver {
    fn open(&self, address: &str) -> DriverResult<Box<dyn Connection>> {
        let mut state = self.state.lock();
        if state.fail_open.contains(address) {
            return Err(DriverError::delegate(format!("mock: cannot open {}", address)));
        }

        state.opened += 1;
        let name = format!("{}#{}", address, state.opened);
        let capabilities = state
            .capabilities
            .get(address)
            .copied()
            .unwrap_or(state.default_capabilities);
        state.events.push(MockEvent::Opened {
            address: address.to_string(),
            conn: name.clone(),
        });
        drop(state);

        Ok(Box::new(MockConnection {
            driver: self.clone(),
            address: address.to_string(),
            name,
            capabilities,
        }))
    }
}

struct MockConnection {
    driver: MockDriver,
    address: String,
    name: String,
    capabilities: ConnectionCapabilities,
}

impl MockConnection {
    fn statement(&self, query: &str) -> Box<dyn Statement> {
        let state = self.driver.state.lock();
        Box::new(MockStatement {
            driver: self.driver.clone(),
            conn: self.name.clone(),
            query: query.to_string(),
            capabilities: state.statement_capabilities,
            num_input: state.num_input,
        })
    }

    fn transaction(&self, with_options: bool, read_only: bool) -> DriverResult<Box<dyn Transaction>> {
        if self.driver.state.lock().fail_begin.contains(&self.address) {
            return Err(DriverError::delegate(format!("mock: begin failed on {}", self.name)));
        }
        self.driver.record(MockEvent::Began {
            conn: self.name.clone(),
            with_options,
            read_only,
        });
        let fail_commit = self.driver.state.lock().fail_commit.contains(&self.address);
        Ok(Box::new(MockTransaction {
            driver: self.driver.clone(),
            conn: self.name.clone(),
            fail_commit,
        }))
    }
}

impl Connection for MockConnection {
    fn capabilities(&self) -> ConnectionCapabilities {
        self.capabilities
    }

    fn prepare(&mut self, query: &str) -> DriverResult<Box<dyn Statement>> {
        self.driver.record(MockEvent::Prepared {
            conn: self.name.clone(),
            query: query.to_string(),
        });
        Ok(self.statement(query))
    }

    fn prepare_with_context(
        &mut self,
        ctx: &Context,
        query: &str,
    ) -> DriverResult<Box<dyn Statement>> {
        ctx.check()?;
        self.prepare(query)
    }

    fn begin(&mut self) -> DriverResult<Box<dyn Transaction>> {
        self.transaction(false, false)
    }

    fn begin_with_options(
        &mut self,
        _ctx: &Context,
        options: &TransactionOptions,
    ) -> DriverResult<Box<dyn Transaction>> {
        self.transaction(true, options.read_only)
    }

    fn execute(
        &mut self,
        _ctx: &Context,
        query: &str,
        _args: &[NamedValue],
    ) -> DriverResult<ExecResult> {
        self.driver.record(MockEvent::Executed {
            conn: self.name.clone(),
            query: query.to_string(),
        });
        Ok(ExecResult::new(1))
    }

    fn query(
        &mut self,
        _ctx: &Context,
        query: &str,
        _args: &[NamedValue],
    ) -> DriverResult<Box<dyn Rows>> {
        self.driver.record(MockEvent::Queried {
            conn: self.name.clone(),
            query: query.to_string(),
        });
        Ok(Box::new(MockRows))
    }

    fn ping(&mut self, _ctx: &Context) -> DriverResult<()> {
        self.driver.record(MockEvent::Pinged {
            conn: self.name.clone(),
        });
        if self.driver.state.lock().fail_ping.contains(&self.address) {
            return Err(DriverError::delegate(format!("mock: ping failed on {}", self.name)));
        }
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.driver.record(MockEvent::Closed {
            conn: self.name.clone(),
        });
        if self.driver.state.lock().fail_close.contains(&self.address) {
            return Err(DriverError::delegate(format!("mock: close failed on {}", self.name)));
        }
        Ok(())
    }
}

struct MockStatement {
    driver: MockDriver,
    conn: String,
    query: String,
    capabilities: StatementCapabilities,
    num_input: Option<usize>,
}

impl Statement for MockStatement {
    fn capabilities(&self) -> StatementCapabilities {
        self.capabilities
    }

    fn num_input(&self) -> Option<usize> {
        self.num_input
    }

    fn exec(&mut self, _args: &[Value]) -> DriverResult<ExecResult> {
        self.driver.record(MockEvent::StatementExec {
            conn: self.conn.clone(),
            query: self.query.clone(),
            with_context: false,
        });
        Ok(ExecResult::new(1))
    }

    fn query(&mut self, _args: &[Value]) -> DriverResult<Box<dyn Rows>> {
        self.driver.record(MockEvent::StatementQuery {
            conn: self.conn.clone(),
            query: self.query.clone(),
            with_context: false,
        });
        Ok(Box::new(MockRows))
    }

    fn exec_with_context(
        &mut self,
        _ctx: &Context,
        _args: &[NamedValue],
    ) -> DriverResult<ExecResult> {
        self.driver.record(MockEvent::StatementExec {
            conn: self.conn.clone(),
            query: self.query.clone(),
            with_context: true,
        });
        Ok(ExecResult::new(1))
    }

    fn query_with_context(
        &mut self,
        _ctx: &Context,
        _args: &[NamedValue],
    ) -> DriverResult<Box<dyn Rows>> {
        self.driver.record(MockEvent::StatementQuery {
            conn: self.conn.clone(),
            query: self.query.clone(),
            with_context: true,
        });
        Ok(Box::new(MockRows))
    }

    fn close(&mut self) -> DriverResult<()> {
        self.driver.record(MockEvent::StatementClosed {
            conn: self.conn.clone(),
            query: self.query.clone(),
        });
        if self
            .driver
            .state
            .lock()
            .fail_statement_close
            .contains(&self.conn)
        {
            return Err(DriverError::delegate(format!(
                "mock: statement close failed on {}",
                self.conn
            )));
        }
        Ok(())
    }
}

struct MockTransaction {
    driver: MockDriver,
    conn: String,
    fail_commit: bool,
}

impl Transaction for MockTransaction {
    fn commit(self: Box<Self>) -> DriverResult<()> {
        self.driver.record(MockEvent::Committed {
            conn: self.conn.clone(),
        });
        if self.fail_commit {
            return Err(DriverError::delegate(format!("mock: commit failed on {}", self.conn)));
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) -> DriverResult<()> {
        self.driver.record(MockEvent::RolledBack {
            conn: self.conn.clone(),
        });
        Ok(())
    }
}

struct MockRows;

impl Rows for MockRows {
    fn columns(&self) -> Vec<String> {
        Vec::new()
    }

    fn next_row(&mut self) -> DriverResult<Option<Vec<Value>>> {
        Ok(None)
    }

    fn close(&mut self) -> DriverResult<()> {
        Ok(())
    }
}
