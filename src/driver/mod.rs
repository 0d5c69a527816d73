//! Driver Module
//!
//! 읽기/쓰기 분리 라우팅 드라이버
//!
//! # 구성
//!
//! - [`RoutingDriver`]: 하위 드라이버를 감싸 가상 연결을 여는 커넥터
//! - [`VirtualConnection`]: 라이터/리더 물리 연결을 지연 생성하고 라우팅
//! - [`PreparedStatement`]: 물리 연결별로 지연 준비되는 스테이트먼트
//! - [`RoutedTransaction`]: 물리 연결 하나에 고정된 트랜잭션
//! - [`routing`]: 클러스터 주소와 리더 선택 정책
//!
//! # Example
//!
//! ```ignore
//! use rwproxy::driver::{Context, RoutingDriver, TransactionOptions};
//!
//! let driver = RoutingDriver::new(my_driver);
//! let conn = driver.open("primary;replica1;replica2")?;
//!
//! // 쓰기는 라이터로
//! let mut insert = conn.prepare("INSERT INTO t VALUES (?)")?;
//! insert.exec(&[1i64.into()])?;
//!
//! // 읽기는 리더로
//! let mut select = conn.prepare("SELECT * FROM t")?;
//! let rows = select.query(&[])?;
//!
//! // 읽기 전용 트랜잭션은 리더에서 시도
//! let mut tx = conn.begin_transaction(&Context::background(), &TransactionOptions::read_only())?;
//! tx.commit()?;
//!
//! conn.close()?;
//! ```

pub mod routing;
mod connection;
mod context;
mod delegate;
mod driver;
mod error;
#[cfg(test)]
mod mock;
mod statement;
mod transaction;
mod types;

// Re-exports
pub use connection::{ConnectionId, VirtualConnection};
pub use context::{CancelHandle, Context};
pub use delegate::{
    Connection, ConnectionCapabilities, Driver, Rows, Statement, StatementCapabilities,
    Transaction,
};
pub use driver::{DriverOption, LogSink, RoutingDriver};
pub use error::{DriverError, DriverResult};
pub use statement::{named_values_to_values, PreparedStatement};
pub use transaction::{IsolationLevel, RoutedTransaction, TransactionOptions, TransactionState};
pub use types::{ExecResult, NamedValue, Value};
