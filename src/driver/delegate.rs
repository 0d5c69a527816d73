//! 하위 드라이버 경계
//!
//! 라우팅 드라이버가 감싸는 실제 연결 구현이 제공해야 하는 트레이트입니다.
//! 선택적 기능은 기본 구현이 "미지원" 에러를 반환하며, 라우터는
//! [`ConnectionCapabilities`] / [`StatementCapabilities`]가 지원한다고
//! 알려준 경우에만 호출합니다.

use std::fmt;

use super::context::Context;
use super::error::{DriverError, DriverResult};
use super::transaction::TransactionOptions;
use super::types::{ExecResult, NamedValue, Value};

// ============================================================================
// Capabilities - 기능 기술자
// ============================================================================

/// 연결이 지원하는 선택적 기능
///
/// 물리 연결 생성 시 한 번만 조회되어 캐시됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionCapabilities {
    /// 옵션을 받는 begin
    pub begin_with_options: bool,
    /// prepare 없이 실행하는 빠른 경로
    pub execute: bool,
    /// prepare 없이 조회하는 빠른 경로
    pub query: bool,
    /// 연결 상태 확인
    pub ping: bool,
    /// 컨텍스트를 받는 prepare
    pub prepare_with_context: bool,
}

impl ConnectionCapabilities {
    /// 필수 기능만 지원
    pub fn basic() -> Self {
        Self::default()
    }

    /// 모든 선택적 기능 지원
    pub fn all() -> Self {
        Self {
            begin_with_options: true,
            execute: true,
            query: true,
            ping: true,
            prepare_with_context: true,
        }
    }

    /// begin_with_options 지원 설정
    pub fn with_begin_with_options(mut self, enabled: bool) -> Self {
        self.begin_with_options = enabled;
        self
    }

    /// execute 빠른 경로 지원 설정
    pub fn with_execute(mut self, enabled: bool) -> Self {
        self.execute = enabled;
        self
    }

    /// query 빠른 경로 지원 설정
    pub fn with_query(mut self, enabled: bool) -> Self {
        self.query = enabled;
        self
    }

    /// ping 지원 설정
    pub fn with_ping(mut self, enabled: bool) -> Self {
        self.ping = enabled;
        self
    }

    /// prepare_with_context 지원 설정
    pub fn with_prepare_with_context(mut self, enabled: bool) -> Self {
        self.prepare_with_context = enabled;
        self
    }
}

/// 스테이트먼트가 지원하는 선택적 기능
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementCapabilities {
    /// 이름 있는 인자와 컨텍스트를 받는 exec
    pub exec_with_context: bool,
    /// 이름 있는 인자와 컨텍스트를 받는 query
    pub query_with_context: bool,
}

impl StatementCapabilities {
    /// 위치 인자만 지원
    pub fn basic() -> Self {
        Self::default()
    }

    /// 컨텍스트 변형 모두 지원
    pub fn all() -> Self {
        Self {
            exec_with_context: true,
            query_with_context: true,
        }
    }
}

// ============================================================================
// Driver - 하위 드라이버
// ============================================================================

/// 주소 하나로 물리 연결을 여는 하위 드라이버
pub trait Driver: Send + Sync {
    /// 연결 열기
    fn open(&self, address: &str) -> DriverResult<Box<dyn Connection>>;
}

impl fmt::Debug for dyn Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Driver")
    }
}

// ============================================================================
// Connection - 물리 연결
// ============================================================================

/// 엔드포인트 하나에 대한 물리 연결
pub trait Connection: Send {
    /// 선택적 기능 기술자
    fn capabilities(&self) -> ConnectionCapabilities {
        ConnectionCapabilities::basic()
    }

    /// 스테이트먼트 준비
    fn prepare(&mut self, query: &str) -> DriverResult<Box<dyn Statement>>;

    /// 컨텍스트를 받는 스테이트먼트 준비
    fn prepare_with_context(
        &mut self,
        _ctx: &Context,
        _query: &str,
    ) -> DriverResult<Box<dyn Statement>> {
        Err(DriverError::Skip("prepare_with_context"))
    }

    /// 옵션 없는 트랜잭션 시작
    fn begin(&mut self) -> DriverResult<Box<dyn Transaction>>;

    /// 옵션을 받는 트랜잭션 시작
    fn begin_with_options(
        &mut self,
        _ctx: &Context,
        _options: &TransactionOptions,
    ) -> DriverResult<Box<dyn Transaction>> {
        Err(DriverError::BeginWithOptionsUnsupported)
    }

    /// prepare 없는 실행
    fn execute(
        &mut self,
        _ctx: &Context,
        _query: &str,
        _args: &[NamedValue],
    ) -> DriverResult<ExecResult> {
        Err(DriverError::Skip("execute"))
    }

    /// prepare 없는 조회
    fn query(
        &mut self,
        _ctx: &Context,
        _query: &str,
        _args: &[NamedValue],
    ) -> DriverResult<Box<dyn Rows>> {
        Err(DriverError::Skip("query"))
    }

    /// 연결 상태 확인
    fn ping(&mut self, _ctx: &Context) -> DriverResult<()> {
        Ok(())
    }

    /// 연결 종료
    fn close(&mut self) -> DriverResult<()>;
}

// ============================================================================
// Statement - 물리 스테이트먼트
// ============================================================================

/// 물리 연결에 바인딩된 준비된 스테이트먼트
pub trait Statement: Send {
    /// 선택적 기능 기술자
    fn capabilities(&self) -> StatementCapabilities {
        StatementCapabilities::basic()
    }

    /// 플레이스홀더 수 (드라이버가 모르면 None)
    fn num_input(&self) -> Option<usize>;

    /// 위치 인자로 실행
    fn exec(&mut self, args: &[Value]) -> DriverResult<ExecResult>;

    /// 위치 인자로 조회
    fn query(&mut self, args: &[Value]) -> DriverResult<Box<dyn Rows>>;

    /// 이름 있는 인자와 컨텍스트로 실행
    fn exec_with_context(
        &mut self,
        _ctx: &Context,
        _args: &[NamedValue],
    ) -> DriverResult<ExecResult> {
        Err(DriverError::Skip("exec_with_context"))
    }

    /// 이름 있는 인자와 컨텍스트로 조회
    fn query_with_context(
        &mut self,
        _ctx: &Context,
        _args: &[NamedValue],
    ) -> DriverResult<Box<dyn Rows>> {
        Err(DriverError::Skip("query_with_context"))
    }

    /// 스테이트먼트 종료
    fn close(&mut self) -> DriverResult<()>;
}

// ============================================================================
// Transaction / Rows
// ============================================================================

/// 물리 트랜잭션 핸들
pub trait Transaction: Send {
    /// 커밋
    fn commit(self: Box<Self>) -> DriverResult<()>;

    /// 롤백
    fn rollback(self: Box<Self>) -> DriverResult<()>;
}

/// 조회 결과 커서
pub trait Rows: Send {
    /// 컬럼 이름
    fn columns(&self) -> Vec<String>;

    /// 다음 행 (끝이면 None)
    fn next_row(&mut self) -> DriverResult<Option<Vec<Value>>>;

    /// 커서 종료
    fn close(&mut self) -> DriverResult<()>;
}

impl fmt::Debug for dyn Rows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows").field("columns", &self.columns()).finish()
    }
}
