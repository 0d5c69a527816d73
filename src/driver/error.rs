//! Driver Error Types
//!
//! 라우팅 드라이버 에러 정의

use std::error::Error as StdError;
use thiserror::Error;

// ============================================================================
// DriverError - 드라이버 에러
// ============================================================================

/// 드라이버 에러
#[derive(Error, Debug)]
pub enum DriverError {
    /// 클러스터 주소에 라이터가 없음
    #[error("rwproxy: cluster address is incomplete: {0:?}")]
    IncompleteAddress(String),

    /// 사용할 수 없는 연결 (풀에서 폐기 후 재생성해야 함)
    #[error("rwproxy: bad connection: {0}")]
    BadConnection(String),

    /// 빠른 경로 미지원 (prepare + exec 경로를 사용해야 함)
    #[error("rwproxy: {0} fast path unsupported; use prepare and exec instead")]
    Skip(&'static str),

    /// 옵션을 받는 begin 미지원
    #[error("rwproxy: driver doesn't support begin with options")]
    BeginWithOptionsUnsupported,

    /// 이름 있는 파라미터 미지원
    #[error("rwproxy: driver does not support the use of named parameters")]
    NamedParametersUnsupported,

    /// 연결 종료 실패 (라이터/리더 에러 모음)
    #[error("rwproxy: failed to close {} proxied connections: {}", .errors.len(), join_errors(.errors, ", "))]
    ConnectionClose {
        /// 개별 종료 에러
        errors: Vec<DriverError>,
    },

    /// 스테이트먼트 종료 실패 (바인딩별 에러 모음)
    #[error("rwproxy: failed to close proxied statements: {}", join_errors(.errors, "; "))]
    StatementClose {
        /// 개별 종료 에러
        errors: Vec<DriverError>,
    },

    /// 연결 에러
    #[error("Connection error: {0}")]
    Connection(String),

    /// 트랜잭션 에러
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 서비스 불가
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 컨텍스트 취소
    #[error("context canceled")]
    Cancelled,

    /// 데드라인 초과
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// 하위 드라이버 에러 (변환 없이 전달)
    #[error(transparent)]
    Delegate(Box<dyn StdError + Send + Sync>),
}

impl DriverError {
    /// 불완전 주소 에러 생성
    pub fn incomplete_address(address: impl Into<String>) -> Self {
        Self::IncompleteAddress(address.into())
    }

    /// 사용 불가 연결 에러 생성
    pub fn bad_connection(msg: impl Into<String>) -> Self {
        Self::BadConnection(msg.into())
    }

    /// 연결 에러 생성
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// 트랜잭션 에러 생성
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// 설정 에러 생성
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 서비스 불가 에러 생성
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// 하위 드라이버 에러 래핑
    pub fn delegate(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Delegate(err.into())
    }

    /// 연결을 폐기해야 하는지 여부
    pub fn is_bad_connection(&self) -> bool {
        matches!(self, Self::BadConnection(_))
    }

    /// 일반 경로로 재시도하라는 신호인지 여부
    ///
    /// 실패가 아니라 호출자가 느리지만 항상 지원되는 경로를 사용해야 함을 뜻합니다.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }

    /// 컨텍스트 종료(취소/데드라인) 여부
    pub fn is_context_error(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// 클라이언트 에러 여부
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::IncompleteAddress(_)
                | Self::Configuration(_)
                | Self::BeginWithOptionsUnsupported
                | Self::NamedParametersUnsupported
        )
    }

    /// 집계 에러에 포함된 개별 에러
    pub fn aggregated(&self) -> &[DriverError] {
        match self {
            Self::ConnectionClose { errors } | Self::StatementClose { errors } => errors,
            _ => &[],
        }
    }
}

fn join_errors(errors: &[DriverError], separator: &str) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

// ============================================================================
// Result Type
// ============================================================================

/// 드라이버 결과 타입
pub type DriverResult<T> = Result<T, DriverError>;

// ============================================================================
// Tests
// ============================================================================
