//! 호출 컨텍스트
//!
//! 데드라인과 취소 신호를 하위 드라이버로 전달합니다.
//! 라우팅 계층 자체는 `prepare_with_context`와 스테이트먼트의 위치 인자 변환 경로에서만
//! 만료 여부를 검사하며, 그 외에는 하위 드라이버가 지원하는 범위에서만 취소가 적용됩니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::{DriverError, DriverResult};

/// 호출 컨텍스트
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// 데드라인
    deadline: Option<Instant>,
    /// 취소 플래그
    cancelled: Option<Arc<AtomicBool>>,
}

impl Context {
    /// 데드라인/취소가 없는 기본 컨텍스트
    pub fn background() -> Self {
        Self::default()
    }

    /// 데드라인 설정
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// 지금부터 `timeout` 후를 데드라인으로 설정
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// 취소 가능한 컨텍스트와 취소 핸들 생성
    pub fn with_cancel(mut self) -> (Self, CancelHandle) {
        let flag = self
            .cancelled
            .get_or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone();
        (self, CancelHandle { flag })
    }

    /// 데드라인
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 남은 시간 (데드라인이 없으면 None)
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// 취소되었거나 데드라인이 지났는지 여부
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// 종료된 컨텍스트면 해당 에러 반환
    pub fn check(&self) -> DriverResult<()> {
        if let Some(flag) = &self.cancelled {
            if flag.load(Ordering::Acquire) {
                return Err(DriverError::Cancelled);
            }
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(DriverError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// 컨텍스트 취소 핸들
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// 연결된 모든 컨텍스트 취소
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// 취소 여부
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
