//! 리더 선택 정책
//!
//! 읽기 연결로 사용할 리더 엔드포인트를 고르는 전략을 정의합니다.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::super::context::Context;
use super::super::delegate::{Connection, Driver};
use super::super::error::{DriverError, DriverResult};
use super::table::Endpoint;

/// 선택된 리더와 열린 물리 연결
pub struct SelectedReader {
    /// 선택된 엔드포인트
    pub endpoint: Endpoint,
    /// 해당 엔드포인트로 열린 연결
    pub connection: Box<dyn Connection>,
}

impl fmt::Debug for SelectedReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedReader")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// 리더 선택 전략
///
/// 하나의 [`RoutingDriver`](super::super::RoutingDriver)에서 열린 모든 가상 연결이
/// 같은 인스턴스를 공유하므로, 여러 스레드에서 동시에 호출될 수 있습니다.
/// 연결 실패는 그대로 반환하며, 가상 연결이 라이터로 대체합니다.
pub trait ReaderSelector: Send + Sync {
    /// 리더 하나를 골라 연결
    fn select(
        &self,
        ctx: &Context,
        driver: &dyn Driver,
        readers: &[Endpoint],
    ) -> DriverResult<SelectedReader>;
}

impl<F> ReaderSelector for F
where
    F: Fn(&Context, &dyn Driver, &[Endpoint]) -> DriverResult<SelectedReader> + Send + Sync,
{
    fn select(
        &self,
        ctx: &Context,
        driver: &dyn Driver,
        readers: &[Endpoint],
    ) -> DriverResult<SelectedReader> {
        self(ctx, driver, readers)
    }
}

/// 라우팅 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    /// 라운드 로빈 (기본값)
    #[default]
    RoundRobin,
    /// 랜덤
    Random,
}

/// 서버 선택기
///
/// 기본 [`ReaderSelector`] 구현입니다. 라운드 로빈 커서는 원자적으로 증가하므로
/// 여러 가상 연결이 동시에 선택해도 순환이 끊기지 않습니다.
#[derive(Debug)]
pub struct ServerSelector {
    /// 라우팅 정책
    policy: RoutingPolicy,
    /// 라운드 로빈 인덱스
    round_robin_index: AtomicUsize,
}

impl ServerSelector {
    /// 새 선택기 생성
    pub fn new(policy: RoutingPolicy) -> Self {
        Self {
            policy,
            round_robin_index: AtomicUsize::new(0),
        }
    }

    /// 기본 선택기 (라운드 로빈)
    pub fn round_robin() -> Self {
        Self::new(RoutingPolicy::RoundRobin)
    }

    /// 랜덤 선택기
    pub fn random() -> Self {
        Self::new(RoutingPolicy::Random)
    }

    /// 길이 `len`인 목록에서 다음 인덱스 선택
    pub fn select_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }

        match self.policy {
            RoutingPolicy::RoundRobin => {
                let index = self.round_robin_index.fetch_add(1, Ordering::Relaxed);
                Some(index % len)
            }
            RoutingPolicy::Random => Some(rand::thread_rng().gen_range(0..len)),
        }
    }

    /// 목록에서 하나 선택
    pub fn select<'a, T>(&self, servers: &'a [T]) -> Option<&'a T> {
        self.select_index(servers.len()).map(|i| &servers[i])
    }

    /// 인덱스 리셋
    pub fn reset(&self) {
        self.round_robin_index.store(0, Ordering::Relaxed);
    }

    /// 현재 정책 조회
    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }
}

impl Default for ServerSelector {
    fn default() -> Self {
        Self::round_robin()
    }
}

impl ReaderSelector for ServerSelector {
    fn select(
        &self,
        _ctx: &Context,
        driver: &dyn Driver,
        readers: &[Endpoint],
    ) -> DriverResult<SelectedReader> {
        let endpoint = ServerSelector::select(self, readers)
            .ok_or_else(|| DriverError::service_unavailable("no reader endpoints"))?;

        let connection = driver.open(endpoint.address())?;
        Ok(SelectedReader {
            endpoint: endpoint.clone(),
            connection,
        })
    }
}
