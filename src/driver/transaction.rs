//! 트랜잭션 코디네이터
//!
//! 활성 트랜잭션 하나를 물리 연결 하나에 고정(pin)하고, 커밋/롤백 시
//! 가상 연결에 고정 해제를 정확히 한 번 알립니다.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::connection::{ConnectionId, PhysicalConnection};
use super::delegate::Transaction;
use super::driver::Diagnostics;
use super::error::{DriverError, DriverResult};
use super::routing::EndpointRole;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// TransactionOptions - 트랜잭션 옵션
// ============================================================================

/// 격리 수준
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// 드라이버 기본값
    #[default]
    Default,
    /// READ UNCOMMITTED
    ReadUncommitted,
    /// READ COMMITTED
    ReadCommitted,
    /// WRITE COMMITTED
    WriteCommitted,
    /// REPEATABLE READ
    RepeatableRead,
    /// 스냅샷
    Snapshot,
    /// SERIALIZABLE
    Serializable,
    /// 선형화 가능
    Linearizable,
}

/// 트랜잭션 옵션
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOptions {
    /// 격리 수준
    pub isolation: IsolationLevel,
    /// 읽기 전용 (리더에서 시작 시도)
    pub read_only: bool,
}

impl TransactionOptions {
    /// 기본 옵션
    pub fn new() -> Self {
        Self::default()
    }

    /// 읽기 전용 옵션
    pub fn read_only() -> Self {
        Self::default().with_read_only(true)
    }

    /// 읽기 전용 설정
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// 격리 수준 설정
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// 명시적인 옵션이 하나도 없는지 여부
    pub fn is_default(&self) -> bool {
        self.isolation == IsolationLevel::Default && !self.read_only
    }
}

// ============================================================================
// TransactionState - 트랜잭션 상태
// ============================================================================

/// 트랜잭션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// 활성 상태
    Active,
    /// 커밋됨
    Committed,
    /// 롤백됨
    RolledBack,
    /// 커밋/롤백 호출이 실패함
    Failed,
}

impl TransactionState {
    /// 완료 상태 여부
    pub fn is_terminated(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

// ============================================================================
// TransactionPin - 가상 연결의 고정 슬롯
// ============================================================================

struct Pinned {
    transaction_id: u64,
    connection: Arc<PhysicalConnection>,
}

/// 가상 연결당 하나인 활성 트랜잭션 슬롯
#[derive(Default)]
pub(crate) struct TransactionPin {
    slot: Mutex<Option<Pinned>>,
}

impl TransactionPin {
    /// 고정된 연결 (트랜잭션이 없으면 None)
    pub(crate) fn connection(&self) -> Option<Arc<PhysicalConnection>> {
        self.slot.lock().as_ref().map(|p| Arc::clone(&p.connection))
    }

    pub(crate) fn is_active(&self) -> bool {
        self.slot.lock().is_some()
    }

    fn acquire(&self, transaction_id: u64, connection: Arc<PhysicalConnection>) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(Pinned {
            transaction_id,
            connection,
        });
        true
    }

    /// 같은 트랜잭션이 잡고 있을 때만 해제
    fn release(&self, transaction_id: u64) -> bool {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some(pinned) if pinned.transaction_id == transaction_id => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// 트랜잭션과 무관하게 비움 (가상 연결 종료 시)
    pub(crate) fn clear(&self) {
        self.slot.lock().take();
    }
}

impl fmt::Debug for TransactionPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("TransactionPin")
            .field("transaction_id", &slot.as_ref().map(|p| p.transaction_id))
            .finish()
    }
}

/// 일회성 고정 해제 신호
struct PinRelease {
    pin: Arc<TransactionPin>,
    transaction_id: u64,
}

impl PinRelease {
    fn release(self) -> bool {
        self.pin.release(self.transaction_id)
    }
}

// ============================================================================
// RoutedTransaction - 트랜잭션 코디네이터
// ============================================================================

/// 물리 연결 하나에 고정된 트랜잭션
///
/// 트랜잭션이 활성인 동안 가상 연결의 모든 실행/조회는 역할과 관계없이
/// 이 연결로 라우팅됩니다. 커밋/롤백 후 같은 가상 연결에서 바로 새
/// 트랜잭션을 시작할 수 있습니다.
pub struct RoutedTransaction {
    id: u64,
    connection: Arc<PhysicalConnection>,
    transaction: Option<Box<dyn Transaction>>,
    release: Option<PinRelease>,
    options: TransactionOptions,
    state: TransactionState,
    diagnostics: Arc<Diagnostics>,
}

impl RoutedTransaction {
    /// 물리 트랜잭션을 고정 슬롯에 등록
    pub(crate) fn pin(
        pin: &Arc<TransactionPin>,
        connection: Arc<PhysicalConnection>,
        transaction: Box<dyn Transaction>,
        options: TransactionOptions,
        diagnostics: Arc<Diagnostics>,
    ) -> DriverResult<Self> {
        let id = NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed);

        if !pin.acquire(id, Arc::clone(&connection)) {
            // 슬롯이 이미 차 있으면 방금 연 물리 트랜잭션은 되돌림
            if let Err(e) = transaction.rollback() {
                diagnostics.debugf(format_args!("rollback of orphaned transaction failed: {}", e));
            }
            return Err(DriverError::bad_connection(
                "begin called while already in a transaction",
            ));
        }

        diagnostics.debugf(format_args!(
            "transaction {} pinned to {} connection {}",
            id,
            connection.role(),
            connection.id()
        ));

        Ok(Self {
            id,
            connection,
            transaction: Some(transaction),
            release: Some(PinRelease {
                pin: Arc::clone(pin),
                transaction_id: id,
            }),
            options,
            state: TransactionState::Active,
            diagnostics,
        })
    }

    /// 커밋
    ///
    /// 물리 커밋 결과와 무관하게 고정을 해제하고, 물리 커밋 결과를 반환합니다.
    pub fn commit(&mut self) -> DriverResult<()> {
        let transaction = self.transaction.take().ok_or_else(|| self.terminated_error())?;

        let result = transaction.commit();
        self.state = match result {
            Ok(()) => TransactionState::Committed,
            Err(_) => TransactionState::Failed,
        };
        self.release_pin();
        result
    }

    /// 롤백
    ///
    /// 이미 완료된 트랜잭션이면 아무 것도 하지 않습니다.
    pub fn rollback(&mut self) -> DriverResult<()> {
        let Some(transaction) = self.transaction.take() else {
            return Ok(());
        };

        let result = transaction.rollback();
        self.state = match result {
            Ok(()) => TransactionState::RolledBack,
            Err(_) => TransactionState::Failed,
        };
        self.release_pin();
        result
    }

    /// 트랜잭션 상태
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// 고정된 물리 연결 ID
    pub fn connection_id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// 고정된 물리 연결의 역할
    pub fn role(&self) -> EndpointRole {
        self.connection.role()
    }

    /// 요청된 옵션
    pub fn options(&self) -> &TransactionOptions {
        &self.options
    }

    fn release_pin(&mut self) {
        if let Some(release) = self.release.take() {
            let released = release.release();
            self.diagnostics.debugf(format_args!(
                "transaction {} finished ({:?}); pin released: {}",
                self.id, self.state, released
            ));
        }
    }

    fn terminated_error(&self) -> DriverError {
        match self.state {
            TransactionState::Committed => DriverError::transaction("Transaction already committed"),
            TransactionState::RolledBack => {
                DriverError::transaction("Transaction already rolled back")
            }
            TransactionState::Failed | TransactionState::Active => {
                DriverError::transaction("Transaction in failed state")
            }
        }
    }
}

impl fmt::Debug for RoutedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutedTransaction")
            .field("id", &self.id)
            .field("connection", &self.connection.id())
            .field("role", &self.connection.role())
            .field("state", &self.state)
            .finish()
    }
}

impl Drop for RoutedTransaction {
    fn drop(&mut self) {
        if let Some(transaction) = self.transaction.take() {
            tracing::warn!(
                transaction = self.id,
                "transaction dropped without commit or rollback; rolling back"
            );
            self.state = match transaction.rollback() {
                Ok(()) => TransactionState::RolledBack,
                Err(e) => {
                    tracing::warn!(transaction = self.id, error = %e, "rollback on drop failed");
                    TransactionState::Failed
                }
            };
            self.release_pin();
        }
    }
}
