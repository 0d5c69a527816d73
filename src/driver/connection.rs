//! 가상 연결
//!
//! 라이터 연결 하나와 리더 연결 하나를 지연 생성하여 캐시하고,
//! 쓰기는 라이터로, 읽기는 리더로, 트랜잭션 중에는 고정된 연결로 라우팅합니다.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::context::Context;
use super::delegate::{Connection, ConnectionCapabilities, Rows, Statement, Transaction};
use super::driver::{Diagnostics, DriverShared};
use super::error::{DriverError, DriverResult};
use super::routing::{ClusterAddress, EndpointRole};
use super::statement::PreparedStatement;
use super::transaction::{IsolationLevel, RoutedTransaction, TransactionOptions, TransactionPin};
use super::types::{ExecResult, NamedValue};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// ConnectionId - 물리 연결 식별자
// ============================================================================

/// 물리 연결 식별자
///
/// 같은 프로세스 안에서 물리 연결마다 유일합니다. 스테이트먼트 바인딩의 키로 쓰입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// 숫자 값
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// PhysicalConnection - 물리 연결
// ============================================================================

/// 하위 드라이버가 연 실제 연결
///
/// 기능 설명자는 생성 시 한 번만 읽고, 모든 호출은 저장된 설명자로 분기합니다.
pub(crate) struct PhysicalConnection {
    id: ConnectionId,
    role: EndpointRole,
    address: String,
    capabilities: ConnectionCapabilities,
    inner: Mutex<Box<dyn Connection>>,
}

impl PhysicalConnection {
    pub(crate) fn new(
        role: EndpointRole,
        address: impl Into<String>,
        connection: Box<dyn Connection>,
    ) -> Self {
        let capabilities = connection.capabilities();
        Self {
            id: ConnectionId::next(),
            role,
            address: address.into(),
            capabilities,
            inner: Mutex::new(connection),
        }
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn role(&self) -> EndpointRole {
        self.role
    }

    pub(crate) fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn prepare(&self, ctx: &Context, query: &str) -> DriverResult<Box<dyn Statement>> {
        let mut conn = self.inner.lock();
        if self.capabilities.prepare_with_context {
            conn.prepare_with_context(ctx, query)
        } else {
            conn.prepare(query)
        }
    }

    pub(crate) fn begin(&self) -> DriverResult<Box<dyn Transaction>> {
        self.inner.lock().begin()
    }

    pub(crate) fn begin_with_options(
        &self,
        ctx: &Context,
        options: &TransactionOptions,
    ) -> DriverResult<Box<dyn Transaction>> {
        if !self.capabilities.begin_with_options {
            return Err(DriverError::BeginWithOptionsUnsupported);
        }
        self.inner.lock().begin_with_options(ctx, options)
    }

    pub(crate) fn execute(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> DriverResult<ExecResult> {
        if !self.capabilities.execute {
            return Err(DriverError::Skip("execute"));
        }
        self.inner.lock().execute(ctx, query, args)
    }

    pub(crate) fn query(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> DriverResult<Box<dyn Rows>> {
        if !self.capabilities.query {
            return Err(DriverError::Skip("query"));
        }
        self.inner.lock().query(ctx, query, args)
    }

    /// ping 기능이 없으면 항상 정상으로 간주
    pub(crate) fn ping(&self, ctx: &Context) -> DriverResult<()> {
        if !self.capabilities.ping {
            return Ok(());
        }
        self.inner.lock().ping(ctx)
    }

    pub(crate) fn close(&self) -> DriverResult<()> {
        self.inner.lock().close()
    }
}

impl fmt::Debug for PhysicalConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalConnection")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("address", &self.address)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

// ============================================================================
// ConnectionState - 가상 연결 공유 상태
// ============================================================================

type Slot = Mutex<Option<Arc<PhysicalConnection>>>;

// 슬롯 잠금은 복제/저장하는 동안만 잡는다. 하위 드라이버, 리더 선택기,
// 로그 콜백은 잠금 밖에서 호출되므로 콜백이 같은 연결을 조회해도 막히지 않는다.
fn cached(slot: &Slot) -> Option<Arc<PhysicalConnection>> {
    slot.lock().as_ref().map(Arc::clone)
}

/// 비어 있으면 저장하고, 이미 채워져 있으면 기존 연결을 반환
fn store(slot: &Slot, conn: Arc<PhysicalConnection>) -> Arc<PhysicalConnection> {
    let mut guard = slot.lock();
    let Some(existing) = guard.as_ref().map(Arc::clone) else {
        *guard = Some(Arc::clone(&conn));
        return conn;
    };
    drop(guard);

    // 다른 곳에서 공유하지 않는 새 연결만 닫음 (라이터 별칭은 그대로 둠)
    if Arc::strong_count(&conn) == 1 {
        if let Err(e) = conn.close() {
            tracing::warn!(connection = %conn.id(), error = %e, "closing redundant connection failed");
        }
    }
    existing
}

/// 가상 연결과 그 스테이트먼트가 공유하는 상태
pub(crate) struct ConnectionState {
    shared: Arc<DriverShared>,
    address: ClusterAddress,
    writer: Slot,
    reader: Slot,
    pin: Arc<TransactionPin>,
    closed: AtomicBool,
}

impl ConnectionState {
    pub(crate) fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.shared.diagnostics
    }

    pub(crate) fn ensure_open(&self) -> DriverResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DriverError::connection("connection is closed"));
        }
        Ok(())
    }

    /// 쓰기 대상 연결
    ///
    /// 트랜잭션 중이면 고정된 연결, 아니면 캐시된 라이터(없으면 연다).
    pub(crate) fn writer(&self) -> DriverResult<Arc<PhysicalConnection>> {
        if let Some(pinned) = self.pin.connection() {
            return Ok(pinned);
        }
        self.cached_writer()
    }

    fn cached_writer(&self) -> DriverResult<Arc<PhysicalConnection>> {
        if let Some(conn) = cached(&self.writer) {
            return Ok(conn);
        }

        let endpoint = self.address.writer();
        self.diagnostics()
            .debugf(format_args!("opening writer connection to: {}", endpoint.address()));
        let conn = self.shared.delegate.open(endpoint.address())?;
        let conn = Arc::new(PhysicalConnection::new(
            EndpointRole::Writer,
            endpoint.address(),
            conn,
        ));
        Ok(store(&self.writer, conn))
    }

    /// 읽기 대상 연결
    ///
    /// 트랜잭션 중이면 고정된 연결을 반환합니다. 아니면 한 번만 결정하여 캐시합니다.
    /// 리더가 없거나 리더 연결에 실패하면 라이터를 대신 씁니다.
    pub(crate) fn reader(&self, ctx: &Context) -> DriverResult<Arc<PhysicalConnection>> {
        if let Some(pinned) = self.pin.connection() {
            return Ok(pinned);
        }

        if let Some(conn) = cached(&self.reader) {
            return Ok(conn);
        }

        let conn = if !self.address.has_readers() {
            self.diagnostics()
                .debugf(format_args!("no readers specified; substituting with writer"));
            self.cached_writer()?
        } else {
            match self.shared.selector.select(
                ctx,
                self.shared.delegate.as_ref(),
                self.address.readers(),
            ) {
                Ok(selected) => {
                    self.diagnostics().debugf(format_args!(
                        "opened reader connection to: {}",
                        selected.endpoint.address()
                    ));
                    Arc::new(PhysicalConnection::new(
                        EndpointRole::Reader,
                        selected.endpoint.address(),
                        selected.connection,
                    ))
                }
                Err(e) => {
                    self.diagnostics().debugf(format_args!(
                        "failed to open reader connection; substituting with writer: {}",
                        e
                    ));
                    self.cached_writer()?
                }
            }
        };

        Ok(store(&self.reader, conn))
    }

    fn begin_on(
        &self,
        ctx: &Context,
        conn: Arc<PhysicalConnection>,
        options: &TransactionOptions,
    ) -> DriverResult<RoutedTransaction> {
        let tx = conn.begin_with_options(ctx, options)?;
        RoutedTransaction::pin(
            &self.pin,
            conn,
            tx,
            *options,
            Arc::clone(self.diagnostics()),
        )
    }

    fn begin_plain(
        &self,
        conn: Arc<PhysicalConnection>,
        options: TransactionOptions,
    ) -> DriverResult<RoutedTransaction> {
        let tx = conn.begin()?;
        RoutedTransaction::pin(&self.pin, conn, tx, options, Arc::clone(self.diagnostics()))
    }

    fn ensure_no_transaction(&self) -> DriverResult<()> {
        if self.pin.is_active() {
            self.diagnostics()
                .debugf(format_args!("begin called while already in a transaction"));
            return Err(DriverError::bad_connection(
                "begin called while already in a transaction",
            ));
        }
        Ok(())
    }

    fn close(&self) -> DriverResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.pin.clear();
        let writer = self.writer.lock().take();
        let reader = self.reader.lock().take();

        let mut errors = Vec::new();
        if let Some(writer) = &writer {
            self.diagnostics()
                .debugf(format_args!("closing writer connection {}", writer.id()));
            if let Err(e) = writer.close() {
                errors.push(e);
            }
        }

        if let Some(reader) = reader {
            // 라이터 별칭이면 이미 닫혔음
            let aliased = writer.as_ref().is_some_and(|w| w.id() == reader.id());
            if !aliased {
                self.diagnostics()
                    .debugf(format_args!("closing reader connection {}", reader.id()));
                if let Err(e) = reader.close() {
                    errors.push(e);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DriverError::ConnectionClose { errors })
        }
    }
}

// ============================================================================
// VirtualConnection - 가상 연결
// ============================================================================

/// 라이터/리더 클러스터에 대한 하나의 논리 연결
///
/// 한 번에 한 호출자만 사용한다고 가정합니다(연결 풀이 보장).
/// 물리 연결은 처음 필요할 때 열리며, 리더 결정은 연결 수명 동안 한 번만 일어납니다.
pub struct VirtualConnection {
    state: Arc<ConnectionState>,
}

impl VirtualConnection {
    pub(crate) fn new(shared: Arc<DriverShared>, address: ClusterAddress) -> Self {
        Self {
            state: Arc::new(ConnectionState {
                shared,
                address,
                writer: Mutex::new(None),
                reader: Mutex::new(None),
                pin: Arc::new(TransactionPin::default()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// 파싱된 클러스터 주소
    pub fn cluster_address(&self) -> &ClusterAddress {
        &self.state.address
    }

    /// 스테이트먼트 준비
    ///
    /// 물리 호출 없이 바인딩되지 않은 스테이트먼트를 즉시 반환합니다.
    pub fn prepare(&self, query: &str) -> DriverResult<PreparedStatement> {
        self.state.ensure_open()?;
        Ok(PreparedStatement::new(Arc::clone(&self.state), query))
    }

    /// 취소/마감을 확인하는 스테이트먼트 준비
    ///
    /// 이미 만료된 컨텍스트면 바로 실패합니다. 바인딩은 여전히 첫 사용 시점입니다.
    pub fn prepare_with_context(
        &self,
        ctx: &Context,
        query: &str,
    ) -> DriverResult<PreparedStatement> {
        ctx.check()?;
        self.prepare(query)
    }

    /// 준비 없이 실행 (항상 라이터 또는 고정된 연결)
    ///
    /// 하위 연결에 기능이 없으면 [`DriverError::Skip`]을 반환합니다.
    pub fn execute(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> DriverResult<ExecResult> {
        self.state.ensure_open()?;
        self.state.writer()?.execute(ctx, query, args)
    }

    /// 준비 없이 조회 (항상 리더 또는 고정된 연결)
    pub fn query(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> DriverResult<Box<dyn Rows>> {
        self.state.ensure_open()?;
        self.state.reader(ctx)?.query(ctx, query, args)
    }

    /// 옵션 없이 라이터에서 트랜잭션 시작
    pub fn begin(&self) -> DriverResult<RoutedTransaction> {
        self.state.ensure_open()?;
        self.state.ensure_no_transaction()?;
        let writer = self.state.writer()?;
        self.state.begin_plain(writer, TransactionOptions::default())
    }

    /// 옵션으로 트랜잭션 시작
    ///
    /// 읽기 전용이면 리더에서 먼저 시도하고, 실패하면 조용히 라이터로 넘어갑니다.
    /// 라이터가 옵션 begin을 지원하지 않으면 격리 수준이 기본값일 때만
    /// 일반 begin으로 폴백합니다.
    pub fn begin_transaction(
        &self,
        ctx: &Context,
        options: &TransactionOptions,
    ) -> DriverResult<RoutedTransaction> {
        self.state.ensure_open()?;
        self.state.ensure_no_transaction()?;

        if options.read_only {
            let diagnostics = self.state.diagnostics();
            diagnostics.debugf(format_args!("begin read-only transaction on reader"));
            match self
                .state
                .reader(ctx)
                .and_then(|reader| self.state.begin_on(ctx, reader, options))
            {
                Ok(tx) => return Ok(tx),
                Err(e) => diagnostics.debugf(format_args!(
                    "read-only transaction on reader failed; using writer: {}",
                    e
                )),
            }
        }

        let writer = self.state.writer()?;
        match self.state.begin_on(ctx, Arc::clone(&writer), options) {
            Err(DriverError::BeginWithOptionsUnsupported)
                if options.isolation == IsolationLevel::Default =>
            {
                self.state.diagnostics().debugf(format_args!(
                    "writer doesn't support begin with options; using plain begin"
                ));
                self.state.begin_plain(writer, *options)
            }
            result => result,
        }
    }

    /// 라이터와 (다른 연결이면) 리더 ping
    pub fn ping(&self, ctx: &Context) -> DriverResult<()> {
        self.state.ensure_open()?;
        let writer = self.state.writer()?;
        writer.ping(ctx)?;

        let reader = self.state.reader(ctx)?;
        if reader.id() != writer.id() {
            reader.ping(ctx)?;
        }
        Ok(())
    }

    /// 연결 종료
    ///
    /// 라이터를 닫고, 리더가 별개의 연결이면 리더도 닫습니다.
    /// 한쪽이 실패해도 다른 쪽을 닫으며 실패는 [`DriverError::ConnectionClose`]로 모읍니다.
    /// 두 번째 호출은 아무 것도 하지 않습니다.
    pub fn close(&self) -> DriverResult<()> {
        self.state.close()
    }

    /// 종료 여부
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// 활성 트랜잭션 여부
    pub fn in_transaction(&self) -> bool {
        self.state.pin.is_active()
    }

    /// 캐시된 라이터 연결 ID
    pub fn writer_id(&self) -> Option<ConnectionId> {
        self.state.writer.lock().as_ref().map(|c| c.id())
    }

    /// 캐시된 리더 연결 ID (라이터 대체 시 라이터 ID)
    pub fn reader_id(&self) -> Option<ConnectionId> {
        self.state.reader.lock().as_ref().map(|c| c.id())
    }

    #[cfg(test)]
    pub(crate) fn reader(&self, ctx: &Context) -> DriverResult<Arc<PhysicalConnection>> {
        self.state.reader(ctx)
    }

    #[cfg(test)]
    pub(crate) fn writer(&self) -> DriverResult<Arc<PhysicalConnection>> {
        self.state.writer()
    }
}

impl fmt::Debug for VirtualConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualConnection")
            .field("address", &self.state.address.to_string())
            .field("writer", &self.writer_id())
            .field("reader", &self.reader_id())
            .field("pin", &self.state.pin)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for VirtualConnection {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Err(e) = self.close() {
            tracing::warn!(
                address = %self.state.address,
                error = %e,
                "closing dropped connection failed"
            );
        }
    }
}
