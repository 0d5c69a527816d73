//! 준비된 스테이트먼트
//!
//! 논리 스테이트먼트 하나를 물리 연결별 바인딩으로 지연 준비합니다.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::connection::{ConnectionId, ConnectionState, PhysicalConnection};
use super::context::Context;
use super::delegate::{Rows, Statement, StatementCapabilities};
use super::error::{DriverError, DriverResult};
use super::types::{ExecResult, NamedValue, Value};

/// 이름 있는 인자를 위치 인자로 변환
///
/// 이름이 붙은 인자가 하나라도 있으면 [`DriverError::NamedParametersUnsupported`]를 반환합니다.
pub fn named_values_to_values(args: &[NamedValue]) -> DriverResult<Vec<Value>> {
    args.iter()
        .map(|arg| {
            if arg.is_named() {
                Err(DriverError::NamedParametersUnsupported)
            } else {
                Ok(arg.value.clone())
            }
        })
        .collect()
}

struct Binding {
    statement: Box<dyn Statement>,
    capabilities: StatementCapabilities,
}

/// 준비된 스테이트먼트
///
/// `exec`는 라이터, `query`는 리더(트랜잭션 중이면 고정된 연결)에서 실행됩니다.
/// 처음 사용하는 물리 연결마다 한 번씩 준비되며, [`close`](Self::close)는
/// 지금까지 만든 모든 바인딩을 닫습니다.
pub struct PreparedStatement {
    connection: Arc<ConnectionState>,
    query: String,
    bindings: HashMap<ConnectionId, Binding>,
}

impl PreparedStatement {
    pub(crate) fn new(connection: Arc<ConnectionState>, query: impl Into<String>) -> Self {
        Self {
            connection,
            query: query.into(),
            bindings: HashMap::new(),
        }
    }

    /// 쿼리 문자열
    pub fn query_text(&self) -> &str {
        &self.query
    }

    /// 지금까지 만든 물리 바인딩 수
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// 플레이스홀더 수 (바인딩이 없으면 알 수 없음)
    pub fn num_input(&self) -> Option<usize> {
        self.bindings
            .values()
            .next()
            .and_then(|binding| binding.statement.num_input())
    }

    /// 라이터에서 실행
    pub fn exec(&mut self, args: &[Value]) -> DriverResult<ExecResult> {
        self.connection.ensure_open()?;
        let conn = self.connection.writer()?;
        self.binding(&Context::background(), conn)?
            .statement
            .exec(args)
    }

    /// 리더에서 조회
    pub fn query(&mut self, args: &[Value]) -> DriverResult<Box<dyn Rows>> {
        self.connection.ensure_open()?;
        let ctx = Context::background();
        let conn = self.connection.reader(&ctx)?;
        self.binding(&ctx, conn)?.statement.query(args)
    }

    /// 컨텍스트와 함께 라이터에서 실행
    ///
    /// 바인딩이 컨텍스트 실행을 지원하지 않으면 인자를 위치 인자로 바꿔 실행합니다.
    pub fn exec_with_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> DriverResult<ExecResult> {
        self.connection.ensure_open()?;
        let conn = self.connection.writer()?;
        let binding = self.binding(ctx, conn)?;

        if binding.capabilities.exec_with_context {
            return binding.statement.exec_with_context(ctx, args);
        }
        let values = named_values_to_values(args)?;
        ctx.check()?;
        binding.statement.exec(&values)
    }

    /// 컨텍스트와 함께 리더에서 조회
    pub fn query_with_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> DriverResult<Box<dyn Rows>> {
        self.connection.ensure_open()?;
        let conn = self.connection.reader(ctx)?;
        let binding = self.binding(ctx, conn)?;

        if binding.capabilities.query_with_context {
            return binding.statement.query_with_context(ctx, args);
        }
        let values = named_values_to_values(args)?;
        ctx.check()?;
        binding.statement.query(&values)
    }

    /// 모든 바인딩 종료
    ///
    /// 실패는 [`DriverError::StatementClose`]로 모읍니다. 바인딩이 없으면 바로 성공합니다.
    pub fn close(&mut self) -> DriverResult<()> {
        let diagnostics = Arc::clone(self.connection.diagnostics());
        let mut errors = Vec::new();

        for (id, mut binding) in self.bindings.drain() {
            diagnostics.debugf(format_args!(
                "closing statement on connection {}: {}",
                id, self.query
            ));
            if let Err(e) = binding.statement.close() {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DriverError::StatementClose { errors })
        }
    }

    fn binding(
        &mut self,
        ctx: &Context,
        conn: Arc<PhysicalConnection>,
    ) -> DriverResult<&mut Binding> {
        match self.bindings.entry(conn.id()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                self.connection.diagnostics().debugf(format_args!(
                    "preparing statement on {} connection {} ({}): {}",
                    conn.role(),
                    conn.id(),
                    conn.address(),
                    self.query
                ));
                let statement = conn.prepare(ctx, &self.query)?;
                let capabilities = statement.capabilities();
                Ok(entry.insert(Binding {
                    statement,
                    capabilities,
                }))
            }
        }
    }
}

impl fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.bindings.keys().copied().collect();
        ids.sort();
        f.debug_struct("PreparedStatement")
            .field("query", &self.query)
            .field("bindings", &ids)
            .finish()
    }
}

impl Drop for PreparedStatement {
    fn drop(&mut self) {
        if self.bindings.is_empty() {
            return;
        }
        if let Err(e) = self.close() {
            tracing::warn!(query = %self.query, error = %e, "closing dropped statement failed");
        }
    }
}
