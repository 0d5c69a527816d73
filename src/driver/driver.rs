//! Routing Driver
//!
//! 하위 드라이버 하나를 감싸 라이터/리더 클러스터로 라우팅하는 커넥터

use std::fmt;
use std::sync::Arc;

use super::connection::VirtualConnection;
use super::delegate::Driver;
use super::error::DriverResult;
use super::routing::{ClusterAddress, ReaderSelector, RoutingPolicy, ServerSelector};

// ============================================================================
// Diagnostics - 진단 로그
// ============================================================================

/// 진단 로그 콜백
///
/// 연결 열기, 리더→라이터 대체, begin 폴백, 스테이트먼트 바인딩, 종료 시점에
/// `"rwproxy: "` 접두사가 붙은 메시지로 호출됩니다. 관찰 전용입니다.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// 진단 출력 (`tracing` 이벤트 + 선택적 콜백)
#[derive(Default)]
pub(crate) struct Diagnostics {
    sink: Option<LogSink>,
}

impl Diagnostics {
    pub(crate) fn new(sink: Option<LogSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn debugf(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: "rwproxy", "{}", args);
        if let Some(sink) = &self.sink {
            sink(&format!("rwproxy: {}", args));
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

// ============================================================================
// DriverOption - 드라이버 옵션
// ============================================================================

/// 드라이버 옵션
///
/// 순서대로 적용되며 같은 항목은 나중 옵션이 이깁니다.
pub enum DriverOption {
    /// 리더 선택 전략 교체
    ReaderSelector(Arc<dyn ReaderSelector>),
    /// 기본 선택기의 정책 지정
    RoutingPolicy(RoutingPolicy),
    /// 진단 로그 콜백
    Log(LogSink),
}

impl DriverOption {
    /// 리더 선택 전략 옵션
    pub fn reader_selector(selector: impl ReaderSelector + 'static) -> Self {
        Self::ReaderSelector(Arc::new(selector))
    }

    /// 라우팅 정책 옵션
    pub fn routing_policy(policy: RoutingPolicy) -> Self {
        Self::RoutingPolicy(policy)
    }

    /// 진단 로그 옵션
    pub fn log(sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self::Log(Arc::new(sink))
    }
}

impl fmt::Debug for DriverOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReaderSelector(_) => f.write_str("ReaderSelector(..)"),
            Self::RoutingPolicy(policy) => f.debug_tuple("RoutingPolicy").field(policy).finish(),
            Self::Log(_) => f.write_str("Log(..)"),
        }
    }
}

// ============================================================================
// RoutingDriver - 라우팅 드라이버
// ============================================================================

/// 드라이버에서 연 모든 가상 연결이 공유하는 상태
pub(crate) struct DriverShared {
    pub(crate) delegate: Box<dyn Driver>,
    pub(crate) selector: Arc<dyn ReaderSelector>,
    pub(crate) diagnostics: Arc<Diagnostics>,
}

/// 라우팅 드라이버
///
/// 클러스터 주소(`writer;reader1;reader2`)로 [`VirtualConnection`]을 엽니다.
/// 리더 선택기는 이 드라이버가 소유하며, 여기서 열린 모든 가상 연결이
/// 같은 순환 커서를 공유합니다.
pub struct RoutingDriver {
    shared: Arc<DriverShared>,
}

impl RoutingDriver {
    /// 기본 옵션(라운드 로빈, 로그 없음)으로 생성
    pub fn new(delegate: impl Driver + 'static) -> Self {
        Self::with_options(delegate, Vec::new())
    }

    /// 옵션 목록으로 생성
    pub fn with_options<I>(delegate: impl Driver + 'static, options: I) -> Self
    where
        I: IntoIterator<Item = DriverOption>,
    {
        let mut selector: Option<Arc<dyn ReaderSelector>> = None;
        let mut sink = None;

        for option in options {
            match option {
                DriverOption::ReaderSelector(s) => selector = Some(s),
                DriverOption::RoutingPolicy(policy) => {
                    selector = Some(Arc::new(ServerSelector::new(policy)))
                }
                DriverOption::Log(l) => sink = Some(l),
            }
        }

        let selector = selector.unwrap_or_else(|| Arc::new(ServerSelector::default()));

        Self {
            shared: Arc::new(DriverShared {
                delegate: Box::new(delegate),
                selector,
                diagnostics: Arc::new(Diagnostics::new(sink)),
            }),
        }
    }

    /// 가상 연결 열기
    ///
    /// 주소만 파싱하며 물리 연결은 처음 필요할 때 엽니다.
    pub fn open(&self, address: &str) -> DriverResult<VirtualConnection> {
        let cluster = ClusterAddress::parse(address)?;
        self.shared.diagnostics.debugf(format_args!(
            "opening virtual connection: writer {}, {} reader(s)",
            cluster.writer().address(),
            cluster.readers().len()
        ));
        Ok(VirtualConnection::new(Arc::clone(&self.shared), cluster))
    }

    /// 감싼 하위 드라이버
    pub fn parent(&self) -> &dyn Driver {
        self.shared.delegate.as_ref()
    }
}

impl fmt::Debug for RoutingDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingDriver")
            .field("diagnostics", &self.shared.diagnostics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::driver::context::Context;
    use crate::driver::error::DriverError;
    use crate::driver::mock::MockDriver;
    use crate::driver::routing::{Endpoint, SelectedReader};

    #[test]
    fn test_open_incomplete_address() {
        let driver = RoutingDriver::new(MockDriver::new());

        assert!(matches!(driver.open(""), Err(DriverError::IncompleteAddress(_))));
        assert!(matches!(driver.open(";;"), Err(DriverError::IncompleteAddress(_))));
    }

    #[test]
    fn test_open_is_lazy() {
        let mock = MockDriver::new();
        let driver = RoutingDriver::new(mock.clone());

        let conn = driver.open("w;r1;r2").unwrap();
        assert_eq!(conn.cluster_address().readers().len(), 2);
        assert!(mock.events().opened().is_empty());
    }

    #[test]
    fn test_parent() {
        let mock = MockDriver::new();
        let driver = RoutingDriver::new(mock.clone());

        driver.parent().open("direct").unwrap();
        assert_eq!(mock.events().opened(), vec!["direct"]);
    }

    #[test]
    fn test_log_option() {
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let driver = RoutingDriver::with_options(
            MockDriver::new(),
            vec![DriverOption::log(move |line| sink.lock().push(line.to_string()))],
        );

        let conn = driver.open("w").unwrap();
        conn.reader(&Context::background()).unwrap();

        let lines = lines.lock();
        assert!(lines.iter().all(|l| l.starts_with("rwproxy: ")));
        assert!(lines.iter().any(|l| l.contains("opening writer connection to: w")));
        assert!(lines
            .iter()
            .any(|l| l.contains("no readers specified; substituting with writer")));
    }

    #[test]
    fn test_reader_selector_option_last_wins() {
        let mock = MockDriver::new();
        let last_reader = |_: &Context, d: &dyn Driver, rs: &[Endpoint]| -> DriverResult<SelectedReader> {
            let endpoint = rs[rs.len() - 1].clone();
            let connection = d.open(endpoint.address())?;
            Ok(SelectedReader { endpoint, connection })
        };
        let driver = RoutingDriver::with_options(
            mock.clone(),
            vec![
                DriverOption::routing_policy(RoutingPolicy::Random),
                DriverOption::reader_selector(last_reader),
            ],
        );

        let conn = driver.open("w;r1;r2;r3").unwrap();
        conn.reader(&Context::background()).unwrap();
        assert_eq!(mock.events().opened(), vec!["r3"]);
    }

    #[test]
    fn test_round_robin_shared_across_connections() {
        let mock = MockDriver::new();
        let driver = RoutingDriver::new(mock.clone());

        for _ in 0..4 {
            let conn = driver.open("w;r1;r2").unwrap();
            conn.reader(&Context::background()).unwrap();
        }

        assert_eq!(mock.events().opened(), vec!["r1", "r2", "r1", "r2"]);
    }

    #[test]
    fn test_driver_option_debug() {
        let option = DriverOption::routing_policy(RoutingPolicy::RoundRobin);
        assert_eq!(format!("{:?}", option), "RoutingPolicy(RoundRobin)");
        assert_eq!(format!("{:?}", DriverOption::log(|_| {})), "Log(..)");
    }
}
