//! 라우팅 모듈
//!
//! 클러스터 주소 파싱과 리더 선택 정책을 담당합니다.
//!
//! # 개요
//!
//! 클러스터 주소는 `;`로 구분된 엔드포인트 목록이며, 첫 번째가 라이터이고
//! 나머지는 리더입니다. 읽기 연결은 [`ReaderSelector`]가 고르며, 기본 구현인
//! [`ServerSelector`]는 드라이버 전체에서 공유되는 라운드 로빈 커서를 씁니다.
//!
//! # 예시
//!
//! ```
//! use rwproxy::driver::routing::{ClusterAddress, EndpointRole};
//!
//! let address = ClusterAddress::parse("primary:5432;replica1:5432;replica2:5432").unwrap();
//! assert_eq!(address.writer().address(), "primary:5432");
//! assert_eq!(address.readers().len(), 2);
//! assert_eq!(address.readers()[0].role(), EndpointRole::Reader);
//! ```

mod policy;
mod table;

pub use policy::{ReaderSelector, RoutingPolicy, SelectedReader, ServerSelector};
pub use table::{make_cluster_address, ClusterAddress, Endpoint, EndpointRole, ADDRESS_SEPARATOR};
