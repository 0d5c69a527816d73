//! 엔드포인트 테이블
//!
//! `;`로 구분된 클러스터 주소를 역할별 엔드포인트 목록으로 파싱합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::super::error::{DriverError, DriverResult};

/// 클러스터 주소 구분자
pub const ADDRESS_SEPARATOR: char = ';';

/// 엔드포인트 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointRole {
    /// 쓰기 가능 (클러스터당 하나)
    Writer,
    /// 읽기 전용 복제본
    Reader,
}

impl EndpointRole {
    /// 역할을 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Writer => "writer",
            Self::Reader => "reader",
        }
    }
}

impl FromStr for EndpointRole {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "writer" => Ok(Self::Writer),
            "reader" => Ok(Self::Reader),
            _ => Err(DriverError::configuration(format!(
                "unknown endpoint role: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 역할이 붙은 엔드포인트 주소
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    address: String,
    role: EndpointRole,
}

impl Endpoint {
    /// 라이터 엔드포인트
    pub fn writer(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            role: EndpointRole::Writer,
        }
    }

    /// 리더 엔드포인트
    pub fn reader(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            role: EndpointRole::Reader,
        }
    }

    /// 하위 드라이버에 전달할 주소
    pub fn address(&self) -> &str {
        &self.address
    }

    /// 역할
    pub fn role(&self) -> EndpointRole {
        self.role
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.role)
    }
}

/// 클러스터 주소
///
/// 라이터 하나가 항상 첫 번째이고, 리더는 입력 순서를 유지합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAddress {
    writer: Endpoint,
    readers: Vec<Endpoint>,
}

impl ClusterAddress {
    /// 라이터와 리더 주소로 생성
    pub fn new<I, S>(writer: impl Into<String>, readers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            writer: Endpoint::writer(writer),
            readers: readers.into_iter().map(Endpoint::reader).collect(),
        }
    }

    /// 복합 주소 파싱
    ///
    /// 빈 세그먼트는 무시하며, 비어 있지 않은 세그먼트가 없으면
    /// [`DriverError::IncompleteAddress`]를 반환합니다.
    pub fn parse(address: &str) -> DriverResult<Self> {
        let mut segments = address
            .split(ADDRESS_SEPARATOR)
            .filter(|segment| !segment.is_empty());

        let writer = segments
            .next()
            .ok_or_else(|| DriverError::incomplete_address(address))?;

        Ok(Self::new(writer, segments))
    }

    /// 라이터 엔드포인트
    pub fn writer(&self) -> &Endpoint {
        &self.writer
    }

    /// 리더 엔드포인트 목록
    pub fn readers(&self) -> &[Endpoint] {
        &self.readers
    }

    /// 리더가 있는지 확인
    pub fn has_readers(&self) -> bool {
        !self.readers.is_empty()
    }

    /// 라이터부터 순서대로 모든 엔드포인트
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        std::iter::once(&self.writer).chain(self.readers.iter())
    }
}

impl FromStr for ClusterAddress {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ClusterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.writer.address())?;
        for reader in &self.readers {
            write!(f, "{}{}", ADDRESS_SEPARATOR, reader.address())?;
        }
        Ok(())
    }
}

/// 라이터와 리더 주소를 복합 주소 문자열로 결합
pub fn make_cluster_address<I, S>(writer: &str, readers: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut address = writer.to_string();
    for reader in readers {
        address.push(ADDRESS_SEPARATOR);
        address.push_str(reader.as_ref());
    }
    address
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_role_from_str() {
        assert_eq!("writer".parse::<EndpointRole>().unwrap(), EndpointRole::Writer);
        assert_eq!("READER".parse::<EndpointRole>().unwrap(), EndpointRole::Reader);
        assert!("route".parse::<EndpointRole>().is_err());
    }

    #[test]
    fn test_parse_writer_only() {
        let address = ClusterAddress::parse("W").unwrap();
        assert_eq!(address.writer().address(), "W");
        assert_eq!(address.writer().role(), EndpointRole::Writer);
        assert!(!address.has_readers());
    }

    #[test]
    fn test_parse_writer_and_readers_in_order() {
        let address = ClusterAddress::parse("W;R1;R2").unwrap();
        let readers: Vec<&str> = address.readers().iter().map(Endpoint::address).collect();
        assert_eq!(readers, vec!["R1", "R2"]);
        assert!(address
            .readers()
            .iter()
            .all(|r| r.role() == EndpointRole::Reader));
    }

    #[test]
    fn test_parse_skips_empty_segments() {
        let address = ClusterAddress::parse(";;W;;R1;").unwrap();
        assert_eq!(address.writer().address(), "W");
        assert_eq!(address.readers().len(), 1);
        assert_eq!(address.to_string(), "W;R1");
    }

    #[test]
    fn test_parse_incomplete() {
        assert!(matches!(
            ClusterAddress::parse(""),
            Err(DriverError::IncompleteAddress(_))
        ));
        assert!(matches!(
            ClusterAddress::parse(";;;"),
            Err(DriverError::IncompleteAddress(ref a)) if a == ";;;"
        ));
    }

    #[test]
    fn test_endpoints_writer_first() {
        let address: ClusterAddress = "W;R1;R2".parse().unwrap();
        let roles: Vec<EndpointRole> = address.endpoints().map(Endpoint::role).collect();
        assert_eq!(
            roles,
            vec![EndpointRole::Writer, EndpointRole::Reader, EndpointRole::Reader]
        );
    }

    #[test]
    fn test_make_cluster_address() {
        assert_eq!(make_cluster_address("w", ["r1", "r2"]), "w;r1;r2");
        assert_eq!(make_cluster_address("w", Vec::<String>::new()), "w");

        let address = ClusterAddress::parse(&make_cluster_address("w", ["r"])).unwrap();
        assert_eq!(address, ClusterAddress::new("w", ["r"]));
    }
}
