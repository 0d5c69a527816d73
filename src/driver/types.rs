//! Driver Types
//!
//! 쿼리 인자와 실행 결과 타입 정의

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// Value - 인자/컬럼 값
// ============================================================================

/// 쿼리 인자 및 결과 컬럼 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer (i64)
    Integer(i64),
    /// Float (f64)
    Float(f64),
    /// String
    String(String),
    /// Bytes
    Bytes(Vec<u8>),
    /// Date
    Date(NaiveDate),
    /// Time
    Time(NaiveTime),
    /// DateTime (타임존 없음)
    DateTime(NaiveDateTime),
}

impl Value {
    /// Null 여부
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean으로 변환
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer로 변환
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Float로 변환
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// String으로 변환
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Bytes로 변환
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// SQL 타입 이름 (로그/에러 메시지용)
    pub fn sql_type(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(_) => "BOOLEAN",
            Value::Integer(_) => "BIGINT",
            Value::Float(_) => "DOUBLE",
            Value::String(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::DateTime(_) => "TIMESTAMP",
        }
    }
}

/// SQL 리터럴 형태로 출력
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(true) => f.write_str("TRUE"),
            Value::Boolean(false) => f.write_str("FALSE"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Bytes(bytes) => {
                f.write_str("X'")?;
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                f.write_str("'")
            }
            Value::Date(d) => write!(f, "DATE '{}'", d),
            Value::Time(t) => write!(f, "TIME '{}'", t),
            Value::DateTime(dt) => write!(f, "TIMESTAMP '{}'", dt),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )+
    };
}

impl_from_for_value! {
    bool => Boolean,
    i64 => Integer,
    i32 => Integer,
    u32 => Integer,
    f64 => Float,
    f32 => Float,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// NamedValue - 위치/이름 정보가 붙은 인자
// ============================================================================

/// 위치(1부터 시작)와 선택적 이름을 가진 인자
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    /// 이름 (위치 인자면 None)
    pub name: Option<String>,
    /// 1부터 시작하는 위치
    pub ordinal: usize,
    /// 값
    pub value: Value,
}

impl NamedValue {
    /// 위치 인자 생성
    pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: None,
            ordinal,
            value: value.into(),
        }
    }

    /// 이름 있는 인자 생성
    pub fn named(name: impl Into<String>, ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            ordinal,
            value: value.into(),
        }
    }

    /// 이름 있는 인자인지 여부 (빈 이름은 위치 인자로 취급)
    pub fn is_named(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
    }

    /// 값 목록을 위치 인자 목록으로 변환
    pub fn from_values<I, V>(values: I) -> Vec<NamedValue>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| NamedValue::positional(i + 1, v))
            .collect()
    }
}

// ============================================================================
// ExecResult - 실행 결과
// ============================================================================

/// 행을 반환하지 않는 실행의 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// 영향받은 행 수
    pub rows_affected: u64,
    /// 마지막 삽입 ID (드라이버가 지원하는 경우)
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    /// 새 결과 생성
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    /// 마지막 삽입 ID 설정
    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(42), Value::Integer(42));
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::from(Option::<i64>::None), Value::Null);
        assert_eq!(Value::Integer(3).as_float(), Some(3.0));
        assert_eq!(Value::from(vec![1u8, 2]).as_bytes(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn test_value_sql_literal() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::from(false).to_string(), "FALSE");
        assert_eq!(Value::from(1.0).to_string(), "1.0");
        assert_eq!(Value::from("it's").to_string(), "'it''s'");
        assert_eq!(Value::from(&[0x0au8, 0xff][..]).to_string(), "X'0AFF'");

        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::from(date).to_string(), "DATE '2024-02-29'");
        assert_eq!(Value::from(date).sql_type(), "DATE");
    }

    #[test]
    fn test_value_untagged_json() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 7, 1.5, "s"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Boolean(true),
                Value::Integer(7),
                Value::Float(1.5),
                Value::String("s".to_string()),
            ]
        );
    }

    #[test]
    fn test_named_value() {
        let positional = NamedValue::positional(1, 10);
        assert!(!positional.is_named());

        let named = NamedValue::named("id", 1, 10);
        assert!(named.is_named());

        let empty_name = NamedValue {
            name: Some(String::new()),
            ordinal: 1,
            value: Value::Null,
        };
        assert!(!empty_name.is_named());

        let args = NamedValue::from_values(["a", "b"]);
        assert_eq!(args[0].ordinal, 1);
        assert_eq!(args[1].ordinal, 2);
        assert_eq!(args[1].value, Value::from("b"));
    }
}
