//! SQL 值：既是绑定参数，也是驱动返回的列值。

use std::borrow::Cow;
use time::OffsetDateTime;

/// SQL 参数值 / 列值。
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(Cow<'static, str>),
    Bytes(Vec<u8>),
    DateTime(OffsetDateTime),
}

impl SqlValue {
    /// 将 `Option<T>` 映射为 `SqlValue`：`None => Null`，`Some(v) => v.into()`。
    pub fn from_option<T: Into<SqlValue>>(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// 用于按主键/外键分组的稳定键；整数类统一比较。
    pub(crate) fn group_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(v) => Some(format!("b:{v}")),
            Self::I64(v) => Some(format!("i:{v}")),
            Self::U64(v) => Some(format!("i:{v}")),
            Self::F64(v) => Some(format!("f:{v}")),
            Self::String(v) => Some(format!("s:{v}")),
            Self::Bytes(v) => Some(format!("x:{v:?}")),
            Self::DateTime(v) => Some(format!("t:{}", v.unix_timestamp_nanos())),
        }
    }
}

impl From<()> for SqlValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self {
                Self::I64(v as i64)
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self {
                Self::U64(v as u64)
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64);
from_unsigned!(u8, u16, u32, u64);

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::F64(v as f64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::String(Cow::Owned(v))
    }
}

impl From<&'static str> for SqlValue {
    fn from(v: &'static str) -> Self {
        Self::String(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<OffsetDateTime> for SqlValue {
    fn from(v: OffsetDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        Self::from_option(v)
    }
}

/// 从列值解码为 Rust 类型；驱动之间的整数/布尔表示差异在这里抹平。
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String>;
}

fn mismatch(expected: &str, got: &SqlValue) -> String {
    format!("expected {expected}, got {got:?}")
}

macro_rules! from_sql_int {
    ($($t:ty),*) => {
        $(impl FromSqlValue for $t {
            fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
                match value {
                    SqlValue::I64(v) => <$t>::try_from(*v).map_err(|e| e.to_string()),
                    SqlValue::U64(v) => <$t>::try_from(*v).map_err(|e| e.to_string()),
                    SqlValue::Bool(v) => Ok(<$t>::from(*v)),
                    other => Err(mismatch(stringify!($t), other)),
                }
            }
        })*
    };
}

from_sql_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromSqlValue for f64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::F64(v) => Ok(*v),
            SqlValue::I64(v) => Ok(*v as f64),
            SqlValue::U64(v) => Ok(*v as f64),
            other => Err(mismatch("f64", other)),
        }
    }
}

impl FromSqlValue for f32 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        f64::from_sql_value(value).map(|v| v as f32)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            SqlValue::I64(v) => Ok(*v != 0),
            SqlValue::U64(v) => Ok(*v != 0),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::String(v) => Ok(v.to_string()),
            SqlValue::Bytes(v) => String::from_utf8(v.clone()).map_err(|e| e.to_string()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Bytes(v) => Ok(v.clone()),
            SqlValue::String(v) => Ok(v.as_bytes().to_vec()),
            other => Err(mismatch("bytes", other)),
        }
    }
}

impl FromSqlValue for OffsetDateTime {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::DateTime(v) => Ok(*v),
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Null => Ok(None),
            v => T::from_sql_value(v).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FromSqlValue, SqlValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn from_option_some() {
        assert_eq!(SqlValue::from_option(Some(123_i64)), SqlValue::I64(123));
    }

    #[test]
    fn from_option_none() {
        assert_eq!(SqlValue::from_option::<i64>(None), SqlValue::Null);
    }

    #[test]
    fn from_string_borrowed() {
        let v: SqlValue = "abc".into();
        assert_eq!(v, SqlValue::String("abc".into()));
    }

    #[test]
    fn decode_integers_across_representations() {
        assert_eq!(i64::from_sql_value(&SqlValue::U64(7)), Ok(7));
        assert_eq!(i32::from_sql_value(&SqlValue::I64(-3)), Ok(-3));
        assert!(u8::from_sql_value(&SqlValue::I64(300)).is_err());
    }

    #[test]
    fn decode_bool_from_integer() {
        assert_eq!(bool::from_sql_value(&SqlValue::I64(1)), Ok(true));
        assert_eq!(bool::from_sql_value(&SqlValue::Bool(false)), Ok(false));
    }

    #[test]
    fn decode_option_null() {
        assert_eq!(Option::<String>::from_sql_value(&SqlValue::Null), Ok(None));
        assert_eq!(
            Option::<String>::from_sql_value(&SqlValue::from("x")),
            Ok(Some("x".to_string()))
        );
    }

    #[test]
    fn group_key_unifies_integers() {
        assert_eq!(SqlValue::I64(5).group_key(), SqlValue::U64(5).group_key());
        assert_eq!(SqlValue::Null.group_key(), None);
    }
}
