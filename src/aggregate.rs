//! 聚合：只能通过分组查询（`Query::group_by`）使用。

use crate::error::{Error, Result};
use crate::field::{FieldRef, FieldType, family};
use crate::flavor::Flavor;
use crate::modifiers::Arg;
use crate::operator::Operator;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    CountAll,
    Min,
    Max,
    Sum,
    Average,
    BitAnd,
    BitOr,
    All,
    Any,
    None,
}

impl AggregateFn {
    pub fn name(self) -> &'static str {
        match self {
            Self::Count => "Count",
            Self::CountAll => "CountAll",
            Self::Min => "Min",
            Self::Max => "Max",
            Self::Sum => "Sum",
            Self::Average => "Average",
            Self::BitAnd => "And",
            Self::BitOr => "Or",
            Self::All => "All",
            Self::Any => "Any",
            Self::None => "None",
        }
    }

    pub(crate) fn render(self, flavor: Flavor, inner: &str) -> Result<String> {
        let bool_int = |f: &str| match flavor {
            Flavor::SQLServer => format!("{f}(CAST({inner} AS INT))"),
            _ => format!("{f}({inner})"),
        };
        let sql = match self {
            Self::Count => format!("COUNT({inner})"),
            Self::CountAll => "COUNT(*)".to_owned(),
            Self::Min => format!("MIN({inner})"),
            Self::Max => format!("MAX({inner})"),
            Self::Sum => format!("SUM({inner})"),
            Self::Average => format!("AVG({inner})"),
            Self::BitAnd | Self::BitOr if !flavor.capabilities().bit_aggregates => {
                return Err(Error::unsupported(flavor, self.name()));
            }
            Self::BitAnd => format!("BIT_AND({inner})"),
            Self::BitOr => format!("BIT_OR({inner})"),
            Self::All if flavor == Flavor::PostgreSQL => format!("BOOL_AND({inner})"),
            Self::All => bool_int("MIN"),
            Self::Any if flavor == Flavor::PostgreSQL => format!("BOOL_OR({inner})"),
            Self::Any => bool_int("MAX"),
            Self::None if flavor == Flavor::PostgreSQL => format!("NOT BOOL_OR({inner})"),
            Self::None if flavor == Flavor::SQLServer => format!("1 - {}", bool_int("MAX")),
            Self::None => format!("NOT {}", bool_int("MAX")),
        };
        Ok(sql)
    }
}

/// 一个聚合表达式。
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub function: AggregateFn,
    pub field: Option<FieldRef>,
}

impl Aggregation {
    fn having(self, operator: Operator, value: impl Into<Arg>) -> Having {
        Having {
            aggregation: self,
            operator,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<Arg>) -> Having {
        self.having(Operator::Eq, value)
    }

    pub fn not_eq(self, value: impl Into<Arg>) -> Having {
        self.having(Operator::NotEq, value)
    }

    pub fn lt(self, value: impl Into<Arg>) -> Having {
        self.having(Operator::Lt, value)
    }

    pub fn lt_or_eq(self, value: impl Into<Arg>) -> Having {
        self.having(Operator::LtOrEq, value)
    }

    pub fn gt(self, value: impl Into<Arg>) -> Having {
        self.having(Operator::Gt, value)
    }

    pub fn gt_or_eq(self, value: impl Into<Arg>) -> Having {
        self.having(Operator::GtOrEq, value)
    }
}

/// `HAVING aggregation <op> value`
#[derive(Debug, Clone)]
pub struct Having {
    pub aggregation: Aggregation,
    pub operator: Operator,
    pub value: Arg,
}

/// `COUNT(*)`
pub fn count_all() -> Aggregation {
    Aggregation {
        function: AggregateFn::CountAll,
        field: None,
    }
}

pub struct FieldAggregation<T> {
    field: FieldRef,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FieldAggregation<T> {
    pub(crate) fn new(field: FieldRef) -> Self {
        Self {
            field,
            _marker: PhantomData,
        }
    }

    fn of(self, function: AggregateFn) -> Aggregation {
        Aggregation {
            function,
            field: Some(self.field),
        }
    }

    /// 非 NULL 值的个数。
    pub fn count(self) -> Aggregation {
        self.of(AggregateFn::Count)
    }

    pub fn min(self) -> Aggregation {
        self.of(AggregateFn::Min)
    }

    pub fn max(self) -> Aggregation {
        self.of(AggregateFn::Max)
    }
}

impl<T: FieldType<Family = family::Numeric>> FieldAggregation<T> {
    pub fn sum(self) -> Aggregation {
        self.of(AggregateFn::Sum)
    }

    pub fn average(self) -> Aggregation {
        self.of(AggregateFn::Average)
    }

    /// 按位与；SQLite 与 SQLServer 不支持。
    pub fn and(self) -> Aggregation {
        self.of(AggregateFn::BitAnd)
    }

    /// 按位或；SQLite 与 SQLServer 不支持。
    pub fn or(self) -> Aggregation {
        self.of(AggregateFn::BitOr)
    }
}

impl FieldAggregation<bool> {
    pub fn all(self) -> Aggregation {
        self.of(AggregateFn::All)
    }

    pub fn any(self) -> Aggregation {
        self.of(AggregateFn::Any)
    }

    pub fn none(self) -> Aggregation {
        self.of(AggregateFn::None)
    }
}
