//! 比较构造器：`field.is().eq(v)`、`field.is_dynamic().eq(other)`、`field.is_unsafe().eq(raw)`。

use crate::condition::{Condition, Node, WhereCondition, WhereNode};
use crate::field::{Field, FieldRef, FieldType};
use crate::model::Model;
use crate::modifiers::Arg;
use crate::operand::Operand;
use crate::operator::Operator;
use std::marker::PhantomData;

fn where_node<M>(field: FieldRef, operator: Operator, operands: Vec<Operand>) -> WhereCondition<M> {
    WhereCondition::from_node(Node::Where(WhereNode {
        field,
        operator,
        operands,
    }))
}

fn value_arg<T: FieldType>(v: T) -> Arg {
    Arg::Value(v.into())
}

fn value_of<T: FieldType>(v: T) -> Operand {
    Operand::Literal(value_arg(v))
}

/// 与字面量比较。
pub struct FieldIs<M, T> {
    field: FieldRef,
    _marker: PhantomData<fn() -> (M, T)>,
}

impl<M: Model, T> FieldIs<M, T> {
    pub(crate) fn new(field: FieldRef) -> Self {
        Self {
            field,
            _marker: PhantomData,
        }
    }

    pub fn null(self) -> WhereCondition<M> {
        where_node(self.field, Operator::IsNull, Vec::new())
    }

    pub fn not_null(self) -> WhereCondition<M> {
        where_node(self.field, Operator::IsNotNull, Vec::new())
    }

    /// 任意运算符与操作数；方言专属运算符在编译时检查。
    pub fn custom(self, operator: Operator, operands: Vec<Operand>) -> WhereCondition<M> {
        where_node(self.field, operator, operands)
    }
}

impl<M: Model, T: FieldType> FieldIs<M, T> {
    fn one(self, operator: Operator, v: T) -> WhereCondition<M> {
        where_node(self.field, operator, vec![value_of(v)])
    }

    pub fn eq(self, v: impl Into<T>) -> WhereCondition<M> {
        self.one(Operator::Eq, v.into())
    }

    pub fn not_eq(self, v: impl Into<T>) -> WhereCondition<M> {
        self.one(Operator::NotEq, v.into())
    }

    pub fn lt(self, v: impl Into<T>) -> WhereCondition<M> {
        self.one(Operator::Lt, v.into())
    }

    pub fn lt_or_eq(self, v: impl Into<T>) -> WhereCondition<M> {
        self.one(Operator::LtOrEq, v.into())
    }

    pub fn gt(self, v: impl Into<T>) -> WhereCondition<M> {
        self.one(Operator::Gt, v.into())
    }

    pub fn gt_or_eq(self, v: impl Into<T>) -> WhereCondition<M> {
        self.one(Operator::GtOrEq, v.into())
    }

    pub fn between(self, low: impl Into<T>, high: impl Into<T>) -> WhereCondition<M> {
        let operands = vec![value_of(low.into()), value_of(high.into())];
        where_node(self.field, Operator::Between, operands)
    }

    pub fn not_between(self, low: impl Into<T>, high: impl Into<T>) -> WhereCondition<M> {
        let operands = vec![value_of(low.into()), value_of(high.into())];
        where_node(self.field, Operator::NotBetween, operands)
    }

    pub fn distinct(self, v: impl Into<T>) -> WhereCondition<M> {
        self.one(Operator::IsDistinct, v.into())
    }

    pub fn not_distinct(self, v: impl Into<T>) -> WhereCondition<M> {
        self.one(Operator::IsNotDistinct, v.into())
    }

    pub fn in_<V: Into<T>>(self, values: impl IntoIterator<Item = V>) -> WhereCondition<M> {
        let list = values
            .into_iter()
            .map(|v| value_arg::<T>(v.into()))
            .collect();
        where_node(self.field, Operator::In, vec![Operand::List(list)])
    }

    pub fn not_in<V: Into<T>>(self, values: impl IntoIterator<Item = V>) -> WhereCondition<M> {
        let list = values
            .into_iter()
            .map(|v| value_arg::<T>(v.into()))
            .collect();
        where_node(self.field, Operator::NotIn, vec![Operand::List(list)])
    }
}

impl<M: Model> FieldIs<M, bool> {
    pub fn true_(self) -> WhereCondition<M> {
        self.one(Operator::Eq, true)
    }

    pub fn not_true(self) -> WhereCondition<M> {
        self.one(Operator::IsDistinct, true)
    }

    pub fn false_(self) -> WhereCondition<M> {
        self.one(Operator::Eq, false)
    }

    pub fn not_false(self) -> WhereCondition<M> {
        self.one(Operator::IsDistinct, false)
    }

    pub fn unknown(self) -> WhereCondition<M> {
        self.null()
    }

    pub fn not_unknown(self) -> WhereCondition<M> {
        self.not_null()
    }
}

impl<M: Model> FieldIs<M, String> {
    pub fn like(self, pattern: impl Into<String>) -> LikeCondition<M> {
        LikeCondition::new(self.field, Operator::Like, pattern.into())
    }

    pub fn not_like(self, pattern: impl Into<String>) -> LikeCondition<M> {
        LikeCondition::new(self.field, Operator::NotLike, pattern.into())
    }

    /// PostgreSQL
    pub fn ilike(self, pattern: impl Into<String>) -> WhereCondition<M> {
        self.one(Operator::ILike, pattern.into())
    }

    /// PostgreSQL
    pub fn similar_to(self, pattern: impl Into<String>) -> WhereCondition<M> {
        self.one(Operator::SimilarTo, pattern.into())
    }

    /// PostgreSQL `~`
    pub fn posix_match(self, pattern: impl Into<String>) -> WhereCondition<M> {
        self.one(Operator::PosixMatch, pattern.into())
    }

    /// PostgreSQL `~*`
    pub fn posix_imatch(self, pattern: impl Into<String>) -> WhereCondition<M> {
        self.one(Operator::PosixIMatch, pattern.into())
    }

    /// SQLite
    pub fn glob(self, pattern: impl Into<String>) -> WhereCondition<M> {
        self.one(Operator::Glob, pattern.into())
    }

    /// MySQL
    pub fn regexp(self, pattern: impl Into<String>) -> WhereCondition<M> {
        self.one(Operator::Regexp, pattern.into())
    }
}

/// LIKE 条件，可再指定 ESCAPE 字符。
pub struct LikeCondition<M> {
    node: WhereNode,
    _model: PhantomData<fn() -> M>,
}

impl<M> LikeCondition<M> {
    fn new(field: FieldRef, operator: Operator, pattern: String) -> Self {
        Self {
            node: WhereNode {
                field,
                operator,
                operands: vec![value_of(pattern)],
            },
            _model: PhantomData,
        }
    }

    pub fn escape(mut self, escape: char) -> WhereCondition<M> {
        self.node.operands.push(value_of(escape.to_string()));
        WhereCondition::from_node(Node::Where(self.node))
    }
}

impl<M> From<LikeCondition<M>> for WhereCondition<M> {
    fn from(v: LikeCondition<M>) -> Self {
        WhereCondition::from_node(Node::Where(v.node))
    }
}

impl<M> From<LikeCondition<M>> for Condition<M> {
    fn from(v: LikeCondition<M>) -> Self {
        WhereCondition::from(v).into()
    }
}

/// 与另一个字段比较；两边类型须属于同一类型族。
pub struct DynamicFieldIs<M, T> {
    field: FieldRef,
    _marker: PhantomData<fn() -> (M, T)>,
}

impl<M, T> DynamicFieldIs<M, T> {
    pub(crate) fn new(field: FieldRef) -> Self {
        Self {
            field,
            _marker: PhantomData,
        }
    }
}

impl<M: Model, T: FieldType> DynamicFieldIs<M, T> {
    fn one<N: Model, U>(self, operator: Operator, other: &Field<N, U>) -> WhereCondition<M> {
        where_node(self.field, operator, vec![Operand::dynamic(other)])
    }

    pub fn eq<N: Model, U: FieldType<Family = T::Family>>(self, other: &Field<N, U>) -> WhereCondition<M> {
        self.one(Operator::Eq, other)
    }

    pub fn not_eq<N: Model, U: FieldType<Family = T::Family>>(self, other: &Field<N, U>) -> WhereCondition<M> {
        self.one(Operator::NotEq, other)
    }

    pub fn lt<N: Model, U: FieldType<Family = T::Family>>(self, other: &Field<N, U>) -> WhereCondition<M> {
        self.one(Operator::Lt, other)
    }

    pub fn lt_or_eq<N: Model, U: FieldType<Family = T::Family>>(self, other: &Field<N, U>) -> WhereCondition<M> {
        self.one(Operator::LtOrEq, other)
    }

    pub fn gt<N: Model, U: FieldType<Family = T::Family>>(self, other: &Field<N, U>) -> WhereCondition<M> {
        self.one(Operator::Gt, other)
    }

    pub fn gt_or_eq<N: Model, U: FieldType<Family = T::Family>>(self, other: &Field<N, U>) -> WhereCondition<M> {
        self.one(Operator::GtOrEq, other)
    }

    pub fn distinct<N: Model, U: FieldType<Family = T::Family>>(self, other: &Field<N, U>) -> WhereCondition<M> {
        self.one(Operator::IsDistinct, other)
    }

    pub fn not_distinct<N: Model, U: FieldType<Family = T::Family>>(
        self,
        other: &Field<N, U>,
    ) -> WhereCondition<M> {
        self.one(Operator::IsNotDistinct, other)
    }

    pub fn between<N1: Model, U1, N2: Model, U2>(
        self,
        low: &Field<N1, U1>,
        high: &Field<N2, U2>,
    ) -> WhereCondition<M>
    where
        U1: FieldType<Family = T::Family>,
        U2: FieldType<Family = T::Family>,
    {
        let operands = vec![Operand::dynamic(low), Operand::dynamic(high)];
        where_node(self.field, Operator::Between, operands)
    }
}

impl<M: Model> DynamicFieldIs<M, String> {
    pub fn like<N: Model>(self, other: &Field<N, String>) -> WhereCondition<M> {
        self.one(Operator::Like, other)
    }
}

/// 不做类型检查的比较：操作数可以是任意字面量、任意字段或原始 SQL。
pub struct UnsafeFieldIs<M> {
    field: FieldRef,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> UnsafeFieldIs<M> {
    pub(crate) fn new(field: FieldRef) -> Self {
        Self {
            field,
            _model: PhantomData,
        }
    }

    pub fn eq(self, v: impl Into<Operand>) -> WhereCondition<M> {
        where_node(self.field, Operator::Eq, vec![v.into()])
    }

    pub fn not_eq(self, v: impl Into<Operand>) -> WhereCondition<M> {
        where_node(self.field, Operator::NotEq, vec![v.into()])
    }

    pub fn lt(self, v: impl Into<Operand>) -> WhereCondition<M> {
        where_node(self.field, Operator::Lt, vec![v.into()])
    }

    pub fn lt_or_eq(self, v: impl Into<Operand>) -> WhereCondition<M> {
        where_node(self.field, Operator::LtOrEq, vec![v.into()])
    }

    pub fn gt(self, v: impl Into<Operand>) -> WhereCondition<M> {
        where_node(self.field, Operator::Gt, vec![v.into()])
    }

    pub fn gt_or_eq(self, v: impl Into<Operand>) -> WhereCondition<M> {
        where_node(self.field, Operator::GtOrEq, vec![v.into()])
    }

    pub fn between(self, low: impl Into<Operand>, high: impl Into<Operand>) -> WhereCondition<M> {
        where_node(self.field, Operator::Between, vec![low.into(), high.into()])
    }
}
