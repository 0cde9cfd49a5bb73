//! halo-cql：带类型的关系查询构建与编译引擎。
//!
//! 条件树 → 连接图校验 → 方言 SQL → 执行 → 物化（含预加载）。

pub mod aggregate;
pub mod args;
pub mod compiler;
pub mod cond;
pub mod condition;
pub mod crud;
pub mod db;
pub mod delete;
pub mod error;
pub mod field;
pub mod flavor;
pub mod insert;
pub mod join_graph;
pub mod macros;
mod materialize;
pub mod model;
pub mod modifiers;
pub mod operand;
pub mod operator;
pub mod query;
#[cfg(test)]
mod query_tests;
pub mod related;
pub mod row;
pub mod select;
#[cfg(test)]
mod select_tests;
mod string_builder;
#[cfg(test)]
mod test_support;
pub mod update;
pub mod validator;
pub mod value;
pub mod valuer;
mod where_clause;

pub use crate::aggregate::{AggregateFn, Aggregation, FieldAggregation, Having, count_all};
pub use crate::args::Args;
pub use crate::compiler::{
    ConflictAction, ConflictTarget, DeleteShape, Direction, InsertShape, OnConflict, OrderSpec,
    QueryShape, SelectAggregation, SelectList, SelectShape, Statement, UpdateShape, compile,
};
pub use crate::cond::{DynamicFieldIs, FieldIs, LikeCondition, UnsafeFieldIs};
pub use crate::condition::{
    CollectionKind, Condition, FieldSet, HasMany, JoinCondition, Node, Relation, Set, SetSpec,
    WhereCondition, always_true, and, not, or, preload_fields, unsafe_condition, xor,
};
pub use crate::crud::{
    Delete, DeleteReturning, Insert, InsertOnConflict, InsertOnConflictUpdate, InsertReturning,
    Update, UpdateReturning,
};
pub use crate::db::{Config, Db, Executor};
pub use crate::error::{DriverError, Error, Result};
pub use crate::field::{Field, FieldRef, FieldType, family};
pub use crate::flavor::{Capabilities, Flavor};
pub use crate::join_graph::JoinGraph;
pub use crate::model::{ColumnMeta, Model, ModelMeta, ModelType, RelationKind, RelationMeta, SqlType};
pub use crate::modifiers::{Arg, list, valuer};
pub use crate::operand::Operand;
pub use crate::operator::{Arity, Function, Operator};
pub use crate::query::{GroupedQuery, Query};
pub use crate::related::{Related, RelatedMany};
pub use crate::row::{Loaded, Record, Row};
pub use crate::validator::validate;
pub use crate::value::{FromSqlValue, SqlValue};
pub use crate::valuer::{SqlValuer, ValuerError};
