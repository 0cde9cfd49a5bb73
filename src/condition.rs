//! 条件树：调用方在校验之前构建的可组合谓词。
//!
//! `Condition<M>` / `WhereCondition<M>` 以所属模型为类型参数：
//! 某个关联模型上的过滤条件只能放在该关联的 `join` 列表里。
//! 跨模型的字段引用（动态操作数、排序、分组、赋值）在运行时由校验器检查。

use crate::error::Error;
use crate::field::{FieldRef, FieldType};
use crate::model::{Model, ModelMeta, ModelType, RelationMeta};
use crate::modifiers::Arg;
use crate::operand::Operand;
use crate::operator::Operator;
use std::marker::PhantomData;

#[derive(Debug, Clone)]
pub struct WhereNode {
    pub field: FieldRef,
    pub operator: Operator,
    pub operands: Vec<Operand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    And,
    Or,
    Not,
    /// 仅 MySQL。
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Any,
    None,
    All,
}

impl CollectionKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::None => "None",
            Self::All => "All",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub relation: &'static RelationMeta,
    pub conditions: Vec<Node>,
    pub preload: bool,
}

#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub owner: &'static ModelMeta,
    pub relation: &'static RelationMeta,
    pub kind: CollectionKind,
    pub conditions: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct CollectionPreloadSpec {
    pub owner: &'static ModelMeta,
    pub relation: &'static RelationMeta,
    pub conditions: Vec<Node>,
}

/// 构造阶段发现、延迟到校验阶段报告的问题。
#[derive(Debug, Clone)]
pub enum Invalid {
    UnknownRelation {
        model: ModelType,
        relation: &'static str,
    },
    InvalidRelation {
        model: ModelType,
        relation: &'static str,
        reason: &'static str,
    },
    EmptyConditions(&'static str),
}

impl From<Invalid> for Error {
    fn from(v: Invalid) -> Self {
        match v {
            Invalid::UnknownRelation { model, relation } => Error::UnknownRelation { model, relation },
            Invalid::InvalidRelation {
                model,
                relation,
                reason,
            } => Error::InvalidRelation {
                model,
                relation,
                reason,
            },
            Invalid::EmptyConditions(context) => Error::EmptyConditions { context },
        }
    }
}

/// 擦除类型后的条件节点。
#[derive(Debug, Clone)]
pub enum Node {
    Where(WhereNode),
    Connector(ConnectorKind, Vec<Node>),
    Join(JoinSpec),
    Collection(CollectionSpec),
    CollectionPreload(CollectionPreloadSpec),
    Preload(Vec<FieldRef>),
    Unsafe { template: String, args: Vec<Arg> },
    Invalid(Invalid),
}

impl Node {
    /// 是否产生过滤谓词（JOIN 的嵌套列表不计入，单独统计）。
    pub(crate) fn is_filter(&self) -> bool {
        matches!(
            self,
            Node::Where(_) | Node::Connector(..) | Node::Collection(_) | Node::Unsafe { .. }
        )
    }

    /// 本层过滤条件是否涉及 `model` 的软删除列。
    /// 涉及时不再自动追加 `deleted_at IS NULL`。
    pub(crate) fn affects_soft_delete(&self, model: &ModelMeta) -> bool {
        let Some(column) = model.soft_delete_column else {
            return false;
        };
        match self {
            Node::Where(node) => {
                node.field.model.model_type == model.model_type && node.field.column == column
            }
            Node::Connector(_, children) => children.iter().any(|c| c.affects_soft_delete(model)),
            _ => false,
        }
    }
}

macro_rules! typed_node {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name<M> {
            pub(crate) node: Node,
            _model: PhantomData<fn() -> M>,
        }

        impl<M> $name<M> {
            pub(crate) fn from_node(node: Node) -> Self {
                Self {
                    node,
                    _model: PhantomData,
                }
            }

            pub fn node(&self) -> &Node {
                &self.node
            }
        }

        impl<M> Clone for $name<M> {
            fn clone(&self) -> Self {
                Self::from_node(self.node.clone())
            }
        }

        impl<M> std::fmt::Debug for $name<M> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.node).finish()
            }
        }
    };
}

typed_node!(
    /// 模型 `M` 上的任意条件。
    Condition
);
typed_node!(
    /// 产生过滤谓词的条件，可以参与 AND/OR/NOT。
    WhereCondition
);
typed_node!(
    /// 连接一个关联模型，可选地预加载它。
    JoinCondition
);

impl<M> Condition<M> {
    pub(crate) fn into_node(self) -> Node {
        self.node
    }
}

impl<M> From<WhereCondition<M>> for Condition<M> {
    fn from(v: WhereCondition<M>) -> Self {
        Condition::from_node(v.node)
    }
}

impl<M> From<JoinCondition<M>> for Condition<M> {
    fn from(v: JoinCondition<M>) -> Self {
        Condition::from_node(v.node)
    }
}

impl<M> JoinCondition<M> {
    /// 物化结果时填充该关联。
    pub fn preload(mut self) -> Self {
        if let Node::Join(join) = &mut self.node {
            join.preload = true;
        }
        self
    }
}

pub(crate) fn into_nodes<M>(conditions: Vec<Condition<M>>) -> Vec<Node> {
    conditions.into_iter().map(Condition::into_node).collect()
}

fn connector<M>(kind: ConnectorKind, conditions: Vec<WhereCondition<M>>) -> WhereCondition<M> {
    WhereCondition::from_node(Node::Connector(
        kind,
        conditions.into_iter().map(|c| c.node).collect(),
    ))
}

pub fn and<M>(conditions: Vec<WhereCondition<M>>) -> WhereCondition<M> {
    connector(ConnectorKind::And, conditions)
}

pub fn or<M>(conditions: Vec<WhereCondition<M>>) -> WhereCondition<M> {
    connector(ConnectorKind::Or, conditions)
}

/// `NOT (c1 AND c2 ...)`；空列表在校验时报 `EmptyConditions`。
pub fn not<M>(conditions: Vec<WhereCondition<M>>) -> WhereCondition<M> {
    if conditions.is_empty() {
        return WhereCondition::from_node(Node::Invalid(Invalid::EmptyConditions("Not")));
    }
    connector(ConnectorKind::Not, conditions)
}

/// `(c1 XOR c2 ...)`，仅 MySQL 支持；空列表在校验时报 `EmptyConditions`。
pub fn xor<M>(conditions: Vec<WhereCondition<M>>) -> WhereCondition<M> {
    if conditions.is_empty() {
        return WhereCondition::from_node(Node::Invalid(Invalid::EmptyConditions("Xor")));
    }
    connector(ConnectorKind::Xor, conditions)
}

/// 恒真条件 `1 = 1`，用于对整张表执行 UPDATE / DELETE。
pub fn always_true<M: Model>() -> WhereCondition<M> {
    unsafe_condition("1 = 1", Vec::new())
}

/// 原始 SQL 条件：`%s` 替换为模型 `M` 的表别名，`?` 依次绑定 `args`。
pub fn unsafe_condition<M: Model>(template: impl Into<String>, args: Vec<Arg>) -> WhereCondition<M> {
    WhereCondition::from_node(Node::Unsafe {
        template: template.into(),
        args,
    })
}

/// 标记当前节点需要物化，`fields` 必须属于模型 `M`。
pub fn preload_fields<M: Model>(fields: Vec<FieldRef>) -> Condition<M> {
    Condition::from_node(Node::Preload(fields))
}

fn lookup_relation<M: Model, R: Model>(
    name: &'static str,
    collection: bool,
) -> Result<&'static RelationMeta, Invalid> {
    let owner = M::meta();
    let relation = owner.relation(name).ok_or(Invalid::UnknownRelation {
        model: owner.model_type,
        relation: name,
    })?;
    if relation.target().model_type != R::meta().model_type {
        return Err(Invalid::InvalidRelation {
            model: owner.model_type,
            relation: name,
            reason: "target model does not match",
        });
    }
    if relation.is_collection() != collection {
        return Err(Invalid::InvalidRelation {
            model: owner.model_type,
            relation: name,
            reason: if collection {
                "expected a has-many relation"
            } else {
                "has-many relations can only be used as collections"
            },
        });
    }
    Ok(relation)
}

/// 一对一关联（belongs-to / has-one）。
pub struct Relation<M, R> {
    name: &'static str,
    _marker: PhantomData<fn() -> (M, R)>,
}

impl<M: Model, R: Model> Relation<M, R> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn join(&self, conditions: Vec<Condition<R>>) -> JoinCondition<M> {
        let node = match lookup_relation::<M, R>(self.name, false) {
            Ok(relation) => Node::Join(JoinSpec {
                relation,
                conditions: conditions.into_iter().map(Condition::into_node).collect(),
                preload: false,
            }),
            Err(invalid) => Node::Invalid(invalid),
        };
        JoinCondition::from_node(node)
    }

    /// 连接并预加载，不附加任何条件。
    pub fn preload(&self) -> JoinCondition<M> {
        self.join(Vec::new()).preload()
    }
}

/// 一对多关联。
pub struct HasMany<M, R> {
    name: &'static str,
    _marker: PhantomData<fn() -> (M, R)>,
}

impl<M: Model, R: Model> HasMany<M, R> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn collection(&self, kind: CollectionKind, conditions: Vec<WhereCondition<R>>) -> WhereCondition<M> {
        if conditions.is_empty() {
            return WhereCondition::from_node(Node::Invalid(Invalid::EmptyConditions(kind.name())));
        }
        let node = match lookup_relation::<M, R>(self.name, true) {
            Ok(relation) => Node::Collection(CollectionSpec {
                owner: M::meta(),
                relation,
                kind,
                conditions: conditions.into_iter().map(|c| c.node).collect(),
            }),
            Err(invalid) => Node::Invalid(invalid),
        };
        WhereCondition::from_node(node)
    }

    /// 至少一个关联对象满足条件：`EXISTS (...)`。
    pub fn any(&self, conditions: Vec<WhereCondition<R>>) -> WhereCondition<M> {
        self.collection(CollectionKind::Any, conditions)
    }

    /// 没有关联对象满足条件：`NOT EXISTS (...)`。
    pub fn none(&self, conditions: Vec<WhereCondition<R>>) -> WhereCondition<M> {
        self.collection(CollectionKind::None, conditions)
    }

    /// 所有关联对象都满足条件：`NOT EXISTS (... NOT (...))`。
    pub fn all(&self, conditions: Vec<WhereCondition<R>>) -> WhereCondition<M> {
        self.collection(CollectionKind::All, conditions)
    }

    /// 预加载整个集合；`nested` 只能包含预加载。
    pub fn preload(&self, nested: Vec<Condition<R>>) -> Condition<M> {
        let node = match lookup_relation::<M, R>(self.name, true) {
            Ok(relation) => Node::CollectionPreload(CollectionPreloadSpec {
                owner: M::meta(),
                relation,
                conditions: nested.into_iter().map(Condition::into_node).collect(),
            }),
            Err(invalid) => Node::Invalid(invalid),
        };
        Condition::from_node(node)
    }
}

/// UPDATE 的赋值。
#[derive(Debug, Clone)]
pub struct SetSpec {
    pub field: FieldRef,
    pub value: Operand,
}

pub struct Set<M> {
    pub(crate) spec: SetSpec,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for Set<M> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            _model: PhantomData,
        }
    }
}

impl<M> std::fmt::Debug for Set<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Set").field(&self.spec).finish()
    }
}

impl<M> From<Set<M>> for SetSpec {
    fn from(v: Set<M>) -> Self {
        v.spec
    }
}

pub struct FieldSet<M, T> {
    field: FieldRef,
    _marker: PhantomData<fn() -> (M, T)>,
}

impl<M: Model, T> FieldSet<M, T> {
    pub(crate) fn new(field: FieldRef) -> Self {
        Self {
            field,
            _marker: PhantomData,
        }
    }

    fn to(self, value: Operand) -> Set<M> {
        Set {
            spec: SetSpec {
                field: self.field,
                value,
            },
            _model: PhantomData,
        }
    }

    pub fn null(self) -> Set<M> {
        self.to(Operand::literal(crate::value::SqlValue::Null))
    }

    /// 不做类型检查的赋值。
    pub fn unsafe_(self, value: impl Into<Operand>) -> Set<M> {
        self.to(value.into())
    }
}

impl<M: Model, T: FieldType> FieldSet<M, T> {
    pub fn eq(self, value: impl Into<T>) -> Set<M> {
        let value: T = value.into();
        self.to(Operand::Literal(Arg::Value(value.into())))
    }

    /// 赋值为另一个（同类型族的）字段。
    pub fn dynamic<N: Model, U: FieldType<Family = T::Family>>(
        self,
        other: &crate::field::Field<N, U>,
    ) -> Set<M> {
        self.to(Operand::dynamic(other))
    }
}
