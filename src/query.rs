//! 查询编排：收集条件与修饰，终结方法负责校验、编译、执行与物化。

use crate::aggregate::{Aggregation, Having};
use crate::compiler::{
    Direction, OrderSpec, QueryShape, SelectAggregation, SelectList, SelectShape, compile,
};
use crate::condition::{Condition, Node, WhereNode, into_nodes};
use crate::db::{Db, Executor};
use crate::error::{Error, Result};
use crate::field::FieldRef;
use crate::join_graph::JoinGraph;
use crate::materialize::{attach_many, materialize, owner_keys};
use crate::model::{Model, ModelMeta};
use crate::modifiers::Arg;
use crate::operand::Operand;
use crate::operator::Operator;
use crate::row::{Record, Row};
use crate::validator::validate;
use std::marker::PhantomData;

pub struct Query<'db, M, E> {
    db: &'db Db<E>,
    conditions: Vec<Node>,
    orders: Vec<OrderSpec>,
    limit: Option<u64>,
    offset: Option<u64>,
    unscoped: bool,
    _model: PhantomData<fn() -> M>,
}

impl<'db, M: Model, E: Executor> Query<'db, M, E> {
    pub fn new(db: &'db Db<E>, conditions: Vec<Condition<M>>) -> Self {
        Self {
            db,
            conditions: into_nodes(conditions),
            orders: Vec::new(),
            limit: None,
            offset: None,
            unscoped: false,
            _model: PhantomData,
        }
    }

    /// 负数取消限制。
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = u64::try_from(limit).ok();
        self
    }

    /// 负数取消偏移。
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = u64::try_from(offset).ok();
        self
    }

    /// 可以是任意已连接模型的字段。
    pub fn ascending(mut self, field: impl Into<FieldRef>) -> Self {
        self.orders.push(OrderSpec {
            field: field.into(),
            direction: Direction::Ascending,
        });
        self
    }

    pub fn descending(mut self, field: impl Into<FieldRef>) -> Self {
        self.orders.push(OrderSpec {
            field: field.into(),
            direction: Direction::Descending,
        });
        self
    }

    /// 不过滤软删除的行。
    pub fn unscoped(mut self) -> Self {
        self.unscoped = true;
        self
    }

    fn shape(&self, list: SelectList) -> SelectShape {
        SelectShape {
            list,
            orders: self.orders.clone(),
            limit: self.limit,
            offset: self.offset,
            unscoped: self.unscoped,
        }
    }

    /// 物化后的记录（关联已按预加载填充）。
    pub fn find_records(self) -> Result<Vec<Record>> {
        let shape = self.shape(SelectList::Entities);
        load_records(self.db, M::meta(), &self.conditions, &shape)
    }

    pub fn find(self) -> Result<Vec<M>> {
        self.find_records()?.iter().map(M::from_record).collect()
    }

    /// 恰好一条：零条为 `ObjectNotFound`，多于一条为 `MoreThanOneObjectFound`。
    pub fn find_one(self) -> Result<M> {
        let mut found = self.find()?;
        match found.len() {
            0 => Err(Error::ObjectNotFound),
            1 => Ok(found.remove(0)),
            _ => Err(Error::MoreThanOneObjectFound),
        }
    }

    fn single(self) -> Result<M> {
        self.limit(1).find()?.into_iter().next().ok_or(Error::ObjectNotFound)
    }

    /// 按主键升序的第一条。
    pub fn first(self) -> Result<M> {
        let pk = primary_key::<M>();
        self.ascending(pk).single()
    }

    /// 按主键降序的第一条。
    pub fn last(self) -> Result<M> {
        let pk = primary_key::<M>();
        self.descending(pk).single()
    }

    /// 不指定顺序的任意一条。
    pub fn take(self) -> Result<M> {
        self.single()
    }

    pub fn count(self) -> Result<u64> {
        let shape = SelectShape {
            orders: Vec::new(),
            limit: None,
            offset: None,
            ..self.shape(SelectList::Count)
        };
        let graph = validate(M::meta(), &self.conditions)?;
        let stmt = compile(&graph, &QueryShape::Select(shape), self.db.flavor())?;
        let rows = self.db.fetch(&stmt)?;
        let value = rows
            .first()
            .and_then(|row| row.values().first())
            .ok_or_else(|| Error::decode("COUNT(*)", "no row returned"))?;
        crate::value::FromSqlValue::from_sql_value(value).map_err(|message| Error::decode("COUNT(*)", message))
    }

    /// 分组查询；只能在这之后使用聚合。
    pub fn group_by(self, fields: Vec<FieldRef>) -> GroupedQuery<'db, M, E> {
        GroupedQuery {
            query: self,
            group_by: fields,
            selects: Vec::new(),
            having: Vec::new(),
        }
    }
}

fn primary_key<M: Model>() -> FieldRef {
    let meta = M::meta();
    FieldRef::new(meta, meta.primary_key)
}

pub struct GroupedQuery<'db, M, E> {
    query: Query<'db, M, E>,
    group_by: Vec<FieldRef>,
    selects: Vec<SelectAggregation>,
    having: Vec<Having>,
}

impl<'db, M: Model, E: Executor> GroupedQuery<'db, M, E> {
    /// `aggregation AS alias`
    pub fn select(mut self, aggregation: Aggregation, alias: impl Into<String>) -> Self {
        self.selects.push(SelectAggregation {
            aggregation,
            alias: alias.into(),
        });
        self
    }

    pub fn having(mut self, having: Having) -> Self {
        self.having.push(having);
        self
    }

    pub fn ascending(mut self, field: impl Into<FieldRef>) -> Self {
        self.query = self.query.ascending(field);
        self
    }

    pub fn descending(mut self, field: impl Into<FieldRef>) -> Self {
        self.query = self.query.descending(field);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.query = self.query.offset(offset);
        self
    }

    /// 每组一行：分组列在前，随后是各聚合别名。
    pub fn find_rows(self) -> Result<Vec<Row>> {
        let shape = self.query.shape(SelectList::Grouped {
            group_by: self.group_by,
            selects: self.selects,
            having: self.having,
        });
        let graph = validate(M::meta(), &self.query.conditions)?;
        let stmt = compile(&graph, &QueryShape::Select(shape), self.query.db.flavor())?;
        self.query.db.fetch(&stmt)
    }
}

/// 校验、编译、执行一次 SELECT，并递归加载集合预加载。
pub(crate) fn load_records<E: Executor>(
    db: &Db<E>,
    root: &'static ModelMeta,
    conditions: &[Node],
    shape: &SelectShape,
) -> Result<Vec<Record>> {
    let graph = validate(root, conditions)?;
    let stmt = compile(&graph, &QueryShape::Select(shape.clone()), db.flavor())?;
    let rows = db.fetch(&stmt)?;
    let mut records = materialize(&graph, &rows)?;
    load_collections(db, &graph, &mut records, shape.unscoped)?;
    Ok(records)
}

/// 每个集合预加载一条后续查询：`WHERE child.fk IN (拥有者的键)`。
pub(crate) fn load_collections<E: Executor>(
    db: &Db<E>,
    graph: &JoinGraph,
    records: &mut [Record],
    unscoped: bool,
) -> Result<()> {
    for preload in graph.collection_preloads() {
        let path = graph.relation_path(preload.owner);
        let relation = preload.relation;
        let keys = owner_keys(records, &path, relation.local_column);

        let children = if keys.is_empty() {
            Vec::new()
        } else {
            let target = relation.target();
            let mut conditions = preload.conditions.clone();
            conditions.push(Node::Where(WhereNode {
                field: FieldRef::new(target, relation.foreign_column),
                operator: Operator::In,
                operands: vec![Operand::List(keys.into_iter().map(Arg::Value).collect())],
            }));
            let shape = SelectShape {
                unscoped,
                ..SelectShape::entities()
            };
            load_records(db, target, &conditions, &shape)?
        };
        attach_many(
            records,
            &path,
            relation.name,
            relation.local_column,
            relation.foreign_column,
            children,
        );
    }
    Ok(())
}
