//! INSERT / UPDATE / DELETE 编排。

use crate::compiler::{
    ConflictAction, ConflictTarget, DeleteShape, Direction, InsertShape, OnConflict, OrderSpec,
    QueryShape, Statement, UpdateShape, compile,
};
use crate::condition::{Condition, Node, Set, SetSpec, WhereCondition, into_nodes};
use crate::db::{Db, Executor};
use crate::error::Result;
use crate::field::FieldRef;
use crate::insert::check_insert_capabilities;
use crate::join_graph::JoinGraph;
use crate::materialize::materialize;
use crate::model::Model;
use crate::query::load_collections;
use crate::row::Record;
use crate::validator::validate;
use crate::value::SqlValue;
use std::marker::PhantomData;
use time::OffsetDateTime;

fn decode_all<M: Model>(records: Vec<Record>) -> Result<Vec<M>> {
    records.iter().map(M::from_record).collect()
}

pub struct Insert<'db, M, E> {
    db: &'db Db<E>,
    rows: Vec<Vec<SqlValue>>,
    on_conflict: Option<OnConflict>,
    _model: PhantomData<fn() -> M>,
}

impl<'db, M: Model, E: Executor> Insert<'db, M, E> {
    pub fn new(db: &'db Db<E>, models: &[M]) -> Self {
        Self {
            db,
            rows: models.iter().map(Model::values).collect(),
            on_conflict: None,
            _model: PhantomData,
        }
    }

    fn conflict(self, target: ConflictTarget) -> InsertOnConflict<'db, M, E> {
        InsertOnConflict {
            insert: self,
            target,
        }
    }

    /// 与任意唯一约束冲突。
    pub fn on_conflict(self) -> InsertOnConflict<'db, M, E> {
        self.conflict(ConflictTarget::Any)
    }

    /// PostgreSQL / SQLite
    pub fn on_conflict_on(self, fields: Vec<FieldRef>) -> InsertOnConflict<'db, M, E> {
        self.conflict(ConflictTarget::Columns(fields))
    }

    /// PostgreSQL
    pub fn on_constraint(self, name: impl Into<String>) -> InsertOnConflict<'db, M, E> {
        self.conflict(ConflictTarget::Constraint(name.into()))
    }

    pub fn returning(self) -> InsertReturning<'db, M, E> {
        InsertReturning { insert: self }
    }

    fn shape(&self, rows: Vec<Vec<SqlValue>>, returning: bool) -> InsertShape {
        InsertShape {
            rows,
            on_conflict: self.on_conflict.clone(),
            returning,
        }
    }

    /// 行集为空时也要先做方言检查。
    fn check(&self, returning: bool) -> Result<()> {
        check_insert_capabilities(self.db.flavor(), &self.shape(Vec::new(), returning))
    }

    fn statement(&self, rows: Vec<Vec<SqlValue>>, returning: bool) -> Result<Statement> {
        let graph = JoinGraph::build(M::meta(), &[])?;
        let shape = self.shape(rows, returning);
        compile(&graph, &QueryShape::Insert(shape), self.db.flavor())
    }

    /// 没有要插入的行时直接返回 0，不发出 SQL。
    pub fn exec(self) -> Result<u64> {
        self.check(false)?;
        if self.rows.is_empty() {
            return Ok(0);
        }
        let stmt = self.statement(self.rows.clone(), false)?;
        self.db.exec(&stmt)
    }

    /// 每 `batch_size` 行一条 INSERT，全部在同一个事务中顺序执行；任何一批失败都会整体回滚。
    pub fn exec_in_batches(self, batch_size: usize) -> Result<u64> {
        self.check(false)?;
        if self.rows.is_empty() {
            return Ok(0);
        }
        let batch_size = batch_size.max(1);
        let statements = self
            .rows
            .chunks(batch_size)
            .map(|chunk| self.statement(chunk.to_vec(), false))
            .collect::<Result<Vec<_>>>()?;
        self.db.transaction(|db| {
            let mut affected = 0;
            for stmt in &statements {
                affected += db.exec(stmt)?;
            }
            Ok(affected)
        })
    }
}

pub struct InsertOnConflict<'db, M, E> {
    insert: Insert<'db, M, E>,
    target: ConflictTarget,
}

impl<'db, M: Model, E: Executor> InsertOnConflict<'db, M, E> {
    fn action(mut self, action: ConflictAction) -> Insert<'db, M, E> {
        self.insert.on_conflict = Some(OnConflict {
            target: self.target,
            action,
            filter: Vec::new(),
        });
        self.insert
    }

    pub fn do_nothing(self) -> Insert<'db, M, E> {
        self.action(ConflictAction::DoNothing)
    }

    /// 用待插入行覆盖除主键外的所有列。
    pub fn update_all(self) -> InsertOnConflictUpdate<'db, M, E> {
        InsertOnConflictUpdate {
            insert: self.action(ConflictAction::UpdateAll),
        }
    }

    /// 用待插入行覆盖指定列。
    pub fn update(self, fields: Vec<FieldRef>) -> InsertOnConflictUpdate<'db, M, E> {
        InsertOnConflictUpdate {
            insert: self.action(ConflictAction::Update(fields)),
        }
    }

    pub fn set(self, sets: Vec<Set<M>>) -> InsertOnConflictUpdate<'db, M, E> {
        let sets = sets.into_iter().map(SetSpec::from).collect();
        InsertOnConflictUpdate {
            insert: self.action(ConflictAction::Set(sets)),
        }
    }
}

/// 冲突时更新；还可以用 `where_` 限定被更新的行。
pub struct InsertOnConflictUpdate<'db, M, E> {
    insert: Insert<'db, M, E>,
}

impl<'db, M: Model, E: Executor> InsertOnConflictUpdate<'db, M, E> {
    /// PostgreSQL / SQLite
    pub fn where_(mut self, conditions: Vec<WhereCondition<M>>) -> Insert<'db, M, E> {
        if let Some(conflict) = &mut self.insert.on_conflict {
            conflict.filter = conditions.into_iter().map(|c| c.node).collect();
        }
        self.insert
    }

    pub fn exec(self) -> Result<u64> {
        self.insert.exec()
    }

    pub fn exec_in_batches(self, batch_size: usize) -> Result<u64> {
        self.insert.exec_in_batches(batch_size)
    }

    pub fn returning(self) -> InsertReturning<'db, M, E> {
        self.insert.returning()
    }
}

impl<'db, M, E> From<InsertOnConflictUpdate<'db, M, E>> for Insert<'db, M, E> {
    fn from(v: InsertOnConflictUpdate<'db, M, E>) -> Self {
        v.insert
    }
}

pub struct InsertReturning<'db, M, E> {
    insert: Insert<'db, M, E>,
}

impl<M: Model, E: Executor> InsertReturning<'_, M, E> {
    /// 返回实际写入（或 upsert 更新）的行。
    pub fn exec(self) -> Result<Vec<M>> {
        self.insert.check(true)?;
        if self.insert.rows.is_empty() {
            return Ok(Vec::new());
        }
        let graph = JoinGraph::build(M::meta(), &[])?;
        let stmt = self.insert.statement(self.insert.rows.clone(), true)?;
        let rows = self.insert.db.fetch(&stmt)?;
        decode_all(materialize(&graph, &rows)?)
    }
}

/// UPDATE/DELETE 共有的修饰：排序与 LIMIT（仅 MySQL）。
#[derive(Debug, Clone, Default)]
struct Modifiers {
    orders: Vec<OrderSpec>,
    limit: Option<u64>,
    unscoped: bool,
    now: Option<OffsetDateTime>,
}

impl Modifiers {
    fn order(&mut self, field: FieldRef, direction: Direction) {
        self.orders.push(OrderSpec { field, direction });
    }

    fn now(&self) -> OffsetDateTime {
        self.now.unwrap_or_else(OffsetDateTime::now_utc)
    }
}

pub struct Update<'db, M, E> {
    db: &'db Db<E>,
    conditions: Vec<Node>,
    modifiers: Modifiers,
    _model: PhantomData<fn() -> M>,
}

impl<'db, M: Model, E: Executor> Update<'db, M, E> {
    pub fn new(db: &'db Db<E>, conditions: Vec<Condition<M>>) -> Self {
        Self {
            db,
            conditions: into_nodes(conditions),
            modifiers: Modifiers::default(),
            _model: PhantomData,
        }
    }

    /// MySQL
    pub fn ascending(mut self, field: impl Into<FieldRef>) -> Self {
        self.modifiers.order(field.into(), Direction::Ascending);
        self
    }

    /// MySQL
    pub fn descending(mut self, field: impl Into<FieldRef>) -> Self {
        self.modifiers.order(field.into(), Direction::Descending);
        self
    }

    /// MySQL，且必须先指定排序；负数取消限制。
    pub fn limit(mut self, limit: i64) -> Self {
        self.modifiers.limit = u64::try_from(limit).ok();
        self
    }

    pub fn unscoped(mut self) -> Self {
        self.modifiers.unscoped = true;
        self
    }

    /// `updated_at` 使用的时间，默认为当前 UTC 时间。
    pub fn at(mut self, now: OffsetDateTime) -> Self {
        self.modifiers.now = Some(now);
        self
    }

    pub fn returning(self) -> UpdateReturning<'db, M, E> {
        UpdateReturning { update: self }
    }

    fn prepare(&self, sets: Vec<SetSpec>, multiple: bool, returning: bool) -> Result<(JoinGraph, Statement)> {
        let graph = validate(M::meta(), &self.conditions)?;
        let shape = UpdateShape {
            sets,
            multiple,
            orders: self.modifiers.orders.clone(),
            limit: self.modifiers.limit,
            returning,
            now: self.modifiers.now(),
            unscoped: self.modifiers.unscoped,
        };
        let stmt = compile(&graph, &QueryShape::Update(shape), self.db.flavor())?;
        Ok((graph, stmt))
    }

    /// 执行更新并返回受影响的行数。
    pub fn set(self, sets: Vec<Set<M>>) -> Result<u64> {
        let sets = sets.into_iter().map(SetSpec::from).collect();
        let (_, stmt) = self.prepare(sets, false, false)?;
        self.db.exec(&stmt)
    }

    /// 同时写入多个已连接模型的列（MySQL）。
    pub fn set_multiple(self, sets: Vec<SetSpec>) -> Result<u64> {
        let (_, stmt) = self.prepare(sets, true, false)?;
        self.db.exec(&stmt)
    }
}

pub struct UpdateReturning<'db, M, E> {
    update: Update<'db, M, E>,
}

impl<M: Model, E: Executor> UpdateReturning<'_, M, E> {
    fn run(self, sets: Vec<SetSpec>, multiple: bool) -> Result<Vec<M>> {
        let (graph, stmt) = self.update.prepare(sets, multiple, true)?;
        let db = self.update.db;
        let rows = db.fetch(&stmt)?;
        let mut records = materialize(&graph, &rows)?;
        load_collections(db, &graph, &mut records, self.update.modifiers.unscoped)?;
        decode_all(records)
    }

    /// 返回更新后的行；PostgreSQL 上还会带上预加载的关联。
    pub fn set(self, sets: Vec<Set<M>>) -> Result<Vec<M>> {
        let sets = sets.into_iter().map(SetSpec::from).collect();
        self.run(sets, false)
    }

    pub fn set_multiple(self, sets: Vec<SetSpec>) -> Result<Vec<M>> {
        self.run(sets, true)
    }
}

pub struct Delete<'db, M, E> {
    db: &'db Db<E>,
    conditions: Vec<Node>,
    modifiers: Modifiers,
    _model: PhantomData<fn() -> M>,
}

impl<'db, M: Model, E: Executor> Delete<'db, M, E> {
    pub fn new(db: &'db Db<E>, conditions: Vec<Condition<M>>) -> Self {
        Self {
            db,
            conditions: into_nodes(conditions),
            modifiers: Modifiers::default(),
            _model: PhantomData,
        }
    }

    /// MySQL
    pub fn ascending(mut self, field: impl Into<FieldRef>) -> Self {
        self.modifiers.order(field.into(), Direction::Ascending);
        self
    }

    /// MySQL
    pub fn descending(mut self, field: impl Into<FieldRef>) -> Self {
        self.modifiers.order(field.into(), Direction::Descending);
        self
    }

    /// MySQL，且必须先指定排序；负数取消限制。
    pub fn limit(mut self, limit: i64) -> Self {
        self.modifiers.limit = u64::try_from(limit).ok();
        self
    }

    /// 真正删除带软删除列的模型。
    pub fn unscoped(mut self) -> Self {
        self.modifiers.unscoped = true;
        self
    }

    /// 软删除写入的时间，默认为当前 UTC 时间。
    pub fn at(mut self, now: OffsetDateTime) -> Self {
        self.modifiers.now = Some(now);
        self
    }

    pub fn returning(self) -> DeleteReturning<'db, M, E> {
        DeleteReturning { delete: self }
    }

    fn prepare(&self, returning: bool) -> Result<(JoinGraph, Statement)> {
        let graph = validate(M::meta(), &self.conditions)?;
        let shape = DeleteShape {
            orders: self.modifiers.orders.clone(),
            limit: self.modifiers.limit,
            returning,
            now: self.modifiers.now(),
            unscoped: self.modifiers.unscoped,
        };
        let stmt = compile(&graph, &QueryShape::Delete(shape), self.db.flavor())?;
        Ok((graph, stmt))
    }

    pub fn exec(self) -> Result<u64> {
        let (_, stmt) = self.prepare(false)?;
        self.db.exec(&stmt)
    }
}

pub struct DeleteReturning<'db, M, E> {
    delete: Delete<'db, M, E>,
}

impl<M: Model, E: Executor> DeleteReturning<'_, M, E> {
    /// 返回被删除的行；不允许预加载。
    pub fn exec(self) -> Result<Vec<M>> {
        let (graph, stmt) = self.delete.prepare(true)?;
        let rows = self.delete.db.fetch(&stmt)?;
        decode_all(materialize(&graph, &rows)?)
    }
}
