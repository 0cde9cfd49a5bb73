//! SQL 编译器：连接图 + 语句形状 + 方言 => SQL 文本与位置参数。
//!
//! 方言不支持的特性在这里变成 `UnsupportedByDatabase`，不会生成残缺的 SQL。

use crate::aggregate::{Aggregation, Having};
use crate::args::Args;
use crate::condition::{Node, SetSpec};
use crate::error::Result;
use crate::field::FieldRef;
use crate::flavor::Flavor;
use crate::join_graph::JoinGraph;
use crate::string_builder::StringBuilder;
use crate::validator::{Scope, method_context};
use crate::value::SqlValue;
use crate::where_clause::Lowerer;
use time::OffsetDateTime;

/// 编译好的语句。
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl Statement {
    pub(crate) fn from_args(format: &str, args: &Args, flavor: Flavor) -> Result<Self> {
        let (sql, args) = args.compile_with_flavor(format, flavor)?;
        Ok(Self { sql, args })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Ascending => "Ascending",
            Self::Descending => "Descending",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderSpec {
    pub field: FieldRef,
    pub direction: Direction,
}

/// 分组查询的一列聚合：`AGG(...) AS "alias"`。
#[derive(Debug, Clone)]
pub struct SelectAggregation {
    pub aggregation: Aggregation,
    pub alias: String,
}

#[derive(Debug, Clone)]
pub enum SelectList {
    /// 根模型的全部列，加上预加载节点的列。
    Entities,
    Count,
    Grouped {
        group_by: Vec<FieldRef>,
        selects: Vec<SelectAggregation>,
        having: Vec<Having>,
    },
}

#[derive(Debug, Clone)]
pub struct SelectShape {
    pub list: SelectList,
    pub orders: Vec<OrderSpec>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub unscoped: bool,
}

impl SelectShape {
    pub fn entities() -> Self {
        Self {
            list: SelectList::Entities,
            orders: Vec::new(),
            limit: None,
            offset: None,
            unscoped: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateShape {
    pub sets: Vec<SetSpec>,
    /// 调用方通过 `set_multiple` 显式要求写多张表。
    pub multiple: bool,
    pub orders: Vec<OrderSpec>,
    pub limit: Option<u64>,
    pub returning: bool,
    /// `updated_at` 列使用的时间。
    pub now: OffsetDateTime,
    pub unscoped: bool,
}

#[derive(Debug, Clone)]
pub struct DeleteShape {
    pub orders: Vec<OrderSpec>,
    pub limit: Option<u64>,
    pub returning: bool,
    /// 软删除写入的时间。
    pub now: OffsetDateTime,
    pub unscoped: bool,
}

#[derive(Debug, Clone)]
pub enum ConflictTarget {
    /// 任意唯一约束（MySQL / SQLServer 仅支持这一种）。
    Any,
    Columns(Vec<FieldRef>),
    Constraint(String),
}

#[derive(Debug, Clone)]
pub enum ConflictAction {
    DoNothing,
    UpdateAll,
    Update(Vec<FieldRef>),
    Set(Vec<SetSpec>),
}

#[derive(Debug, Clone)]
pub struct OnConflict {
    pub target: ConflictTarget,
    pub action: ConflictAction,
    /// `DO UPDATE ... WHERE`。
    pub filter: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct InsertShape {
    pub rows: Vec<Vec<SqlValue>>,
    pub on_conflict: Option<OnConflict>,
    pub returning: bool,
}

#[derive(Debug, Clone)]
pub enum QueryShape {
    Select(SelectShape),
    Insert(InsertShape),
    Update(UpdateShape),
    Delete(DeleteShape),
}

/// 按形状编译；`graph` 必须来自 `validate`。
pub fn compile(graph: &JoinGraph, shape: &QueryShape, flavor: Flavor) -> Result<Statement> {
    match shape {
        QueryShape::Select(s) => crate::select::compile_select(graph, s, flavor),
        QueryShape::Insert(s) => crate::insert::compile_insert(graph.root().model, s, flavor),
        QueryShape::Update(s) => crate::update::compile_update(graph, s, flavor),
        QueryShape::Delete(s) => crate::delete::compile_delete(graph, s, flavor),
    }
}

/// 预加载节点的列在结果集中的名字。
pub(crate) fn column_alias(alias: &str, column: &str) -> String {
    format!("{alias}__{column}")
}

/// 根模型的列，加上每个预加载节点的 `"a"."c" AS "a__c"`。
pub(crate) fn entity_columns(flavor: Flavor, graph: &JoinGraph, with_preloads: bool) -> Vec<String> {
    let root = graph.root();
    let mut cols: Vec<String> = root
        .model
        .column_names()
        .map(|c| flavor.qualify(&root.alias, c))
        .collect();
    if with_preloads {
        for (_, node) in graph.joins().filter(|(_, n)| n.preload) {
            cols.extend(node.model.column_names().map(|c| {
                format!(
                    "{} AS {}",
                    flavor.qualify(&node.alias, c),
                    flavor.quote(&column_alias(&node.alias, c))
                )
            }));
        }
    }
    cols
}

pub(crate) fn order_by(lowerer: &mut Lowerer<'_>, scope: &Scope<'_>, orders: &[OrderSpec]) -> Result<Vec<String>> {
    let mut cols = Vec::with_capacity(orders.len());
    for order in orders {
        let context = method_context(order.direction.name(), &order.field);
        let field = lowerer.field(scope, &order.field, &context)?;
        cols.push(format!("{field} {}", order.direction.keyword()));
    }
    Ok(cols)
}

/// LIMIT / OFFSET，按方言规则书写。
pub(crate) fn write_limit_offset(
    buf: &mut StringBuilder,
    flavor: Flavor,
    args: &mut Args,
    limit: Option<u64>,
    offset: Option<u64>,
    ordered: bool,
) {
    match flavor {
        Flavor::MySQL | Flavor::SQLite => {
            if limit.is_none() && offset.is_none() {
                return;
            }
            buf.write_leading("LIMIT ");
            match limit {
                Some(limit) => buf.write_str(&args.add(limit)),
                // OFFSET 不能单独出现。
                None if flavor == Flavor::SQLite => buf.write_str("-1"),
                None => buf.write_str("18446744073709551615"),
            }
            if let Some(offset) = offset {
                buf.write_leading("OFFSET ");
                buf.write_str(&args.add(offset));
            }
        }
        Flavor::PostgreSQL => {
            if let Some(limit) = limit {
                buf.write_leading("LIMIT ");
                buf.write_str(&args.add(limit));
            }
            if let Some(offset) = offset {
                buf.write_leading("OFFSET ");
                buf.write_str(&args.add(offset));
            }
        }
        Flavor::SQLServer => {
            if limit.is_none() && offset.is_none() {
                return;
            }
            if !ordered {
                buf.write_leading("ORDER BY 1");
            }
            buf.write_leading("OFFSET ");
            match offset {
                Some(offset) => buf.write_str(&args.add(offset)),
                None => buf.write_str("0"),
            }
            buf.write_str(" ROWS");
            if let Some(limit) = limit {
                buf.write_leading("FETCH NEXT ");
                buf.write_str(&args.add(limit));
                buf.write_str(" ROWS ONLY");
            }
        }
    }
}

/// UPDATE/DELETE 共用的门槛检查（排序、LIMIT 只有 MySQL 支持）。
pub(crate) fn check_mutation_order_limit(flavor: Flavor, orders: &[OrderSpec], limit: Option<u64>) -> Result<()> {
    use crate::error::Error;

    let caps = flavor.capabilities();
    if let Some(order) = orders.first()
        && !caps.mutation_order_limit
    {
        return Err(Error::unsupported(flavor, order.direction.name()));
    }
    if limit.is_some() {
        if !caps.mutation_order_limit {
            return Err(Error::unsupported(flavor, "Limit"));
        }
        if orders.is_empty() {
            return Err(Error::OrderByMustBeCalled { method: "Limit" });
        }
    }
    Ok(())
}

/// 赋值右侧；同时确认被赋值的字段在图中。返回 (字段所在别名, 值)。
pub(crate) fn assignment<'g>(
    lowerer: &mut Lowerer<'_>,
    scope: &Scope<'g>,
    set: &SetSpec,
) -> Result<(&'g str, String)> {
    let context = method_context("Set", &set.field);
    let alias = scope.resolve(&set.field, &context)?;
    let value = lowerer.operand(scope, &set.value, &context)?;
    Ok((alias, value))
}
