//! UPDATE 编译。
//!
//! 连接在 PostgreSQL / SQLite 上变成 `FROM` 列表，连接谓词移入 WHERE；
//! SQLServer 使用 `UPDATE t SET ... FROM t JOIN ...`；MySQL 使用多表
//! `UPDATE t JOIN ... SET`，也只有 MySQL 允许 ORDER BY / LIMIT 与写多张表。

use crate::args::Args;
use crate::compiler::{
    Statement, UpdateShape, assignment, check_mutation_order_limit, entity_columns, order_by,
    write_limit_offset,
};
use crate::error::{Error, Result};
use crate::flavor::Flavor;
use crate::join_graph::{JoinGraph, JoinNode};
use crate::string_builder::StringBuilder;
use crate::validator::Scope;
use crate::where_clause::{Lowerer, WhereClause};

pub(crate) fn compile_update(graph: &JoinGraph, shape: &UpdateShape, flavor: Flavor) -> Result<Statement> {
    update_statement(graph, shape, flavor, true)
}

/// `touch_updated_at` 为真时，未显式赋值的 `updated_at` 列写入 `shape.now`。
pub(crate) fn update_statement(
    graph: &JoinGraph,
    shape: &UpdateShape,
    flavor: Flavor,
    touch_updated_at: bool,
) -> Result<Statement> {
    let caps = flavor.capabilities();
    check_mutation_order_limit(flavor, &shape.orders, shape.limit)?;
    if shape.multiple && !caps.multi_table_update {
        return Err(Error::unsupported(flavor, "SetMultiple"));
    }
    check_returning(flavor, graph, shape.returning)?;
    if graph.root().conditions.is_empty() {
        return Err(Error::EmptyConditions { context: "Update" });
    }
    if shape.sets.is_empty() {
        return Err(Error::EmptyConditions { context: "Set" });
    }

    let mut args = Args::default();
    let scope = Scope::root(graph);
    let mut lowerer = Lowerer::new(flavor, &mut args, shape.unscoped);
    let root = graph.root();
    let mysql = flavor == Flavor::MySQL;

    let mut assigns = Vec::with_capacity(shape.sets.len() + 1);
    let mut assigned: Vec<(&str, &str)> = Vec::with_capacity(shape.sets.len());
    // 收到赋值的表，按首次出现排序。
    let mut updated: Vec<&JoinNode> = Vec::new();
    for set in &shape.sets {
        let (alias, value) = assignment(&mut lowerer, &scope, set)?;
        if assigned.contains(&(alias, set.field.column)) {
            return Err(Error::FieldIsRepeated {
                model: set.field.model.model_type,
                column: set.field.column,
                method: "Set",
            });
        }
        assigned.push((alias, set.field.column));
        if alias != root.alias && !caps.multi_table_update {
            return Err(Error::unsupported(flavor, "SetMultiple"));
        }
        if !updated.iter().any(|n| n.alias == alias)
            && let Some(node) = graph.nodes().iter().find(|n| n.alias == alias)
        {
            updated.push(node);
        }
        let target = if mysql {
            flavor.qualify(alias, set.field.column)
        } else {
            flavor.quote(set.field.column)
        };
        assigns.push(format!("{target} = {value}"));
    }
    if touch_updated_at {
        for node in updated {
            let Some(column) = node.model.updated_at_column else {
                continue;
            };
            if assigned.contains(&(node.alias.as_str(), column)) {
                continue;
            }
            let target = if mysql {
                flavor.qualify(&node.alias, column)
            } else {
                flavor.quote(column)
            };
            let now = lowerer.args.add(shape.now);
            assigns.push(format!("{target} = {now}"));
        }
    }

    let mut wc = WhereClause::default();
    if !mysql && flavor != Flavor::SQLServer {
        for (_, node) in graph.joins() {
            for pred in lowerer.join_on(graph, node) {
                wc.add_where_expr(pred);
            }
        }
    }
    lowerer.graph_predicates(&scope, &mut wc)?;
    let orders = order_by(&mut lowerer, &scope, &shape.orders)?;

    let mut buf = StringBuilder::new();
    buf.write_str("UPDATE ");
    buf.write_str(&lowerer.table_ref(root));
    match flavor {
        Flavor::MySQL => {
            for join in lowerer.joins(graph) {
                buf.write_leading(&join);
            }
            buf.write_clause("SET", &assigns, ", ");
        }
        Flavor::SQLServer => {
            buf.write_clause("SET", &assigns, ", ");
            if shape.returning {
                let cols = returning_columns(flavor, graph, "INSERTED.");
                buf.write_clause("OUTPUT", &cols, ", ");
            }
            if graph.len() > 1 {
                buf.write_leading("FROM ");
                buf.write_str(&lowerer.table_ref(root));
                for join in lowerer.joins(graph) {
                    buf.write_leading(&join);
                }
            }
        }
        Flavor::PostgreSQL | Flavor::SQLite => {
            buf.write_clause("SET", &assigns, ", ");
            let from: Vec<String> = graph.joins().map(|(_, n)| lowerer.table_ref(n)).collect();
            buf.write_clause("FROM", &from, ", ");
        }
    }
    buf.write_clause("WHERE", wc.exprs(), " AND ");
    buf.write_clause("ORDER BY", &orders, ", ");
    if mysql {
        write_limit_offset(&mut buf, flavor, lowerer.args, shape.limit, None, true);
    }
    if shape.returning && flavor != Flavor::SQLServer {
        let cols = match flavor {
            Flavor::PostgreSQL => entity_columns(flavor, graph, true),
            _ => returning_columns(flavor, graph, ""),
        };
        buf.write_clause("RETURNING", &cols, ", ");
    }

    Statement::from_args(&buf.into_string(), &args, flavor)
}

/// RETURNING：MySQL 不支持；带预加载时只有 PostgreSQL 支持。
pub(crate) fn check_returning(flavor: Flavor, graph: &JoinGraph, returning: bool) -> Result<()> {
    let caps = flavor.capabilities();
    if !returning {
        return Ok(());
    }
    if !caps.returning || (graph.has_preloads() && !caps.returning_preload) {
        return Err(Error::unsupported(flavor, "Returning"));
    }
    Ok(())
}

/// 根模型的列（不限定表名），可带 `INSERTED.` / `DELETED.` 前缀。
pub(crate) fn returning_columns(flavor: Flavor, graph: &JoinGraph, prefix: &str) -> Vec<String> {
    graph
        .root()
        .model
        .column_names()
        .map(|c| format!("{prefix}{}", flavor.quote(c)))
        .collect()
}
