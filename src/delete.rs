//! DELETE 编译。
//!
//! 带软删除列的模型改为 UPDATE 该列；硬删除的连接在 PostgreSQL 上用 `USING`，
//! MySQL 用 `DELETE t FROM t JOIN ...`，SQLite / SQLServer 用主键子查询。

use crate::args::Args;
use crate::compiler::{DeleteShape, Statement, UpdateShape, check_mutation_order_limit, order_by, write_limit_offset};
use crate::condition::SetSpec;
use crate::error::{Error, Result};
use crate::field::FieldRef;
use crate::flavor::Flavor;
use crate::join_graph::JoinGraph;
use crate::operand::Operand;
use crate::string_builder::StringBuilder;
use crate::update::{check_returning, returning_columns, update_statement};
use crate::validator::Scope;
use crate::where_clause::{Lowerer, WhereClause};

pub(crate) fn compile_delete(graph: &JoinGraph, shape: &DeleteShape, flavor: Flavor) -> Result<Statement> {
    if shape.returning && graph.has_preloads() {
        return Err(Error::PreloadsInDeleteReturningNotAllowed);
    }
    check_mutation_order_limit(flavor, &shape.orders, shape.limit)?;
    check_returning(flavor, graph, shape.returning)?;
    if graph.root().conditions.is_empty() {
        return Err(Error::EmptyConditions { context: "Delete" });
    }

    let root = graph.root();
    if let Some(column) = root.model.soft_delete_column
        && !shape.unscoped
    {
        let update = UpdateShape {
            sets: vec![SetSpec {
                field: FieldRef::new(root.model, column),
                value: Operand::literal(shape.now),
            }],
            multiple: false,
            orders: shape.orders.clone(),
            limit: shape.limit,
            returning: shape.returning,
            now: shape.now,
            unscoped: false,
        };
        return update_statement(graph, &update, flavor, false);
    }

    let mut args = Args::default();
    let scope = Scope::root(graph);
    let mut lowerer = Lowerer::new(flavor, &mut args, shape.unscoped);
    let joined = graph.len() > 1;

    let mut wc = WhereClause::default();
    if joined && flavor == Flavor::PostgreSQL {
        for (_, node) in graph.joins() {
            for pred in lowerer.join_on(graph, node) {
                wc.add_where_expr(pred);
            }
        }
    }
    lowerer.graph_predicates(&scope, &mut wc)?;
    let orders = order_by(&mut lowerer, &scope, &shape.orders)?;
    let table = lowerer.table_ref(root);

    let mut buf = StringBuilder::new();
    match flavor {
        Flavor::MySQL if joined => {
            buf.write_str("DELETE ");
            buf.write_str(&flavor.quote(&root.alias));
            buf.write_str(" FROM ");
            buf.write_str(&table);
            for join in lowerer.joins(graph) {
                buf.write_leading(&join);
            }
            buf.write_clause("WHERE", wc.exprs(), " AND ");
        }
        Flavor::PostgreSQL if joined => {
            buf.write_str("DELETE FROM ");
            buf.write_str(&table);
            let using: Vec<String> = graph.joins().map(|(_, n)| lowerer.table_ref(n)).collect();
            buf.write_clause("USING", &using, ", ");
            buf.write_clause("WHERE", wc.exprs(), " AND ");
        }
        Flavor::SQLite | Flavor::SQLServer if joined => {
            let pk = flavor.qualify(&root.alias, root.model.primary_key);
            buf.write_str("DELETE FROM ");
            buf.write_str(&table);
            write_output(&mut buf, flavor, graph, shape.returning);
            buf.write_leading("WHERE ");
            buf.write_str(&pk);
            buf.write_str(" IN (SELECT ");
            buf.write_str(&pk);
            buf.write_str(" FROM ");
            buf.write_str(&table);
            for join in lowerer.joins(graph) {
                buf.write_leading(&join);
            }
            buf.write_clause("WHERE", wc.exprs(), " AND ");
            buf.write_str(")");
        }
        _ => {
            buf.write_str("DELETE FROM ");
            buf.write_str(&table);
            write_output(&mut buf, flavor, graph, shape.returning);
            buf.write_clause("WHERE", wc.exprs(), " AND ");
        }
    }
    buf.write_clause("ORDER BY", &orders, ", ");
    if flavor == Flavor::MySQL {
        write_limit_offset(&mut buf, flavor, lowerer.args, shape.limit, None, true);
    }
    if shape.returning && flavor != Flavor::SQLServer {
        let cols: Vec<String> = match flavor {
            Flavor::PostgreSQL => returning_columns(flavor, graph, "")
                .into_iter()
                .map(|c| format!("{}.{c}", flavor.quote(&root.alias)))
                .collect(),
            _ => returning_columns(flavor, graph, ""),
        };
        buf.write_clause("RETURNING", &cols, ", ");
    }

    Statement::from_args(&buf.into_string(), &args, flavor)
}

fn write_output(buf: &mut StringBuilder, flavor: Flavor, graph: &JoinGraph, returning: bool) {
    if flavor == Flavor::SQLServer && returning {
        buf.write_clause("OUTPUT", &returning_columns(flavor, graph, "DELETED."), ", ");
    }
}
