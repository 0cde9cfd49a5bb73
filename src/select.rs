//! SELECT 编译：实体查询、计数、分组聚合。

use crate::aggregate::Aggregation;
use crate::args::Args;
use crate::compiler::{SelectList, SelectShape, Statement, entity_columns, order_by, write_limit_offset};
use crate::error::Result;
use crate::flavor::Flavor;
use crate::join_graph::JoinGraph;
use crate::string_builder::StringBuilder;
use crate::validator::{Scope, method_context};
use crate::where_clause::{Lowerer, WhereClause};

pub(crate) fn compile_select(graph: &JoinGraph, shape: &SelectShape, flavor: Flavor) -> Result<Statement> {
    let mut args = Args::default();
    let scope = Scope::root(graph);
    let mut lowerer = Lowerer::new(flavor, &mut args, shape.unscoped);

    let mut group_by = Vec::new();
    let mut having = Vec::new();
    let cols = match &shape.list {
        SelectList::Entities => entity_columns(flavor, graph, true),
        SelectList::Count => vec!["COUNT(*)".to_owned()],
        SelectList::Grouped {
            group_by: fields,
            selects,
            having: predicates,
        } => {
            for field in fields {
                let context = method_context("GroupBy", field);
                group_by.push(lowerer.field(&scope, field, &context)?);
            }
            let mut cols = group_by.clone();
            for select in selects {
                let sql = aggregation(&mut lowerer, &scope, &select.aggregation, "Select")?;
                cols.push(format!("{sql} AS {}", flavor.quote(&select.alias)));
            }
            for predicate in predicates {
                let lhs = aggregation(&mut lowerer, &scope, &predicate.aggregation, "Having")?;
                let value = lowerer.args.add(predicate.value.clone());
                having.push(predicate.operator.render(flavor, &lhs, &[value])?);
            }
            cols
        }
    };

    let mut wc = WhereClause::default();
    lowerer.graph_predicates(&scope, &mut wc)?;
    let orders = order_by(&mut lowerer, &scope, &shape.orders)?;
    let joins = lowerer.joins(graph);

    let mut buf = StringBuilder::new();
    buf.write_clause("SELECT", &cols, ", ");
    buf.write_leading("FROM ");
    buf.write_str(&lowerer.table_ref(graph.root()));
    for join in &joins {
        buf.write_leading(join);
    }
    buf.write_clause("WHERE", wc.exprs(), " AND ");
    buf.write_clause("GROUP BY", &group_by, ", ");
    buf.write_clause("HAVING", &having, " AND ");
    buf.write_clause("ORDER BY", &orders, ", ");
    write_limit_offset(
        &mut buf,
        flavor,
        lowerer.args,
        shape.limit,
        shape.offset,
        !orders.is_empty(),
    );

    Statement::from_args(&buf.into_string(), &args, flavor)
}

fn aggregation(
    lowerer: &mut Lowerer<'_>,
    scope: &Scope<'_>,
    aggregation: &Aggregation,
    method: &str,
) -> Result<String> {
    let inner = match &aggregation.field {
        Some(field) => lowerer.field(scope, field, &method_context(method, field))?,
        None => String::new(),
    };
    aggregation.function.render(lowerer.flavor, &inner)
}
