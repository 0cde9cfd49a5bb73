//! INSERT 编译，含 upsert。
//!
//! PostgreSQL / SQLite 使用 `ON CONFLICT`，MySQL 使用 `INSERT IGNORE` 与
//! `ON DUPLICATE KEY UPDATE`，SQLServer 改写成 `MERGE`。

use crate::args::Args;
use crate::compiler::{ConflictAction, ConflictTarget, InsertShape, OnConflict, Statement, assignment};
use crate::error::{Error, Result};
use crate::flavor::Flavor;
use crate::join_graph::JoinGraph;
use crate::model::ModelMeta;
use crate::string_builder::StringBuilder;
use crate::validator::{Scope, method_context, validate};
use crate::where_clause::{Lowerer, WhereClause};

pub(crate) fn compile_insert(model: &'static ModelMeta, shape: &InsertShape, flavor: Flavor) -> Result<Statement> {
    check_insert_capabilities(flavor, shape)?;
    if shape.rows.is_empty() {
        return Err(Error::EmptyConditions { context: "Insert" });
    }

    let graph = match &shape.on_conflict {
        Some(conflict) => validate(model, &conflict.filter)?,
        None => JoinGraph::build(model, &[])?,
    };
    let mut args = Args::default();
    let mut lowerer = Lowerer::new(flavor, &mut args, true);
    let scope = Scope::root(&graph);

    let sql = if flavor == Flavor::SQLServer && shape.on_conflict.is_some() {
        merge(&mut lowerer, &scope, shape)?
    } else {
        insert(&mut lowerer, &scope, shape)?
    };
    Statement::from_args(&sql, &args, flavor)
}

/// 方言能力检查，与要插入的行数无关。
pub(crate) fn check_insert_capabilities(flavor: Flavor, shape: &InsertShape) -> Result<()> {
    if shape.returning && !flavor.capabilities().returning {
        return Err(Error::unsupported(flavor, "Returning"));
    }
    match &shape.on_conflict {
        Some(conflict) => check_conflict(flavor, conflict),
        None => Ok(()),
    }
}

fn check_conflict(flavor: Flavor, conflict: &OnConflict) -> Result<()> {
    let caps = flavor.capabilities();
    match &conflict.target {
        ConflictTarget::Columns(_) if !caps.on_conflict_columns => {
            return Err(Error::unsupported(flavor, "OnConflictOn"));
        }
        ConflictTarget::Constraint(_) if !caps.on_constraint => {
            return Err(Error::unsupported(flavor, "OnConstraint"));
        }
        _ => {}
    }
    if !conflict.filter.is_empty() && !caps.on_conflict_where {
        return Err(Error::unsupported(flavor, "Where"));
    }
    Ok(())
}

fn column_list(flavor: Flavor, model: &ModelMeta) -> String {
    model
        .column_names()
        .map(|c| flavor.quote(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn values_rows(lowerer: &mut Lowerer<'_>, shape: &InsertShape) -> Vec<String> {
    shape
        .rows
        .iter()
        .map(|row| {
            let values: Vec<String> = row.iter().map(|v| lowerer.args.add(v.clone())).collect();
            format!("({})", values.join(", "))
        })
        .collect()
}

/// 待插入行中的同名列：`EXCLUDED."c"`，MySQL 为 `VALUES(`c`)`。
fn excluded(flavor: Flavor, column: &str) -> String {
    let keyword = flavor.capabilities().excluded;
    if flavor == Flavor::MySQL {
        format!("{keyword}({})", flavor.quote(column))
    } else {
        format!("{keyword}.{}", flavor.quote(column))
    }
}

/// DO UPDATE 要写的列与值；`None` 表示 DO NOTHING。
fn conflict_updates(
    lowerer: &mut Lowerer<'_>,
    scope: &Scope<'_>,
    action: &ConflictAction,
) -> Result<Option<Vec<String>>> {
    let flavor = lowerer.flavor;
    let model = scope.model();
    let updates = match action {
        ConflictAction::DoNothing => return Ok(None),
        ConflictAction::UpdateAll => model
            .column_names()
            .filter(|c| *c != model.primary_key)
            .map(|c| format!("{} = {}", flavor.quote(c), excluded(flavor, c)))
            .collect(),
        ConflictAction::Update(fields) => {
            let mut updates = Vec::with_capacity(fields.len());
            for field in fields {
                scope.resolve(field, &method_context("Update", field))?;
                updates.push(format!(
                    "{} = {}",
                    flavor.quote(field.column),
                    excluded(flavor, field.column)
                ));
            }
            updates
        }
        ConflictAction::Set(sets) => {
            let mut updates = Vec::with_capacity(sets.len());
            for set in sets {
                let (_, value) = assignment(lowerer, scope, set)?;
                updates.push(format!("{} = {value}", flavor.quote(set.field.column)));
            }
            updates
        }
    };
    Ok(Some(updates))
}

fn returning_columns(flavor: Flavor, model: &ModelMeta, prefix: &str) -> Vec<String> {
    model
        .column_names()
        .map(|c| format!("{prefix}{}", flavor.quote(c)))
        .collect()
}

fn insert(lowerer: &mut Lowerer<'_>, scope: &Scope<'_>, shape: &InsertShape) -> Result<String> {
    let flavor = lowerer.flavor;
    let model = scope.model();

    let updates = match &shape.on_conflict {
        Some(conflict) => conflict_updates(lowerer, scope, &conflict.action)?,
        None => None,
    };
    let ignore = shape.on_conflict.is_some() && updates.is_none();

    let mut buf = StringBuilder::new();
    if ignore {
        buf.write_str(flavor.prepare_insert_ignore());
    } else {
        buf.write_str("INSERT");
    }
    buf.write_str(" INTO ");
    buf.write_str(&flavor.quote(model.table));
    buf.write_str(" (");
    buf.write_str(&column_list(flavor, model));
    buf.write_str(")");

    if flavor == Flavor::SQLServer && shape.returning {
        buf.write_clause("OUTPUT", &returning_columns(flavor, model, "INSERTED."), ", ");
    }

    buf.write_clause("VALUES", &values_rows(lowerer, shape), ", ");

    if let Some(conflict) = &shape.on_conflict {
        if flavor == Flavor::MySQL {
            if let Some(updates) = &updates {
                buf.write_clause("ON DUPLICATE KEY UPDATE", updates, ", ");
            }
        } else {
            buf.write_leading("ON CONFLICT");
            match &conflict.target {
                ConflictTarget::Any if updates.is_some() => {
                    buf.write_str(" (");
                    buf.write_str(&flavor.quote(model.primary_key));
                    buf.write_str(")");
                }
                ConflictTarget::Any => {}
                ConflictTarget::Columns(fields) => {
                    let mut cols = Vec::with_capacity(fields.len());
                    for field in fields {
                        scope.resolve(field, &method_context("OnConflictOn", field))?;
                        cols.push(flavor.quote(field.column));
                    }
                    buf.write_str(" (");
                    buf.write_str(&cols.join(", "));
                    buf.write_str(")");
                }
                ConflictTarget::Constraint(name) => {
                    buf.write_str(" ON CONSTRAINT ");
                    buf.write_str(&flavor.quote(name));
                }
            }
            match &updates {
                None => buf.write_leading("DO NOTHING"),
                Some(updates) => {
                    buf.write_leading("DO UPDATE");
                    buf.write_clause("SET", updates, ", ");
                    let mut wc = WhereClause::default();
                    lowerer.graph_predicates(scope, &mut wc)?;
                    buf.write_clause("WHERE", wc.exprs(), " AND ");
                }
            }
        }
    }

    if shape.returning && flavor != Flavor::SQLServer {
        buf.write_clause("RETURNING", &returning_columns(flavor, model, ""), ", ");
    }
    Ok(buf.into_string())
}

/// SQLServer upsert：
/// `MERGE INTO t USING (VALUES ...) AS "excluded" (cols) ON t.pk = excluded.pk ...;`
fn merge(lowerer: &mut Lowerer<'_>, scope: &Scope<'_>, shape: &InsertShape) -> Result<String> {
    let flavor = lowerer.flavor;
    let model = scope.model();
    let updates = match &shape.on_conflict {
        Some(conflict) => conflict_updates(lowerer, scope, &conflict.action)?,
        None => None,
    };
    let source = flavor.capabilities().excluded;

    let mut buf = StringBuilder::new();
    buf.write_str("MERGE INTO ");
    buf.write_str(&flavor.quote(model.table));
    buf.write_str(" USING (VALUES ");
    buf.write_str(&values_rows(lowerer, shape).join(", "));
    buf.write_str(") AS ");
    buf.write_str(&flavor.quote(source));
    buf.write_str(" (");
    buf.write_str(&column_list(flavor, model));
    buf.write_str(") ON ");
    buf.write_str(&flavor.qualify(model.table, model.primary_key));
    buf.write_str(" = ");
    buf.write_str(&flavor.qualify(source, model.primary_key));

    if let Some(updates) = &updates {
        buf.write_leading("WHEN MATCHED THEN UPDATE");
        buf.write_clause("SET", updates, ", ");
    }

    let inserted: Vec<String> = model
        .column_names()
        .map(|c| flavor.qualify(source, c))
        .collect();
    buf.write_leading("WHEN NOT MATCHED THEN INSERT (");
    buf.write_str(&column_list(flavor, model));
    buf.write_str(") VALUES (");
    buf.write_str(&inserted.join(", "));
    buf.write_str(")");

    if shape.returning {
        buf.write_clause("OUTPUT", &returning_columns(flavor, model, "INSERTED."), ", ");
    }
    buf.write_str(";");
    Ok(buf.into_string())
}
