//! 结果物化：按根主键分组，把预加载节点的列填进对应的关联。

use crate::compiler::column_alias;
use crate::error::Result;
use crate::join_graph::JoinGraph;
use crate::row::{Loaded, Record, Row};
use crate::value::SqlValue;
use std::collections::{HashMap, HashSet};

/// 行 => 记录。同一个根主键只产生一条记录，顺序与首次出现一致。
pub(crate) fn materialize(graph: &JoinGraph, rows: &[Row]) -> Result<Vec<Record>> {
    let root = graph.root();
    let mut records = Vec::new();
    let mut seen = HashSet::new();

    for row in rows {
        let key = row.get(root.model.primary_key).and_then(SqlValue::group_key);
        if let Some(key) = &key
            && seen.contains(key)
        {
            continue;
        }

        let mut record = Record::new();
        for column in root.model.column_names() {
            if let Some(value) = row.get(column) {
                record.insert_value(column, value.clone());
            }
        }
        attach_children(graph, row, 0, &mut record);

        if let Some(key) = key {
            seen.insert(key);
        }
        records.push(record);
    }
    Ok(records)
}

fn attach_children(graph: &JoinGraph, row: &Row, parent: usize, record: &mut Record) {
    for (idx, node) in graph.children(parent).filter(|(_, n)| n.preload) {
        if let Some(relation) = node.relation {
            let child = node_record(graph, row, idx);
            record.set_relation(relation.name, Loaded::One(child.map(Box::new)));
        }
    }
}

/// 主键为 NULL 说明 LEFT JOIN 没有匹配：关联已加载但为空。
fn node_record(graph: &JoinGraph, row: &Row, idx: usize) -> Option<Record> {
    let node = graph.node(idx);
    let pk = row.get(&column_alias(&node.alias, node.model.primary_key))?;
    if pk.is_null() {
        return None;
    }
    let mut record = Record::new();
    for column in node.model.column_names() {
        if let Some(value) = row.get(&column_alias(&node.alias, column)) {
            record.insert_value(column, value.clone());
        }
    }
    attach_children(graph, row, idx, &mut record);
    Some(record)
}

/// 沿关联路径找到集合的拥有者；路径上任何一段为空都返回 `None`。
fn owner_mut<'r>(record: &'r mut Record, path: &[&str]) -> Option<&'r mut Record> {
    match path.split_first() {
        None => Some(record),
        Some((head, rest)) => match record.relation_mut(head)? {
            Loaded::One(Some(child)) => owner_mut(child, rest),
            _ => None,
        },
    }
}

/// 所有拥有者上 `column` 的非空取值，去重并保持顺序。
pub(crate) fn owner_keys(records: &mut [Record], path: &[&str], column: &str) -> Vec<SqlValue> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for record in records.iter_mut() {
        let Some(owner) = owner_mut(record, path) else {
            continue;
        };
        let Some(value) = owner.value(column) else {
            continue;
        };
        if let Some(key) = value.group_key()
            && seen.insert(key)
        {
            keys.push(value.clone());
        }
    }
    keys
}

/// 把子记录按 `foreign_column` 分配给拥有者（按 `local_column` 匹配）。
/// 没有子记录的拥有者得到空集合。
pub(crate) fn attach_many(
    records: &mut [Record],
    path: &[&str],
    relation: &str,
    local_column: &str,
    foreign_column: &str,
    children: Vec<Record>,
) {
    let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
    for child in children {
        if let Some(key) = child.value(foreign_column).and_then(SqlValue::group_key) {
            groups.entry(key).or_default().push(child);
        }
    }
    for record in records.iter_mut() {
        let Some(owner) = owner_mut(record, path) else {
            continue;
        };
        let items = owner
            .value(local_column)
            .and_then(SqlValue::group_key)
            .and_then(|key| groups.get(&key).cloned())
            .unwrap_or_default();
        owner.set_relation(relation, Loaded::Many(items));
    }
}
