//! 驱动返回的行，以及物化后的记录。

use crate::error::{Error, Result};
use crate::model::Model;
use crate::related::{Related, RelatedMany};
use crate::value::{FromSqlValue, SqlValue};
use std::collections::BTreeMap;

/// 结果集中的一行：列名与值一一对应。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// 由 `(列名, 值)` 构造。
    pub fn from_pairs<C: Into<String>>(pairs: impl IntoIterator<Item = (C, SqlValue)>) -> Self {
        let (columns, values) = pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn try_get<T: FromSqlValue>(&self, column: &str) -> Result<T> {
        let value = self
            .get(column)
            .ok_or_else(|| Error::decode(column, "column not found in row"))?;
        T::from_sql_value(value).map_err(|message| Error::decode(column, message))
    }
}

/// 已物化的关联。
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    One(Option<Box<Record>>),
    Many(Vec<Record>),
}

/// 一个实体的列值与已加载的关联；没有出现在 `relations` 中的关联即未加载。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: BTreeMap<String, SqlValue>,
    relations: BTreeMap<String, Loaded>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub(crate) fn insert_value(&mut self, column: &str, value: SqlValue) {
        self.values.insert(column.to_owned(), value);
    }

    pub(crate) fn set_relation(&mut self, name: &str, loaded: Loaded) {
        self.relations.insert(name.to_owned(), loaded);
    }

    pub(crate) fn relation_mut(&mut self, name: &str) -> Option<&mut Loaded> {
        self.relations.get_mut(name)
    }

    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    pub fn get<T: FromSqlValue>(&self, column: &str) -> Result<T> {
        let value = self
            .value(column)
            .ok_or_else(|| Error::decode(column, "column not selected"))?;
        T::from_sql_value(value).map_err(|message| Error::decode(column, message))
    }

    pub fn is_loaded(&self, relation: &str) -> bool {
        self.relations.contains_key(relation)
    }

    pub fn loaded(&self, relation: &str) -> Option<&Loaded> {
        self.relations.get(relation)
    }

    /// 一对一关联；未预加载时为 `Related::Unloaded`。
    pub fn one<R: Model>(&self, relation: &str) -> Result<Related<R>> {
        match self.relations.get(relation) {
            None => Ok(Related::Unloaded),
            Some(Loaded::One(None)) => Ok(Related::Loaded(None)),
            Some(Loaded::One(Some(record))) => Ok(Related::Loaded(Some(R::from_record(record)?))),
            Some(Loaded::Many(_)) => Err(Error::decode(relation, "expected a single related record")),
        }
    }

    /// 一对多关联；未预加载时为 `RelatedMany::Unloaded`。
    pub fn many<R: Model>(&self, relation: &str) -> Result<RelatedMany<R>> {
        match self.relations.get(relation) {
            None => Ok(RelatedMany::Unloaded),
            Some(Loaded::Many(records)) => {
                let items = records.iter().map(R::from_record).collect::<Result<Vec<_>>>()?;
                Ok(RelatedMany::Loaded(items))
            }
            Some(Loaded::One(_)) => Err(Error::decode(relation, "expected a related collection")),
        }
    }
}
