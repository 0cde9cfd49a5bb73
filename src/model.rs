//! 模型元数据：表名、列、关联关系。由外部代码生成器产出，进程内只读。

use crate::error::Result;
use crate::row::Record;
use crate::value::SqlValue;
use std::fmt;

/// 模型类型标识（按类型名区分）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelType(pub &'static str);

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// 列的 SQL 类型族。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Int,
    Float,
    Text,
    Bool,
    Bytes,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
}

impl ColumnMeta {
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
}

/// 关联关系。
///
/// 连接条件总是 `target.foreign_column = owner.local_column`：
/// belongs-to 的 `local_column` 是外键、`foreign_column` 是目标主键；
/// has-one/has-many 则相反。
#[derive(Debug, Clone, Copy)]
pub struct RelationMeta {
    pub name: &'static str,
    pub target: fn() -> &'static ModelMeta,
    pub kind: RelationKind,
    pub local_column: &'static str,
    pub foreign_column: &'static str,
    pub optional: bool,
}

impl RelationMeta {
    pub fn target(&self) -> &'static ModelMeta {
        (self.target)()
    }

    pub fn is_collection(&self) -> bool {
        self.kind == RelationKind::HasMany
    }
}

#[derive(Debug)]
pub struct ModelMeta {
    pub model_type: ModelType,
    pub table: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [ColumnMeta],
    pub relations: &'static [RelationMeta],
    pub soft_delete_column: Option<&'static str>,
    pub updated_at_column: Option<&'static str>,
}

impl PartialEq for ModelMeta {
    fn eq(&self, other: &Self) -> bool {
        self.model_type == other.model_type
    }
}

impl Eq for ModelMeta {}

impl ModelMeta {
    pub fn column(&self, name: &str) -> Option<&'static ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&'static RelationMeta> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|c| c.name)
    }
}

/// 可被查询的实体。
pub trait Model: Sized {
    fn meta() -> &'static ModelMeta;

    /// 从物化后的记录构造实体；未预加载的关联应保持 `Unloaded`。
    fn from_record(record: &Record) -> Result<Self>;

    /// 按 `meta().columns` 顺序给出插入值。
    fn values(&self) -> Vec<SqlValue>;
}
