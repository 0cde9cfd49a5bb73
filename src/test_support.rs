//! 测试用模型与记录语句的执行器。

use crate::condition::{HasMany, Relation};
use crate::db::{Config, Db, Executor};
use crate::error::{DriverError, Result};
use crate::field::Field;
use crate::flavor::Flavor;
use crate::model::{ColumnMeta, Model, ModelMeta, ModelType, RelationKind, RelationMeta, SqlType};
use crate::related::{Related, RelatedMany};
use crate::row::{Record, Row};
use crate::value::SqlValue;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use time::OffsetDateTime;

fn company_meta() -> &'static ModelMeta {
    &COMPANY
}

fn seller_meta() -> &'static ModelMeta {
    &SELLER
}

fn product_meta() -> &'static ModelMeta {
    &PRODUCT
}

fn parent_parent_meta() -> &'static ModelMeta {
    &PARENT_PARENT
}

fn parent1_meta() -> &'static ModelMeta {
    &PARENT1
}

fn parent2_meta() -> &'static ModelMeta {
    &PARENT2
}

const fn belongs_to(
    name: &'static str,
    target: fn() -> &'static ModelMeta,
    local_column: &'static str,
    optional: bool,
) -> RelationMeta {
    RelationMeta {
        name,
        target,
        kind: RelationKind::BelongsTo,
        local_column,
        foreign_column: "id",
        optional,
    }
}

pub static COMPANY: ModelMeta = ModelMeta {
    model_type: ModelType("models.Company"),
    table: "companies",
    primary_key: "id",
    columns: &[
        ColumnMeta::new("id", SqlType::Int),
        ColumnMeta::new("name", SqlType::Text),
        ColumnMeta::nullable("deleted_at", SqlType::Timestamp),
    ],
    relations: &[RelationMeta {
        name: "sellers",
        target: seller_meta,
        kind: RelationKind::HasMany,
        local_column: "id",
        foreign_column: "company_id",
        optional: true,
    }],
    soft_delete_column: Some("deleted_at"),
    updated_at_column: None,
};

pub static SELLER: ModelMeta = ModelMeta {
    model_type: ModelType("models.Seller"),
    table: "sellers",
    primary_key: "id",
    columns: &[
        ColumnMeta::new("id", SqlType::Int),
        ColumnMeta::new("name", SqlType::Text),
        ColumnMeta::nullable("company_id", SqlType::Int),
    ],
    relations: &[belongs_to("company", company_meta, "company_id", true)],
    soft_delete_column: None,
    updated_at_column: None,
};

pub static PRODUCT: ModelMeta = ModelMeta {
    model_type: ModelType("models.Product"),
    table: "products",
    primary_key: "id",
    columns: &[
        ColumnMeta::new("id", SqlType::Int),
        ColumnMeta::new("int", SqlType::Int),
        ColumnMeta::new("string", SqlType::Text),
        ColumnMeta::new("float", SqlType::Float),
        ColumnMeta::new("bool", SqlType::Bool),
        ColumnMeta::new("updated_at", SqlType::Timestamp),
    ],
    relations: &[],
    soft_delete_column: None,
    updated_at_column: Some("updated_at"),
};

pub static SALE: ModelMeta = ModelMeta {
    model_type: ModelType("models.Sale"),
    table: "sales",
    primary_key: "id",
    columns: &[
        ColumnMeta::new("id", SqlType::Int),
        ColumnMeta::new("code", SqlType::Text),
        ColumnMeta::new("product_id", SqlType::Int),
        ColumnMeta::nullable("seller_id", SqlType::Int),
    ],
    relations: &[
        belongs_to("product", product_meta, "product_id", false),
        belongs_to("seller", seller_meta, "seller_id", true),
    ],
    soft_delete_column: None,
    updated_at_column: None,
};

pub static PARENT_PARENT: ModelMeta = ModelMeta {
    model_type: ModelType("models.ParentParent"),
    table: "parent_parents",
    primary_key: "id",
    columns: &[
        ColumnMeta::new("id", SqlType::Int),
        ColumnMeta::new("name", SqlType::Text),
    ],
    relations: &[],
    soft_delete_column: None,
    updated_at_column: None,
};

pub static PARENT1: ModelMeta = ModelMeta {
    model_type: ModelType("models.Parent1"),
    table: "parent1s",
    primary_key: "id",
    columns: &[
        ColumnMeta::new("id", SqlType::Int),
        ColumnMeta::new("parent_parent_id", SqlType::Int),
    ],
    relations: &[belongs_to("parent_parent", parent_parent_meta, "parent_parent_id", false)],
    soft_delete_column: None,
    updated_at_column: None,
};

pub static PARENT2: ModelMeta = ModelMeta {
    model_type: ModelType("models.Parent2"),
    table: "parent2s",
    primary_key: "id",
    columns: &[
        ColumnMeta::new("id", SqlType::Int),
        ColumnMeta::new("parent_parent_id", SqlType::Int),
    ],
    relations: &[belongs_to("parent_parent", parent_parent_meta, "parent_parent_id", false)],
    soft_delete_column: None,
    updated_at_column: None,
};

pub static CHILD: ModelMeta = ModelMeta {
    model_type: ModelType("models.Child"),
    table: "children",
    primary_key: "id",
    columns: &[
        ColumnMeta::new("id", SqlType::Int),
        ColumnMeta::new("parent1_id", SqlType::Int),
        ColumnMeta::new("parent2_id", SqlType::Int),
    ],
    relations: &[
        belongs_to("parent1", parent1_meta, "parent1_id", false),
        belongs_to("parent2", parent2_meta, "parent2_id", false),
    ],
    soft_delete_column: None,
    updated_at_column: None,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub deleted_at: Option<OffsetDateTime>,
    pub sellers: RelatedMany<Seller>,
}

impl Model for Company {
    fn meta() -> &'static ModelMeta {
        &COMPANY
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.get("id")?,
            name: record.get("name")?,
            deleted_at: record.get("deleted_at")?,
            sellers: record.many("sellers")?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.deleted_at.into(),
        ]
    }
}

pub mod company {
    use super::{Company, Seller};
    use crate::condition::HasMany;
    use crate::field::Field;
    use time::OffsetDateTime;

    pub fn id() -> Field<Company, i64> {
        Field::new("id")
    }

    pub fn name() -> Field<Company, String> {
        Field::new("name")
    }

    pub fn deleted_at() -> Field<Company, OffsetDateTime> {
        Field::new("deleted_at")
    }

    pub fn sellers() -> HasMany<Company, Seller> {
        HasMany::new("sellers")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Seller {
    pub id: i64,
    pub name: String,
    pub company_id: Option<i64>,
    pub company: Related<Company>,
}

impl Model for Seller {
    fn meta() -> &'static ModelMeta {
        &SELLER
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.get("id")?,
            name: record.get("name")?,
            company_id: record.get("company_id")?,
            company: record.one("company")?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.id.into(), self.name.clone().into(), self.company_id.into()]
    }
}

pub mod seller {
    use super::{Company, Seller};
    use crate::condition::Relation;
    use crate::field::Field;

    pub fn id() -> Field<Seller, i64> {
        Field::new("id")
    }

    pub fn name() -> Field<Seller, String> {
        Field::new("name")
    }

    pub fn company_id() -> Field<Seller, i64> {
        Field::new("company_id")
    }

    pub fn company() -> Relation<Seller, Company> {
        Relation::new("company")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub int: i64,
    pub string: String,
    pub float: f64,
    pub bool: bool,
    pub updated_at: OffsetDateTime,
}

impl Product {
    pub fn new(id: i64, int: i64) -> Self {
        Self {
            id,
            int,
            string: format!("product {id}"),
            float: 0.0,
            bool: false,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

impl Model for Product {
    fn meta() -> &'static ModelMeta {
        &PRODUCT
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.get("id")?,
            int: record.get("int")?,
            string: record.get("string")?,
            float: record.get("float")?,
            bool: record.get("bool")?,
            updated_at: record.get("updated_at")?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.into(),
            self.int.into(),
            self.string.clone().into(),
            self.float.into(),
            self.bool.into(),
            self.updated_at.into(),
        ]
    }
}

pub mod product {
    use super::Product;
    use crate::field::Field;
    use time::OffsetDateTime;

    pub fn id() -> Field<Product, i64> {
        Field::new("id")
    }

    pub fn int() -> Field<Product, i64> {
        Field::new("int")
    }

    pub fn string() -> Field<Product, String> {
        Field::new("string")
    }

    pub fn float() -> Field<Product, f64> {
        Field::new("float")
    }

    pub fn bool() -> Field<Product, bool> {
        Field::new("bool")
    }

    pub fn updated_at() -> Field<Product, OffsetDateTime> {
        Field::new("updated_at")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub id: i64,
    pub code: String,
    pub product_id: i64,
    pub seller_id: Option<i64>,
    pub product: Related<Product>,
    pub seller: Related<Seller>,
}

impl Model for Sale {
    fn meta() -> &'static ModelMeta {
        &SALE
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.get("id")?,
            code: record.get("code")?,
            product_id: record.get("product_id")?,
            seller_id: record.get("seller_id")?,
            product: record.one("product")?,
            seller: record.one("seller")?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.into(),
            self.code.clone().into(),
            self.product_id.into(),
            self.seller_id.into(),
        ]
    }
}

pub mod sale {
    use super::{Product, Sale, Seller};
    use crate::condition::Relation;
    use crate::field::Field;

    pub fn id() -> Field<Sale, i64> {
        Field::new("id")
    }

    pub fn code() -> Field<Sale, String> {
        Field::new("code")
    }

    pub fn product_id() -> Field<Sale, i64> {
        Field::new("product_id")
    }

    pub fn seller_id() -> Field<Sale, i64> {
        Field::new("seller_id")
    }

    pub fn product() -> Relation<Sale, Product> {
        Relation::new("product")
    }

    pub fn seller() -> Relation<Sale, Seller> {
        Relation::new("seller")
    }
}

macro_rules! plain_model {
    ($name:ident, $meta:ident, $($field:ident: $col:literal),+) => {
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct $name {
            $(pub $field: i64,)+
        }

        impl Model for $name {
            fn meta() -> &'static ModelMeta {
                &$meta
            }

            fn from_record(record: &Record) -> Result<Self> {
                Ok(Self {
                    $($field: record.get($col)?,)+
                })
            }

            fn values(&self) -> Vec<SqlValue> {
                vec![$(self.$field.into()),+]
            }
        }
    };
}

plain_model!(Parent1, PARENT1, id: "id", parent_parent_id: "parent_parent_id");
plain_model!(Parent2, PARENT2, id: "id", parent_parent_id: "parent_parent_id");
plain_model!(Child, CHILD, id: "id", parent1_id: "parent1_id", parent2_id: "parent2_id");

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParentParent {
    pub id: i64,
    pub name: String,
}

impl Model for ParentParent {
    fn meta() -> &'static ModelMeta {
        &PARENT_PARENT
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.get("id")?,
            name: record.get("name")?,
        })
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.id.into(), self.name.clone().into()]
    }
}

pub fn parent_parent_id() -> Field<ParentParent, i64> {
    Field::new("id")
}

pub fn parent_parent_name() -> Field<ParentParent, String> {
    Field::new("name")
}

pub fn parent1_id() -> Field<Parent1, i64> {
    Field::new("id")
}

pub fn parent1_parent_parent() -> Relation<Parent1, ParentParent> {
    Relation::new("parent_parent")
}

pub fn parent2_id() -> Field<Parent2, i64> {
    Field::new("id")
}

pub fn parent2_parent_parent() -> Relation<Parent2, ParentParent> {
    Relation::new("parent_parent")
}

pub fn child_id() -> Field<Child, i64> {
    Field::new("id")
}

pub fn child_parent1() -> Relation<Child, Parent1> {
    Relation::new("parent1")
}

pub fn child_parent2() -> Relation<Child, Parent2> {
    Relation::new("parent2")
}

/// 不是 has-many 的关联，用来触发 `InvalidRelation`。
pub fn company_sellers_as_one() -> HasMany<Seller, Company> {
    HasMany::new("company")
}

/// 记录收到的每条语句，按脚本返回结果。
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    pub statements: RefCell<Vec<(String, Vec<SqlValue>)>>,
    pub events: RefCell<Vec<&'static str>>,
    rows: RefCell<VecDeque<Vec<Row>>>,
    affected: RefCell<VecDeque<u64>>,
    fail_execute_at: Cell<Option<usize>>,
    executes: Cell<usize>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 下一次 `query` 返回的行。
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.rows.borrow_mut().push_back(rows);
    }

    /// 下一次 `execute` 返回的受影响行数。
    pub fn push_affected(&self, n: u64) {
        self.affected.borrow_mut().push_back(n);
    }

    /// 第 `n` 次（从 0 开始）`execute` 返回错误。
    pub fn fail_execute_at(&self, n: usize) {
        self.fail_execute_at.set(Some(n));
    }

    pub fn sqls(&self) -> Vec<String> {
        self.statements.borrow().iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub fn args(&self, idx: usize) -> Vec<SqlValue> {
        self.statements.borrow()[idx].1.clone()
    }

    fn record(&self, sql: &str, args: &[SqlValue]) {
        self.statements
            .borrow_mut()
            .push((sql.to_owned(), args.to_vec()));
    }
}

impl Executor for RecordingExecutor {
    fn query(&self, sql: &str, args: &[SqlValue]) -> std::result::Result<Vec<Row>, DriverError> {
        self.record(sql, args);
        Ok(self.rows.borrow_mut().pop_front().unwrap_or_default())
    }

    fn execute(&self, sql: &str, args: &[SqlValue]) -> std::result::Result<u64, DriverError> {
        self.record(sql, args);
        let n = self.executes.get();
        self.executes.set(n + 1);
        if self.fail_execute_at.get() == Some(n) {
            return Err("duplicate key".into());
        }
        Ok(self.affected.borrow_mut().pop_front().unwrap_or(1))
    }

    fn begin(&self) -> std::result::Result<(), DriverError> {
        self.events.borrow_mut().push("begin");
        Ok(())
    }

    fn commit(&self) -> std::result::Result<(), DriverError> {
        self.events.borrow_mut().push("commit");
        Ok(())
    }

    fn rollback(&self) -> std::result::Result<(), DriverError> {
        self.events.borrow_mut().push("rollback");
        Ok(())
    }
}

pub fn db(flavor: Flavor) -> Db<RecordingExecutor> {
    Db::new(RecordingExecutor::new(), Config::new(flavor))
}

/// `(列名, 值)` 简写。
pub fn row(pairs: Vec<(&str, SqlValue)>) -> Row {
    Row::from_pairs(pairs)
}

pub fn ts(seconds: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(seconds).expect("valid timestamp")
}
