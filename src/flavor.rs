//! SQL Flavor（方言）：控制占位符、Quote 以及各方言的能力表。

use std::fmt;

/// 引擎支持的四种方言。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Flavor {
    #[default]
    MySQL,
    PostgreSQL,
    SQLite,
    SQLServer,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MySQL => "MySQL",
            Self::PostgreSQL => "PostgreSQL",
            Self::SQLite => "SQLite",
            Self::SQLServer => "SQLServer",
        };
        f.write_str(s)
    }
}

/// 参数占位符风格。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`
    Question,
    /// `$1, $2, ...`
    Dollar,
    /// `@p1, @p2, ...`
    AtP,
}

/// 方言能力表：只读，编译器据此决定语法变体或返回 `UnsupportedByDatabase`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub placeholder: PlaceholderStyle,
    /// INSERT/UPDATE/DELETE 可以返回行（RETURNING 或 OUTPUT）。
    pub returning: bool,
    /// RETURNING 中可以带上关联表的列。
    pub returning_preload: bool,
    /// `ON CONFLICT (cols)`。
    pub on_conflict_columns: bool,
    /// `ON CONFLICT ON CONSTRAINT name`。
    pub on_constraint: bool,
    /// upsert 的 `DO UPDATE ... WHERE`。
    pub on_conflict_where: bool,
    /// UPDATE/DELETE 上的 ORDER BY / LIMIT。
    pub mutation_order_limit: bool,
    /// 一条 UPDATE 写多张表。
    pub multi_table_update: bool,
    /// `IS [NOT] DISTINCT FROM`；否则使用 `<=>`。
    pub distinct_from: bool,
    /// 位运算聚合 `BIT_AND` / `BIT_OR`。
    pub bit_aggregates: bool,
    /// 位运算异或。
    pub bit_xor: bool,
    /// 逻辑连接词 `XOR`。
    pub logical_xor: bool,
    /// upsert 中引用待插入行的关键字。
    pub excluded: &'static str,
}

const MYSQL: Capabilities = Capabilities {
    placeholder: PlaceholderStyle::Question,
    returning: false,
    returning_preload: false,
    on_conflict_columns: false,
    on_constraint: false,
    on_conflict_where: false,
    mutation_order_limit: true,
    multi_table_update: true,
    distinct_from: false,
    bit_aggregates: true,
    bit_xor: true,
    logical_xor: true,
    excluded: "VALUES",
};

const POSTGRESQL: Capabilities = Capabilities {
    placeholder: PlaceholderStyle::Dollar,
    returning: true,
    returning_preload: true,
    on_conflict_columns: true,
    on_constraint: true,
    on_conflict_where: true,
    mutation_order_limit: false,
    multi_table_update: false,
    distinct_from: true,
    bit_aggregates: true,
    bit_xor: true,
    logical_xor: false,
    excluded: "EXCLUDED",
};

const SQLITE: Capabilities = Capabilities {
    placeholder: PlaceholderStyle::Question,
    returning: true,
    returning_preload: false,
    on_conflict_columns: true,
    on_constraint: false,
    on_conflict_where: true,
    mutation_order_limit: false,
    multi_table_update: false,
    distinct_from: true,
    bit_aggregates: false,
    bit_xor: false,
    logical_xor: false,
    excluded: "excluded",
};

const SQLSERVER: Capabilities = Capabilities {
    placeholder: PlaceholderStyle::AtP,
    returning: true,
    returning_preload: false,
    on_conflict_columns: false,
    on_constraint: false,
    on_conflict_where: false,
    mutation_order_limit: false,
    multi_table_update: false,
    distinct_from: true,
    bit_aggregates: false,
    bit_xor: true,
    logical_xor: false,
    excluded: "excluded",
};

impl Flavor {
    pub const ALL: [Flavor; 4] = [
        Flavor::MySQL,
        Flavor::PostgreSQL,
        Flavor::SQLite,
        Flavor::SQLServer,
    ];

    pub fn capabilities(self) -> &'static Capabilities {
        match self {
            Self::MySQL => &MYSQL,
            Self::PostgreSQL => &POSTGRESQL,
            Self::SQLite => &SQLITE,
            Self::SQLServer => &SQLSERVER,
        }
    }

    /// 为标识符加引号。
    pub fn quote(self, name: &str) -> String {
        match self {
            Self::MySQL => format!("`{name}`"),
            Self::PostgreSQL | Self::SQLServer | Self::SQLite => format!("\"{name}\""),
        }
    }

    /// `alias.column` 形式的限定列名。
    pub fn qualify(self, alias: &str, column: &str) -> String {
        format!("{}.{}", self.quote(alias), self.quote(column))
    }

    /// 第 `n` 个（从 1 开始）参数的占位符。
    pub fn placeholder(self, n: usize) -> String {
        match self.capabilities().placeholder {
            PlaceholderStyle::Question => "?".to_owned(),
            PlaceholderStyle::Dollar => format!("${n}"),
            PlaceholderStyle::AtP => format!("@p{n}"),
        }
    }

    /// 冲突即忽略的 INSERT 动词（仅 MySQL 使用）。
    pub fn prepare_insert_ignore(self) -> &'static str {
        match self {
            Flavor::MySQL => "INSERT IGNORE",
            _ => "INSERT",
        }
    }
}
