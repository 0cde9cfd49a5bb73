//! 错误类型：校验、方言能力、执行与物化错误统一为 `Error`。

use crate::flavor::Flavor;
use crate::model::ModelType;
use crate::valuer::ValuerError;

/// 驱动层返回的错误，原样透传。
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("field's model is not concerned by the query (not joined); not concerned model: {model}; {context}")]
    FieldModelNotConcerned { model: ModelType, context: String },

    #[error("model is joined more than once, select which one you want to use with appearance; model: {model}; {context}")]
    AppearanceMustBeSelected { model: ModelType, context: String },

    #[error("selected appearance is bigger than field's model number of appearances; model: {model}; appearance: {appearance}; joined: {joined}; {context}")]
    AppearanceOutOfRange {
        model: ModelType,
        appearance: usize,
        joined: usize,
        context: String,
    },

    #[error("only preloads are allowed inside a collection preload; model: {model}; relation: {relation}")]
    OnlyPreloadsAllowed {
        model: ModelType,
        relation: &'static str,
    },

    #[error("at least one condition is required; method: {context}")]
    EmptyConditions { context: &'static str },

    #[error("method not supported by database; database: {flavor}; method: {method}")]
    UnsupportedByDatabase {
        flavor: Flavor,
        method: &'static str,
    },

    #[error("field is repeated; model: {model}; column: {column}; method: {method}")]
    FieldIsRepeated {
        model: ModelType,
        column: &'static str,
        method: &'static str,
    },

    #[error("order by must be called before {method}")]
    OrderByMustBeCalled { method: &'static str },

    #[error("object not found")]
    ObjectNotFound,

    #[error("found more that one object that meet the requested conditions")]
    MoreThanOneObjectFound,

    #[error("relation not loaded")]
    RelationNotLoaded,

    #[error("preloads in returning are not allowed for delete")]
    PreloadsInDeleteReturningNotAllowed,

    #[error("unknown relation; model: {model}; relation: {relation}")]
    UnknownRelation {
        model: ModelType,
        relation: &'static str,
    },

    #[error("unknown column; model: {model}; column: {column}")]
    UnknownColumn {
        model: ModelType,
        column: &'static str,
    },

    #[error("relation cannot be used here; model: {model}; relation: {relation}; {reason}")]
    InvalidRelation {
        model: ModelType,
        relation: &'static str,
        reason: &'static str,
    },

    #[error("invalid operands for operator {operator}: expected {expected}, got {got}")]
    InvalidOperands {
        operator: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    #[error(transparent)]
    Valuer(#[from] ValuerError),

    #[error(transparent)]
    Driver(DriverError),
}

impl Error {
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(flavor: Flavor, method: &'static str) -> Self {
        Self::UnsupportedByDatabase { flavor, method }
    }

    pub fn driver(err: impl Into<DriverError>) -> Self {
        Self::Driver(err.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound)
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedByDatabase { .. })
    }

    /// 是否在生成 SQL 之前就被拒绝（校验或方言能力错误）。
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::FieldModelNotConcerned { .. }
                | Self::AppearanceMustBeSelected { .. }
                | Self::AppearanceOutOfRange { .. }
                | Self::OnlyPreloadsAllowed { .. }
                | Self::EmptyConditions { .. }
                | Self::FieldIsRepeated { .. }
                | Self::UnknownRelation { .. }
                | Self::UnknownColumn { .. }
                | Self::InvalidRelation { .. }
                | Self::InvalidOperands { .. }
        )
    }

    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver(_))
    }
}
