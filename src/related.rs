//! 关联字段的两种状态：从未加载，或已加载（可能为空）。

use crate::error::{Error, Result};

/// 一对一关联。`Loaded(None)` 表示查过了但确实没有。
#[derive(Debug, Clone, PartialEq)]
pub enum Related<T> {
    Unloaded,
    Loaded(Option<T>),
}

impl<T> Default for Related<T> {
    fn default() -> Self {
        Self::Unloaded
    }
}

impl<T> Related<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// 未预加载时返回 `RelationNotLoaded`，而不是 `None`。
    pub fn get(&self) -> Result<Option<&T>> {
        match self {
            Self::Unloaded => Err(Error::RelationNotLoaded),
            Self::Loaded(v) => Ok(v.as_ref()),
        }
    }

    pub fn into_inner(self) -> Result<Option<T>> {
        match self {
            Self::Unloaded => Err(Error::RelationNotLoaded),
            Self::Loaded(v) => Ok(v),
        }
    }
}

/// 一对多关联。
#[derive(Debug, Clone, PartialEq)]
pub enum RelatedMany<T> {
    Unloaded,
    Loaded(Vec<T>),
}

impl<T> Default for RelatedMany<T> {
    fn default() -> Self {
        Self::Unloaded
    }
}

impl<T> RelatedMany<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn get(&self) -> Result<&[T]> {
        match self {
            Self::Unloaded => Err(Error::RelationNotLoaded),
            Self::Loaded(v) => Ok(v),
        }
    }

    pub fn into_inner(self) -> Result<Vec<T>> {
        match self {
            Self::Unloaded => Err(Error::RelationNotLoaded),
            Self::Loaded(v) => Ok(v),
        }
    }
}
