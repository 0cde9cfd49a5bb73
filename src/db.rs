//! 执行边界：驱动实现 `Executor`，`Db` 负责记录日志与事务。

use crate::compiler::Statement;
use crate::error::{DriverError, Error, Result};
use crate::flavor::Flavor;
use crate::model::Model;
use crate::row::Row;
use crate::value::SqlValue;
use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::time::{Duration, Instant};

/// 驱动接口。方法都是同步的，错误原样透传。
pub trait Executor {
    fn query(&self, sql: &str, args: &[SqlValue]) -> std::result::Result<Vec<Row>, DriverError>;

    /// 返回受影响的行数。
    fn execute(&self, sql: &str, args: &[SqlValue]) -> std::result::Result<u64, DriverError>;

    fn begin(&self) -> std::result::Result<(), DriverError>;

    fn commit(&self) -> std::result::Result<(), DriverError>;

    fn rollback(&self) -> std::result::Result<(), DriverError>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn query(&self, sql: &str, args: &[SqlValue]) -> std::result::Result<Vec<Row>, DriverError> {
        (**self).query(sql, args)
    }

    fn execute(&self, sql: &str, args: &[SqlValue]) -> std::result::Result<u64, DriverError> {
        (**self).execute(sql, args)
    }

    fn begin(&self) -> std::result::Result<(), DriverError> {
        (**self).begin()
    }

    fn commit(&self) -> std::result::Result<(), DriverError> {
        (**self).commit()
    }

    fn rollback(&self) -> std::result::Result<(), DriverError> {
        (**self).rollback()
    }
}

/// 每个 `Db` 自带的配置；方言不从全局状态推断。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    pub flavor: Flavor,
    /// 每条语句输出一条 debug 事件。
    pub log_statements: bool,
    /// 超过该耗时的语句输出 warn 事件。
    pub slow_statement: Option<Duration>,
}

impl Config {
    pub fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            ..Self::default()
        }
    }

    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    pub fn slow_statement(mut self, threshold: Duration) -> Self {
        self.slow_statement = Some(threshold);
        self
    }
}

pub struct Db<E> {
    executor: E,
    config: Config,
    tx_depth: Cell<usize>,
}

impl<E: std::fmt::Debug> std::fmt::Debug for Db<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("executor", &self.executor)
            .field("config", &self.config)
            .field("tx_depth", &self.tx_depth.get())
            .finish()
    }
}

impl<E: Executor> Db<E> {
    pub fn new(executor: E, config: Config) -> Self {
        Self {
            executor,
            config,
            tx_depth: Cell::new(0),
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.config.flavor
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_inner(self) -> E {
        self.executor
    }

    pub fn in_transaction(&self) -> bool {
        self.tx_depth.get() > 0
    }

    pub fn query<M: Model>(&self, conditions: Vec<crate::Condition<M>>) -> crate::Query<'_, M, E> {
        crate::Query::new(self, conditions)
    }

    pub fn insert<M: Model>(&self, models: &[M]) -> crate::Insert<'_, M, E> {
        crate::Insert::new(self, models)
    }

    pub fn update<M: Model>(&self, conditions: Vec<crate::Condition<M>>) -> crate::Update<'_, M, E> {
        crate::Update::new(self, conditions)
    }

    pub fn delete<M: Model>(&self, conditions: Vec<crate::Condition<M>>) -> crate::Delete<'_, M, E> {
        crate::Delete::new(self, conditions)
    }

    pub(crate) fn fetch(&self, stmt: &Statement) -> Result<Vec<Row>> {
        let started = Instant::now();
        let rows = self
            .executor
            .query(&stmt.sql, &stmt.args)
            .map_err(Error::Driver)?;
        self.trace(stmt, started.elapsed(), rows.len() as u64);
        Ok(rows)
    }

    pub(crate) fn exec(&self, stmt: &Statement) -> Result<u64> {
        let started = Instant::now();
        let affected = self
            .executor
            .execute(&stmt.sql, &stmt.args)
            .map_err(Error::Driver)?;
        self.trace(stmt, started.elapsed(), affected);
        Ok(affected)
    }

    fn trace(&self, stmt: &Statement, elapsed: Duration, rows: u64) {
        if self.config.log_statements {
            tracing::debug!(
                flavor = %self.config.flavor,
                sql = %stmt.sql,
                args = stmt.args.len(),
                rows,
                elapsed_us = elapsed.as_micros() as u64,
                "statement executed"
            );
        }
        if let Some(threshold) = self.config.slow_statement
            && elapsed >= threshold
        {
            tracing::warn!(
                flavor = %self.config.flavor,
                sql = %stmt.sql,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow statement"
            );
        }
    }

    /// 在事务中执行 `f`：返回 `Ok` 提交，返回 `Err` 或 panic 时回滚（panic 会在回滚后继续传播）。
    ///
    /// 嵌套调用加入已打开的事务，由最外层决定提交或回滚。
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        if self.in_transaction() {
            return f(self);
        }

        self.executor.begin().map_err(Error::Driver)?;
        self.tx_depth.set(1);
        let outcome = catch_unwind(AssertUnwindSafe(|| f(self)));
        self.tx_depth.set(0);

        match outcome {
            Ok(Ok(value)) => {
                self.executor.commit().map_err(Error::Driver)?;
                tracing::debug!(flavor = %self.config.flavor, "transaction committed");
                Ok(value)
            }
            Ok(Err(err)) => {
                self.rollback(&err.to_string());
                Err(err)
            }
            Err(payload) => {
                self.rollback("panic");
                resume_unwind(payload)
            }
        }
    }

    fn rollback(&self, reason: &str) {
        match self.executor.rollback() {
            Ok(()) => tracing::warn!(flavor = %self.config.flavor, reason, "transaction rolled back"),
            Err(err) => tracing::warn!(
                flavor = %self.config.flavor,
                reason,
                error = %err,
                "transaction rollback failed"
            ),
        }
    }
}
