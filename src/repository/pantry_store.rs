// ==========================================
// 食材库存消耗引擎 - 库存事务作用域
// ==========================================
// 职责: 为消耗/撤销提供"全部生效或全部回滚"的事务边界
// 约束:
// - 闭包返回 Ok → 提交; 返回 Err → 回滚
// - SQLite 实现以 IMMEDIATE 事务 + 连接互斥锁串行化同一库上的消耗操作
// ==========================================

use crate::domain::consumption::ConsumptionRecord;
use crate::domain::pantry::PantryBatch;
use crate::repository::consumption_record_repo::{insert_record, select_record, update_reverted};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::pantry_batch_repo::{apply_credit, apply_debit, select_available, select_batch};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// PantryTransaction - 事务内可用操作
// ==========================================
pub trait PantryTransaction {
    /// 用户全部 available 批次
    fn list_available_batches(&mut self, user_id: &str) -> RepositoryResult<Vec<PantryBatch>>;

    fn get_batch(&mut self, batch_id: &str) -> RepositoryResult<Option<PantryBatch>>;

    /// 扣减(带乐观锁 revision 校验)
    fn debit_batch(
        &mut self,
        batch_id: &str,
        amount: Decimal,
        expected_revision: i64,
    ) -> RepositoryResult<PantryBatch>;

    /// 回补
    fn credit_batch(&mut self, batch_id: &str, amount: Decimal) -> RepositoryResult<PantryBatch>;

    fn insert_record(&mut self, record: &ConsumptionRecord) -> RepositoryResult<()>;

    fn find_record(&mut self, record_id: &str) -> RepositoryResult<Option<ConsumptionRecord>>;

    fn mark_record_reverted(&mut self, record_id: &str, reverted_at: DateTime<Utc>) -> RepositoryResult<()>;
}

// ==========================================
// PantryStore - 库存存储(事务工厂)
// ==========================================
pub trait PantryStore: Send + Sync {
    /// 在单个事务中执行闭包
    fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn PantryTransaction) -> Result<T, E>,
        E: From<RepositoryError>;

    /// 只读快照(预览用,不开写事务)
    fn snapshot_available_batches(&self, user_id: &str) -> RepositoryResult<Vec<PantryBatch>>;
}

// ==========================================
// SqlitePantryStore - SQLite 实现
// ==========================================
#[derive(Clone)]
pub struct SqlitePantryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePantryStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

impl PantryStore for SqlitePantryStore {
    fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn PantryTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let result = {
            let mut scope = SqliteTransactionScope { conn: &tx };
            f(&mut scope)
        };

        match result {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "事务回滚失败");
                }
                Err(err)
            }
        }
    }

    fn snapshot_available_batches(&self, user_id: &str) -> RepositoryResult<Vec<PantryBatch>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        select_available(&conn, user_id)
    }
}

// ==========================================
// SqliteTransactionScope - 事务内操作
// ==========================================
struct SqliteTransactionScope<'t> {
    conn: &'t Connection,
}

impl PantryTransaction for SqliteTransactionScope<'_> {
    fn list_available_batches(&mut self, user_id: &str) -> RepositoryResult<Vec<PantryBatch>> {
        select_available(self.conn, user_id)
    }

    fn get_batch(&mut self, batch_id: &str) -> RepositoryResult<Option<PantryBatch>> {
        select_batch(self.conn, batch_id)
    }

    fn debit_batch(
        &mut self,
        batch_id: &str,
        amount: Decimal,
        expected_revision: i64,
    ) -> RepositoryResult<PantryBatch> {
        apply_debit(self.conn, batch_id, amount, expected_revision)
    }

    fn credit_batch(&mut self, batch_id: &str, amount: Decimal) -> RepositoryResult<PantryBatch> {
        apply_credit(self.conn, batch_id, amount)
    }

    fn insert_record(&mut self, record: &ConsumptionRecord) -> RepositoryResult<()> {
        insert_record(self.conn, record)
    }

    fn find_record(&mut self, record_id: &str) -> RepositoryResult<Option<ConsumptionRecord>> {
        select_record(self.conn, record_id)
    }

    fn mark_record_reverted(&mut self, record_id: &str, reverted_at: DateTime<Utc>) -> RepositoryResult<()> {
        update_reverted(self.conn, record_id, reverted_at)
    }
}
