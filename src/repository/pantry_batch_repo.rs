// ==========================================
// 食材库存消耗引擎 - 库存批次数据仓储
// ==========================================
// 对齐: pantry_batch 表
// 红线: Repository 不含业务逻辑,只做数据映射与一致性校验
// 并发: revision 乐观锁,每次扣减/回补 revision + 1
// ==========================================

use crate::domain::pantry::PantryBatch;
use crate::domain::types::BatchStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

const BATCH_COLUMNS: &str = "batch_id, user_id, product_name, quantity, unit, expiration_date, \
                             status, revision, created_at, updated_at";

// ==========================================
// PantryBatchRepository - 库存批次仓储
// ==========================================
pub struct PantryBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PantryBatchRepository {
    /// 创建新的批次仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入批次(入库侧/测试数据)
    pub fn insert(&self, batch: &PantryBatch) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_batch(&conn, batch)?;
        Ok(batch.batch_id.clone())
    }

    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<PantryBatch>> {
        let conn = self.get_conn()?;
        select_batch(&conn, batch_id)
    }

    /// 查询用户全部批次(含已耗尽/过期)
    pub fn list_by_user(&self, user_id: &str) -> RepositoryResult<Vec<PantryBatch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM pantry_batch WHERE user_id = ?1 ORDER BY batch_id",
            BATCH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], map_batch_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

// ==========================================
// SQL 操作(供仓储与事务作用域共用)
// ==========================================

pub(crate) fn insert_batch(conn: &Connection, batch: &PantryBatch) -> RepositoryResult<()> {
    if batch.quantity < Decimal::ZERO {
        return Err(RepositoryError::FieldValueError {
            field: "quantity".to_string(),
            message: format!("批次数量不能为负: {}", batch.quantity),
        });
    }

    conn.execute(
        r#"
        INSERT INTO pantry_batch (
            batch_id, user_id, product_name, quantity, unit, expiration_date,
            status, revision, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            batch.batch_id,
            batch.user_id,
            batch.product_name,
            batch.quantity.to_string(),
            batch.unit,
            batch.expiration_date,
            batch.status.as_str(),
            batch.revision,
            batch.created_at,
            batch.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn select_batch(conn: &Connection, batch_id: &str) -> RepositoryResult<Option<PantryBatch>> {
    let sql = format!("SELECT {} FROM pantry_batch WHERE batch_id = ?1", BATCH_COLUMNS);
    Ok(conn
        .query_row(&sql, params![batch_id], map_batch_row)
        .optional()?)
}

pub(crate) fn select_available(conn: &Connection, user_id: &str) -> RepositoryResult<Vec<PantryBatch>> {
    let sql = format!(
        "SELECT {} FROM pantry_batch WHERE user_id = ?1 AND status = 'available' ORDER BY batch_id",
        BATCH_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], map_batch_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// 扣减批次
///
/// # 校验
/// - revision 必须等于 expected_revision,否则乐观锁冲突
/// - 批次必须为 available,扣减量 > 0 且不超过剩余量
/// - 扣减后数量为 0 → 状态置为 consumed
pub(crate) fn apply_debit(
    conn: &Connection,
    batch_id: &str,
    amount: Decimal,
    expected_revision: i64,
) -> RepositoryResult<PantryBatch> {
    let current = require_batch(conn, batch_id)?;

    if current.revision != expected_revision {
        return Err(RepositoryError::OptimisticLockFailure {
            entity: "PantryBatch".to_string(),
            id: batch_id.to_string(),
            expected: expected_revision,
            actual: current.revision,
        });
    }
    if amount <= Decimal::ZERO {
        return Err(RepositoryError::BusinessRuleViolation(format!(
            "扣减量必须为正: batch_id={}, amount={}",
            batch_id, amount
        )));
    }
    if current.status != BatchStatus::Available {
        return Err(RepositoryError::BusinessRuleViolation(format!(
            "批次不可扣减: batch_id={}, status={}",
            batch_id, current.status
        )));
    }
    if amount > current.quantity {
        return Err(RepositoryError::BusinessRuleViolation(format!(
            "扣减量超过剩余量: batch_id={}, amount={}, quantity={}",
            batch_id, amount, current.quantity
        )));
    }

    let new_quantity = current.quantity - amount;
    let new_status = if new_quantity.is_zero() {
        BatchStatus::Consumed
    } else {
        BatchStatus::Available
    };

    write_quantity(conn, &current, new_quantity, new_status)
}

/// 回补批次
///
/// consumed 批次回补后数量为正 → 恢复为 available; 其它状态保持不变
pub(crate) fn apply_credit(conn: &Connection, batch_id: &str, amount: Decimal) -> RepositoryResult<PantryBatch> {
    let current = require_batch(conn, batch_id)?;

    if amount <= Decimal::ZERO {
        return Err(RepositoryError::BusinessRuleViolation(format!(
            "回补量必须为正: batch_id={}, amount={}",
            batch_id, amount
        )));
    }

    let new_quantity = current.quantity + amount;
    let new_status = match current.status {
        BatchStatus::Consumed if new_quantity > Decimal::ZERO => BatchStatus::Available,
        other => other,
    };

    write_quantity(conn, &current, new_quantity, new_status)
}

fn require_batch(conn: &Connection, batch_id: &str) -> RepositoryResult<PantryBatch> {
    select_batch(conn, batch_id)?.ok_or_else(|| RepositoryError::NotFound {
        entity: "PantryBatch".to_string(),
        id: batch_id.to_string(),
    })
}

fn write_quantity(
    conn: &Connection,
    current: &PantryBatch,
    new_quantity: Decimal,
    new_status: BatchStatus,
) -> RepositoryResult<PantryBatch> {
    let now = Utc::now();
    let rows = conn.execute(
        r#"
        UPDATE pantry_batch
           SET quantity = ?1, status = ?2, revision = revision + 1, updated_at = ?3
         WHERE batch_id = ?4 AND revision = ?5
        "#,
        params![
            new_quantity.to_string(),
            new_status.as_str(),
            now,
            current.batch_id,
            current.revision,
        ],
    )?;

    if rows == 0 {
        let actual = require_batch(conn, &current.batch_id)?.revision;
        return Err(RepositoryError::OptimisticLockFailure {
            entity: "PantryBatch".to_string(),
            id: current.batch_id.clone(),
            expected: current.revision,
            actual,
        });
    }

    Ok(PantryBatch {
        quantity: new_quantity,
        status: new_status,
        revision: current.revision + 1,
        updated_at: now,
        ..current.clone()
    })
}

pub(crate) fn map_batch_row(row: &Row<'_>) -> rusqlite::Result<PantryBatch> {
    let quantity_raw: String = row.get(3)?;
    let quantity = Decimal::from_str(&quantity_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let status_raw: String = row.get(6)?;
    let status = BatchStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            Type::Text,
            format!("未知批次状态: {}", status_raw).into(),
        )
    })?;

    Ok(PantryBatch {
        batch_id: row.get(0)?,
        user_id: row.get(1)?,
        product_name: row.get(2)?,
        quantity,
        unit: row.get(4)?,
        expiration_date: row.get(5)?,
        status,
        revision: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
