// ==========================================
// 食材库存消耗引擎 - 消耗记录数据仓储
// ==========================================
// 对齐: consumption_record 表
// 红线: 追加式事务日志; 只允许 active → reverted 一次
// ==========================================

use crate::domain::consumption::{ConsumptionRecord, RecordLineItem};
use crate::domain::types::RecordStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const RECORD_COLUMNS: &str = "record_id, recipe_id, user_id, created_at, revertible_until, \
                              status, reverted_at, line_items_json";

// ==========================================
// ConsumptionRecordRepository - 消耗记录仓储
// ==========================================
pub struct ConsumptionRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ConsumptionRecordRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_by_id(&self, record_id: &str) -> RepositoryResult<Option<ConsumptionRecord>> {
        let conn = self.get_conn()?;
        select_record(&conn, record_id)
    }

    /// 查询用户消耗历史(新 → 旧)
    ///
    /// # 参数
    /// - user_id: 用户ID
    /// - limit: 返回记录数上限
    pub fn list_by_user(&self, user_id: &str, limit: usize) -> RepositoryResult<Vec<ConsumptionRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM consumption_record WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id, limit as i64], map_record_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

// ==========================================
// SQL 操作(供仓储与事务作用域共用)
// ==========================================

pub(crate) fn insert_record(conn: &Connection, record: &ConsumptionRecord) -> RepositoryResult<()> {
    let line_items_json = serde_json::to_string(&record.line_items)?;
    conn.execute(
        r#"
        INSERT INTO consumption_record (
            record_id, recipe_id, user_id, created_at, revertible_until,
            status, reverted_at, line_items_json
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            record.record_id,
            record.recipe_id,
            record.user_id,
            record.created_at,
            record.revertible_until,
            record.status.as_str(),
            record.reverted_at,
            line_items_json,
        ],
    )?;
    Ok(())
}

pub(crate) fn select_record(conn: &Connection, record_id: &str) -> RepositoryResult<Option<ConsumptionRecord>> {
    let sql = format!(
        "SELECT {} FROM consumption_record WHERE record_id = ?1",
        RECORD_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![record_id], map_record_row)
        .optional()?)
}

/// active → reverted(条件更新,重复撤销不会二次生效)
pub(crate) fn update_reverted(
    conn: &Connection,
    record_id: &str,
    reverted_at: DateTime<Utc>,
) -> RepositoryResult<()> {
    let rows = conn.execute(
        "UPDATE consumption_record SET status = 'reverted', reverted_at = ?1
         WHERE record_id = ?2 AND status = 'active'",
        params![reverted_at, record_id],
    )?;
    if rows == 0 {
        return Err(RepositoryError::BusinessRuleViolation(format!(
            "消耗记录不可撤销(不存在或已撤销): record_id={}",
            record_id
        )));
    }
    Ok(())
}

fn map_record_row(row: &Row<'_>) -> rusqlite::Result<ConsumptionRecord> {
    let status_raw: String = row.get(5)?;
    let status = RecordStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("未知记录状态: {}", status_raw).into(),
        )
    })?;

    let line_items_raw: String = row.get(7)?;
    let line_items: Vec<RecordLineItem> = serde_json::from_str(&line_items_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(ConsumptionRecord {
        record_id: row.get(0)?,
        recipe_id: row.get(1)?,
        user_id: row.get(2)?,
        created_at: row.get(3)?,
        revertible_until: row.get(4)?,
        status,
        reverted_at: row.get(6)?,
        line_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::consumption::RecordDebit;
    use crate::domain::types::LineStatus;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn make_record(record_id: &str, user_id: &str) -> ConsumptionRecord {
        let now = Utc::now();
        ConsumptionRecord {
            record_id: record_id.to_string(),
            recipe_id: "recipe-1".to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            revertible_until: now + Duration::hours(24),
            status: RecordStatus::Active,
            reverted_at: None,
            line_items: vec![RecordLineItem {
                ingredient_name: "milk".to_string(),
                status: LineStatus::Fulfilled,
                required_quantity: Some(Decimal::ONE),
                required_unit: "cup".to_string(),
                debits: vec![RecordDebit {
                    batch_id: "m1".to_string(),
                    product_name: "Milk (Whole)".to_string(),
                    quantity: Decimal::from_str("236.5882365").unwrap(),
                    unit: "ml".to_string(),
                    quantity_before: Decimal::from(1000),
                    status_consumed: false,
                }],
                shortfall: Decimal::ZERO,
            }],
        }
    }

    #[test]
    fn test_insert_and_find_keeps_full_precision() {
        let conn = setup();
        let repo = ConsumptionRecordRepository::new(conn.clone());
        let record = make_record("r1", "u1");
        insert_record(&conn.lock().unwrap(), &record).unwrap();

        let found = repo.find_by_id("r1").unwrap().unwrap();
        assert_eq!(found.line_items, record.line_items);
        assert_eq!(
            found.all_debits().next().unwrap().quantity,
            Decimal::from_str("236.5882365").unwrap()
        );
        assert_eq!(found.status, RecordStatus::Active);
    }

    #[test]
    fn test_update_reverted_only_once() {
        let conn = setup();
        let guard = conn.lock().unwrap();
        insert_record(&guard, &make_record("r1", "u1")).unwrap();

        update_reverted(&guard, "r1", Utc::now()).unwrap();
        assert!(update_reverted(&guard, "r1", Utc::now()).is_err());

        let found = select_record(&guard, "r1").unwrap().unwrap();
        assert_eq!(found.status, RecordStatus::Reverted);
        assert!(found.reverted_at.is_some());
    }

    #[test]
    fn test_list_by_user() {
        let conn = setup();
        {
            let guard = conn.lock().unwrap();
            insert_record(&guard, &make_record("r1", "u1")).unwrap();
            insert_record(&guard, &make_record("r2", "u1")).unwrap();
            insert_record(&guard, &make_record("r3", "u2")).unwrap();
        }
        let repo = ConsumptionRecordRepository::new(conn);
        assert_eq!(repo.list_by_user("u1", 10).unwrap().len(), 2);
        assert_eq!(repo.list_by_user("u1", 1).unwrap().len(), 1);
    }
}
