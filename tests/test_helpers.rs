// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, Utc};
use pantry_consume::app::AppState;
use pantry_consume::domain::{IngredientNeed, PantryBatch};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::error::Error;
use std::str::FromStr;
use tempfile::NamedTempFile;

pub const USER: &str = "user-1";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("临时路径非 UTF-8")?.to_string();

    let conn = Connection::open(&db_path)?;
    pantry_consume::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建临时数据库上的完整应用状态
pub fn create_test_state() -> (NamedTempFile, AppState) {
    let (temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    (temp_file, state)
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// 相对今天的保质期
pub fn expires_in(days: i64) -> Option<NaiveDate> {
    Some(Utc::now().date_naive() + Duration::days(days))
}

pub fn need(name: &str, qty: &str, unit: &str) -> IngredientNeed {
    IngredientNeed::new(name, Some(dec(qty)), unit)
}

/// 录入一个库存批次
pub fn seed_batch(
    state: &AppState,
    batch_id: &str,
    product_name: &str,
    qty: &str,
    unit: &str,
    expiration_date: Option<NaiveDate>,
) {
    state
        .pantry_batch_repo
        .insert(&PantryBatch::new(
            batch_id,
            USER,
            product_name,
            dec(qty),
            unit,
            expiration_date,
        ))
        .unwrap();
}

pub fn batch(state: &AppState, batch_id: &str) -> PantryBatch {
    state
        .pantry_batch_repo
        .find_by_id(batch_id)
        .unwrap()
        .unwrap()
}
