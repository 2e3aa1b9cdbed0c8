// ==========================================
// 食材库存消耗引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::consumption_config_trait::{ConfigResult, ConsumptionConfigReader};
use crate::db::open_sqlite_connection;
use crate::engine::matcher::DEFAULT_MIN_SCORE;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    // 匹配
    pub const MATCH_MIN_SCORE: &str = "match_min_score";
    pub const SUBSTITUTIONS: &str = "substitutions"; // 附加替换对 (JSON)

    // 批次选择
    pub const SKIP_EXPIRED: &str = "skip_expired";

    // 撤销
    pub const REVERT_WINDOW_MINUTES: &str = "revert_window_minutes";
}

/// 默认撤销窗口: 24 小时
pub const DEFAULT_REVERT_WINDOW_MINUTES: i64 = 24 * 60;

/// 撤销窗口上限: 366 天
pub const MAX_REVERT_WINDOW_MINUTES: i64 = 366 * 24 * 60;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明:为保证连接行为一致,会对传入连接再次应用统一 PRAGMA(幂等)。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值(scope_id='global')
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值(公开方法,供其他模块复用)
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值(UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照(JSON格式)
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 读取并解析,缺失或格式错误时回退默认值
    fn parse_or_default<T, F>(&self, key: &str, default: T, parse: F) -> ConfigResult<T>
    where
        F: FnOnce(&str) -> Option<T>,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match parse(raw.trim()) {
                Some(v) => Ok(v),
                None => {
                    warn!(key, value = %raw, "配置值格式错误,使用默认值");
                    Ok(default)
                }
            },
        }
    }
}

#[async_trait]
impl ConsumptionConfigReader for ConfigManager {
    async fn get_match_min_score(&self) -> ConfigResult<u8> {
        self.parse_or_default(config_keys::MATCH_MIN_SCORE, DEFAULT_MIN_SCORE, |s| {
            s.parse::<u8>().ok().filter(|v| *v <= 100)
        })
    }

    async fn get_revert_window_minutes(&self) -> ConfigResult<i64> {
        self.parse_or_default(
            config_keys::REVERT_WINDOW_MINUTES,
            DEFAULT_REVERT_WINDOW_MINUTES,
            |s| {
                s.parse::<i64>()
                    .ok()
                    .filter(|v| (0..=MAX_REVERT_WINDOW_MINUTES).contains(v))
            },
        )
    }

    async fn get_skip_expired(&self) -> ConfigResult<bool> {
        self.parse_or_default(config_keys::SKIP_EXPIRED, true, |s| {
            match s.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Some(true),
                "0" | "false" | "no" => Some(false),
                _ => None,
            }
        })
    }

    async fn get_substitution_pairs(&self) -> ConfigResult<Vec<(String, String)>> {
        match self.get_config_value(config_keys::SUBSTITUTIONS)? {
            None => Ok(vec![]),
            Some(raw) => Ok(serde_json::from_str::<Vec<(String, String)>>(&raw)?),
        }
    }
}
