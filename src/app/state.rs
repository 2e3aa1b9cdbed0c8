// ==========================================
// 食材库存消耗引擎 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::ConsumptionApi;
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{ConsumptionOrchestrator, UnitTable};
use crate::repository::{ConsumptionRecordRepository, PantryBatchRepository, SqlitePantryStore};

/// 应用状态
///
/// 包含所有API实例和共享资源(单连接共享,消耗操作在连接锁下串行)
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 菜谱完成API
    pub consumption_api: Arc<ConsumptionApi>,

    /// 库存批次仓储(录入/查询)
    pub pantry_batch_repo: Arc<PantryBatchRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开连接并初始化 schema
    /// 2. 初始化Repository与配置
    /// 3. 组装编排器与API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState,数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化数据库结构: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // Repository 与配置
        // ==========================================
        let pantry_batch_repo = Arc::new(PantryBatchRepository::new(conn.clone()));
        let record_repo = Arc::new(ConsumptionRecordRepository::new(conn.clone()));
        let store = Arc::new(SqlitePantryStore::new(conn.clone()));
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 编排器与API
        // ==========================================
        let orchestrator = Arc::new(ConsumptionOrchestrator::new(
            store,
            config_manager.clone(),
            Arc::new(UnitTable::standard()),
        ));
        let consumption_api = Arc::new(ConsumptionApi::new(orchestrator, record_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            consumption_api,
            pantry_batch_repo,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 PANTRY_CONSUME_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("PANTRY_CONSUME_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./pantry_consume.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("pantry-consume");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("pantry_consume.db");
        }
    }

    path.to_string_lossy().to_string()
}
