// ==========================================
// 食材库存消耗引擎 - 单次操作配置快照
// ==========================================
// 职责: 每次消耗操作开始时读取一次配置,操作期间不再变化
// ==========================================

use crate::config::config_manager::DEFAULT_REVERT_WINDOW_MINUTES;
use crate::config::consumption_config_trait::ConsumptionConfigReader;
use crate::engine::batch_picker::PickOptions;
use crate::engine::error::{ConsumptionError, ConsumptionResult};
use crate::engine::matcher::{IngredientMatcher, SubstitutionTable, DEFAULT_MIN_SCORE};
use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone)]
pub struct ConsumptionSettings {
    pub match_min_score: u8,
    pub revert_window: Duration,
    pub skip_expired: bool,
    pub substitutions: SubstitutionTable,
}

impl Default for ConsumptionSettings {
    fn default() -> Self {
        Self {
            match_min_score: DEFAULT_MIN_SCORE,
            revert_window: Duration::minutes(DEFAULT_REVERT_WINDOW_MINUTES),
            skip_expired: true,
            substitutions: SubstitutionTable::with_defaults(),
        }
    }
}

impl ConsumptionSettings {
    /// 从配置读取器加载
    ///
    /// 附加替换对合并到内置替换表之上
    pub async fn load<C>(reader: &C) -> ConsumptionResult<Self>
    where
        C: ConsumptionConfigReader + ?Sized,
    {
        let match_min_score = reader
            .get_match_min_score()
            .await
            .map_err(|e| ConsumptionError::Config(e.to_string()))?;
        let window_minutes = reader
            .get_revert_window_minutes()
            .await
            .map_err(|e| ConsumptionError::Config(e.to_string()))?;
        let skip_expired = reader
            .get_skip_expired()
            .await
            .map_err(|e| ConsumptionError::Config(e.to_string()))?;
        let extra_pairs = reader
            .get_substitution_pairs()
            .await
            .map_err(|e| ConsumptionError::Config(e.to_string()))?;

        let revert_window = Duration::try_minutes(window_minutes)
            .filter(|w| *w >= Duration::zero())
            .ok_or_else(|| {
                ConsumptionError::Config(format!("撤销窗口无效: {} 分钟", window_minutes))
            })?;

        let mut substitutions = SubstitutionTable::with_defaults();
        substitutions.extend(extra_pairs);

        Ok(Self {
            match_min_score,
            revert_window,
            skip_expired,
            substitutions,
        })
    }

    pub fn matcher(&self) -> IngredientMatcher {
        IngredientMatcher::new(self.substitutions.clone(), self.match_min_score)
    }

    pub fn pick_options(&self, today: NaiveDate) -> PickOptions {
        PickOptions {
            today,
            skip_expired: self.skip_expired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{config_keys, ConfigManager};
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_load_merges_substitutions_over_defaults() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let config = ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap();
        config
            .set_global_config_value(config_keys::SUBSTITUTIONS, r#"[["rocket","arugula"]]"#)
            .unwrap();
        config
            .set_global_config_value(config_keys::REVERT_WINDOW_MINUTES, "30")
            .unwrap();

        let settings = ConsumptionSettings::load(&config).await.unwrap();
        assert_eq!(settings.revert_window, Duration::minutes(30));
        assert!(settings.substitutions.are_substitutes("rocket", "arugula"));
        assert!(settings.substitutions.are_substitutes("cilantro", "coriander"));

        let matcher = settings.matcher();
        assert_eq!(matcher.min_score(), 60);
    }

    struct FixedWindow(i64);

    #[async_trait::async_trait]
    impl ConsumptionConfigReader for FixedWindow {
        async fn get_match_min_score(&self) -> crate::config::ConfigResult<u8> {
            Ok(DEFAULT_MIN_SCORE)
        }
        async fn get_revert_window_minutes(&self) -> crate::config::ConfigResult<i64> {
            Ok(self.0)
        }
        async fn get_skip_expired(&self) -> crate::config::ConfigResult<bool> {
            Ok(true)
        }
        async fn get_substitution_pairs(&self) -> crate::config::ConfigResult<Vec<(String, String)>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_load_rejects_unrepresentable_window() {
        for minutes in [i64::MAX, -1] {
            let err = ConsumptionSettings::load(&FixedWindow(minutes)).await.unwrap_err();
            assert!(matches!(err, ConsumptionError::Config(_)), "{minutes}: {err:?}");
        }
        let settings = ConsumptionSettings::load(&FixedWindow(0)).await.unwrap();
        assert_eq!(settings.revert_window, Duration::zero());
    }
}
