use super::rules::{default_rules, normalize_name, MatchKind, MatchRule, SubstitutionTable};
use crate::domain::pantry::PantryBatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// 最低可接受分数(低于即视为缺失,不做模糊猜测)
pub const DEFAULT_MIN_SCORE: u8 = 60;

// ==========================================
// MatchCandidate - 去重后的库存商品名
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub product_name: String,
    pub latest_added_at: DateTime<Utc>, // 同名批次中最近入库时间
}

// ==========================================
// MatchResult - 匹配结果
// ==========================================
// candidates: 同为最高分的商品名(最近入库优先),其批次将被合并
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub ingredient_name: String,
    pub score: u8,
    pub kind: MatchKind,
    pub candidates: Vec<String>,
}

// ==========================================
// IngredientMatcher - 食材匹配引擎
// ==========================================
#[derive(Debug, Clone)]
pub struct IngredientMatcher {
    rules: Vec<MatchRule>,
    substitutions: SubstitutionTable,
    min_score: u8,
}

impl Default for IngredientMatcher {
    fn default() -> Self {
        Self::new(SubstitutionTable::with_defaults(), DEFAULT_MIN_SCORE)
    }
}

impl IngredientMatcher {
    /// 构造函数
    ///
    /// # 参数
    /// - substitutions: 替换表
    /// - min_score: 最低可接受分数
    pub fn new(substitutions: SubstitutionTable, min_score: u8) -> Self {
        Self {
            rules: default_rules(),
            substitutions,
            min_score,
        }
    }

    /// 替换规则表(规则需按分数降序排列)
    pub fn with_rules(mut self, mut rules: Vec<MatchRule>) -> Self {
        rules.sort_by(|a, b| b.score.cmp(&a.score));
        self.rules = rules;
        self
    }

    pub fn min_score(&self) -> u8 {
        self.min_score
    }

    pub fn substitutions(&self) -> &SubstitutionTable {
        &self.substitutions
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 计算单对名称的得分
    ///
    /// # 返回
    /// - Some((kind, score)): 首个命中的规则
    /// - None: 无规则命中
    pub fn score(&self, requested: &str, product: &str) -> Option<(MatchKind, u8)> {
        let req = normalize_name(requested);
        let prod = normalize_name(product);
        if req.is_empty() || prod.is_empty() {
            return None;
        }

        self.rules
            .iter()
            .find(|rule| (rule.predicate)(&req, &prod, &self.substitutions))
            .map(|rule| (rule.kind, rule.score))
    }

    /// 库存批次 → 去重商品名(保留最近入库时间)
    pub fn distinct_products(batches: &[PantryBatch]) -> Vec<MatchCandidate> {
        let mut latest: HashMap<&str, DateTime<Utc>> = HashMap::new();
        for batch in batches {
            latest
                .entry(batch.product_name.as_str())
                .and_modify(|t| {
                    if batch.created_at > *t {
                        *t = batch.created_at;
                    }
                })
                .or_insert(batch.created_at);
        }

        let mut candidates: Vec<MatchCandidate> = latest
            .into_iter()
            .map(|(name, t)| MatchCandidate {
                product_name: name.to_string(),
                latest_added_at: t,
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.latest_added_at
                .cmp(&a.latest_added_at)
                .then_with(|| a.product_name.cmp(&b.product_name))
        });
        candidates
    }

    /// 为一个食材在候选商品中找最佳匹配
    ///
    /// # 规则
    /// 1. 逐个商品名计算得分
    /// 2. 低于 min_score 的丢弃
    /// 3. 保留全部最高分商品名(最近入库优先)
    ///
    /// # 返回
    /// - Some(MatchResult): 命中
    /// - None: 缺失
    pub fn match_ingredient(
        &self,
        ingredient_name: &str,
        candidates: &[MatchCandidate],
    ) -> Option<MatchResult> {
        let mut best: Option<(MatchKind, u8)> = None;
        let mut winners: Vec<&MatchCandidate> = Vec::new();

        for candidate in candidates {
            let Some((kind, score)) = self.score(ingredient_name, &candidate.product_name) else {
                continue;
            };
            if score < self.min_score {
                continue;
            }
            match best {
                Some((_, top)) if score < top => {}
                Some((_, top)) if score == top => winners.push(candidate),
                _ => {
                    best = Some((kind, score));
                    winners.clear();
                    winners.push(candidate);
                }
            }
        }

        let (kind, score) = best?;
        winners.sort_by(|a, b| {
            b.latest_added_at
                .cmp(&a.latest_added_at)
                .then_with(|| a.product_name.cmp(&b.product_name))
        });

        debug!(
            ingredient = ingredient_name,
            score,
            kind = %kind,
            candidates = winners.len(),
            "食材匹配命中"
        );

        Some(MatchResult {
            ingredient_name: ingredient_name.to_string(),
            score,
            kind,
            candidates: winners.into_iter().map(|c| c.product_name.clone()).collect(),
        })
    }

    /// 直接基于批次快照匹配
    pub fn match_against_batches(
        &self,
        ingredient_name: &str,
        batches: &[PantryBatch],
    ) -> Option<MatchResult> {
        let candidates = Self::distinct_products(batches);
        self.match_ingredient(ingredient_name, &candidates)
    }
}
