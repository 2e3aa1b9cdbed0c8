// ==========================================
// 食材库存消耗引擎 - 食材名称匹配引擎
// ==========================================
// 职责: 菜谱食材名 → 库存商品名(带置信分)
// 输入: 食材名 + 库存批次快照
// 输出: 最高分的商品名集合,或无匹配(缺失)
// ==========================================
// 评分规则以有序规则表表达(谓词, 分数),首个命中即定分
// 替换表(如 scallion ↔ green onion)通过数据扩展
// ==========================================

mod core;
mod rules;

#[cfg(test)]
mod tests;

pub use core::{IngredientMatcher, MatchCandidate, MatchResult, DEFAULT_MIN_SCORE};
pub use rules::{default_rules, normalize_name, MatchKind, MatchRule, SubstitutionTable};
