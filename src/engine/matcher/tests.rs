use super::*;
use crate::domain::pantry::PantryBatch;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

// ==========================================
// 测试辅助函数
// ==========================================

fn batch(batch_id: &str, product_name: &str, added_days_ago: i64) -> PantryBatch {
    let base = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
    PantryBatch::new(batch_id, "u1", product_name, Decimal::from(1), "each", None)
        .with_created_at(base - Duration::days(added_days_ago))
}

// ==========================================
// 评分规则
// ==========================================

#[test]
fn test_score_tiers() {
    let matcher = IngredientMatcher::default();

    assert_eq!(matcher.score("Milk", "milk"), Some((MatchKind::Exact, 100)));
    assert_eq!(
        matcher.score("tomatoes", "Tomato"),
        Some((MatchKind::PluralVariant, 90))
    );
    assert_eq!(matcher.score("egg", "Eggs"), Some((MatchKind::PluralVariant, 90)));
    assert_eq!(
        matcher.score("milk", "Milk (Whole)"),
        Some((MatchKind::RequestInProduct, 80))
    );
    assert_eq!(
        matcher.score("fresh basil leaves", "Basil"),
        Some((MatchKind::ProductInRequest, 70))
    );
    assert_eq!(
        matcher.score("scallion", "Green Onion"),
        Some((MatchKind::Substitution, 60))
    );
    assert_eq!(matcher.score("saffron", "Spaghetti"), None);
}

#[test]
fn test_normalization_whitespace_and_case() {
    let matcher = IngredientMatcher::default();
    assert_eq!(
        matcher.score("  Olive   OIL ", "olive oil"),
        Some((MatchKind::Exact, 100))
    );
    assert_eq!(matcher.score("   ", "olive oil"), None);
}

#[test]
fn test_substitution_is_symmetric_and_plural_aware() {
    let matcher = IngredientMatcher::default();
    assert_eq!(
        matcher.score("green onions", "Scallion"),
        Some((MatchKind::Substitution, 60))
    );
    assert_eq!(
        matcher.score("pasta", "Spaghetti"),
        Some((MatchKind::Substitution, 60))
    );
    assert_eq!(
        matcher.score("spaghetti", "Pasta"),
        Some((MatchKind::Substitution, 60))
    );
}

#[test]
fn test_substitution_added_by_data() {
    let mut subs = SubstitutionTable::new();
    assert_eq!(
        IngredientMatcher::new(subs.clone(), DEFAULT_MIN_SCORE).score("rocket", "Arugula"),
        None
    );

    subs.add_pair("rocket", "arugula");
    let matcher = IngredientMatcher::new(subs, DEFAULT_MIN_SCORE);
    assert_eq!(
        matcher.score("rocket", "Arugula"),
        Some((MatchKind::Substitution, 60))
    );
}

#[test]
fn test_exact_always_outscores_other_kinds() {
    // 同一对名称,完全一致时只会得到 100
    let matcher = IngredientMatcher::default();
    let names = ["pasta", "green onion", "tomatoes", "milk (whole)", "eggs"];
    for name in names {
        let (kind, score) = matcher.score(name, &name.to_uppercase()).unwrap();
        assert_eq!(kind, MatchKind::Exact);
        assert_eq!(score, 100);
        for other in default_rules().iter().filter(|r| r.kind != MatchKind::Exact) {
            assert!(score > other.score);
        }
    }
}

// ==========================================
// 候选选择
// ==========================================

#[test]
fn test_best_candidate_wins() {
    let matcher = IngredientMatcher::default();
    let batches = vec![
        batch("b1", "Tomato", 3),
        batch("b2", "Tomato Paste", 1),
        batch("b3", "tomatoes", 10),
    ];

    let result = matcher.match_against_batches("tomatoes", &batches).unwrap();
    assert_eq!(result.score, 100);
    assert_eq!(result.candidates, vec!["tomatoes".to_string()]);
}

#[test]
fn test_tied_candidates_pooled_most_recent_first() {
    let matcher = IngredientMatcher::default();
    let batches = vec![
        batch("b1", "Pasta (Spaghetti)", 5),
        batch("b2", "Pasta (Penne)", 1),
        batch("b3", "Pasta (Spaghetti)", 2),
    ];

    let result = matcher.match_against_batches("pasta", &batches).unwrap();
    assert_eq!(result.kind, MatchKind::RequestInProduct);
    assert_eq!(
        result.candidates,
        vec!["Pasta (Penne)".to_string(), "Pasta (Spaghetti)".to_string()]
    );
}

#[test]
fn test_below_threshold_is_missing() {
    let matcher = IngredientMatcher::default();
    let batches = vec![batch("b1", "Spaghetti", 1), batch("b2", "Flour", 1)];
    assert!(matcher.match_against_batches("saffron", &batches).is_none());

    // 提高门槛后,替换表命中(60)也视为缺失
    let strict = IngredientMatcher::new(SubstitutionTable::with_defaults(), 70);
    assert!(strict.match_against_batches("pasta", &batches).is_none());
    assert!(matcher.match_against_batches("pasta", &batches).is_some());
}

#[test]
fn test_distinct_products_keeps_latest_timestamp() {
    let batches = vec![
        batch("b1", "Milk", 9),
        batch("b2", "Milk", 2),
        batch("b3", "Eggs", 4),
    ];
    let products = IngredientMatcher::distinct_products(&batches);
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].product_name, "Milk");
    assert_eq!(products[0].latest_added_at, batches[1].created_at);
}

#[test]
fn test_plural_rule_is_suffix_only() {
    assert!(rules::is_plural_variant("potatoes", "potato"));
    assert!(rules::is_plural_variant("onion", "onions"));
    assert!(!rules::is_plural_variant("berries", "berry"));
    assert!(!rules::is_plural_variant("rice", "rice"));
}

#[test]
fn test_custom_rule_table_sorted_by_score() {
    let exact_only: Vec<MatchRule> = default_rules()
        .into_iter()
        .filter(|r| matches!(r.kind, MatchKind::Exact | MatchKind::Substitution))
        .rev()
        .collect();
    let matcher = IngredientMatcher::default().with_rules(exact_only);

    assert_eq!(matcher.score("Milk", "milk"), Some((MatchKind::Exact, 100)));
    assert_eq!(matcher.score("tomatoes", "Tomato"), None);
    assert_eq!(
        matcher.score("scallion", "Green Onion"),
        Some((MatchKind::Substitution, 60))
    );
}
