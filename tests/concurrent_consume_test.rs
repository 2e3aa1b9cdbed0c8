// ==========================================
// 并发消耗测试
// ==========================================
// 职责: 验证同一批次被并发消耗时不会超扣,扣减总量守恒
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use pantry_consume::api::CompleteRecipeRequest;
use pantry_consume::app::AppState;
use pantry_consume::domain::{BatchStatus, ConsumptionOutcome};
use rust_decimal::Decimal;
use std::sync::Arc;

use test_helpers::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_consumers_never_overdraw() {
    let (_tmp, db_path) = create_test_db().unwrap();

    // 两个独立连接指向同一库文件
    let state_a = Arc::new(AppState::new(db_path.clone()).unwrap());
    let state_b = Arc::new(AppState::new(db_path).unwrap());
    seed_batch(&state_a, "rice", "Rice", "1000", "g", None);

    let mut handles = Vec::new();
    for i in 0..10 {
        let state = if i % 2 == 0 { state_a.clone() } else { state_b.clone() };
        handles.push(tokio::spawn(async move {
            let req = CompleteRecipeRequest {
                recipe_id: format!("pilaf-{}", i),
                user_id: USER.to_string(),
                ingredient_needs: vec![need("rice", "150", "g")],
                servings_multiplier: Decimal::ONE,
            };
            state.consumption_api.complete_recipe(&req).await
        }));
    }

    let mut total_consumed = Decimal::ZERO;
    let mut cooked = 0;
    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        if report.outcome == ConsumptionOutcome::Cooked {
            cooked += 1;
        }
        total_consumed += report.per_ingredient[0]
            .consumed
            .iter()
            .map(|c| c.quantity)
            .sum::<Decimal>();
    }

    assert_eq!(cooked, 6);
    assert_eq!(total_consumed, dec("1000"));

    let rice = batch(&state_a, "rice");
    assert_eq!(rice.quantity, Decimal::ZERO);
    assert_eq!(rice.status, BatchStatus::Consumed);

    let debited: Decimal = state_a
        .consumption_api
        .list_history(USER, Some(100))
        .unwrap()
        .iter()
        .flat_map(|r| r.all_debits().map(|d| d.quantity).collect::<Vec<_>>())
        .sum();
    assert_eq!(debited, dec("1000"));
}
