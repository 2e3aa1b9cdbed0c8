// ==========================================
// 食材库存消耗引擎 - API 层
// ==========================================
// 职责: 对外业务接口,请求校验与错误转换
// ==========================================

pub mod consumption_api;
pub mod error;

pub use consumption_api::{CompleteRecipeRequest, ConsumptionApi, RevertResponse};
pub use error::{ApiError, ApiResult};
