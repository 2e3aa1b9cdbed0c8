// ==========================================
// 食材库存消耗引擎 - 命令行入口
// ==========================================
// 用法:
//   pantry-consume consume <request.json>
//   pantry-consume preview <request.json>
//   pantry-consume revert <record_id> <user_id>
//   pantry-consume history <user_id> [limit]
//   pantry-consume pantry <user_id>
//
// 数据库路径: 环境变量 PANTRY_CONSUME_DB_PATH,否则使用用户数据目录
// ==========================================

use anyhow::{bail, Context};
use pantry_consume::api::CompleteRecipeRequest;
use pantry_consume::app::{get_default_db_path, AppState};
use pantry_consume::logging;

const USAGE: &str = "用法:
  pantry-consume consume <request.json>
  pantry-consume preview <request.json>
  pantry-consume revert <record_id> <user_id>
  pantry-consume history <user_id> [limit]
  pantry-consume pantry <user_id>";

fn read_request(path: &str) -> anyhow::Result<CompleteRecipeRequest> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("无法读取请求文件: {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("请求文件格式错误: {}", path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!("缺少子命令\n{}", USAGE);
    };

    let db_path = get_default_db_path();
    tracing::info!(version = pantry_consume::VERSION, db_path = %db_path, "启动 {}", pantry_consume::APP_NAME);
    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let api = &state.consumption_api;

    let output = match (command.as_str(), &args[1..]) {
        ("consume", [path]) => {
            let request = read_request(path)?;
            serde_json::to_string_pretty(&api.complete_recipe(&request).await?)?
        }
        ("preview", [path]) => {
            let request = read_request(path)?;
            serde_json::to_string_pretty(&api.preview_recipe(&request).await?)?
        }
        ("revert", [record_id, user_id]) => {
            serde_json::to_string_pretty(&api.revert(record_id, user_id).await)?
        }
        ("history", [user_id, rest @ ..]) if rest.len() <= 1 => {
            let limit = match rest.first() {
                Some(raw) => Some(raw.parse::<usize>().with_context(|| format!("limit 不是有效数字: {}", raw))?),
                None => None,
            };
            serde_json::to_string_pretty(&api.list_history(user_id, limit)?)?
        }
        ("pantry", [user_id]) => {
            serde_json::to_string_pretty(&state.pantry_batch_repo.list_by_user(user_id)?)?
        }
        _ => bail!("无法识别的参数: {:?}\n{}", args, USAGE),
    };

    println!("{}", output);
    Ok(())
}
