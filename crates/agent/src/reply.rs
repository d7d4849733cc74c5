//! User-facing reply text.

use serde_json::Value;

use rentwise_core::error::{Error, RoutingError, UpstreamError};
use rentwise_core::{ActionField, ActionRequest, ApiResponse, Operation, PendingAction};

/// Houses listed per reply.
pub const MAX_LISTED: usize = 10;

pub const EMPTY_MESSAGE: &str =
    "请描述您的租房需求，例如：区域、预算、户型、整租/合租、是否近地铁、到西二旗通勤时间等。";
pub const NO_CONDITIONS: &str = "未识别到具体条件，您可以分多轮说，例如先讲「海淀」，再说「5000以内」「一居」「整租」「近地铁」。";
pub const NO_RESULTS: &str = "未找到符合条件的房源，可以放宽预算或更换区域再试试。";
pub const RESET_DONE: &str = "房源数据已重置。";
pub const PLATFORM_PROMPT: &str = "请问通过哪个平台办理？可选：链家、安居客、58同城。";
pub const MISSING_IDENTITY: &str = "未配置用户标识（X-User-ID），无法执行该操作。";

/// First non-empty scalar among `keys`, rendered as text.
fn field(entry: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| entry.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn house_line(index: usize, house: &Value) -> String {
    if !house.is_object() {
        return format!("{index}. {house}");
    }
    let address = field(house, &["address", "community", "title"]);
    let layout = field(house, &["layout", "rooms", "bedrooms"]);
    let price = field(house, &["rent", "price", "monthly_rent"]);
    let id = field(house, &["house_id", "id"]);
    format!("{index}. {address} | {layout} | {price}元/月 | 房源ID: {id}")
}

/// Summarize a search result page.
pub fn search_results(response: &ApiResponse) -> String {
    let Some(items) = response.items().filter(|items| !items.is_empty()) else {
        return NO_RESULTS.to_string();
    };
    let total = response.total().max(items.len());

    let mut lines = vec![format!("根据您的条件共找到 {total} 套房源：")];
    lines.extend(
        items
            .iter()
            .take(MAX_LISTED)
            .enumerate()
            .map(|(i, house)| house_line(i + 1, house)),
    );
    if total > MAX_LISTED {
        lines.push(format!(
            "… 仅展示前 {MAX_LISTED} 条，共 {total} 条。可补充条件或指定小区/地标缩小范围。"
        ));
    }
    lines.join("\n")
}

/// One-line summary of a single house.
pub fn house_detail(response: &ApiResponse) -> String {
    if response.items().is_some() {
        return search_results(response);
    }
    let data = response.data();
    if !data.is_object() {
        return data.to_string();
    }
    let address = field(data, &["address", "community", "title"]);
    let price = field(data, &["rent", "price", "monthly_rent"]);
    let layout = field(data, &["layout", "rooms"]);
    if layout.is_empty() {
        format!("房源：{address}，月租 {price} 元。")
    } else {
        format!("房源：{address}，{layout}，月租 {price} 元。")
    }
}

/// Every platform a house is listed on.
pub fn listings(house_id: &str, response: &ApiResponse) -> String {
    let Some(items) = response.items().filter(|items| !items.is_empty()) else {
        return format!("房源 {house_id} 暂无挂牌记录。");
    };
    let mut lines = vec![format!("房源 {house_id} 共有 {} 条挂牌：", items.len())];
    for (i, entry) in items.iter().enumerate() {
        let platform = field(entry, &["listing_platform", "platform"]);
        let price = field(entry, &["rent", "price", "monthly_rent"]);
        let status = field(entry, &["status", "state"]);
        let mut line = format!("{}. {platform} | {price}元/月", i + 1);
        if !status.is_empty() {
            line.push_str(" | ");
            line.push_str(&status);
        }
        lines.push(line);
    }
    lines.join("\n")
}

pub fn stats(response: &ApiResponse) -> String {
    match response.data() {
        Value::Object(map) => {
            let mut lines = vec!["房源统计：".to_string()];
            for (key, value) in map {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                lines.push(format!("- {key}: {rendered}"));
            }
            lines.join("\n")
        }
        other => format!("房源统计：{other}"),
    }
}

pub fn action_done(request: &ActionRequest) -> String {
    let id = &request.house_id;
    let platform = request.listing_platform;
    match request.operation {
        Operation::Rent => format!("已为您办理租房，房源 {id}（{platform}）。"),
        Operation::Terminate => format!("已退租房源 {id}（{platform}）。"),
        Operation::Offline => format!("已下架房源 {id}（{platform}）。"),
    }
}

pub fn action_failed(operation: Operation, err: &Error) -> String {
    match err {
        Error::Upstream(upstream) => format!("{}失败：{}", operation.label(), upstream_detail(upstream)),
        other => error(other),
    }
}

/// Prompt for the platform of a proposal.
pub fn platform_prompt(pending: &PendingAction) -> String {
    format!(
        "好的，{}房源 {}。{PLATFORM_PROMPT}",
        pending.operation.label(),
        pending.house_id
    )
}

pub fn reset_failed(err: &Error) -> String {
    match err {
        Error::Upstream(upstream) => format!("重置失败：{}", upstream_detail(upstream)),
        other => format!("重置失败：{other}"),
    }
}

fn upstream_detail(err: &UpstreamError) -> String {
    match err {
        UpstreamError::Status { status_code, body } => format!("HTTP {status_code} {body}"),
        UpstreamError::Network(msg) => format!("无法连接房源服务（{msg}）"),
        UpstreamError::Decode(msg) => format!("返回数据无法解析（{msg}）"),
    }
}

fn field_label(field: ActionField) -> &'static str {
    match field {
        ActionField::Operation => "操作类型",
        ActionField::HouseId => "房源ID",
        ActionField::ListingPlatform => "挂牌平台",
        ActionField::UserId => "用户标识",
    }
}

/// Turn any pipeline error into a reply.
pub fn error(err: &Error) -> String {
    match err {
        Error::Upstream(upstream) => format!("查询出错：{}", upstream_detail(upstream)),
        Error::Routing(routing) => match routing {
            RoutingError::NoConditions => NO_CONDITIONS.to_string(),
            RoutingError::Contradictory(detail) => format!("条件有冲突：{detail}，请确认后重新说明。"),
            RoutingError::LandmarkUnresolved(name) => {
                format!("没有找到地标「{name}」，请换个说法，例如具体的地铁站名或小区名。")
            }
            RoutingError::LookupFailed { reason, .. } => format!("地标查询出错：{reason}"),
        },
        Error::MissingIdentity => MISSING_IDENTITY.to_string(),
        Error::ActionIncomplete { missing } if missing.contains(&ActionField::ListingPlatform) => {
            PLATFORM_PROMPT.to_string()
        }
        Error::ActionIncomplete { missing } => {
            let labels: Vec<&str> = missing.iter().map(|f| field_label(*f)).collect();
            format!("缺少{}，请补充后再试。", labels.join("、"))
        }
        other => format!("处理出错：{other}"),
    }
}
