// ==========================================
// 隧道超前地质预报 - 后端响应信封解析
// ==========================================
// 规则:
// - 含 resultcode 时必须为 0 或 200，否则为业务错误
// - resultcode 正常但 data == false 视为操作失败
// - data 与 code/message/success/resultcode 同时出现时取 data
// - 其余形状原样返回
// ==========================================

use crate::gateway::error::{GatewayError, GatewayResult};
use serde_json::Value;

const WRAPPER_KEYS: [&str; 4] = ["code", "message", "success", "resultcode"];

pub fn decode_envelope(raw: Value) -> GatewayResult<Value> {
    let Value::Object(map) = raw else {
        return Ok(raw);
    };

    if let Some(code) = map.get("resultcode") {
        let code = code.as_i64().unwrap_or(-1);
        if code != 0 && code != 200 {
            return Err(GatewayError::Business {
                code,
                message: message_of(&map).unwrap_or_else(|| format!("业务错误 ({})", code)),
            });
        }
        if map.get("data") == Some(&Value::Bool(false)) {
            return Err(GatewayError::Rejected(
                message_of(&map).unwrap_or_else(|| "操作失败".to_string()),
            ));
        }
    }

    if map.contains_key("data") && WRAPPER_KEYS.iter().any(|k| map.contains_key(*k)) {
        let mut map = map;
        return Ok(map.remove("data").unwrap_or(Value::Null));
    }
    Ok(Value::Object(map))
}

fn message_of(map: &serde_json::Map<String, Value>) -> Option<String> {
    ["message", "msg"]
        .iter()
        .filter_map(|k| map.get(*k).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// 新增接口返回的记录标识
///
/// 兼容: 数字 / 数字字符串 / {ybPk|id|ybId}
pub fn extract_created_id(data: &Value) -> Option<i64> {
    let id = match data {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => ["ybPk", "id", "ybId"]
            .iter()
            .find_map(|k| map.get(*k).and_then(extract_created_id)),
        _ => None,
    };
    id.filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwraps_data() {
        let data = decode_envelope(json!({ "resultcode": 200, "data": { "ybPk": 5 } })).unwrap();
        assert_eq!(data, json!({ "ybPk": 5 }));

        let data = decode_envelope(json!({ "code": 0, "message": "ok", "data": [1, 2] })).unwrap();
        assert_eq!(data, json!([1, 2]));
    }

    #[test]
    fn test_passes_through_bare_objects() {
        let raw = json!({ "ybPk": 5, "data": "x" });
        assert_eq!(decode_envelope(raw.clone()).unwrap(), raw);
        assert_eq!(decode_envelope(json!(true)).unwrap(), json!(true));
    }

    #[test]
    fn test_business_errors() {
        let err = decode_envelope(json!({ "resultcode": 500, "msg": "服务异常" })).unwrap_err();
        assert!(matches!(err, GatewayError::Business { code: 500, ref message } if message == "服务异常"));

        let err = decode_envelope(json!({ "resultcode": 0, "data": false })).unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
    }

    #[test]
    fn test_extract_created_id() {
        assert_eq!(extract_created_id(&json!(42)), Some(42));
        assert_eq!(extract_created_id(&json!("17")), Some(17));
        assert_eq!(extract_created_id(&json!({ "ybPk": 8 })), Some(8));
        assert_eq!(extract_created_id(&json!(true)), None);
        assert_eq!(extract_created_id(&json!({ "ybPk": null })), None);
        assert_eq!(extract_created_id(&json!(0)), None);
    }
}
