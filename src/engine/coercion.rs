// ==========================================
// 隧道超前地质预报 - 字段规整工具
// ==========================================
// 职责: 时间/数值/枚举字段统一规整为后端线上格式
// 时间格式: YYYY-MM-DDTHH:mm:ss（无毫秒、无时区后缀）
// ==========================================

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Number, Value};
use thiserror::Error;

/// 后端接收的时间格式
pub const API_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// 带时间部分的可接受输入格式（按优先级）
const DATETIME_INPUT_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

// ==========================================
// CoercionError
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("无法解析的时间: {0}")]
    InvalidTimestamp(String),

    #[error("无法解析的数值: {0}")]
    InvalidNumber(String),

    #[error("不支持的值类型: {0}")]
    UnsupportedValue(String),
}

pub type CoercionResult<T> = Result<T, CoercionError>;

// ==========================================
// 时间规整
// ==========================================

/// 规整时间字符串
///
/// - 已是规范格式: 原样返回
/// - 带毫秒或时区后缀（`.000Z`、`+08:00`）: 取墙上时间，去掉后缀
/// - 空格分隔: 替换为 `T`
/// - 仅日期: 补 `T00:00:00`
/// - 空串: 返回空串
pub fn normalize_timestamp_str(raw: &str) -> CoercionResult<String> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(String::new());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(format_naive(&dt.naive_local()));
    }

    for fmt in DATETIME_INPUT_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(format_naive(&dt));
        }
    }

    for fmt in DATE_INPUT_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(format_naive(&dt));
            }
        }
    }

    Err(CoercionError::InvalidTimestamp(s.to_string()))
}

pub fn format_naive(dt: &NaiveDateTime) -> String {
    dt.format(API_DATETIME_FORMAT).to_string()
}

/// 日期时间对象 -> 线上格式（统一换算为 UTC；同一时刻得到同一字符串）
pub fn format_instant<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    format_naive(&dt.with_timezone(&Utc).naive_utc())
}

/// 任意 JSON 值 -> 规范时间串
///
/// null 视为缺失（空串）；整数视为毫秒时间戳（UTC）
pub fn canonical_timestamp(value: &Value) -> CoercionResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => normalize_timestamp_str(s),
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .ok_or_else(|| CoercionError::InvalidTimestamp(n.to_string()))?;
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(|dt| format_instant(&dt))
                .ok_or_else(|| CoercionError::InvalidTimestamp(n.to_string()))
        }
        other => Err(CoercionError::UnsupportedValue(other.to_string())),
    }
}

// ==========================================
// 数值规整
// ==========================================

/// 按小数位四舍五入
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// 宽松读取数值：数字原样，字符串尝试解析，其余为 None
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok().filter(|v| v.is_finite())
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// 严格读取数值（校验用）
pub fn require_number(value: &Value) -> CoercionResult<f64> {
    parse_number(value).ok_or_else(|| CoercionError::InvalidNumber(value.to_string()))
}

pub fn decimal_value(value: f64, precision: u32) -> Value {
    Number::from_f64(round_to(value, precision))
        .map(Value::Number)
        .unwrap_or_else(|| Value::from(0))
}

pub fn integer_value(value: f64) -> Value {
    Value::from(value.round() as i64)
}

/// 文本读取：数字/布尔转为字符串，null 为空串
pub fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

// ==========================================
// Map 读取辅助
// ==========================================

pub fn get_i64(map: &serde_json::Map<String, Value>, key: &str) -> Option<i64> {
    map.get(key).and_then(parse_number).map(|v| v.round() as i64)
}

pub fn get_f64(map: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(parse_number)
}

pub fn get_string(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(text_of(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    #[test]
    fn test_timestamp_equivalent_inputs() {
        let expected = "2024-01-02T03:04:05";
        assert_eq!(normalize_timestamp_str("2024-01-02 03:04:05").unwrap(), expected);
        assert_eq!(normalize_timestamp_str("2024-01-02T03:04:05.000Z").unwrap(), expected);
        assert_eq!(normalize_timestamp_str(expected).unwrap(), expected);

        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_instant(&instant), expected);
    }

    #[test]
    fn test_instant_in_other_zone_uses_utc() {
        let utc = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let beijing = FixedOffset::east_opt(8 * 3600).unwrap();
        let local = utc.with_timezone(&beijing);
        assert_eq!(local, utc);
        assert_eq!(format_instant(&local), "2024-01-02T03:04:05");

        let west = FixedOffset::west_opt(5 * 3600).unwrap();
        let evening = west.with_ymd_and_hms(2024, 1, 1, 22, 4, 5).unwrap();
        assert_eq!(format_instant(&evening), "2024-01-02T03:04:05");
    }

    #[test]
    fn test_timestamp_other_shapes() {
        assert_eq!(
            normalize_timestamp_str("2024-01-02").unwrap(),
            "2024-01-02T00:00:00"
        );
        assert_eq!(
            normalize_timestamp_str("2024-01-02T03:04:05+08:00").unwrap(),
            "2024-01-02T03:04:05"
        );
        assert_eq!(
            normalize_timestamp_str("2024-01-02 03:04").unwrap(),
            "2024-01-02T03:04:00"
        );
        assert_eq!(normalize_timestamp_str("  ").unwrap(), "");
        assert!(normalize_timestamp_str("昨天").is_err());
    }

    #[test]
    fn test_canonical_timestamp_from_value() {
        assert_eq!(canonical_timestamp(&Value::Null).unwrap(), "");
        // 2024-01-02T03:04:05Z
        assert_eq!(
            canonical_timestamp(&json!(1_704_164_645_000_i64)).unwrap(),
            "2024-01-02T03:04:05"
        );
        assert!(canonical_timestamp(&json!(true)).is_err());
    }

    #[test]
    fn test_round_and_parse_number() {
        assert_eq!(round_to(12.345_6, 2), 12.35);
        assert_eq!(round_to(7.25, 0), 7.0);
        assert_eq!(parse_number(&json!(" 8.5 ")), Some(8.5));
        assert_eq!(parse_number(&json!("")), None);
        assert_eq!(parse_number(&json!("abc")), None);
        assert_eq!(decimal_value(1.234, 1), json!(1.2));
        assert_eq!(integer_value(2.6), json!(3));
    }

    #[test]
    fn test_text_of() {
        assert_eq!(text_of(&json!(12)), "12");
        assert_eq!(text_of(&Value::Null), "");
        assert_eq!(text_of(&json!("DK")), "DK");
    }
}
