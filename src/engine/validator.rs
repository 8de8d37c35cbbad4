// ==========================================
// 隧道超前地质预报 - 保存前校验
// ==========================================
// 职责: 按注册表检查必填/格式，检查分段与辅助点不变量
// 失败时阻止保存，不发起任何网络调用
// ==========================================

use crate::domain::point::{AuxiliaryPoint, SequenceLabel};
use crate::domain::segment::{keys as seg_keys, ForecastSegment};
use crate::domain::types::MethodTag;
use crate::engine::coercion::{canonical_timestamp, parse_number, text_of};
use crate::engine::schema_registry::{
    point_shape_of, schema_for, FieldKind, FieldSpec, DEFAULT_CONCLUSION_MAX_LEN,
};
use crate::i18n::t_with_args;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

// ==========================================
// 违规类型
// ==========================================
pub const VIOLATION_REQUIRED: &str = "REQUIRED";
pub const VIOLATION_MALFORMED: &str = "MALFORMED";
pub const VIOLATION_OUT_OF_RANGE: &str = "OUT_OF_RANGE";
pub const VIOLATION_TOO_LONG: &str = "TOO_LONG";
pub const VIOLATION_MILEAGE_ORDER: &str = "MILEAGE_ORDER";
pub const VIOLATION_DUPLICATE_LABEL: &str = "DUPLICATE_LABEL";

/// 校验违规详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationViolation {
    /// 违规类型（REQUIRED / MALFORMED / MILEAGE_ORDER ...）
    pub violation_type: String,
    /// 字段路径，如 dkname、ybjgDTOList[0].sdkilo
    pub field: String,
    /// 违规原因（已本地化）
    pub reason: String,
    pub details: Option<Value>,
}

impl ValidationViolation {
    fn new(violation_type: &str, field: impl Into<String>, reason: String) -> Self {
        Self {
            violation_type: violation_type.to_string(),
            field: field.into(),
            reason,
            details: None,
        }
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("数据校验失败: {} 项", .violations.len())]
pub struct ValidationError {
    pub violations: Vec<ValidationViolation>,
}

impl ValidationError {
    pub fn from_violations(violations: Vec<ValidationViolation>) -> Result<(), ValidationError> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    /// 违规字段路径（供界面高亮）
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }

    pub fn reason(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.reason.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ==========================================
// RecordValidator
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct RecordValidator {
    conclusion_max_len: usize,
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new(DEFAULT_CONCLUSION_MAX_LEN)
    }
}

impl RecordValidator {
    pub fn new(conclusion_max_len: usize) -> Self {
        Self { conclusion_max_len }
    }

    pub fn conclusion_max_len(&self) -> usize {
        self.conclusion_max_len
    }

    /// 完整校验：基本信息/变体字段 + 分段 + 辅助点
    pub fn validate(
        &self,
        method: MethodTag,
        merged: &Map<String, Value>,
        segments: &[ForecastSegment],
        points: &[AuxiliaryPoint],
    ) -> Result<(), ValidationError> {
        let mut violations = self.validate_fields(method, merged);
        for (i, seg) in segments.iter().enumerate() {
            violations.extend(self.validate_segment(i, seg));
        }
        violations.extend(self.validate_points(method, points));

        if !violations.is_empty() {
            tracing::warn!(
                method = %method,
                count = violations.len(),
                "保存被校验阻止"
            );
        }
        ValidationError::from_violations(violations)
    }

    /// 按注册表检查合并后的字段（规整前）
    pub fn validate_fields(
        &self,
        method: MethodTag,
        merged: &Map<String, Value>,
    ) -> Vec<ValidationViolation> {
        let schema = schema_for(method);
        schema
            .all_fields()
            .filter_map(|spec| {
                check_field(spec, spec.key, merged.get(spec.key), schema.is_required(spec))
            })
            .collect()
    }

    /// 分段不变量: 开始里程 <= 结束里程；时间/风险类别/结论必填；结论限长
    pub fn validate_segment(&self, index: usize, seg: &ForecastSegment) -> Vec<ValidationViolation> {
        let path = |key: &str| format!("ybjgDTOList[{}].{}", index, key);
        let mut out = Vec::new();

        if seg.mileage_name.trim().is_empty() {
            out.push(required(path(seg_keys::MILEAGE_NAME)));
        }

        if !seg.mileage_ordered() {
            out.push(
                ValidationViolation::new(
                    VIOLATION_MILEAGE_ORDER,
                    path(seg_keys::START),
                    t_with_args(
                        "validation.mileage_order",
                        &[
                            ("start", &seg.start_mileage.to_string()),
                            ("end", &seg.end_mileage.to_string()),
                        ],
                    ),
                )
                .with_details(serde_json::json!({
                    "start": seg.start_mileage,
                    "end": seg.end_mileage,
                })),
            );
        }

        if seg.occurred_at.trim().is_empty() {
            out.push(required(path(seg_keys::TIME)));
        } else if canonical_timestamp(&Value::String(seg.occurred_at.clone())).is_err() {
            out.push(malformed(path(seg_keys::TIME)));
        }

        if seg.risk_category.trim().is_empty() {
            out.push(required(path(seg_keys::RISK)));
        }

        let len = seg.conclusion.chars().count();
        if seg.conclusion.trim().is_empty() {
            out.push(required(path(seg_keys::CONCLUSION)));
        } else if len > self.conclusion_max_len {
            out.push(too_long(
                path(seg_keys::CONCLUSION),
                len,
                self.conclusion_max_len,
            ));
        }

        out
    }

    /// 辅助点: 形状匹配、必填测量值、列表内序号唯一
    pub fn validate_points(
        &self,
        method: MethodTag,
        points: &[AuxiliaryPoint],
    ) -> Vec<ValidationViolation> {
        let mut out = Vec::new();
        let Some(shape) = schema_for(method).point_shape else {
            return out;
        };

        let mut seen_labels = HashSet::new();
        for (i, point) in points.iter().enumerate() {
            let prefix = format!("{}[{}]", shape.list_key, i);

            if point.kind() != shape.kind {
                out.push(
                    ValidationViolation::new(
                        VIOLATION_MALFORMED,
                        prefix.clone(),
                        t_with_args("validation.point_shape", &[("field", &prefix)]),
                    )
                    .with_details(serde_json::json!({
                        "expected": format!("{:?}", shape.kind),
                        "found": format!("{:?}", point.kind()),
                    })),
                );
                continue;
            }

            let data = point.data.to_wire_patch();
            for spec in point_shape_of(shape.kind).fields {
                let path = format!("{}.{}", prefix, spec.key);
                if let Some(v) = check_field(spec, &path, data.get(spec.key), spec.required) {
                    out.push(v);
                }
            }

            if let (Some(rule), Some(label)) = (shape.label, point.label_value(i)) {
                let text = text_of(&label);
                if matches!(point.label, SequenceLabel::Explicit(_)) && text.trim().is_empty() {
                    out.push(required(format!("{}.{}", prefix, rule.key())));
                } else if !seen_labels.insert(text.clone()) {
                    out.push(
                        ValidationViolation::new(
                            VIOLATION_DUPLICATE_LABEL,
                            format!("{}.{}", prefix, rule.key()),
                            t_with_args("validation.duplicate_label", &[("label", &text)]),
                        )
                        .with_details(serde_json::json!({ "label": text })),
                    );
                }
            }
        }
        out
    }
}

// ==========================================
// 单字段检查
// ==========================================

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_field(
    spec: &FieldSpec,
    path: &str,
    value: Option<&Value>,
    required_field: bool,
) -> Option<ValidationViolation> {
    if is_blank(value) {
        return required_field.then(|| required(path.to_string()));
    }
    let value = value?;

    match spec.kind {
        FieldKind::Decimal { .. } | FieldKind::Integer => {
            if parse_number(value).is_none() {
                return Some(malformed(path.to_string()));
            }
        }
        FieldKind::Code { allowed, .. } => match parse_number(value) {
            None => return Some(malformed(path.to_string())),
            Some(v) => {
                let code = v.round() as i64;
                if !allowed.contains(&code) {
                    return Some(
                        ValidationViolation::new(
                            VIOLATION_OUT_OF_RANGE,
                            path,
                            t_with_args(
                                "validation.out_of_range",
                                &[("field", path), ("value", &code.to_string())],
                            ),
                        )
                        .with_details(serde_json::json!({ "allowed": allowed })),
                    );
                }
            }
        },
        FieldKind::Timestamp => {
            if canonical_timestamp(value).is_err() {
                return Some(malformed(path.to_string()));
            }
        }
        FieldKind::Text | FieldKind::Attachment => {}
    }

    if let Some(max) = spec.max_len {
        let len = text_of(value).chars().count();
        if len > max {
            return Some(too_long(path.to_string(), len, max));
        }
    }
    None
}

fn required(field: String) -> ValidationViolation {
    let reason = t_with_args("validation.required", &[("field", &field)]);
    ValidationViolation::new(VIOLATION_REQUIRED, field, reason)
}

fn malformed(field: String) -> ValidationViolation {
    let reason = t_with_args("validation.malformed", &[("field", &field)]);
    ValidationViolation::new(VIOLATION_MALFORMED, field, reason)
}

fn too_long(field: String, len: usize, max: usize) -> ValidationViolation {
    let reason = t_with_args(
        "validation.too_long",
        &[("field", &field), ("max", &max.to_string())],
    );
    ValidationViolation::new(VIOLATION_TOO_LONG, field, reason)
        .with_details(serde_json::json!({ "length": len, "max": max }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ElectrodeKind, RockGrade, SeverityColor};
    use serde_json::json;

    fn valid_segment() -> ForecastSegment {
        ForecastSegment {
            mileage_name: "DK".to_string(),
            start_mileage: 100.0,
            end_mileage: 130.0,
            occurred_at: "2024-01-02T03:04:05".to_string(),
            risk_category: "岩溶".to_string(),
            severity: SeverityColor::Yellow,
            grade: RockGrade::IV,
            conclusion: "溶洞发育".to_string(),
            ..ForecastSegment::default()
        }
    }

    fn types_of(v: &[ValidationViolation]) -> Vec<(&str, &str)> {
        v.iter()
            .map(|x| (x.violation_type.as_str(), x.field.as_str()))
            .collect()
    }

    #[test]
    fn test_required_header_fields() {
        let validator = RecordValidator::default();
        let merged = json!({ "dkname": "DK", "dkilo": 100, "ybLength": "" });
        let v = validator.validate_fields(MethodTag::Tsp, merged.as_object().unwrap());
        let found = types_of(&v);
        assert!(found.contains(&(VIOLATION_REQUIRED, "ybLength")));
        assert!(found.contains(&(VIOLATION_REQUIRED, "monitordate")));
        assert!(!found.iter().any(|(_, f)| *f == "dkname"));
    }

    #[test]
    fn test_malformed_and_out_of_range() {
        let validator = RecordValidator::default();
        let merged = json!({
            "dkname": "DK",
            "dkilo": "abc",
            "ybLength": 30,
            "monitordate": "not a date",
            "sbName": "TEM",
            "sbdcType": 7
        });
        let v = validator.validate_fields(MethodTag::TransientEm, merged.as_object().unwrap());
        let found = types_of(&v);
        assert!(found.contains(&(VIOLATION_MALFORMED, "dkilo")));
        assert!(found.contains(&(VIOLATION_MALFORMED, "monitordate")));
        assert!(found.contains(&(VIOLATION_OUT_OF_RANGE, "sbdcType")));
    }

    #[test]
    fn test_segment_mileage_order_rejected() {
        let validator = RecordValidator::default();
        assert!(validator.validate_segment(0, &valid_segment()).is_empty());

        let bad = ForecastSegment {
            start_mileage: 150.0,
            end_mileage: 120.0,
            ..valid_segment()
        };
        let v = validator.validate_segment(2, &bad);
        assert_eq!(
            types_of(&v),
            vec![(VIOLATION_MILEAGE_ORDER, "ybjgDTOList[2].sdkilo")]
        );
    }

    #[test]
    fn test_segment_conclusion_limits() {
        let validator = RecordValidator::new(5);
        let long = ForecastSegment {
            conclusion: "六个汉字呢".repeat(2),
            ..valid_segment()
        };
        let v = validator.validate_segment(0, &long);
        assert_eq!(v[0].violation_type, VIOLATION_TOO_LONG);

        let empty = ForecastSegment {
            conclusion: " ".to_string(),
            risk_category: String::new(),
            occurred_at: String::new(),
            ..valid_segment()
        };
        let v = validator.validate_segment(0, &empty);
        assert_eq!(v.len(), 3);
        assert!(v.iter().all(|x| x.violation_type == VIOLATION_REQUIRED));
    }

    #[test]
    fn test_duplicate_point_labels() {
        let validator = RecordValidator::default();
        let points = vec![
            AuxiliaryPoint::electrode(ElectrodeKind::PowerSupply, 1.0),
            AuxiliaryPoint::electrode(ElectrodeKind::Measurement, 2.0).with_label("DJ001"),
        ];
        let v = validator.validate_points(MethodTag::HighResResistivity, &points);
        assert_eq!(
            types_of(&v),
            vec![(VIOLATION_DUPLICATE_LABEL, "gfbzldResultinfoDTOList[1].djxh")]
        );
    }

    #[test]
    fn test_point_required_and_shape() {
        let validator = RecordValidator::default();
        let points = vec![
            AuxiliaryPoint::horizontal_borehole("", 2.0, 30.0, "完整"),
            AuxiliaryPoint::sonar(1.0, 2.0),
        ];
        let v = validator.validate_points(MethodTag::DrillingHorizontal, &points);
        let found = types_of(&v);
        assert!(found.contains(&(VIOLATION_REQUIRED, "cqspzZkzzDTOList[0].kwbh")));
        assert!(found.contains(&(VIOLATION_MALFORMED, "cqspzZkzzDTOList[1]")));
    }
}
