// ==========================================
// 隧道超前地质预报 - 预报分段（子记录）
// ==========================================
// 职责: 某一里程区间内的风险/地质结论
// 不变量: 开始里程 <= 结束里程
// 分段无独立生命周期，总是随父记录一并提交
// ==========================================

use crate::domain::types::{RiskCategory, RockGrade, SeverityColor};
use crate::engine::coercion::{get_f64, get_i64, get_string, normalize_timestamp_str};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 分段线上字段名
pub mod keys {
    pub const PK: &str = "ybjgPk";
    pub const ID: &str = "ybjgId";
    pub const PARENT: &str = "ybPk";
    pub const MILEAGE_NAME: &str = "dkname";
    pub const START: &str = "sdkilo";
    pub const END: &str = "edkilo";
    pub const TIME: &str = "ybjgTime";
    pub const RISK: &str = "risklevel";
    pub const SEVERITY: &str = "dzjb";
    pub const GRADE: &str = "grade";
    pub const GRADE_MIRROR: &str = "wylevel";
    pub const CONCLUSION: &str = "jlresult";

    pub const ALL: [&str; 12] = [
        PK,
        ID,
        PARENT,
        MILEAGE_NAME,
        START,
        END,
        TIME,
        RISK,
        SEVERITY,
        GRADE,
        GRADE_MIRROR,
        CONCLUSION,
    ];
}

// ==========================================
// ForecastSegment
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSegment {
    /// ybjgPk；0 表示尚未持久化
    pub pk: i64,
    /// ybjgId
    pub seq_id: i64,
    /// 父记录 ybPk
    pub record_pk: i64,
    pub mileage_name: String,
    pub start_mileage: f64,
    pub end_mileage: f64,
    /// 规范时间串，空串表示未填写
    pub occurred_at: String,
    /// 风险类别（建议词表见 RiskCategory，线上为自由文本）
    pub risk_category: String,
    pub severity: SeverityColor,
    pub grade: RockGrade,
    pub conclusion: String,
    /// 未建模的线上字段
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl Default for ForecastSegment {
    fn default() -> Self {
        Self {
            pk: 0,
            seq_id: 0,
            record_pk: 0,
            mileage_name: String::new(),
            start_mileage: 0.0,
            end_mileage: 0.0,
            occurred_at: String::new(),
            risk_category: String::new(),
            severity: SeverityColor::Green,
            grade: RockGrade::I,
            conclusion: String::new(),
            extra: Map::new(),
        }
    }
}

impl ForecastSegment {
    pub fn is_persisted(&self) -> bool {
        self.pk > 0
    }

    /// 区间长度 |end - start|
    pub fn length(&self) -> f64 {
        (self.end_mileage - self.start_mileage).abs()
    }

    pub fn mileage_ordered(&self) -> bool {
        self.start_mileage <= self.end_mileage
    }

    pub fn risk(&self) -> Option<RiskCategory> {
        RiskCategory::from_label(&self.risk_category)
    }

    /// 从线上对象解析（宽松：缺失/异常字段取默认值）
    pub fn from_wire(map: &Map<String, Value>) -> Self {
        let grade = get_i64(map, keys::GRADE)
            .and_then(RockGrade::from_code)
            .or_else(|| get_i64(map, keys::GRADE_MIRROR).and_then(RockGrade::from_code))
            .unwrap_or_default();

        let occurred_at = get_string(map, keys::TIME)
            .map(|raw| normalize_timestamp_str(&raw).unwrap_or(raw))
            .unwrap_or_default();

        let extra = map
            .iter()
            .filter(|(k, _)| !keys::ALL.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            pk: get_i64(map, keys::PK).unwrap_or(0),
            seq_id: get_i64(map, keys::ID).unwrap_or(0),
            record_pk: get_i64(map, keys::PARENT).unwrap_or(0),
            mileage_name: get_string(map, keys::MILEAGE_NAME).unwrap_or_default(),
            start_mileage: get_f64(map, keys::START).unwrap_or(0.0),
            end_mileage: get_f64(map, keys::END).unwrap_or(0.0),
            occurred_at,
            risk_category: get_string(map, keys::RISK).unwrap_or_default(),
            severity: get_string(map, keys::SEVERITY)
                .and_then(|s| SeverityColor::parse(&s))
                .unwrap_or_default(),
            grade,
            conclusion: get_string(map, keys::CONCLUSION).unwrap_or_default(),
            extra,
        }
    }

    /// 线上对象（grade 与 wylevel 始终一致）
    pub fn to_wire(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        map.insert(keys::PK.into(), Value::from(self.pk));
        map.insert(keys::ID.into(), Value::from(self.seq_id));
        map.insert(keys::PARENT.into(), Value::from(self.record_pk));
        map.insert(keys::MILEAGE_NAME.into(), Value::from(self.mileage_name.clone()));
        map.insert(keys::START.into(), Value::from(self.start_mileage));
        map.insert(keys::END.into(), Value::from(self.end_mileage));
        map.insert(keys::TIME.into(), Value::from(self.occurred_at.clone()));
        map.insert(keys::RISK.into(), Value::from(self.risk_category.clone()));
        map.insert(keys::SEVERITY.into(), Value::from(self.severity.as_str()));
        map.insert(keys::GRADE.into(), Value::from(self.grade.code()));
        map.insert(keys::GRADE_MIRROR.into(), Value::from(self.grade.code()));
        map.insert(keys::CONCLUSION.into(), Value::from(self.conclusion.clone()));
        map
    }

    /// 部分更新：仅替换补丁中给出的字段，标识不变
    pub fn apply(&mut self, patch: &SegmentPatch) {
        if let Some(v) = &patch.mileage_name {
            self.mileage_name = v.clone();
        }
        if let Some(v) = patch.start_mileage {
            self.start_mileage = v;
        }
        if let Some(v) = patch.end_mileage {
            self.end_mileage = v;
        }
        if let Some(v) = &patch.occurred_at {
            self.occurred_at = v.clone();
        }
        if let Some(v) = &patch.risk_category {
            self.risk_category = v.clone();
        }
        if let Some(v) = patch.severity {
            self.severity = v;
        }
        if let Some(v) = patch.grade {
            self.grade = v;
        }
        if let Some(v) = &patch.conclusion {
            self.conclusion = v.clone();
        }
    }
}

// ==========================================
// SegmentPatch - 新增/编辑输入
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentPatch {
    pub mileage_name: Option<String>,
    pub start_mileage: Option<f64>,
    pub end_mileage: Option<f64>,
    pub occurred_at: Option<String>,
    pub risk_category: Option<String>,
    pub severity: Option<SeverityColor>,
    pub grade: Option<RockGrade>,
    pub conclusion: Option<String>,
}

impl SegmentPatch {
    pub fn mileage(mut self, start: f64, end: f64) -> Self {
        self.start_mileage = Some(start);
        self.end_mileage = Some(end);
        self
    }

    pub fn at(mut self, occurred_at: impl Into<String>) -> Self {
        self.occurred_at = Some(occurred_at.into());
        self
    }

    pub fn risk(mut self, category: RiskCategory) -> Self {
        self.risk_category = Some(category.label().to_string());
        self
    }

    pub fn severity(mut self, color: SeverityColor) -> Self {
        self.severity = Some(color);
        self
    }

    pub fn grade(mut self, grade: RockGrade) -> Self {
        self.grade = Some(grade);
        self
    }

    pub fn conclusion(mut self, text: impl Into<String>) -> Self {
        self.conclusion = Some(text.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_wire_grade_mirror() {
        let wire = json!({
            "ybjgPk": 9,
            "sdkilo": "100.5",
            "edkilo": 120,
            "wylevel": 5,
            "dzjb": "RED",
            "ybjgTime": "2024-01-02 03:04:05",
            "remarkExtra": "x"
        });
        let seg = ForecastSegment::from_wire(wire.as_object().unwrap());
        assert_eq!(seg.pk, 9);
        assert!(seg.is_persisted());
        assert_eq!(seg.grade, RockGrade::V);
        assert_eq!(seg.severity, SeverityColor::Red);
        assert_eq!(seg.start_mileage, 100.5);
        assert_eq!(seg.occurred_at, "2024-01-02T03:04:05");
        assert_eq!(seg.length(), 19.5);
        assert_eq!(seg.extra.get("remarkExtra"), Some(&json!("x")));

        let out = seg.to_wire();
        assert_eq!(out.get("grade"), Some(&json!(5)));
        assert_eq!(out.get("wylevel"), Some(&json!(5)));
        assert_eq!(out.get("remarkExtra"), Some(&json!("x")));
    }

    #[test]
    fn test_apply_patch_keeps_identity() {
        let mut seg = ForecastSegment {
            pk: 77,
            conclusion: "旧结论".to_string(),
            risk_category: "岩溶".to_string(),
            ..ForecastSegment::default()
        };
        seg.apply(&SegmentPatch::default().conclusion("新结论"));
        assert_eq!(seg.pk, 77);
        assert_eq!(seg.conclusion, "新结论");
        assert_eq!(seg.risk(), Some(RiskCategory::Karst));
    }
}
