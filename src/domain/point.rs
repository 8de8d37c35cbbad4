// ==========================================
// 隧道超前地质预报 - 辅助点（子记录）
// ==========================================
// 职责: 测点/测线/电极/钻孔等按方法区分形状的子记录
// 序号: 默认按位置（位置+1），允许显式序号（如 DJ001）
// ==========================================

use crate::domain::types::{ElectrodeKind, PointKind};
use crate::engine::coercion::{get_i64, text_of};
use crate::engine::schema_registry::point_shape_of;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ==========================================
// PointError
// ==========================================
#[derive(Error, Debug)]
pub enum PointError {
    #[error("点类型不匹配: expected={expected:?}, found={found:?}")]
    ShapeMismatch { expected: PointKind, found: PointKind },

    #[error("点字段解析失败: {0}")]
    Decode(#[from] serde_json::Error),
}

// ==========================================
// 序号
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceLabel {
    /// 按当前位置编号
    #[default]
    Auto,
    /// 用户指定的序号
    Explicit(String),
}

// ==========================================
// 各形状测量值
// ==========================================

/// 陆地声呐测点
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonarPoint {
    /// 距拱顶距离
    #[serde(rename = "jgdjl", skip_serializing_if = "Option::is_none")]
    pub crown_distance: Option<f64>,
    /// 距左线距离
    #[serde(rename = "jzxjl", skip_serializing_if = "Option::is_none")]
    pub left_line_distance: Option<f64>,
}

/// 电磁波反射测线
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyLine {
    #[serde(rename = "qdzbx", skip_serializing_if = "Option::is_none")]
    pub start_x: Option<f64>,
    #[serde(rename = "qdzby", skip_serializing_if = "Option::is_none")]
    pub start_y: Option<f64>,
    #[serde(rename = "zdzbx", skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f64>,
    #[serde(rename = "zdzby", skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
}

/// 高分辨直流电电极
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Electrode {
    /// 1 供电电极 / 2 测量电极
    #[serde(rename = "gfbzldResultinfoType", skip_serializing_if = "Option::is_none")]
    pub kind: Option<i64>,
    /// 距掌子面距离
    #[serde(rename = "jzzmjl", skip_serializing_if = "Option::is_none")]
    pub face_distance: Option<f64>,
}

impl Electrode {
    pub fn electrode_kind(&self) -> Option<ElectrodeKind> {
        self.kind.and_then(ElectrodeKind::from_code)
    }
}

/// 加深炮孔
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedBorehole {
    #[serde(rename = "zkwz", skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(rename = "wcj", skip_serializing_if = "Option::is_none")]
    pub outward_angle: Option<f64>,
    #[serde(rename = "zkcd", skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(rename = "dzqkjs", skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

/// 超前水平钻孔
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizontalBorehole {
    #[serde(rename = "kwbh", skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(rename = "kwpjangle", skip_serializing_if = "Option::is_none")]
    pub outward_angle: Option<f64>,
    #[serde(rename = "jgdjl", skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(rename = "zjcode", skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

// ==========================================
// PointData - 按形状区分的联合类型
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum PointData {
    Sonar(SonarPoint),
    SurveyLine(SurveyLine),
    Electrode(Electrode),
    AdvancedBorehole(AdvancedBorehole),
    HorizontalBorehole(HorizontalBorehole),
}

impl PointData {
    pub fn kind(&self) -> PointKind {
        match self {
            PointData::Sonar(_) => PointKind::SonarPoint,
            PointData::SurveyLine(_) => PointKind::SurveyLine,
            PointData::Electrode(_) => PointKind::Electrode,
            PointData::AdvancedBorehole(_) => PointKind::AdvancedBorehole,
            PointData::HorizontalBorehole(_) => PointKind::HorizontalBorehole,
        }
    }

    pub fn empty(kind: PointKind) -> Self {
        match kind {
            PointKind::SonarPoint => PointData::Sonar(SonarPoint::default()),
            PointKind::SurveyLine => PointData::SurveyLine(SurveyLine::default()),
            PointKind::Electrode => PointData::Electrode(Electrode::default()),
            PointKind::AdvancedBorehole => PointData::AdvancedBorehole(AdvancedBorehole::default()),
            PointKind::HorizontalBorehole => {
                PointData::HorizontalBorehole(HorizontalBorehole::default())
            }
        }
    }

    /// 已填写的测量值（线上字段名）
    pub fn to_wire_patch(&self) -> Map<String, Value> {
        match self {
            PointData::Sonar(v) => object_of(v),
            PointData::SurveyLine(v) => object_of(v),
            PointData::Electrode(v) => object_of(v),
            PointData::AdvancedBorehole(v) => object_of(v),
            PointData::HorizontalBorehole(v) => object_of(v),
        }
    }

    pub fn from_wire(kind: PointKind, wire: &Map<String, Value>) -> serde_json::Result<Self> {
        let clean: Map<String, Value> = point_shape_of(kind)
            .fields
            .iter()
            .filter_map(|spec| {
                wire.get(spec.key)
                    .and_then(|v| spec.lenient(v))
                    .map(|v| (spec.key.to_string(), v))
            })
            .collect();
        let clean = Value::Object(clean);
        Ok(match kind {
            PointKind::SonarPoint => PointData::Sonar(decode(clean)?),
            PointKind::SurveyLine => PointData::SurveyLine(decode(clean)?),
            PointKind::Electrode => PointData::Electrode(decode(clean)?),
            PointKind::AdvancedBorehole => PointData::AdvancedBorehole(decode(clean)?),
            PointKind::HorizontalBorehole => PointData::HorizontalBorehole(decode(clean)?),
        })
    }

    /// 叠加补丁中已填写的字段
    pub fn merge(&mut self, patch: &PointData) -> Result<(), PointError> {
        if patch.kind() != self.kind() {
            return Err(PointError::ShapeMismatch {
                expected: self.kind(),
                found: patch.kind(),
            });
        }
        let mut merged = self.to_wire_patch();
        merged.extend(patch.to_wire_patch());
        *self = PointData::from_wire(self.kind(), &merged)?;
        Ok(())
    }
}

fn object_of<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
    serde_json::from_value(value)
}

// ==========================================
// AuxiliaryPoint
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryPoint {
    /// {prefix}Pk；0 表示尚未持久化
    pub pk: i64,
    /// 父记录标识（ldsnPk / dcbfsPk / gfbzldPk / ybPk）
    pub parent_pk: i64,
    pub label: SequenceLabel,
    pub data: PointData,
    /// 未建模的线上字段
    pub extra: Map<String, Value>,
}

impl AuxiliaryPoint {
    pub fn new(data: PointData) -> Self {
        Self {
            pk: 0,
            parent_pk: 0,
            label: SequenceLabel::Auto,
            data,
            extra: Map::new(),
        }
    }

    pub fn sonar(crown_distance: f64, left_line_distance: f64) -> Self {
        Self::new(PointData::Sonar(SonarPoint {
            crown_distance: Some(crown_distance),
            left_line_distance: Some(left_line_distance),
        }))
    }

    pub fn survey_line(start: (f64, f64), end: (f64, f64)) -> Self {
        Self::new(PointData::SurveyLine(SurveyLine {
            start_x: Some(start.0),
            start_y: Some(start.1),
            end_x: Some(end.0),
            end_y: Some(end.1),
        }))
    }

    pub fn electrode(kind: ElectrodeKind, face_distance: f64) -> Self {
        Self::new(PointData::Electrode(Electrode {
            kind: Some(kind.code()),
            face_distance: Some(face_distance),
        }))
    }

    pub fn advanced_borehole(
        position: impl Into<String>,
        outward_angle: f64,
        length: f64,
        log: impl Into<String>,
    ) -> Self {
        Self::new(PointData::AdvancedBorehole(AdvancedBorehole {
            position: Some(position.into()),
            outward_angle: Some(outward_angle),
            length: Some(length),
            log: Some(log.into()),
        }))
    }

    pub fn horizontal_borehole(
        position: impl Into<String>,
        outward_angle: f64,
        length: f64,
        log: impl Into<String>,
    ) -> Self {
        Self::new(PointData::HorizontalBorehole(HorizontalBorehole {
            position: Some(position.into()),
            outward_angle: Some(outward_angle),
            length: Some(length),
            log: Some(log.into()),
        }))
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = SequenceLabel::Explicit(label.into());
        self
    }

    pub fn kind(&self) -> PointKind {
        self.data.kind()
    }

    pub fn is_persisted(&self) -> bool {
        self.pk > 0
    }

    /// 指定位置下的序号线上值（无序号字段的形状返回 None）
    pub fn label_value(&self, position: usize) -> Option<Value> {
        let rule = point_shape_of(self.kind()).label?;
        Some(match &self.label {
            SequenceLabel::Auto => rule.default_label(position),
            SequenceLabel::Explicit(s) => rule.explicit_label(s),
        })
    }

    /// 从线上对象解析；序号等于位置默认值时记为 Auto
    pub fn from_wire(
        kind: PointKind,
        position: usize,
        wire: &Map<String, Value>,
    ) -> serde_json::Result<Self> {
        let shape = point_shape_of(kind);
        let label = match shape.label {
            Some(rule) => match wire.get(rule.key()) {
                None | Some(Value::Null) => SequenceLabel::Auto,
                Some(v) if *v == rule.default_label(position) => SequenceLabel::Auto,
                Some(v) => {
                    let text = text_of(v);
                    if text.trim().is_empty() {
                        SequenceLabel::Auto
                    } else {
                        SequenceLabel::Explicit(text)
                    }
                }
            },
            None => SequenceLabel::Auto,
        };

        let mut modelled: Vec<&str> = vec![shape.pk_key, shape.id_key, shape.parent_key];
        if let Some(rule) = shape.label {
            modelled.push(rule.key());
        }
        modelled.extend(shape.fields.iter().map(|f| f.key));
        let extra = wire
            .iter()
            .filter(|(k, _)| !modelled.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            pk: get_i64(wire, shape.pk_key).unwrap_or(0),
            parent_pk: get_i64(wire, shape.parent_key).unwrap_or(0),
            label,
            data: PointData::from_wire(kind, wire)?,
            extra,
        })
    }

    /// 线上对象（{prefix}Id = 位置+1）
    pub fn to_wire(&self, position: usize) -> Map<String, Value> {
        let shape = point_shape_of(self.kind());
        let mut map = self.extra.clone();
        map.insert(shape.pk_key.to_string(), Value::from(self.pk));
        map.insert(shape.id_key.to_string(), Value::from((position + 1) as i64));
        map.insert(shape.parent_key.to_string(), Value::from(self.parent_pk));
        if let (Some(rule), Some(label)) = (shape.label, self.label_value(position)) {
            map.insert(rule.key().to_string(), label);
        }
        map.extend(self.data.to_wire_patch());
        map
    }

    pub fn apply(&mut self, patch: &PointPatch) -> Result<(), PointError> {
        if let Some(data) = &patch.data {
            self.data.merge(data)?;
        }
        if let Some(label) = &patch.label {
            self.label = label.clone();
        }
        Ok(())
    }
}

// ==========================================
// PointPatch - 编辑输入
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointPatch {
    pub label: Option<SequenceLabel>,
    /// 仅已填写字段生效
    pub data: Option<PointData>,
}

impl PointPatch {
    pub fn data(data: PointData) -> Self {
        Self {
            label: None,
            data: Some(data),
        }
    }

    pub fn label(label: SequenceLabel) -> Self {
        Self {
            label: Some(label),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_electrode_labels() {
        let auto = AuxiliaryPoint::electrode(ElectrodeKind::Measurement, 12.5);
        assert_eq!(auto.label_value(0), Some(json!("DJ001")));
        assert_eq!(auto.label_value(9), Some(json!("DJ010")));

        let manual = AuxiliaryPoint::electrode(ElectrodeKind::PowerSupply, 3.0).with_label("DJ105");
        assert_eq!(manual.label_value(0), Some(json!("DJ105")));
    }

    #[test]
    fn test_borehole_has_no_label() {
        let hole = AuxiliaryPoint::advanced_borehole("拱顶", 5.0, 30.0, "完整");
        assert_eq!(hole.label_value(0), None);

        let wire = hole.to_wire(2);
        assert_eq!(wire.get("jspkZkzzId"), Some(&json!(3)));
        assert_eq!(wire.get("zkwz"), Some(&json!("拱顶")));
        assert_eq!(wire.get("jspkZkzzPk"), Some(&json!(0)));
    }

    #[test]
    fn test_from_wire_detects_explicit_label() {
        let auto = json!({ "ldsnResultinfoPk": 4, "cdxh": 2, "jgdjl": "1.5" });
        let p = AuxiliaryPoint::from_wire(PointKind::SonarPoint, 1, auto.as_object().unwrap())
            .unwrap();
        assert_eq!(p.label, SequenceLabel::Auto);
        assert_eq!(p.pk, 4);
        assert!(p.is_persisted());

        let manual = json!({ "cdxh": 9 });
        let p = AuxiliaryPoint::from_wire(PointKind::SonarPoint, 1, manual.as_object().unwrap())
            .unwrap();
        assert_eq!(p.label, SequenceLabel::Explicit("9".to_string()));
    }

    #[test]
    fn test_merge_only_given_fields() {
        let mut line = AuxiliaryPoint::survey_line((0.0, 1.0), (10.0, 11.0));
        let patch = PointData::SurveyLine(SurveyLine {
            end_y: Some(12.0),
            ..SurveyLine::default()
        });
        line.apply(&PointPatch::data(patch)).unwrap();
        match &line.data {
            PointData::SurveyLine(v) => {
                assert_eq!(v.start_x, Some(0.0));
                assert_eq!(v.end_x, Some(10.0));
                assert_eq!(v.end_y, Some(12.0));
            }
            other => panic!("unexpected data: {:?}", other),
        }

        let wrong = PointData::Sonar(SonarPoint::default());
        assert!(matches!(
            line.apply(&PointPatch::data(wrong)),
            Err(PointError::ShapeMismatch { .. })
        ));
    }
}
