// ==========================================
// 隧道超前地质预报 - 预报记录（聚合根）
// ==========================================
// 职责: 基本信息 + 方法变体 + 分段列表 + 辅助点列表
// 线上格式: 扁平 JSON 对象（基本信息与变体字段同级，子列表为 …DTOList）
// ==========================================

use crate::domain::point::AuxiliaryPoint;
use crate::domain::segment::ForecastSegment;
use crate::domain::types::{MethodTag, SubmitFlag};
use crate::domain::variant::VariantPayload;
use crate::engine::coercion::get_i64;
use crate::engine::schema_registry::{
    schema_for, HEADER_FIELDS, METHOD_KEY, RECORD_ID_KEY, RECORD_PK_KEY, SEGMENT_DETAIL_LIST_KEYS,
    SEGMENT_LIST_KEY,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ==========================================
// 人员信息
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personnel {
    pub name: Option<String>,
    pub id_number: Option<String>,
    pub phone: Option<String>,
}

// ==========================================
// RecordHeader - 基本信息
// ==========================================
// 所有字段可缺省：作为草稿时 None 表示“未修改”
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordHeader {
    #[serde(rename = "siteId", skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    /// 里程冠号（如 DK）
    #[serde(rename = "dkname", skip_serializing_if = "Option::is_none")]
    pub mileage_name: Option<String>,
    #[serde(rename = "dkilo", skip_serializing_if = "Option::is_none")]
    pub mileage: Option<f64>,
    /// 里程的米以下部分
    #[serde(rename = "dkiloPlus", skip_serializing_if = "Option::is_none")]
    pub mileage_plus: Option<f64>,
    #[serde(rename = "ybLength", skip_serializing_if = "Option::is_none")]
    pub forecast_length: Option<f64>,
    #[serde(rename = "monitordate", skip_serializing_if = "Option::is_none")]
    pub monitor_date: Option<String>,
    #[serde(rename = "createdate", skip_serializing_if = "Option::is_none")]
    pub create_date: Option<String>,

    #[serde(rename = "testname", skip_serializing_if = "Option::is_none")]
    pub tester_name: Option<String>,
    #[serde(rename = "testno", skip_serializing_if = "Option::is_none")]
    pub tester_id: Option<String>,
    #[serde(rename = "testtel", skip_serializing_if = "Option::is_none")]
    pub tester_phone: Option<String>,
    #[serde(rename = "monitorname", skip_serializing_if = "Option::is_none")]
    pub reviewer_name: Option<String>,
    #[serde(rename = "monitorno", skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<String>,
    #[serde(rename = "monitortel", skip_serializing_if = "Option::is_none")]
    pub reviewer_phone: Option<String>,
    #[serde(rename = "supervisorname", skip_serializing_if = "Option::is_none")]
    pub supervisor_name: Option<String>,
    #[serde(rename = "supervisorno", skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<String>,
    #[serde(rename = "supervisortel", skip_serializing_if = "Option::is_none")]
    pub supervisor_phone: Option<String>,

    #[serde(rename = "conclusionyb", skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(rename = "suggestion", skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(rename = "solution", skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(rename = "remark", skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,

    /// 有效标记
    #[serde(rename = "flag", skip_serializing_if = "Option::is_none")]
    pub flag: Option<i64>,
    #[serde(rename = "submitFlag", skip_serializing_if = "Option::is_none")]
    pub submit_flag: Option<i64>,
}

/// 草稿基本信息：None 字段保留原记录的值
pub type DraftHeader = RecordHeader;

impl RecordHeader {
    pub fn tester(&self) -> Personnel {
        Personnel {
            name: self.tester_name.clone(),
            id_number: self.tester_id.clone(),
            phone: self.tester_phone.clone(),
        }
    }

    pub fn reviewer(&self) -> Personnel {
        Personnel {
            name: self.reviewer_name.clone(),
            id_number: self.reviewer_id.clone(),
            phone: self.reviewer_phone.clone(),
        }
    }

    pub fn supervisor(&self) -> Personnel {
        Personnel {
            name: self.supervisor_name.clone(),
            id_number: self.supervisor_id.clone(),
            phone: self.supervisor_phone.clone(),
        }
    }

    pub fn set_tester(&mut self, p: Personnel) {
        self.tester_name = p.name;
        self.tester_id = p.id_number;
        self.tester_phone = p.phone;
    }

    pub fn set_reviewer(&mut self, p: Personnel) {
        self.reviewer_name = p.name;
        self.reviewer_id = p.id_number;
        self.reviewer_phone = p.phone;
    }

    pub fn set_supervisor(&mut self, p: Personnel) {
        self.supervisor_name = p.name;
        self.supervisor_id = p.id_number;
        self.supervisor_phone = p.phone;
    }

    pub fn submit_state(&self) -> SubmitFlag {
        SubmitFlag::from_code(self.submit_flag.unwrap_or(0))
    }

    /// 已填写字段（线上字段名）
    pub fn to_wire_patch(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// 从线上对象解析（按注册表宽松规整）
    pub fn from_wire(wire: &Map<String, Value>) -> serde_json::Result<Self> {
        let clean: Map<String, Value> = HEADER_FIELDS
            .iter()
            .filter_map(|spec| {
                wire.get(spec.key)
                    .and_then(|v| spec.lenient(v))
                    .map(|v| (spec.key.to_string(), v))
            })
            .collect();
        serde_json::from_value(Value::Object(clean))
    }
}

// ==========================================
// RecordIdentity - 记录标识
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIdentity {
    /// ybPk；未创建为 None
    pub pk: Option<i64>,
    /// ybId
    pub id: Option<i64>,
}

impl RecordIdentity {
    pub fn persisted(pk: i64) -> Self {
        Self {
            pk: Some(pk),
            id: None,
        }
    }

    /// 后端分配的正整数标识才视为已持久化
    pub fn is_persisted(&self) -> bool {
        matches!(self.pk, Some(pk) if pk > 0)
    }
}

// ==========================================
// RecordDecodeError
// ==========================================
#[derive(Error, Debug)]
pub enum RecordDecodeError {
    #[error("记录不是 JSON 对象")]
    NotAnObject,

    #[error("无法确定预报方法: method={0}")]
    UnknownMethod(String),

    #[error("字段解析失败: {0}")]
    Field(#[from] serde_json::Error),
}

// ==========================================
// ForecastRecord - 聚合根
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub identity: RecordIdentity,
    pub method: MethodTag,
    pub header: RecordHeader,
    pub variant: VariantPayload,
    pub segments: Vec<ForecastSegment>,
    pub points: Vec<AuxiliaryPoint>,
    /// 未建模的线上字段（方法级标识、后端附加字段），原样保留
    pub extra: Map<String, Value>,
}

impl ForecastRecord {
    /// 内存中的新记录: 无标识，submitFlag=0
    pub fn new(method: MethodTag) -> Self {
        Self {
            identity: RecordIdentity::default(),
            method,
            header: RecordHeader {
                submit_flag: Some(SubmitFlag::Draft.code()),
                ..RecordHeader::default()
            },
            variant: VariantPayload::empty(method),
            segments: Vec::new(),
            points: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn submit_state(&self) -> SubmitFlag {
        self.header.submit_state()
    }

    /// 解析详情对象
    ///
    /// - method_hint: 详情中缺少 method 字段时使用；
    ///   method 编码所属大类与提示不一致时（素描接口返回 7/8 等）以提示为准
    /// - 分段/点列表接受 …VOList 与 …DTOList 两种命名
    pub fn from_wire(method_hint: Option<MethodTag>, wire: &Value) -> Result<Self, RecordDecodeError> {
        let map = wire.as_object().ok_or(RecordDecodeError::NotAnObject)?;

        let method = match map.get(METHOD_KEY) {
            Some(v) if !v.is_null() => {
                let coded = get_i64(map, METHOD_KEY).and_then(MethodTag::from_code);
                match (coded, method_hint) {
                    (Some(m), Some(hint)) if m.family() != hint.family() => hint,
                    (Some(m), _) => m,
                    (None, hint) => {
                        hint.ok_or_else(|| RecordDecodeError::UnknownMethod(v.to_string()))?
                    }
                }
            }
            _ => method_hint.ok_or_else(|| RecordDecodeError::UnknownMethod("null".to_string()))?,
        };
        let schema = schema_for(method);

        let identity = RecordIdentity {
            pk: get_i64(map, RECORD_PK_KEY),
            id: get_i64(map, RECORD_ID_KEY),
        };
        let header = RecordHeader::from_wire(map)?;
        let variant = VariantPayload::from_wire(method, map)?;

        let segments = list_of(map, SEGMENT_LIST_KEY, &SEGMENT_DETAIL_LIST_KEYS)
            .iter()
            .filter_map(Value::as_object)
            .map(ForecastSegment::from_wire)
            .collect();

        let points = match schema.point_shape {
            Some(shape) => list_of(map, shape.list_key, &[shape.detail_list_key])
                .iter()
                .filter_map(Value::as_object)
                .enumerate()
                .map(|(pos, obj)| AuxiliaryPoint::from_wire(shape.kind, pos, obj))
                .collect::<serde_json::Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let mut extra = Map::new();
        for (k, v) in map {
            if is_modelled_key(method, k) {
                continue;
            }
            extra.insert(k.clone(), v.clone());
        }

        Ok(Self {
            identity,
            method,
            header,
            variant,
            segments,
            points,
            extra,
        })
    }

    /// 还原为线上对象（不做规整，作为提交构建的原始快照）
    pub fn to_wire(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        if let Some(pk) = self.identity.pk {
            map.insert(RECORD_PK_KEY.to_string(), Value::from(pk));
        }
        if let Some(id) = self.identity.id {
            map.insert(RECORD_ID_KEY.to_string(), Value::from(id));
        }
        map.insert(METHOD_KEY.to_string(), Value::from(self.method.code()));
        map.extend(self.header.to_wire_patch());
        map.extend(self.variant.to_wire_patch());
        map.insert(
            SEGMENT_LIST_KEY.to_string(),
            Value::Array(
                self.segments
                    .iter()
                    .map(|s| Value::Object(s.to_wire()))
                    .collect(),
            ),
        );
        if let Some(shape) = schema_for(self.method).point_shape {
            map.insert(
                shape.list_key.to_string(),
                Value::Array(
                    self.points
                        .iter()
                        .enumerate()
                        .map(|(pos, p)| Value::Object(p.to_wire(pos)))
                        .collect(),
                ),
            );
        }
        map
    }
}

fn list_of<'a>(map: &'a Map<String, Value>, primary: &str, alternates: &[&str]) -> &'a [Value] {
    std::iter::once(primary)
        .chain(alternates.iter().copied())
        .find_map(|k| map.get(k).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn is_modelled_key(method: MethodTag, key: &str) -> bool {
    let schema = schema_for(method);
    if key == RECORD_PK_KEY || key == RECORD_ID_KEY || key == METHOD_KEY {
        return true;
    }
    if key == SEGMENT_LIST_KEY || SEGMENT_DETAIL_LIST_KEYS.contains(&key) {
        return true;
    }
    if let Some(shape) = schema.point_shape {
        if key == shape.list_key || key == shape.detail_list_key {
            return true;
        }
    }
    schema.field(key).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hsp_detail() -> Value {
        json!({
            "ybPk": 88,
            "ybId": 3,
            "hspPk": 12,
            "hspId": 4,
            "siteId": 1001,
            "method": 2,
            "dkname": "DK",
            "dkilo": "713.5",
            "ybLength": 30,
            "monitordate": "2024-03-01 08:00:00",
            "conclusionyb": "围岩较完整",
            "submitFlag": 1,
            "cqnum": 2,
            "cdnum": "24",
            "jsfs": "单点",
            "sbName": "HSP-206",
            "pic1": "1",
            "ybjgVOList": [
                {
                    "ybjgPk": 501,
                    "ybjgId": 1,
                    "ybPk": 88,
                    "dkname": "DK",
                    "sdkilo": 713.5,
                    "edkilo": 733.5,
                    "ybjgTime": "2024-03-01T08:00:00.000Z",
                    "risklevel": "涌水",
                    "dzjb": "yellow",
                    "wylevel": 4,
                    "jlresult": "局部渗水"
                }
            ],
            "updateTime": "2024-03-02T10:00:00"
        })
    }

    #[test]
    fn test_decode_detail() {
        let record = ForecastRecord::from_wire(None, &hsp_detail()).unwrap();

        assert_eq!(record.method, MethodTag::Hsp);
        assert_eq!(record.identity.pk, Some(88));
        assert!(record.identity.is_persisted());
        assert_eq!(record.header.site_id.as_deref(), Some("1001"));
        assert_eq!(record.header.mileage, Some(713.5));
        assert_eq!(record.header.monitor_date.as_deref(), Some("2024-03-01T08:00:00"));
        assert_eq!(record.submit_state(), SubmitFlag::Submitted);

        match &record.variant {
            VariantPayload::Hsp(v) => {
                assert_eq!(v.point_count, Some(24));
                assert_eq!(v.layout_picture.as_deref(), Some("1"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }

        assert_eq!(record.segments.len(), 1);
        assert_eq!(record.segments[0].pk, 501);

        // 方法级标识与后端附加字段进入 extra
        assert_eq!(record.extra.get("hspPk"), Some(&json!(12)));
        assert_eq!(record.extra.get("updateTime"), Some(&json!("2024-03-02T10:00:00")));
        assert!(!record.extra.contains_key("ybjgVOList"));
    }

    #[test]
    fn test_method_hint_used_when_missing() {
        let wire = json!({ "ybPk": 5, "dkname": "DK" });
        let record = ForecastRecord::from_wire(Some(MethodTag::MicroSeismic), &wire).unwrap();
        assert_eq!(record.method, MethodTag::MicroSeismic);

        assert!(matches!(
            ForecastRecord::from_wire(None, &wire),
            Err(RecordDecodeError::UnknownMethod(_))
        ));
        assert!(matches!(
            ForecastRecord::from_wire(None, &json!([1, 2])),
            Err(RecordDecodeError::NotAnObject)
        ));
    }

    #[test]
    fn test_hint_wins_across_method_families() {
        // 素描接口的 method 编码与物探法编码重叠
        let wire = json!({ "ybPk": 21, "method": 7, "dkname": "DK" });
        let record = ForecastRecord::from_wire(Some(MethodTag::FaceSketch), &wire).unwrap();
        assert_eq!(record.method, MethodTag::FaceSketch);

        let wire = json!({ "ybPk": 22, "method": 8, "dkname": "DK" });
        let record = ForecastRecord::from_wire(Some(MethodTag::TunnelBodySketch), &wire).unwrap();
        assert_eq!(record.method, MethodTag::TunnelBodySketch);

        // 同一大类内以记录自身的编码为准
        let wire = json!({ "ybPk": 23, "method": 7, "dkname": "DK" });
        let record = ForecastRecord::from_wire(Some(MethodTag::Tsp), &wire).unwrap();
        assert_eq!(record.method, MethodTag::MicroSeismic);
        let record = ForecastRecord::from_wire(None, &wire).unwrap();
        assert_eq!(record.method, MethodTag::MicroSeismic);
    }

    #[test]
    fn test_to_wire_uses_dto_list_names() {
        let record = ForecastRecord::from_wire(None, &hsp_detail()).unwrap();
        let wire = record.to_wire();

        assert!(wire.contains_key("ybjgDTOList"));
        assert!(!wire.contains_key("ybjgVOList"));
        assert_eq!(wire.get("method"), Some(&json!(2)));
        assert_eq!(wire.get("hspId"), Some(&json!(4)));
        assert_eq!(wire.get("cdnum"), Some(&json!(24)));
    }

    #[test]
    fn test_new_record_is_draft() {
        let record = ForecastRecord::new(MethodTag::TransientEm);
        assert!(!record.identity.is_persisted());
        assert_eq!(record.submit_state(), SubmitFlag::Draft);
        assert!(record.segments.is_empty());
    }

    #[test]
    fn test_personnel_blocks() {
        let mut header = RecordHeader::default();
        header.set_supervisor(Personnel {
            name: Some("王工".to_string()),
            id_number: None,
            phone: Some("13800000000".to_string()),
        });
        assert_eq!(header.supervisor().name.as_deref(), Some("王工"));
        assert_eq!(header.tester(), Personnel::default());
        assert_eq!(
            header.to_wire_patch().get("supervisortel"),
            Some(&json!("13800000000"))
        );
    }
}
