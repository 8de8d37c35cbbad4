// ==========================================
// 隧道超前地质预报 - 提交载荷构建
// ==========================================
// 职责: 原记录 + 草稿基本信息 + 草稿变体 + 分段 + 辅助点 -> 线上载荷
// 红线: 纯函数，无副作用；相同输入得到完全相同的输出
// 说明: 不做校验（调用方先跑 RecordValidator），缺失字段写出为空值
// ==========================================

use crate::domain::point::AuxiliaryPoint;
use crate::domain::record::{DraftHeader, ForecastRecord};
use crate::domain::segment::{keys as seg_keys, ForecastSegment};
use crate::domain::types::{MethodTag, SubmitFlag};
use crate::domain::variant::VariantPayload;
use crate::engine::coercion::get_i64;
use crate::engine::error::BuildError;
use crate::engine::schema_registry::{
    point_shape_of, schema_for, IdentityRule, MethodSchema, METHOD_KEY, RECORD_ID_KEY, RECORD_PK_KEY,
    SEGMENT_FIELDS, SEGMENT_LIST_KEY, SUBMIT_FLAG_KEY,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

// ==========================================
// WirePayload
// ==========================================
/// 发送给数据网关的完整记录对象
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WirePayload(Map<String, Value>);

impl WirePayload {
    pub fn new(map: Map<String, Value>) -> Self {
        WirePayload(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn method(&self) -> Option<MethodTag> {
        get_i64(&self.0, METHOD_KEY).and_then(MethodTag::from_code)
    }

    pub fn record_pk(&self) -> Option<i64> {
        get_i64(&self.0, RECORD_PK_KEY)
    }

    pub fn submit_flag(&self) -> SubmitFlag {
        SubmitFlag::from_code(get_i64(&self.0, SUBMIT_FLAG_KEY).unwrap_or(0))
    }

    /// 只改 submitFlag，其他字段保持不变
    pub fn with_submit_flag(&self, flag: SubmitFlag) -> Self {
        let mut map = self.0.clone();
        map.insert(SUBMIT_FLAG_KEY.to_string(), Value::from(flag.code()));
        WirePayload(map)
    }

    /// 分段列表
    pub fn segments(&self) -> &[Value] {
        self.0
            .get(SEGMENT_LIST_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ==========================================
// SubmissionBuilder
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionBuilder;

impl SubmissionBuilder {
    pub fn new() -> Self {
        SubmissionBuilder
    }

    /// 原记录快照叠加草稿（规整前，供校验使用）
    ///
    /// 草稿中已填写的字段覆盖原值，未填写的保留原值
    pub fn merge_fields(
        original: Option<&ForecastRecord>,
        header: &DraftHeader,
        variant: &VariantPayload,
    ) -> Map<String, Value> {
        let mut merged = original.map(ForecastRecord::to_wire).unwrap_or_default();
        merged.extend(header.to_wire_patch());
        merged.extend(variant.to_wire_patch());
        merged
    }

    /// 构建提交载荷
    pub fn build(
        &self,
        method: MethodTag,
        original: Option<&ForecastRecord>,
        header: &DraftHeader,
        variant: &VariantPayload,
        segments: &[ForecastSegment],
        points: &[AuxiliaryPoint],
    ) -> Result<WirePayload, BuildError> {
        if variant.method() != method {
            return Err(BuildError::MethodMismatch {
                expected: method,
                found: variant.method(),
            });
        }
        if let Some(orig) = original {
            if orig.method != method {
                return Err(BuildError::MethodMismatch {
                    expected: method,
                    found: orig.method,
                });
            }
        }

        let schema = schema_for(method);
        let is_update = original.is_some_and(|r| r.identity.is_persisted());

        // 1-2. 原快照 + 草稿
        let mut out = Self::merge_fields(original, header, variant);
        out.insert(METHOD_KEY.to_string(), Value::from(method.code()));

        // 3. 字段规整
        for spec in schema.all_fields() {
            let coerced = spec.coerce(out.get(spec.key));
            out.insert(spec.key.to_string(), coerced);
        }

        // 4. 分段
        let segment_list = segments
            .iter()
            .map(|seg| Value::Object(Self::segment_payload(schema, is_update, seg)))
            .collect();
        out.insert(SEGMENT_LIST_KEY.to_string(), Value::Array(segment_list));

        // 5. 辅助点（序号按当前顺序重排）
        if let Some(shape) = schema.point_shape {
            let mut list = Vec::with_capacity(points.len());
            for point in points {
                if point.kind() != shape.kind {
                    warn!(
                        method = %method,
                        expected = ?shape.kind,
                        found = ?point.kind(),
                        "忽略形状不符的辅助点"
                    );
                    continue;
                }
                list.push(Value::Object(Self::point_payload(is_update, point, list.len())));
            }
            out.insert(shape.list_key.to_string(), Value::Array(list));
        } else if !points.is_empty() {
            warn!(method = %method, count = points.len(), "该方法无辅助点列表，已忽略");
        }

        for key in schema.empty_lists {
            out.insert(key.to_string(), Value::Array(Vec::new()));
        }

        // 6. 标识字段
        let identity = original.map(|r| r.identity).unwrap_or_default();
        let known_pk = identity.pk.map(Value::from);
        let known_id = identity.id.map(Value::from);
        out.insert(
            RECORD_PK_KEY.to_string(),
            schema.identity.record_pk.resolve(is_update, known_pk.as_ref()),
        );
        out.insert(
            RECORD_ID_KEY.to_string(),
            schema.identity.record_id.resolve(is_update, known_id.as_ref()),
        );
        for key in schema.identity_fields {
            let resolved = schema.identity.record_id.resolve(is_update, out.get(*key));
            out.insert(key.to_string(), resolved);
        }

        debug!(
            method = %method,
            is_update,
            segments = segments.len(),
            points = points.len(),
            "提交载荷构建完成"
        );
        Ok(WirePayload(out))
    }

    fn segment_payload(
        schema: &MethodSchema,
        is_update: bool,
        seg: &ForecastSegment,
    ) -> Map<String, Value> {
        let mut map = seg.to_wire();
        for spec in SEGMENT_FIELDS {
            let coerced = spec.coerce(map.get(spec.key));
            map.insert(spec.key.to_string(), coerced);
        }
        if let Some(grade) = map.get(seg_keys::GRADE).cloned() {
            map.insert(seg_keys::GRADE_MIRROR.to_string(), grade);
        }

        let persisted = seg.is_persisted();
        let known_pk = persisted.then(|| Value::from(seg.pk));
        let known_id = persisted.then(|| Value::from(seg.seq_id));
        let known_parent = persisted.then(|| Value::from(seg.record_pk));
        map.insert(
            seg_keys::PK.to_string(),
            schema.identity.segment_pk.resolve(is_update, known_pk.as_ref()),
        );
        map.insert(
            seg_keys::ID.to_string(),
            IdentityRule::ZERO_THEN_PRESERVE.resolve(is_update, known_id.as_ref()),
        );
        map.insert(
            seg_keys::PARENT.to_string(),
            schema
                .identity
                .segment_parent
                .resolve(is_update, known_parent.as_ref()),
        );
        map
    }

    fn point_payload(is_update: bool, point: &AuxiliaryPoint, position: usize) -> Map<String, Value> {
        let shape = point_shape_of(point.kind());
        let mut map = point.to_wire(position);
        for spec in shape.fields {
            let coerced = spec.coerce(map.get(spec.key));
            map.insert(spec.key.to_string(), coerced);
        }

        let persisted = point.is_persisted();
        let known_pk = persisted.then(|| Value::from(point.pk));
        let known_parent = persisted.then(|| Value::from(point.parent_pk));
        let rule = IdentityRule::ZERO_THEN_PRESERVE;
        map.insert(
            shape.pk_key.to_string(),
            rule.resolve(is_update, known_pk.as_ref()),
        );
        map.insert(
            shape.parent_key.to_string(),
            rule.resolve(is_update, known_parent.as_ref()),
        );
        map
    }
}
