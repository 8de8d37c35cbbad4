// ==========================================
// 隧道超前地质预报 - 预报记录编辑 API
// ==========================================
// 职责: 打开/新建记录 → 编辑草稿与子列表 → 保存/上报/撤回
// 流程: 校验 → 构建载荷 → 网关新增或更新 → 生命周期迁移 → 重新读取
// 红线: 校验或网关失败时草稿保持不变
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::attachment::{attachment_path, Attachment, NO_FILE_SENTINEL};
use crate::domain::record::{DraftHeader, ForecastRecord};
use crate::domain::types::{MethodTag, SubmitFlag};
use crate::domain::variant::VariantPayload;
use crate::engine::coercion::{format_instant, get_string};
use crate::engine::error::ListError;
use crate::engine::lifecycle::{LifecycleState, RecordLifecycle};
use crate::engine::point_manager::PointManager;
use crate::engine::schema_registry::schema_for;
use crate::engine::segment_manager::{SegmentManager, DEFAULT_MILEAGE_NAME};
use crate::engine::submission::{SubmissionBuilder, WirePayload};
use crate::engine::validator::RecordValidator;
use crate::gateway::traits::DataGateway;

/// 地表补充的默认里程冠号
pub const SURFACE_MILEAGE_NAME: &str = "X2DK";

// ==========================================
// EditSession - 单条记录的编辑会话
// ==========================================
#[derive(Debug, Clone)]
pub struct EditSession {
    method: MethodTag,
    /// 最近一次读取/保存后的记录快照
    original: Option<ForecastRecord>,
    draft_header: DraftHeader,
    draft_variant: VariantPayload,
    segments: SegmentManager,
    points: Option<PointManager>,
    lifecycle: RecordLifecycle,
}

impl EditSession {
    fn empty(method: MethodTag, validator: RecordValidator) -> Self {
        Self {
            method,
            original: None,
            draft_header: DraftHeader::default(),
            draft_variant: VariantPayload::empty(method),
            segments: SegmentManager::new(validator),
            points: PointManager::new(method).ok(),
            lifecycle: RecordLifecycle::new(),
        }
    }

    /// 以记录快照重置会话（草稿清空，子列表取记录中的值）
    fn reload(&mut self, record: ForecastRecord, validator: RecordValidator) {
        let mut segments = SegmentManager::from_segments(record.segments.clone(), validator);
        if let Some(name) = record.header.mileage_name.as_deref() {
            segments.set_default_mileage_name(name);
        }
        self.points = PointManager::from_points(self.method, record.points.clone()).ok();
        self.segments = segments;
        self.draft_header = DraftHeader::default();
        self.draft_variant = VariantPayload::empty(self.method);
        self.original = Some(record);
    }

    pub fn method(&self) -> MethodTag {
        self.method
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn record_id(&self) -> Option<i64> {
        self.lifecycle.record_id()
    }

    pub fn original(&self) -> Option<&ForecastRecord> {
        self.original.as_ref()
    }

    pub fn lifecycle(&self) -> &RecordLifecycle {
        &self.lifecycle
    }

    pub fn draft_header(&self) -> &DraftHeader {
        &self.draft_header
    }

    pub fn header_mut(&mut self) -> &mut DraftHeader {
        &mut self.draft_header
    }

    pub fn set_draft_header(&mut self, header: DraftHeader) {
        self.draft_header = header;
    }

    pub fn draft_variant(&self) -> &VariantPayload {
        &self.draft_variant
    }

    /// 替换变体草稿（方法必须与会话一致）
    pub fn set_draft_variant(&mut self, variant: VariantPayload) -> ApiResult<()> {
        if variant.method() != self.method {
            return Err(ApiError::MethodMismatch {
                expected: self.method,
                found: variant.method(),
            });
        }
        self.draft_variant = variant;
        Ok(())
    }

    pub fn segments(&self) -> &SegmentManager {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut SegmentManager {
        &mut self.segments
    }

    pub fn points(&self) -> Option<&PointManager> {
        self.points.as_ref()
    }

    pub fn points_mut(&mut self) -> ApiResult<&mut PointManager> {
        let method = self.method;
        self.points
            .as_mut()
            .ok_or_else(|| ListError::NoPointList(method).into())
    }

    /// 当前显示值（草稿优先，其次原记录）
    pub fn field_value(&self, key: &str) -> Option<String> {
        let merged = SubmissionBuilder::merge_fields(
            self.original.as_ref(),
            &self.draft_header,
            &self.draft_variant,
        );
        get_string(&merged, key)
    }

    /// 附件字段及其访问路径（无文件/占位值时路径为 None）
    pub fn attachments(&self) -> Vec<(&'static str, Attachment, Option<String>)> {
        let site_id = self.field_value("siteId").unwrap_or_default();
        let record_id = self.record_id();
        schema_for(self.method)
            .attachment_keys()
            .into_iter()
            .map(|key| {
                let value = self.field_value(key);
                let file = Attachment::from_field(value.as_deref());
                if value.as_deref().map(str::trim) == Some(NO_FILE_SENTINEL) {
                    warn!(method = %self.method, field = key, "附件字段为后端占位值");
                }
                let path = record_id.and_then(|id| attachment_path(&site_id, self.method, id, &file));
                (key, file, path)
            })
            .collect()
    }

    fn sync_submit_flag(&mut self, flag: SubmitFlag) {
        self.draft_header.submit_flag = None;
        if let Some(record) = self.original.as_mut() {
            record.header.submit_flag = Some(flag.code());
        }
    }
}

/// 保存结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub record_id: i64,
    pub created: bool,
    pub state: LifecycleState,
}

// ==========================================
// ForecastApi - 预报记录编辑 API
// ==========================================

/// 预报记录编辑API
///
/// 职责：
/// 1. 新建草稿 / 打开已有记录
/// 2. 保存前校验与载荷构建
/// 3. 新增、更新、上报、撤回
pub struct ForecastApi {
    gateway: Arc<dyn DataGateway>,
    validator: RecordValidator,
    builder: SubmissionBuilder,
}

impl ForecastApi {
    /// 创建新的ForecastApi实例
    ///
    /// # 参数
    /// - gateway: 数据网关
    /// - conclusion_max_len: 分段结论最大长度（来自配置）
    pub fn new(gateway: Arc<dyn DataGateway>, conclusion_max_len: usize) -> Self {
        Self {
            gateway,
            validator: RecordValidator::new(conclusion_max_len),
            builder: SubmissionBuilder::new(),
        }
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    /// 新建草稿
    ///
    /// 预填: 工点、里程冠号、监测/填报时间（当前时间）、submitFlag=0
    pub fn new_draft(&self, method: MethodTag, site_id: &str) -> ApiResult<EditSession> {
        if site_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("工点ID不能为空".to_string()));
        }

        let mileage_name = if method == MethodTag::SurfaceSupplement {
            SURFACE_MILEAGE_NAME
        } else {
            DEFAULT_MILEAGE_NAME
        };
        let now = format_instant(&Utc::now());

        let mut session = EditSession::empty(method, self.validator);
        session.draft_header = DraftHeader {
            site_id: Some(site_id.trim().to_string()),
            mileage_name: Some(mileage_name.to_string()),
            monitor_date: Some(now.clone()),
            create_date: Some(now),
            submit_flag: Some(SubmitFlag::Draft.code()),
            ..DraftHeader::default()
        };
        session.segments.set_default_mileage_name(mileage_name);
        Ok(session)
    }

    /// 打开已有记录
    ///
    /// # 参数
    /// - record_id: 记录主键
    /// - method_hint: 已知方法（物探法详情接口需要）
    pub async fn open(
        &self,
        record_id: i64,
        method_hint: Option<MethodTag>,
    ) -> ApiResult<EditSession> {
        if record_id <= 0 {
            return Err(ApiError::InvalidInput(format!("无效的记录标识: {}", record_id)));
        }

        let record = self.gateway.fetch_detail(record_id, method_hint).await?;
        if let Some(hint) = method_hint {
            if hint != record.method {
                return Err(ApiError::MethodMismatch {
                    expected: hint,
                    found: record.method,
                });
            }
        }

        let mut session = EditSession::empty(record.method, self.validator);
        session.reload(record, self.validator);
        let payload = self.build_payload(&session)?;
        if let Some(record) = session.original.as_ref() {
            session.lifecycle = RecordLifecycle::from_record(record, payload);
        }
        info!(
            record_id,
            method = %session.method,
            state = %session.state(),
            "记录已打开"
        );
        Ok(session)
    }

    /// 保存（新增或更新）
    pub async fn save(&self, session: &mut EditSession) -> ApiResult<SaveOutcome> {
        let method = session.method;
        let segments = session.segments.snapshot();
        let points = session
            .points
            .as_ref()
            .map(PointManager::snapshot)
            .unwrap_or_default();

        let merged = SubmissionBuilder::merge_fields(
            session.original.as_ref(),
            &session.draft_header,
            &session.draft_variant,
        );
        self.validator.validate(method, &merged, &segments, &points)?;
        let payload = self.builder.build(
            method,
            session.original.as_ref(),
            &session.draft_header,
            &session.draft_variant,
            &segments,
            &points,
        )?;

        let (record_id, created) = match session.lifecycle.record_id() {
            None => {
                let outcome = self.gateway.create(method, &payload).await?;
                let Some(id) = outcome.id.filter(|_| outcome.success) else {
                    warn!(method = %method, "新增后未获得记录标识，保持新建状态");
                    return Err(ApiError::DegradedResponse(
                        "新增成功但后端未返回记录标识".to_string(),
                    ));
                };
                session.lifecycle.on_created(id, payload.clone())?;
                (id, true)
            }
            Some(id) => {
                let outcome = self.gateway.update(method, id, &payload).await?;
                if !outcome.success {
                    return Err(ApiError::DegradedResponse("更新未成功".to_string()));
                }
                session.lifecycle.on_updated(payload.clone())?;
                (id, false)
            }
        };

        self.refresh(session, record_id, &payload).await?;
        info!(
            record_id,
            method = %method,
            created,
            state = %session.state(),
            "记录保存成功"
        );
        Ok(SaveOutcome {
            record_id,
            created,
            state: session.state(),
        })
    }

    /// 上报（submitFlag=1，其余沿用上次完整载荷）
    pub async fn submit(&self, session: &mut EditSession) -> ApiResult<LifecycleState> {
        let payload = session.lifecycle.submit_payload()?;
        self.send_flag(session, payload, SubmitFlag::Submitted).await
    }

    /// 撤回（submitFlag=0，其余沿用上次完整载荷）
    pub async fn withdraw(&self, session: &mut EditSession) -> ApiResult<LifecycleState> {
        let payload = session.lifecycle.withdraw_payload()?;
        self.send_flag(session, payload, SubmitFlag::Draft).await
    }

    async fn send_flag(
        &self,
        session: &mut EditSession,
        payload: WirePayload,
        flag: SubmitFlag,
    ) -> ApiResult<LifecycleState> {
        let record_id = session
            .lifecycle
            .record_id()
            .ok_or_else(|| ApiError::InvalidInput("记录尚未保存".to_string()))?;

        let outcome = self.gateway.update(session.method, record_id, &payload).await?;
        if !outcome.success {
            return Err(ApiError::DegradedResponse("状态更新未成功".to_string()));
        }
        match flag {
            SubmitFlag::Submitted => session.lifecycle.on_submitted(payload),
            SubmitFlag::Draft => session.lifecycle.on_withdrawn(payload),
        }
        session.sync_submit_flag(flag);
        Ok(session.state())
    }

    /// 保存后重新读取；读取失败时以已发送的载荷作为快照
    async fn refresh(
        &self,
        session: &mut EditSession,
        record_id: i64,
        sent: &WirePayload,
    ) -> ApiResult<()> {
        let record = match self.gateway.fetch_detail(record_id, Some(session.method)).await {
            Ok(record) => record,
            Err(e) => {
                warn!(record_id, error = %e, "保存后重新读取失败，使用本地载荷");
                let mut record = ForecastRecord::from_wire(Some(session.method), &sent.to_value())
                    .map_err(|e| ApiError::InternalError(e.to_string()))?;
                if !record.identity.is_persisted() {
                    record.identity.pk = Some(record_id);
                }
                record
            }
        };

        session.reload(record, self.validator);
        let payload = self.build_payload(session)?;
        session.lifecycle.refresh_payload(payload);
        Ok(())
    }

    /// 以当前快照（无草稿修改）构建完整载荷
    fn build_payload(&self, session: &EditSession) -> ApiResult<WirePayload> {
        let points = session
            .points
            .as_ref()
            .map(PointManager::snapshot)
            .unwrap_or_default();
        let payload = self.builder.build(
            session.method,
            session.original.as_ref(),
            &session.draft_header,
            &session.draft_variant,
            &session.segments.snapshot(),
            &points,
        )?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::local_gateway::LocalGateway;

    fn api() -> ForecastApi {
        ForecastApi::new(Arc::new(LocalGateway::in_memory().unwrap()), 500)
    }

    #[test]
    fn test_new_draft_defaults() {
        let api = api();
        let session = api.new_draft(MethodTag::SurfaceSupplement, "S-01").unwrap();
        assert_eq!(session.state(), LifecycleState::New);
        assert_eq!(session.draft_header().mileage_name.as_deref(), Some("X2DK"));
        assert_eq!(session.draft_header().submit_flag, Some(0));
        assert!(session.draft_header().monitor_date.is_some());
        assert!(session.points().is_none());

        let session = api.new_draft(MethodTag::HighResResistivity, "S-01").unwrap();
        assert_eq!(session.draft_header().mileage_name.as_deref(), Some("DK"));
        assert!(session.points().is_some());

        assert!(matches!(
            api.new_draft(MethodTag::Tsp, " "),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_new_draft_dates_are_utc() {
        let before = format_instant(&Utc::now());
        let session = api().new_draft(MethodTag::TransientEm, "S-01").unwrap();
        let after = format_instant(&Utc::now());

        let monitor = session.draft_header().monitor_date.clone().unwrap();
        assert!(before <= monitor && monitor <= after, "{} 不在 UTC 区间内", monitor);
        assert_eq!(session.draft_header().create_date.as_deref(), Some(monitor.as_str()));
    }

    #[test]
    fn test_set_variant_of_other_method() {
        let mut session = api().new_draft(MethodTag::Tsp, "S-01").unwrap();
        let err = session
            .set_draft_variant(VariantPayload::empty(MethodTag::Hsp))
            .unwrap_err();
        assert!(matches!(err, ApiError::MethodMismatch { .. }));
        assert!(matches!(session.points_mut(), Err(ApiError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_save_blocked_by_validation() {
        let api = api();
        let mut session = api.new_draft(MethodTag::Other, "S-01").unwrap();
        let err = api.save(&mut session).await.unwrap_err();
        let fields = err.invalid_fields();
        assert!(fields.contains(&"dkilo"));
        assert!(fields.contains(&"ybLength"));
        assert_eq!(session.state(), LifecycleState::New);
        assert_eq!(session.draft_header().site_id.as_deref(), Some("S-01"));
    }

    #[tokio::test]
    async fn test_submit_requires_saved_record() {
        let api = api();
        let mut session = api.new_draft(MethodTag::Other, "S-01").unwrap();
        let err = api.submit(&mut session).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
    }
}
