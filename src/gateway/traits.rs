// ==========================================
// 隧道超前地质预报 - 数据网关 Trait
// ==========================================
// 职责: 定义记录读写接口（详情/新增/更新）
// 实现者: HttpGateway（真实后端）、LocalGateway（本地 SQLite）
// 红线: 网关不含业务规则，载荷原样发送
// ==========================================

use crate::domain::record::ForecastRecord;
use crate::domain::types::MethodTag;
use crate::engine::submission::WirePayload;
use crate::gateway::error::GatewayResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 新增结果（id 缺失属于后端数据异常，由调用方降级处理）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOutcome {
    pub success: bool,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub success: bool,
}

#[async_trait]
pub trait DataGateway: Send + Sync {
    /// 读取记录详情（含分段与辅助点）
    ///
    /// # 参数
    /// - record_id: 记录主键
    /// - method_hint: 已知方法时用于选择接口/补全 method 字段
    async fn fetch_detail(
        &self,
        record_id: i64,
        method_hint: Option<MethodTag>,
    ) -> GatewayResult<ForecastRecord>;

    /// 新增记录
    async fn create(&self, method: MethodTag, payload: &WirePayload)
        -> GatewayResult<CreateOutcome>;

    /// 更新记录（record_id 为更新目标，不依赖载荷中的 ybPk）
    async fn update(
        &self,
        method: MethodTag,
        record_id: i64,
        payload: &WirePayload,
    ) -> GatewayResult<UpdateOutcome>;

    /// 实现名称（日志用）
    fn name(&self) -> &'static str;
}
