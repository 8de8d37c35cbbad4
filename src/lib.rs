// ==========================================
// 隧道超前地质预报 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + HTTP 后端
// 系统定位: 预报记录编辑（方法变体/分段/辅助点）与提交
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 注册表/子列表管理/提交构建/生命周期
pub mod engine;

// 数据网关层 - 真实后端与本地存储
pub mod gateway;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 编辑会话接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    MethodFamily, MethodTag, RiskCategory, RockGrade, SeverityColor, SubmitFlag,
};

// 领域实体
pub use domain::{
    Attachment, AuxiliaryPoint, ForecastRecord, ForecastSegment, RecordHeader, SegmentPatch,
    VariantPayload,
};

// 引擎
pub use engine::{
    schema_for, LifecycleState, PointManager, RecordLifecycle, RecordValidator, SegmentManager,
    SubmissionBuilder, WirePayload,
};

// 网关
pub use gateway::{build_gateway, DataGateway, HttpGateway, LocalGateway, SessionContext};

// API
pub use api::{ApiError, ApiResult, EditSession, ForecastApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "隧道超前地质预报";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
