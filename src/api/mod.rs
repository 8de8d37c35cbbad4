// ==========================================
// 隧道超前地质预报 - API 层
// ==========================================
// 职责: 提供记录编辑会话接口，供界面层调用
// ==========================================

pub mod error;
pub mod forecast_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use forecast_api::{EditSession, ForecastApi, SaveOutcome, SURFACE_MILEAGE_NAME};
