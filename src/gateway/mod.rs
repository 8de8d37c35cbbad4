// ==========================================
// 隧道超前地质预报 - 数据网关层
// ==========================================
// 职责: 记录详情读取、新增、更新
// 实现: HttpGateway（真实后端）/ LocalGateway（本地 SQLite）
// 选择: 由 GatewaySettings.mode 决定，运行期不再切换
// ==========================================

pub mod envelope;
pub mod error;
pub mod http_gateway;
pub mod local_gateway;
pub mod session;
pub mod traits;

pub use envelope::{decode_envelope, extract_created_id};
pub use error::{GatewayError, GatewayResult};
pub use http_gateway::HttpGateway;
pub use local_gateway::LocalGateway;
pub use session::SessionContext;
pub use traits::{CreateOutcome, DataGateway, UpdateOutcome};

use crate::config::{GatewayMode, GatewaySettings};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::info;

/// 按配置构建网关
///
/// # 参数
/// - settings: 网关配置（模式/地址/超时）
/// - session: 登录态（仅真实后端使用）
/// - conn: 本地模式使用的数据库连接
pub fn build_gateway(
    settings: &GatewaySettings,
    session: SessionContext,
    conn: Arc<Mutex<Connection>>,
) -> GatewayResult<Arc<dyn DataGateway>> {
    let gateway: Arc<dyn DataGateway> = match settings.mode {
        GatewayMode::Real => Arc::new(HttpGateway::new(settings, session)?),
        GatewayMode::Local => Arc::new(LocalGateway::new(conn)?),
    };
    info!(
        gateway = gateway.name(),
        base_url = %settings.base_url,
        timeout_secs = settings.timeout_secs,
        "数据网关已就绪"
    );
    Ok(gateway)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn test_build_gateway_by_mode() {
        let conn = Arc::new(Mutex::new(open_in_memory().unwrap()));

        let local = GatewaySettings {
            mode: GatewayMode::Local,
            ..GatewaySettings::default()
        };
        let gateway = build_gateway(&local, SessionContext::anonymous(), conn.clone()).unwrap();
        assert_eq!(gateway.name(), "local");

        let real = GatewaySettings::default();
        let gateway = build_gateway(&real, SessionContext::anonymous(), conn).unwrap();
        assert_eq!(gateway.name(), "http");
    }
}
