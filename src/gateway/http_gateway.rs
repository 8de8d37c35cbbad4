// ==========================================
// 隧道超前地质预报 - 真实后端网关（HTTP）
// ==========================================
// 接口:
//   详情  GET  {base}/{family}/{id}
//         物探法且已知方法: GET {base}/wtf/{short}?wtfPk={id}
//   新增  POST {base}/{family}
//   更新  PUT  {base}/{family}/{id}
// 鉴权: Bearer 令牌（来自注入的 SessionContext）
// ==========================================

use crate::config::GatewaySettings;
use crate::domain::record::ForecastRecord;
use crate::domain::types::{MethodFamily, MethodTag};
use crate::engine::submission::WirePayload;
use crate::gateway::envelope::{decode_envelope, extract_created_id};
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::session::SessionContext;
use crate::gateway::traits::{CreateOutcome, DataGateway, UpdateOutcome};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

// ==========================================
// 接口地址（纯函数）
// ==========================================

/// 详情地址；未知方法时按物探法主键读取
pub fn detail_endpoint(base: &str, record_id: i64, hint: Option<MethodTag>) -> String {
    match hint {
        Some(method) if method.family() == MethodFamily::Geophysical => format!(
            "{}/{}/{}?wtfPk={}",
            base,
            MethodFamily::Geophysical.endpoint(),
            method.short_code(),
            record_id
        ),
        Some(method) => format!("{}/{}/{}", base, method.family().endpoint(), record_id),
        None => format!(
            "{}/{}/{}",
            base,
            MethodFamily::Geophysical.endpoint(),
            record_id
        ),
    }
}

pub fn collection_endpoint(base: &str, method: MethodTag) -> String {
    format!("{}/{}", base, method.family().endpoint())
}

pub fn record_endpoint(base: &str, method: MethodTag, record_id: i64) -> String {
    format!("{}/{}/{}", base, method.family().endpoint(), record_id)
}

// ==========================================
// HttpGateway
// ==========================================
pub struct HttpGateway {
    client: Client,
    base_url: String,
    session: SessionContext,
}

impl HttpGateway {
    pub fn new(settings: &GatewaySettings, session: SessionContext) -> GatewayResult<Self> {
        let base_url = settings.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(GatewayError::Config("base_url 为空".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.bearer() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// 发送请求并解析信封
    async fn send(&self, request: RequestBuilder) -> GatewayResult<Value> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::HttpStatus {
                status: status.as_u16(),
                message: status_message(status.as_u16(), &body),
            });
        }

        let raw: Value = response.json().await?;
        decode_envelope(raw)
    }
}

/// 状态码对应的提示；后端返回了 message/msg 时优先使用
fn status_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = ["message", "msg"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
        {
            return msg.to_string();
        }
    }
    match status {
        400 => "Bad request",
        401 => "Unauthorized, please login",
        403 => "Forbidden",
        404 => "Not found",
        408 => "Request timeout",
        413 => "Payload too large",
        429 => "Too many requests",
        500 => "Server error",
        502 => "Bad gateway",
        503 => "Service unavailable",
        504 => "Gateway timeout",
        _ => "Request failed",
    }
    .to_string()
}

#[async_trait]
impl DataGateway for HttpGateway {
    async fn fetch_detail(
        &self,
        record_id: i64,
        method_hint: Option<MethodTag>,
    ) -> GatewayResult<ForecastRecord> {
        let url = detail_endpoint(&self.base_url, record_id, method_hint);
        let data = self.send(self.client.get(&url)).await?;
        if data.is_null() {
            return Err(GatewayError::NotFound(record_id));
        }

        let record = ForecastRecord::from_wire(method_hint, &data)?;
        info!(
            gateway = self.name(),
            record_id,
            method = %record.method,
            segments = record.segments.len(),
            "详情读取成功"
        );
        Ok(record)
    }

    async fn create(
        &self,
        method: MethodTag,
        payload: &WirePayload,
    ) -> GatewayResult<CreateOutcome> {
        let url = collection_endpoint(&self.base_url, method);
        let data = self.send(self.client.post(&url).json(payload)).await?;

        let id = extract_created_id(&data);
        if id.is_none() {
            warn!(gateway = self.name(), method = %method, response = %data, "新增成功但未返回记录标识");
        }
        info!(gateway = self.name(), method = %method, id = ?id, "记录新增完成");
        Ok(CreateOutcome { success: true, id })
    }

    async fn update(
        &self,
        method: MethodTag,
        record_id: i64,
        payload: &WirePayload,
    ) -> GatewayResult<UpdateOutcome> {
        let url = record_endpoint(&self.base_url, method, record_id);
        self.send(self.client.put(&url).json(payload)).await?;
        info!(gateway = self.name(), method = %method, record_id, "记录更新完成");
        Ok(UpdateOutcome { success: true })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://host/api";

    #[test]
    fn test_detail_endpoints() {
        assert_eq!(
            detail_endpoint(BASE, 12, Some(MethodTag::TransientEm)),
            "http://host/api/wtf/sbdc?wtfPk=12"
        );
        assert_eq!(
            detail_endpoint(BASE, 12, Some(MethodTag::DrillingAdvanced)),
            "http://host/api/ztf/12"
        );
        assert_eq!(detail_endpoint(BASE, 12, None), "http://host/api/wtf/12");
    }

    #[test]
    fn test_write_endpoints() {
        assert_eq!(
            collection_endpoint(BASE, MethodTag::FaceSketch),
            "http://host/api/zzmsm"
        );
        assert_eq!(
            record_endpoint(BASE, MethodTag::SurfaceSupplement, 7),
            "http://host/api/dbbc/7"
        );
    }

    #[test]
    fn test_status_message_prefers_body() {
        assert_eq!(status_message(404, ""), "Not found");
        assert_eq!(status_message(500, r#"{"msg":"数据库异常"}"#), "数据库异常");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let settings = GatewaySettings {
            base_url: " ".to_string(),
            ..GatewaySettings::default()
        };
        assert!(matches!(
            HttpGateway::new(&settings, SessionContext::anonymous()),
            Err(GatewayError::Config(_))
        ));
    }
}
