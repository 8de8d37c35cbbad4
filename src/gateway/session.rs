// ==========================================
// 隧道超前地质预报 - 会话上下文
// ==========================================
// 登录态（令牌/用户名/用户标识）由外部注入网关，核心不读全局状态
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub token: Option<String>,
    pub username: Option<String>,
    pub user_id: Option<String>,
}

impl SessionContext {
    pub fn new(token: impl Into<String>, username: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            username: Some(username.into()),
            user_id: Some(user_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 非空令牌
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer().is_some()
    }
}
