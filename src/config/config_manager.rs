// ==========================================
// 隧道超前地质预报 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入；环境变量覆写
// 存储: config_kv 表 (key-value + scope)
// 优先级: 环境变量 > config_kv(global) > 默认值
// ==========================================

use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::engine::schema_registry::DEFAULT_CONCLUSION_MAX_LEN;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// GatewaySettings - 数据网关设置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayMode {
    /// 真实后端（HTTP）
    Real,
    /// 本地数据存储（SQLite）
    Local,
}

impl GatewayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayMode::Real => "real",
            GatewayMode::Local => "local",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "real" | "http" => Some(GatewayMode::Real),
            "local" | "mock" => Some(GatewayMode::Local),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySettings {
    pub mode: GatewayMode,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            mode: GatewayMode::Real,
            base_url: defaults::BASE_URL.to_string(),
            timeout_secs: defaults::TIMEOUT_SECS,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 并建表（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
            ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::debug!(key, value, "配置已写入");
        Ok(())
    }

    /// 获取所有配置的快照（JSON 格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 数据网关 =====

    /// 网关设置（读取进程环境变量）
    pub fn gateway_settings(&self) -> Result<GatewaySettings, Box<dyn Error>> {
        self.gateway_settings_with_env(|key| std::env::var(key).ok())
    }

    /// 网关设置（环境变量来源可注入）
    pub fn gateway_settings_with_env<F>(&self, env: F) -> Result<GatewaySettings, Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match env(env_keys::USE_REAL_API).map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "false" || v == "0" => GatewayMode::Local,
            Some(v) if v == "true" || v == "1" => GatewayMode::Real,
            _ => {
                let raw = self.get_config_or_default(config_keys::GATEWAY_MODE, "real")?;
                GatewayMode::parse(&raw).unwrap_or_else(|| {
                    tracing::warn!(
                        config_key = config_keys::GATEWAY_MODE,
                        raw_value = %raw,
                        "网关模式配置无效，使用 real"
                    );
                    GatewayMode::Real
                })
            }
        };

        let base_url = match env(env_keys::API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            Some(v) => v,
            None => self.get_config_or_default(config_keys::GATEWAY_BASE_URL, defaults::BASE_URL)?,
        };

        let timeout_raw = match env(env_keys::API_TIMEOUT_SECS) {
            Some(v) => v,
            None => self.get_config_or_default(
                config_keys::GATEWAY_TIMEOUT_SECS,
                &defaults::TIMEOUT_SECS.to_string(),
            )?,
        };
        let timeout_secs = timeout_raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|v| *v > 0)
            .unwrap_or(defaults::TIMEOUT_SECS);

        Ok(GatewaySettings {
            mode,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    // ===== 分段 =====

    /// 分段结论最大长度（默认 500）
    pub fn conclusion_max_len(&self) -> Result<usize, Box<dyn Error>> {
        let value = self.get_config_or_default(
            config_keys::CONCLUSION_MAX_LEN,
            &DEFAULT_CONCLUSION_MAX_LEN.to_string(),
        )?;
        Ok(value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_CONCLUSION_MAX_LEN))
    }

    // ===== 界面 =====

    pub fn locale(&self) -> Result<String, Box<dyn Error>> {
        self.locale_with_env(|key| std::env::var(key).ok())
    }

    pub fn locale_with_env<F>(&self, env: F) -> Result<String, Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env(env_keys::LOCALE).filter(|v| !v.trim().is_empty()) {
            return Ok(v);
        }
        self.get_config_or_default(config_keys::UI_LOCALE, defaults::LOCALE)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const GATEWAY_MODE: &str = "gateway.mode";
    pub const GATEWAY_BASE_URL: &str = "gateway.base_url";
    pub const GATEWAY_TIMEOUT_SECS: &str = "gateway.timeout_secs";
    pub const CONCLUSION_MAX_LEN: &str = "segment.conclusion_max_len";
    pub const UI_LOCALE: &str = "ui.locale";
}

/// 环境变量覆写
pub mod env_keys {
    /// "false" 时使用本地数据存储
    pub const USE_REAL_API: &str = "FORECAST_USE_REAL_API";
    pub const API_BASE_URL: &str = "FORECAST_API_BASE_URL";
    pub const API_TIMEOUT_SECS: &str = "FORECAST_API_TIMEOUT_SECS";
    pub const LOCALE: &str = "FORECAST_LOCALE";
}

pub mod defaults {
    pub const BASE_URL: &str = "http://localhost:8080/api/v1";
    pub const TIMEOUT_SECS: u64 = 30;
    pub const LOCALE: &str = "zh-CN";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn manager() -> ConfigManager {
        let conn = open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let cm = manager();
        let settings = cm.gateway_settings_with_env(no_env).unwrap();
        assert_eq!(settings, GatewaySettings::default());
        assert_eq!(cm.conclusion_max_len().unwrap(), 500);
        assert_eq!(cm.locale_with_env(no_env).unwrap(), "zh-CN");
    }

    #[test]
    fn test_stored_values_and_env_override() {
        let cm = manager();
        cm.set_config_value(config_keys::GATEWAY_MODE, "local").unwrap();
        cm.set_config_value(config_keys::GATEWAY_BASE_URL, "http://10.0.0.5/api/")
            .unwrap();
        cm.set_config_value(config_keys::GATEWAY_TIMEOUT_SECS, "abc")
            .unwrap();
        cm.set_config_value(config_keys::CONCLUSION_MAX_LEN, "200")
            .unwrap();

        let settings = cm.gateway_settings_with_env(no_env).unwrap();
        assert_eq!(settings.mode, GatewayMode::Local);
        assert_eq!(settings.base_url, "http://10.0.0.5/api");
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(cm.conclusion_max_len().unwrap(), 200);

        let env = |key: &str| match key {
            env_keys::USE_REAL_API => Some("true".to_string()),
            env_keys::API_TIMEOUT_SECS => Some("5".to_string()),
            _ => None,
        };
        let settings = cm.gateway_settings_with_env(env).unwrap();
        assert_eq!(settings.mode, GatewayMode::Real);
        assert_eq!(settings.timeout_secs, 5);
    }

    #[test]
    fn test_snapshot() {
        let cm = manager();
        cm.set_config_value(config_keys::UI_LOCALE, "en").unwrap();
        let snapshot: serde_json::Value =
            serde_json::from_str(&cm.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot["ui.locale"], "en");
    }
}
