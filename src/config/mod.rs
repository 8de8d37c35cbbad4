// ==========================================
// 隧道超前地质预报 - 配置层
// ==========================================
// 职责: 系统配置管理，支持环境变量覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{
    config_keys, defaults, env_keys, ConfigManager, GatewayMode, GatewaySettings,
};
