// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 验证配置读取、写入与环境变量覆写
// ==========================================


use test_helpers::{create_test_db, insert_test_config, open_test_connection};
use tunnel_forecast::config::{config_keys, ConfigManager, GatewayMode};

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[test]
fn test_defaults_without_config_rows() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let settings = config_manager.gateway_settings_with_env(no_env).unwrap();
    assert_eq!(settings.mode, GatewayMode::Real);
    assert_eq!(settings.base_url, "http://localhost:8080/api/v1");
    assert_eq!(settings.timeout_secs, 30);
    assert_eq!(config_manager.conclusion_max_len().unwrap(), 500);
    assert_eq!(config_manager.locale_with_env(no_env).unwrap(), "zh-CN");
}

#[test]
fn test_values_from_config_table() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).expect("Failed to open db");
    insert_test_config(&conn, config_keys::GATEWAY_MODE, "local").unwrap();
    insert_test_config(&conn, config_keys::GATEWAY_BASE_URL, "http://10.0.0.8/api/").unwrap();
    insert_test_config(&conn, config_keys::CONCLUSION_MAX_LEN, "800").unwrap();

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    let settings = config_manager.gateway_settings_with_env(no_env).unwrap();
    assert_eq!(settings.mode, GatewayMode::Local);
    assert_eq!(settings.base_url, "http://10.0.0.8/api");
    assert_eq!(config_manager.conclusion_max_len().unwrap(), 800);
}

#[test]
fn test_env_overrides_config_table() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config_manager
        .set_config_value(config_keys::GATEWAY_MODE, "local")
        .unwrap();

    let settings = config_manager
        .gateway_settings_with_env(|key| match key {
            "FORECAST_USE_REAL_API" => Some("true".to_string()),
            "FORECAST_API_TIMEOUT_SECS" => Some("12".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(settings.mode, GatewayMode::Real);
    assert_eq!(settings.timeout_secs, 12);
}

#[test]
fn test_config_snapshot_contains_written_keys() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config_manager
        .set_config_value(config_keys::UI_LOCALE, "en")
        .unwrap();

    let snapshot = config_manager.get_config_snapshot().unwrap();
    let value: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
    assert_eq!(value[config_keys::UI_LOCALE], "en");
}
