// ==========================================
// LocalGateway 集成测试
// ==========================================
// 测试目标: 文件数据库持久化、标识分配、网关构建
// ==========================================


use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use test_helpers::{create_test_db, open_test_connection};
use tunnel_forecast::config::{GatewayMode, GatewaySettings};
use tunnel_forecast::engine::WirePayload;
use tunnel_forecast::gateway::{build_gateway, DataGateway, LocalGateway, SessionContext};
use tunnel_forecast::MethodTag;

fn payload(value: Value) -> WirePayload {
    match value {
        Value::Object(map) => WirePayload::new(map),
        _ => unreachable!("payload must be an object"),
    }
}

fn drilling_payload() -> WirePayload {
    payload(json!({
        "ybPk": 0, "ybId": 0, "method": 14, "siteId": "SITE-009",
        "dkname": "DK", "dkilo": 320.0, "ybLength": 5.0,
        "monitordate": "2024-03-01T08:00:00", "submitFlag": 0,
        "ybjgDTOList": [
            { "ybjgPk": 0, "ybjgId": 0, "ybPk": 0, "dkname": "DK", "sdkilo": 320.0,
              "edkilo": 325.0, "ybjgTime": "2024-03-01T08:00:00", "risklevel": "涌水",
              "dzjb": "red", "grade": 5, "wylevel": 5, "jlresult": "孔内出水" }
        ],
        "jspkZkzzDTOList": [
            { "jspkZkzzPk": 0, "jspkZkzzId": 1, "ybPk": 0, "zkwz": "左上", "wcj": 5.0 },
            { "jspkZkzzPk": 0, "jspkZkzzId": 2, "ybPk": 0, "zkwz": "右上", "wcj": 5.0 }
        ]
    }))
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let id = {
        let gateway = LocalGateway::open(&db_path).expect("Failed to open gateway");
        gateway
            .create(MethodTag::DrillingAdvanced, &drilling_payload())
            .await
            .unwrap()
            .id
            .unwrap()
    };

    let gateway = LocalGateway::open(&db_path).expect("Failed to reopen gateway");
    assert_eq!(gateway.count().unwrap(), 1);
    let record = gateway.fetch_detail(id, None).await.unwrap();
    assert_eq!(record.method, MethodTag::DrillingAdvanced);
    assert_eq!(record.header.site_id.as_deref(), Some("SITE-009"));
    assert_eq!(record.points.len(), 2);
    assert!(record.points.iter().all(|p| p.parent_pk == id));
    assert_eq!(record.segments[0].record_pk, id);
}

#[tokio::test]
async fn test_update_keeps_existing_child_ids() {
    let gateway = LocalGateway::in_memory().unwrap();
    let id = gateway
        .create(MethodTag::DrillingAdvanced, &drilling_payload())
        .await
        .unwrap()
        .id
        .unwrap();
    let first = gateway.fetch_detail(id, None).await.unwrap();
    let segment_pk = first.segments[0].pk;

    // 保留已有分段，再追加一个新分段
    let mut map = first.to_wire();
    if let Some(Value::Array(list)) = map.get_mut("ybjgDTOList") {
        let mut added = list[0].clone();
        added["ybjgPk"] = json!(0);
        added["sdkilo"] = json!(325.0);
        added["edkilo"] = json!(330.0);
        list.push(added);
    }
    gateway
        .update(MethodTag::DrillingAdvanced, id, &WirePayload::new(map))
        .await
        .unwrap();

    let second = gateway.fetch_detail(id, None).await.unwrap();
    assert_eq!(second.segments.len(), 2);
    assert_eq!(second.segments[0].pk, segment_pk);
    assert!(second.segments[1].pk > segment_pk);
    assert_eq!(second.segments[1].seq_id, 2);
}

#[tokio::test]
async fn test_build_local_gateway_shares_connection() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = Arc::new(Mutex::new(open_test_connection(&db_path).unwrap()));
    let settings = GatewaySettings {
        mode: GatewayMode::Local,
        ..GatewaySettings::default()
    };

    let gateway = build_gateway(&settings, SessionContext::anonymous(), conn.clone()).unwrap();
    gateway
        .create(MethodTag::DrillingAdvanced, &drilling_payload())
        .await
        .unwrap();

    let count: i64 = conn
        .lock()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM forecast_record", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}
