// ==========================================
// 隧道超前地质预报 - 本地数据网关（SQLite）
// ==========================================
// 职责: 离线/演示模式下按后端契约存取记录
// 存储: forecast_record 表保存整份载荷 JSON
// 标识分配: 新增/更新时为 0 或空的标识分配本地自增值
// ==========================================

use crate::db::{ensure_schema, open_in_memory, open_sqlite_connection};
use crate::domain::record::ForecastRecord;
use crate::domain::types::MethodTag;
use crate::engine::schema_registry::{
    schema_for, MethodSchema, METHOD_KEY, RECORD_ID_KEY, RECORD_PK_KEY, SEGMENT_DETAIL_LIST_KEYS,
    SEGMENT_ID_KEY, SEGMENT_LIST_KEY, SEGMENT_PARENT_KEY, SEGMENT_PK_KEY, SUBMIT_FLAG_KEY,
};
use crate::engine::submission::WirePayload;
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::traits::{CreateOutcome, DataGateway, UpdateOutcome};
use async_trait::async_trait;
use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const RECORD_SEQUENCE: &str = "forecast_record";
const CHILD_SEQUENCE: &str = "forecast_child";

// ==========================================
// LocalGateway
// ==========================================
pub struct LocalGateway {
    conn: Arc<Mutex<Connection>>,
}

impl LocalGateway {
    /// 基于共享连接创建（确保表结构存在）
    pub fn new(conn: Arc<Mutex<Connection>>) -> GatewayResult<Self> {
        {
            let c = conn
                .lock()
                .map_err(|e| GatewayError::LockError(e.to_string()))?;
            ensure_schema(&c)?;
        }
        Ok(Self { conn })
    }

    pub fn open(db_path: &str) -> GatewayResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::new(Arc::new(Mutex::new(conn)))
    }

    pub fn in_memory() -> GatewayResult<Self> {
        let conn = open_in_memory()?;
        Self::new(Arc::new(Mutex::new(conn)))
    }

    /// 已保存记录数
    pub fn count(&self) -> GatewayResult<i64> {
        let conn = self.lock()?;
        let n = conn.query_row("SELECT COUNT(*) FROM forecast_record", [], |row| row.get(0))?;
        Ok(n)
    }

    fn lock(&self) -> GatewayResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GatewayError::LockError(e.to_string()))
    }

    fn save_row(
        conn: &Connection,
        id: i64,
        method: MethodTag,
        stored: &Map<String, Value>,
    ) -> GatewayResult<()> {
        let site_id = stored.get("siteId").and_then(Value::as_str).unwrap_or("");
        let submit_flag = stored.get(SUBMIT_FLAG_KEY).and_then(Value::as_i64).unwrap_or(0);
        let payload_json = serde_json::to_string(stored)?;
        let updated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        conn.execute(
            r#"
            INSERT INTO forecast_record (yb_pk, method, site_id, submit_flag, payload_json, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(yb_pk) DO UPDATE SET
                method = excluded.method,
                site_id = excluded.site_id,
                submit_flag = excluded.submit_flag,
                payload_json = excluded.payload_json,
                updated_at = excluded.updated_at
            "#,
            params![id, method.code(), site_id, submit_flag, payload_json, updated_at],
        )?;
        Ok(())
    }
}

/// 本地自增序列
fn next_id(conn: &Connection, name: &str) -> GatewayResult<i64> {
    conn.execute(
        r#"
        INSERT INTO local_sequence (name, value) VALUES (?1, 1)
        ON CONFLICT(name) DO UPDATE SET value = value + 1
        "#,
        params![name],
    )?;
    let value = conn.query_row(
        "SELECT value FROM local_sequence WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(value)
}

fn is_unassigned(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(v) => v.as_i64().map(|n| n <= 0).unwrap_or(false),
    }
}

/// 为载荷分配记录/分段/辅助点标识，返回入库对象
fn assign_identities(
    conn: &Connection,
    schema: &MethodSchema,
    id: i64,
    payload: &WirePayload,
) -> GatewayResult<Map<String, Value>> {
    let mut stored = payload.as_map().clone();
    stored.insert(RECORD_PK_KEY.to_string(), Value::from(id));
    if is_unassigned(stored.get(RECORD_ID_KEY)) {
        stored.insert(RECORD_ID_KEY.to_string(), Value::from(id));
    }
    for key in schema.identity_fields {
        if is_unassigned(stored.get(*key)) {
            stored.insert(key.to_string(), Value::from(id));
        }
    }

    if let Some(Value::Array(segments)) = stored.get_mut(SEGMENT_LIST_KEY) {
        for (pos, seg) in segments.iter_mut().enumerate() {
            let Value::Object(seg) = seg else { continue };
            if is_unassigned(seg.get(SEGMENT_PK_KEY)) {
                seg.insert(SEGMENT_PK_KEY.to_string(), Value::from(next_id(conn, CHILD_SEQUENCE)?));
            }
            seg.insert(SEGMENT_ID_KEY.to_string(), Value::from((pos + 1) as i64));
            seg.insert(SEGMENT_PARENT_KEY.to_string(), Value::from(id));
        }
    }

    if let Some(shape) = schema.point_shape {
        let parent = stored
            .get(shape.parent_key)
            .and_then(Value::as_i64)
            .filter(|pk| *pk > 0)
            .unwrap_or(id);
        if let Some(Value::Array(points)) = stored.get_mut(shape.list_key) {
            for point in points.iter_mut() {
                let Value::Object(point) = point else { continue };
                if is_unassigned(point.get(shape.pk_key)) {
                    point.insert(shape.pk_key.to_string(), Value::from(next_id(conn, CHILD_SEQUENCE)?));
                }
                point.insert(shape.parent_key.to_string(), Value::from(parent));
            }
        }
    }

    Ok(stored)
}

/// 入库对象 → 详情对象（列表改用详情命名）
fn to_detail(mut stored: Map<String, Value>, schema: &MethodSchema) -> Value {
    if let Some(segments) = stored.remove(SEGMENT_LIST_KEY) {
        stored.insert(SEGMENT_DETAIL_LIST_KEYS[0].to_string(), segments);
    }
    if let Some(shape) = schema.point_shape {
        if let Some(points) = stored.remove(shape.list_key) {
            stored.insert(shape.detail_list_key.to_string(), points);
        }
    }
    Value::Object(stored)
}

#[async_trait]
impl DataGateway for LocalGateway {
    async fn fetch_detail(
        &self,
        record_id: i64,
        method_hint: Option<MethodTag>,
    ) -> GatewayResult<ForecastRecord> {
        let row: Option<(i64, String)> = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT method, payload_json FROM forecast_record WHERE yb_pk = ?1",
                params![record_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
        };
        let (method_code, payload_json) = row.ok_or(GatewayError::NotFound(record_id))?;

        let method = MethodTag::from_code(method_code)
            .or(method_hint)
            .ok_or_else(|| GatewayError::Decode(format!("未知方法代码: {}", method_code)))?;
        let stored: Map<String, Value> = serde_json::from_str(&payload_json)?;
        let detail = to_detail(stored, schema_for(method));

        let record = ForecastRecord::from_wire(Some(method), &detail)?;
        debug!(gateway = self.name(), record_id, method = %method, "本地详情读取");
        Ok(record)
    }

    async fn create(
        &self,
        method: MethodTag,
        payload: &WirePayload,
    ) -> GatewayResult<CreateOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = next_id(&tx, RECORD_SEQUENCE)?;
        let mut stored = assign_identities(&tx, schema_for(method), id, payload)?;
        stored.insert(METHOD_KEY.to_string(), Value::from(method.code()));
        Self::save_row(&tx, id, method, &stored)?;
        tx.commit()?;

        info!(gateway = self.name(), method = %method, id, "本地记录新增");
        Ok(CreateOutcome {
            success: true,
            id: Some(id),
        })
    }

    async fn update(
        &self,
        method: MethodTag,
        record_id: i64,
        payload: &WirePayload,
    ) -> GatewayResult<UpdateOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT method FROM forecast_record WHERE yb_pk = ?1",
                params![record_id],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            None => return Err(GatewayError::NotFound(record_id)),
            Some(code) if code != method.code() => {
                return Err(GatewayError::Rejected(format!(
                    "记录 {} 的方法为 {}，不能按 {} 更新",
                    record_id, code, method
                )));
            }
            Some(_) => {}
        }

        let stored = assign_identities(&tx, schema_for(method), record_id, payload)?;
        Self::save_row(&tx, record_id, method, &stored)?;
        tx.commit()?;

        info!(gateway = self.name(), method = %method, record_id, "本地记录更新");
        Ok(UpdateOutcome { success: true })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> WirePayload {
        match value {
            Value::Object(map) => WirePayload::new(map),
            _ => panic!("payload must be an object"),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_identities() {
        let gateway = LocalGateway::in_memory().unwrap();
        let outcome = gateway
            .create(
                MethodTag::TransientEm,
                &payload(json!({
                    "ybPk": 0, "ybId": 0, "method": 6, "sbdcPk": 0, "sbdcId": 0,
                    "dkname": "DK", "submitFlag": 0,
                    "ybjgDTOList": [{ "ybjgPk": 0, "ybjgId": 0, "ybPk": 0, "jlresult": "完整" }]
                })),
            )
            .await
            .unwrap();
        let id = outcome.id.unwrap();
        assert!(id > 0);
        assert_eq!(gateway.count().unwrap(), 1);

        let record = gateway.fetch_detail(id, None).await.unwrap();
        assert_eq!(record.method, MethodTag::TransientEm);
        assert_eq!(record.identity.pk, Some(id));
        assert_eq!(record.identity.id, Some(id));
        assert_eq!(record.extra.get("sbdcPk"), Some(&json!(id)));
        assert_eq!(record.segments.len(), 1);
        assert!(record.segments[0].is_persisted());
        assert_eq!(record.segments[0].record_pk, id);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let gateway = LocalGateway::in_memory().unwrap();
        let err = gateway
            .update(MethodTag::Other, 99, &payload(json!({ "method": 0 })))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(99)));
    }

    #[tokio::test]
    async fn test_update_rejects_method_change() {
        let gateway = LocalGateway::in_memory().unwrap();
        let id = gateway
            .create(MethodTag::Other, &payload(json!({ "method": 0 })))
            .await
            .unwrap()
            .id
            .unwrap();
        let err = gateway
            .update(MethodTag::Tsp, id, &payload(json!({ "method": 1 })))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_point_parent_follows_method_pk() {
        let gateway = LocalGateway::in_memory().unwrap();
        let id = gateway
            .create(
                MethodTag::LandSonar,
                &payload(json!({
                    "method": 3, "ldsnPk": 0,
                    "ldsnResultinfoDTOList": [
                        { "ldsnResultinfoPk": 0, "ldsnPk": 0, "ldsnResultinfoId": 1 }
                    ]
                })),
            )
            .await
            .unwrap()
            .id
            .unwrap();

        let record = gateway.fetch_detail(id, Some(MethodTag::LandSonar)).await.unwrap();
        assert_eq!(record.points.len(), 1);
        assert!(record.points[0].pk > 0);
        assert_eq!(record.points[0].parent_pk, id);
    }

    #[tokio::test]
    async fn test_fetch_missing() {
        let gateway = LocalGateway::in_memory().unwrap();
        assert!(matches!(
            gateway.fetch_detail(5, None).await,
            Err(GatewayError::NotFound(5))
        ));
    }
}
