// ==========================================
// 隧道超前地质预报 - 引擎层
// ==========================================
// 职责: 字段规整、方法模式注册表、子记录管理、校验、载荷构建、生命周期
// 红线: 引擎不做网络/数据库访问，所有拒绝必须给出原因
// ==========================================

pub mod arena;
pub mod coercion;
pub mod error;
pub mod lifecycle;
pub mod point_manager;
pub mod schema_registry;
pub mod segment_manager;
pub mod submission;
pub mod validator;

// 重导出核心引擎
pub use arena::{Arena, EntryKey};
pub use coercion::{CoercionError, CoercionResult};
pub use error::{BuildError, ListError, ListResult};
pub use lifecycle::{LifecycleError, LifecycleState, RecordLifecycle};
pub use point_manager::PointManager;
pub use schema_registry::{schema_for, FieldKind, FieldSpec, MethodSchema, PointShape};
pub use segment_manager::SegmentManager;
pub use submission::{SubmissionBuilder, WirePayload};
pub use validator::{RecordValidator, ValidationError, ValidationViolation};
