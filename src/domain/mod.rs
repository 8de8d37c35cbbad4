// ==========================================
// 隧道超前地质预报 - 领域层
// ==========================================
// 职责: 预报记录聚合根及其子记录、方法变体、附件引用
// ==========================================

pub mod attachment;
pub mod point;
pub mod record;
pub mod segment;
pub mod types;
pub mod variant;

// 重导出核心类型
pub use attachment::{attachment_path, Attachment, NO_FILE_SENTINEL};
pub use point::{AuxiliaryPoint, PointData, PointError, PointPatch, SequenceLabel};
pub use record::{
    DraftHeader, ForecastRecord, Personnel, RecordDecodeError, RecordHeader, RecordIdentity,
};
pub use segment::{ForecastSegment, SegmentPatch};
pub use types::{
    ElectrodeKind, ExcavationMethod, ExcavationSide, MethodFamily, MethodTag, PointKind,
    RiskCategory, RockGrade, SeverityColor, SubmitFlag, TemLoopKind,
};
pub use variant::VariantPayload;
