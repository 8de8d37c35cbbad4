// ==========================================
// 隧道超前地质预报 - 方法特有字段（变体载荷）
// ==========================================
// 职责: 每种预报方法一个结构体，VariantPayload 为按方法标签区分的联合类型
// 线上字段名见注册表（engine::schema_registry），两者由测试保持一致
// ==========================================

use crate::domain::types::{ExcavationMethod, ExcavationSide, MethodTag, TemLoopKind};
use crate::engine::schema_registry::schema_for;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==========================================
// TSP 地震波反射
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TspVariant {
    #[serde(rename = "jfpknum", skip_serializing_if = "Option::is_none")]
    pub excitation_hole_count: Option<i64>,
    #[serde(rename = "jfpksd", skip_serializing_if = "Option::is_none")]
    pub excitation_hole_depth: Option<f64>,
    #[serde(rename = "jfpkzj", skip_serializing_if = "Option::is_none")]
    pub excitation_hole_diameter: Option<f64>,
    #[serde(rename = "jfpkjdmgd", skip_serializing_if = "Option::is_none")]
    pub excitation_hole_height: Option<f64>,
    #[serde(rename = "jfpkjj", skip_serializing_if = "Option::is_none")]
    pub excitation_hole_spacing: Option<f64>,
    #[serde(rename = "jspknum", skip_serializing_if = "Option::is_none")]
    pub receiver_hole_count: Option<i64>,
    #[serde(rename = "jspksd", skip_serializing_if = "Option::is_none")]
    pub receiver_hole_depth: Option<f64>,
    #[serde(rename = "jspkzj", skip_serializing_if = "Option::is_none")]
    pub receiver_hole_diameter: Option<f64>,
    #[serde(rename = "jspkjdmgd", skip_serializing_if = "Option::is_none")]
    pub receiver_hole_height: Option<f64>,
    #[serde(rename = "sbName", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// 1 左侧 / 2 右侧 / 3 双侧
    #[serde(rename = "kwwz", skip_serializing_if = "Option::is_none")]
    pub excavation_side: Option<i64>,
    #[serde(rename = "leftkilo", skip_serializing_if = "Option::is_none")]
    pub left_mileage: Option<f64>,
    #[serde(rename = "rightkilo", skip_serializing_if = "Option::is_none")]
    pub right_mileage: Option<f64>,
    #[serde(rename = "leftjgdczjl", skip_serializing_if = "Option::is_none")]
    pub left_crown_distance: Option<f64>,
    #[serde(rename = "rightjgdczjl", skip_serializing_if = "Option::is_none")]
    pub right_crown_distance: Option<f64>,
    #[serde(rename = "leftzxjl", skip_serializing_if = "Option::is_none")]
    pub left_centerline_distance: Option<f64>,
    #[serde(rename = "rightzxjl", skip_serializing_if = "Option::is_none")]
    pub right_centerline_distance: Option<f64>,
    #[serde(rename = "leftjdmgd", skip_serializing_if = "Option::is_none")]
    pub left_floor_height: Option<f64>,
    #[serde(rename = "rightjdmgd", skip_serializing_if = "Option::is_none")]
    pub right_floor_height: Option<f64>,
    #[serde(rename = "leftks", skip_serializing_if = "Option::is_none")]
    pub left_hole_depth: Option<f64>,
    #[serde(rename = "rightks", skip_serializing_if = "Option::is_none")]
    pub right_hole_depth: Option<f64>,
    #[serde(rename = "leftqj", skip_serializing_if = "Option::is_none")]
    pub left_inclination: Option<f64>,
    #[serde(rename = "rightqj", skip_serializing_if = "Option::is_none")]
    pub right_inclination: Option<f64>,
}

impl TspVariant {
    pub fn side(&self) -> Option<ExcavationSide> {
        self.excavation_side.and_then(ExcavationSide::from_code)
    }
}

// ==========================================
// HSP 水平声波剖面
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HspVariant {
    #[serde(rename = "cqnum", skip_serializing_if = "Option::is_none")]
    pub zone_count: Option<i64>,
    #[serde(rename = "cdnum", skip_serializing_if = "Option::is_none")]
    pub point_count: Option<i64>,
    #[serde(rename = "jsfs", skip_serializing_if = "Option::is_none")]
    pub receive_mode: Option<String>,
    #[serde(rename = "sbName", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(rename = "pic1", skip_serializing_if = "Option::is_none")]
    pub layout_picture: Option<String>,
    #[serde(rename = "pic2", skip_serializing_if = "Option::is_none")]
    pub waveform_picture: Option<String>,
}

// ==========================================
// 陆地声呐
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandSonarVariant {
    #[serde(rename = "sbName", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    /// 探检参数
    #[serde(rename = "cxnum", skip_serializing_if = "Option::is_none")]
    pub probe_count: Option<i64>,
}

// ==========================================
// 电磁波反射
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmReflectionVariant {
    #[serde(rename = "sbName", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(rename = "cxnum", skip_serializing_if = "Option::is_none")]
    pub line_count: Option<i64>,
    /// 天线工作频率
    #[serde(rename = "gzpl", skip_serializing_if = "Option::is_none")]
    pub antenna_frequency: Option<f64>,
}

// ==========================================
// 高分辨直流电
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResistivityVariant {
    #[serde(rename = "gddjnum", skip_serializing_if = "Option::is_none")]
    pub power_electrode_count: Option<i64>,
    #[serde(rename = "cldjnum", skip_serializing_if = "Option::is_none")]
    pub measurement_point_count: Option<i64>,
    #[serde(rename = "sbName", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(rename = "gddy", skip_serializing_if = "Option::is_none")]
    pub supply_voltage: Option<f64>,
    #[serde(rename = "gddl", skip_serializing_if = "Option::is_none")]
    pub supply_current: Option<f64>,
    #[serde(rename = "pic1", skip_serializing_if = "Option::is_none")]
    pub layout_picture: Option<String>,
    #[serde(rename = "pic2", skip_serializing_if = "Option::is_none")]
    pub contour_picture: Option<String>,
    #[serde(rename = "pic3", skip_serializing_if = "Option::is_none")]
    pub result_picture: Option<String>,
}

// ==========================================
// 瞬变电磁
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransientEmVariant {
    /// 采集装置类型: 1 重叠回线 / 2 中心回线 / 3 偶极装置
    #[serde(rename = "sbdcType", skip_serializing_if = "Option::is_none")]
    pub loop_kind: Option<i64>,
    #[serde(rename = "fskwzlc", skip_serializing_if = "Option::is_none")]
    pub transmitter_mileage: Option<f64>,
    #[serde(rename = "fskc", skip_serializing_if = "Option::is_none")]
    pub transmitter_length: Option<f64>,
    #[serde(rename = "fskk", skip_serializing_if = "Option::is_none")]
    pub transmitter_width: Option<f64>,
    #[serde(rename = "jfxqzs", skip_serializing_if = "Option::is_none")]
    pub transmitter_turns: Option<i64>,
    #[serde(rename = "jskc", skip_serializing_if = "Option::is_none")]
    pub receiver_length: Option<f64>,
    #[serde(rename = "jskk", skip_serializing_if = "Option::is_none")]
    pub receiver_width: Option<f64>,
    #[serde(rename = "jskzs", skip_serializing_if = "Option::is_none")]
    pub receiver_turns: Option<i64>,
    #[serde(rename = "jsxqdxmj", skip_serializing_if = "Option::is_none")]
    pub receiver_effective_area: Option<f64>,
    /// 收发距
    #[serde(rename = "sf", skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    #[serde(rename = "sbName", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(rename = "fspl", skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(rename = "gddl", skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(rename = "clsj", skip_serializing_if = "Option::is_none")]
    pub measurement_duration: Option<f64>,
    /// 盲区范围
    #[serde(rename = "mqfw", skip_serializing_if = "Option::is_none")]
    pub blind_zone: Option<f64>,
    #[serde(rename = "cxbzms", skip_serializing_if = "Option::is_none")]
    pub line_layout_description: Option<String>,
    #[serde(rename = "pic1", skip_serializing_if = "Option::is_none")]
    pub layout_picture: Option<String>,
    #[serde(rename = "pic2", skip_serializing_if = "Option::is_none")]
    pub curve_picture: Option<String>,
    #[serde(rename = "pic3", skip_serializing_if = "Option::is_none")]
    pub result_picture: Option<String>,
}

impl TransientEmVariant {
    pub fn loop_kind(&self) -> Option<TemLoopKind> {
        self.loop_kind.and_then(TemLoopKind::from_code)
    }
}

// ==========================================
// 微震监测预报
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicroSeismicVariant {
    #[serde(rename = "cumEventnum", skip_serializing_if = "Option::is_none")]
    pub cumulative_events: Option<i64>,
    #[serde(rename = "cumEnergy", skip_serializing_if = "Option::is_none")]
    pub cumulative_energy: Option<f64>,
    #[serde(rename = "cumAppvol", skip_serializing_if = "Option::is_none")]
    pub cumulative_apparent_volume: Option<f64>,
    #[serde(rename = "eventRate", skip_serializing_if = "Option::is_none")]
    pub event_rate: Option<f64>,
    #[serde(rename = "energyRate", skip_serializing_if = "Option::is_none")]
    pub energy_rate: Option<f64>,
    #[serde(rename = "appvolRate", skip_serializing_if = "Option::is_none")]
    pub apparent_volume_rate: Option<f64>,
    #[serde(rename = "hdtzfxyms", skip_serializing_if = "Option::is_none")]
    pub activity_analysis: Option<String>,
    #[serde(rename = "wzsjfbtzt", skip_serializing_if = "Option::is_none")]
    pub event_distribution_picture: Option<String>,
}

// ==========================================
// 掌子面素描
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceSketchVariant {
    /// 开挖分区: 1 全断面 / 2 台阶 / 3 CD / 4 双侧壁导坑
    #[serde(rename = "kwfs", skip_serializing_if = "Option::is_none")]
    pub excavation_method: Option<i64>,
    #[serde(rename = "kwgd", skip_serializing_if = "Option::is_none")]
    pub excavation_height: Option<f64>,
    #[serde(rename = "kwkd", skip_serializing_if = "Option::is_none")]
    pub excavation_width: Option<f64>,
    #[serde(rename = "kwmj", skip_serializing_if = "Option::is_none")]
    pub excavation_area: Option<f64>,
    #[serde(rename = "bwnum", skip_serializing_if = "Option::is_none")]
    pub blast_count: Option<i64>,
    #[serde(rename = "zzmzt", skip_serializing_if = "Option::is_none")]
    pub face_state: Option<String>,
    #[serde(rename = "zzmms", skip_serializing_if = "Option::is_none")]
    pub face_description: Option<String>,
    #[serde(rename = "ytwzztpd", skip_serializing_if = "Option::is_none")]
    pub rock_integrity: Option<String>,
    #[serde(rename = "ytlx", skip_serializing_if = "Option::is_none")]
    pub lithology: Option<String>,
    /// 岩土特征类别
    #[serde(rename = "zzmsmType", skip_serializing_if = "Option::is_none")]
    pub material_class: Option<i64>,
    #[serde(rename = "tmc", skip_serializing_if = "Option::is_none")]
    pub soil_name: Option<String>,
    #[serde(rename = "tttz", skip_serializing_if = "Option::is_none")]
    pub soil_features: Option<String>,
    #[serde(rename = "dznd", skip_serializing_if = "Option::is_none")]
    pub geological_age: Option<String>,
    #[serde(rename = "ttys", skip_serializing_if = "Option::is_none")]
    pub soil_color: Option<String>,
    #[serde(rename = "ttjg", skip_serializing_if = "Option::is_none")]
    pub soil_structure: Option<String>,
    #[serde(rename = "cy", skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(rename = "sd", skip_serializing_if = "Option::is_none")]
    pub humidity: Option<String>,
    #[serde(rename = "msd", skip_serializing_if = "Option::is_none")]
    pub compactness: Option<String>,
    #[serde(rename = "sx", skip_serializing_if = "Option::is_none")]
    pub plasticity: Option<String>,
    #[serde(rename = "yd", skip_serializing_if = "Option::is_none")]
    pub hardness: Option<String>,
    #[serde(rename = "basicwylevel", skip_serializing_if = "Option::is_none")]
    pub basic_grade: Option<i64>,
    #[serde(rename = "jgmzs", skip_serializing_if = "Option::is_none")]
    pub joint_set_count: Option<i64>,
    #[serde(rename = "dxspd", skip_serializing_if = "Option::is_none")]
    pub groundwater_rating: Option<String>,
    #[serde(rename = "pjjj", skip_serializing_if = "Option::is_none")]
    pub average_spacing: Option<f64>,
    #[serde(rename = "pgjz", skip_serializing_if = "Option::is_none")]
    pub assessment_value: Option<String>,
    #[serde(rename = "fixwylevel", skip_serializing_if = "Option::is_none")]
    pub corrected_grade: Option<i64>,
    #[serde(rename = "csdylpd", skip_serializing_if = "Option::is_none")]
    pub initial_stress_rating: Option<String>,
    #[serde(rename = "dzgzyl", skip_serializing_if = "Option::is_none")]
    pub tectonic_stress: Option<String>,
    #[serde(rename = "images", skip_serializing_if = "Option::is_none")]
    pub images: Option<String>,
    #[serde(rename = "photo", skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(rename = "addition", skip_serializing_if = "Option::is_none")]
    pub addition: Option<String>,
}

impl FaceSketchVariant {
    pub fn method(&self) -> Option<ExcavationMethod> {
        self.excavation_method.and_then(ExcavationMethod::from_code)
    }
}

// ==========================================
// 洞身素描
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelBodySketchVariant {
    #[serde(rename = "beginkilo", skip_serializing_if = "Option::is_none")]
    pub start_mileage: Option<f64>,
    /// 开挖进尺
    #[serde(rename = "dssmLength", skip_serializing_if = "Option::is_none")]
    pub advance_length: Option<f64>,
    #[serde(rename = "sjwydj", skip_serializing_if = "Option::is_none")]
    pub design_grade: Option<i64>,
    #[serde(rename = "sgwydj", skip_serializing_if = "Option::is_none")]
    pub construction_grade: Option<i64>,
    #[serde(rename = "sjdzms", skip_serializing_if = "Option::is_none")]
    pub hydrogeology_description: Option<String>,
    #[serde(rename = "sgdztz", skip_serializing_if = "Option::is_none")]
    pub lithology_features: Option<String>,
    #[serde(rename = "sggztz", skip_serializing_if = "Option::is_none")]
    pub structural_features: Option<String>,
    #[serde(rename = "shswtz", skip_serializing_if = "Option::is_none")]
    pub hydrogeology_features: Option<String>,
    /// 对拱顶沉降影响
    #[serde(rename = "dgdcjyx", skip_serializing_if = "Option::is_none")]
    pub crown_settlement_effect: Option<String>,
    #[serde(rename = "nextMethod", skip_serializing_if = "Option::is_none")]
    pub next_method: Option<String>,
    #[serde(rename = "nextForecastDate", skip_serializing_if = "Option::is_none")]
    pub next_forecast_date: Option<String>,
    #[serde(rename = "zbqsmt", skip_serializing_if = "Option::is_none")]
    pub left_wall_sketch: Option<String>,
    #[serde(rename = "zbqxct", skip_serializing_if = "Option::is_none")]
    pub left_wall_photo: Option<String>,
    #[serde(rename = "ybqsmt", skip_serializing_if = "Option::is_none")]
    pub right_wall_sketch: Option<String>,
    #[serde(rename = "ybqxct", skip_serializing_if = "Option::is_none")]
    pub right_wall_photo: Option<String>,
    #[serde(rename = "gbsmt", skip_serializing_if = "Option::is_none")]
    pub crown_sketch: Option<String>,
    #[serde(rename = "gbxct", skip_serializing_if = "Option::is_none")]
    pub crown_photo: Option<String>,
    #[serde(rename = "addition", skip_serializing_if = "Option::is_none")]
    pub addition: Option<String>,
}

// ==========================================
// 地表补充
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSupplementVariant {
    #[serde(rename = "beginkilo", skip_serializing_if = "Option::is_none")]
    pub start_mileage: Option<f64>,
    #[serde(rename = "beginkiloStart", skip_serializing_if = "Option::is_none")]
    pub range_start: Option<f64>,
    #[serde(rename = "beginkiloEnd", skip_serializing_if = "Option::is_none")]
    pub range_end: Option<f64>,
    #[serde(rename = "dbbcLength", skip_serializing_if = "Option::is_none")]
    pub survey_length: Option<f64>,
    #[serde(rename = "sjwydj", skip_serializing_if = "Option::is_none")]
    pub design_grade: Option<i64>,
    /// 与设计情况是否相符
    #[serde(rename = "sjqk", skip_serializing_if = "Option::is_none")]
    pub design_conformity: Option<String>,
    #[serde(rename = "dcyx", skip_serializing_if = "Option::is_none")]
    pub stratum_lithology: Option<String>,
    #[serde(rename = "dbry", skip_serializing_if = "Option::is_none")]
    pub surface_karst: Option<String>,
    #[serde(rename = "tsdz", skip_serializing_if = "Option::is_none")]
    pub special_geology: Option<String>,
    #[serde(rename = "rwdk", skip_serializing_if = "Option::is_none")]
    pub artificial_cavity: Option<String>,
    #[serde(rename = "dzpj", skip_serializing_if = "Option::is_none")]
    pub geological_assessment: Option<String>,
    #[serde(rename = "addition", skip_serializing_if = "Option::is_none")]
    pub addition: Option<String>,
}

// ==========================================
// 钻探法（超前水平钻 / 加深炮孔共用）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrillingVariant {
    #[serde(rename = "images", skip_serializing_if = "Option::is_none")]
    pub images: Option<String>,
}

// ==========================================
// VariantPayload - 按方法标签区分的联合类型
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum VariantPayload {
    /// 其他方法仅有基本信息
    Other,
    Tsp(TspVariant),
    Hsp(HspVariant),
    LandSonar(LandSonarVariant),
    EmReflection(EmReflectionVariant),
    HighResResistivity(ResistivityVariant),
    TransientEm(TransientEmVariant),
    MicroSeismic(MicroSeismicVariant),
    FaceSketch(FaceSketchVariant),
    TunnelBodySketch(TunnelBodySketchVariant),
    SurfaceSupplement(SurfaceSupplementVariant),
    DrillingHorizontal(DrillingVariant),
    DrillingAdvanced(DrillingVariant),
}

impl VariantPayload {
    pub fn method(&self) -> MethodTag {
        match self {
            VariantPayload::Other => MethodTag::Other,
            VariantPayload::Tsp(_) => MethodTag::Tsp,
            VariantPayload::Hsp(_) => MethodTag::Hsp,
            VariantPayload::LandSonar(_) => MethodTag::LandSonar,
            VariantPayload::EmReflection(_) => MethodTag::EmReflection,
            VariantPayload::HighResResistivity(_) => MethodTag::HighResResistivity,
            VariantPayload::TransientEm(_) => MethodTag::TransientEm,
            VariantPayload::MicroSeismic(_) => MethodTag::MicroSeismic,
            VariantPayload::FaceSketch(_) => MethodTag::FaceSketch,
            VariantPayload::TunnelBodySketch(_) => MethodTag::TunnelBodySketch,
            VariantPayload::SurfaceSupplement(_) => MethodTag::SurfaceSupplement,
            VariantPayload::DrillingHorizontal(_) => MethodTag::DrillingHorizontal,
            VariantPayload::DrillingAdvanced(_) => MethodTag::DrillingAdvanced,
        }
    }

    /// 指定方法的空载荷（所有字段未填写）
    pub fn empty(method: MethodTag) -> Self {
        match method {
            MethodTag::Other => VariantPayload::Other,
            MethodTag::Tsp => VariantPayload::Tsp(TspVariant::default()),
            MethodTag::Hsp => VariantPayload::Hsp(HspVariant::default()),
            MethodTag::LandSonar => VariantPayload::LandSonar(LandSonarVariant::default()),
            MethodTag::EmReflection => VariantPayload::EmReflection(EmReflectionVariant::default()),
            MethodTag::HighResResistivity => {
                VariantPayload::HighResResistivity(ResistivityVariant::default())
            }
            MethodTag::TransientEm => VariantPayload::TransientEm(TransientEmVariant::default()),
            MethodTag::MicroSeismic => VariantPayload::MicroSeismic(MicroSeismicVariant::default()),
            MethodTag::FaceSketch => VariantPayload::FaceSketch(FaceSketchVariant::default()),
            MethodTag::TunnelBodySketch => {
                VariantPayload::TunnelBodySketch(TunnelBodySketchVariant::default())
            }
            MethodTag::SurfaceSupplement => {
                VariantPayload::SurfaceSupplement(SurfaceSupplementVariant::default())
            }
            MethodTag::DrillingHorizontal => {
                VariantPayload::DrillingHorizontal(DrillingVariant::default())
            }
            MethodTag::DrillingAdvanced => VariantPayload::DrillingAdvanced(DrillingVariant::default()),
        }
    }

    /// 已填写字段（线上字段名），用于叠加到原记录之上
    pub fn to_wire_patch(&self) -> Map<String, Value> {
        match self {
            VariantPayload::Other => Map::new(),
            VariantPayload::Tsp(v) => object_of(v),
            VariantPayload::Hsp(v) => object_of(v),
            VariantPayload::LandSonar(v) => object_of(v),
            VariantPayload::EmReflection(v) => object_of(v),
            VariantPayload::HighResResistivity(v) => object_of(v),
            VariantPayload::TransientEm(v) => object_of(v),
            VariantPayload::MicroSeismic(v) => object_of(v),
            VariantPayload::FaceSketch(v) => object_of(v),
            VariantPayload::TunnelBodySketch(v) => object_of(v),
            VariantPayload::SurfaceSupplement(v) => object_of(v),
            VariantPayload::DrillingHorizontal(v) | VariantPayload::DrillingAdvanced(v) => {
                object_of(v)
            }
        }
    }

    /// 从线上对象解析（先按注册表宽松规整，再反序列化）
    pub fn from_wire(method: MethodTag, wire: &Map<String, Value>) -> serde_json::Result<Self> {
        let clean = Value::Object(lenient_variant_fields(method, wire));
        Ok(match method {
            MethodTag::Other => VariantPayload::Other,
            MethodTag::Tsp => VariantPayload::Tsp(decode(clean)?),
            MethodTag::Hsp => VariantPayload::Hsp(decode(clean)?),
            MethodTag::LandSonar => VariantPayload::LandSonar(decode(clean)?),
            MethodTag::EmReflection => VariantPayload::EmReflection(decode(clean)?),
            MethodTag::HighResResistivity => VariantPayload::HighResResistivity(decode(clean)?),
            MethodTag::TransientEm => VariantPayload::TransientEm(decode(clean)?),
            MethodTag::MicroSeismic => VariantPayload::MicroSeismic(decode(clean)?),
            MethodTag::FaceSketch => VariantPayload::FaceSketch(decode(clean)?),
            MethodTag::TunnelBodySketch => VariantPayload::TunnelBodySketch(decode(clean)?),
            MethodTag::SurfaceSupplement => VariantPayload::SurfaceSupplement(decode(clean)?),
            MethodTag::DrillingHorizontal => VariantPayload::DrillingHorizontal(decode(clean)?),
            MethodTag::DrillingAdvanced => VariantPayload::DrillingAdvanced(decode(clean)?),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.to_wire_patch().is_empty()
    }
}

fn object_of<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
    serde_json::from_value(value)
}

fn lenient_variant_fields(method: MethodTag, wire: &Map<String, Value>) -> Map<String, Value> {
    schema_for(method)
        .variant_fields
        .iter()
        .filter_map(|spec| {
            wire.get(spec.key)
                .and_then(|v| spec.lenient(v))
                .map(|v| (spec.key.to_string(), v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema_registry::FieldKind;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn sample_value(kind: FieldKind) -> Value {
        match kind {
            FieldKind::Text | FieldKind::Attachment => json!("x"),
            FieldKind::Decimal { .. } => json!(1.5),
            FieldKind::Integer => json!(2),
            FieldKind::Code { fallback, .. } => json!(fallback),
            FieldKind::Timestamp => json!("2024-01-02T03:04:05"),
        }
    }

    #[test]
    fn test_struct_fields_match_registry() {
        for method in MethodTag::ALL {
            let schema = schema_for(method);
            let wire: Map<String, Value> = schema
                .variant_fields
                .iter()
                .map(|f| (f.key.to_string(), sample_value(f.kind)))
                .collect();

            let payload = VariantPayload::from_wire(method, &wire).unwrap();
            assert_eq!(payload.method(), method);

            let keys: BTreeSet<String> = payload.to_wire_patch().keys().cloned().collect();
            let expected: BTreeSet<String> =
                schema.variant_keys().iter().map(|k| k.to_string()).collect();
            assert_eq!(keys, expected, "{} 变体字段与注册表不一致", method);
        }
    }

    #[test]
    fn test_empty_payload_has_no_patch() {
        for method in MethodTag::ALL {
            let payload = VariantPayload::empty(method);
            assert_eq!(payload.method(), method);
            assert!(payload.is_empty());
        }
    }

    #[test]
    fn test_lenient_decode_accepts_string_numbers() {
        let wire = json!({
            "sbdcType": "2",
            "fspl": "8.0",
            "gddl": 1.2,
            "sbName": "TEM-47",
            "tspUnrelated": 1
        });
        let payload =
            VariantPayload::from_wire(MethodTag::TransientEm, wire.as_object().unwrap()).unwrap();
        match payload {
            VariantPayload::TransientEm(v) => {
                assert_eq!(v.loop_kind(), Some(TemLoopKind::CenterLoop));
                assert_eq!(v.frequency, Some(8.0));
                assert_eq!(v.current, Some(1.2));
                assert_eq!(v.device_name.as_deref(), Some("TEM-47"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }
}
