// ==========================================
// 隧道超前地质预报 - 领域类型定义
// ==========================================
// 职责: 预报方法标签、风险类别、地质级别颜色、围岩等级等闭合枚举
// 说明: 后端使用数值代码/中文文本，这里统一提供双向转换
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 预报方法 (Method Tag)
// ==========================================
// 决定记录的变体载荷与辅助点列表形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MethodTag {
    Other,              // 其他（仅基本信息）
    Tsp,                // 地震波反射
    Hsp,                // 水平声波剖面
    LandSonar,          // 陆地声呐
    EmReflection,       // 电磁波反射
    HighResResistivity, // 高分辨直流电
    TransientEm,        // 瞬变电磁
    MicroSeismic,       // 微震监测预报
    FaceSketch,         // 掌子面素描
    TunnelBodySketch,   // 洞身素描
    SurfaceSupplement,  // 地表补充
    DrillingHorizontal, // 超前水平钻
    DrillingAdvanced,   // 加深炮孔
}

impl MethodTag {
    pub const ALL: [MethodTag; 13] = [
        MethodTag::Other,
        MethodTag::Tsp,
        MethodTag::Hsp,
        MethodTag::LandSonar,
        MethodTag::EmReflection,
        MethodTag::HighResResistivity,
        MethodTag::TransientEm,
        MethodTag::MicroSeismic,
        MethodTag::FaceSketch,
        MethodTag::TunnelBodySketch,
        MethodTag::SurfaceSupplement,
        MethodTag::DrillingHorizontal,
        MethodTag::DrillingAdvanced,
    ];

    /// 后端 `method` 字段的数值代码
    pub fn code(self) -> i64 {
        match self {
            MethodTag::Other => 0,
            MethodTag::Tsp => 1,
            MethodTag::Hsp => 2,
            MethodTag::LandSonar => 3,
            MethodTag::EmReflection => 4,
            MethodTag::HighResResistivity => 5,
            MethodTag::TransientEm => 6,
            MethodTag::MicroSeismic => 7,
            MethodTag::FaceSketch => 10,
            MethodTag::TunnelBodySketch => 11,
            MethodTag::SurfaceSupplement => 12,
            MethodTag::DrillingHorizontal => 13,
            MethodTag::DrillingAdvanced => 14,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        MethodTag::ALL.into_iter().find(|m| m.code() == code)
    }

    /// 方法简码（附件路径与接口路径使用）
    pub fn short_code(self) -> &'static str {
        match self {
            MethodTag::Other => "qt",
            MethodTag::Tsp => "tsp",
            MethodTag::Hsp => "hsp",
            MethodTag::LandSonar => "ldsn",
            MethodTag::EmReflection => "dcbfs",
            MethodTag::HighResResistivity => "gfbzld",
            MethodTag::TransientEm => "sbdc",
            MethodTag::MicroSeismic => "wzjc",
            MethodTag::FaceSketch => "zzmsm",
            MethodTag::TunnelBodySketch => "dssm",
            MethodTag::SurfaceSupplement => "dbbc",
            MethodTag::DrillingHorizontal => "cqspz",
            MethodTag::DrillingAdvanced => "jspk",
        }
    }

    pub fn from_short_code(code: &str) -> Option<Self> {
        let code = code.trim().to_lowercase();
        MethodTag::ALL.into_iter().find(|m| m.short_code() == code)
    }

    pub fn family(self) -> MethodFamily {
        match self {
            MethodTag::Other
            | MethodTag::Tsp
            | MethodTag::Hsp
            | MethodTag::LandSonar
            | MethodTag::EmReflection
            | MethodTag::HighResResistivity
            | MethodTag::TransientEm
            | MethodTag::MicroSeismic => MethodFamily::Geophysical,
            MethodTag::FaceSketch => MethodFamily::FaceSketch,
            MethodTag::TunnelBodySketch => MethodFamily::TunnelSketch,
            MethodTag::SurfaceSupplement => MethodFamily::SurfaceSupplement,
            MethodTag::DrillingHorizontal | MethodTag::DrillingAdvanced => MethodFamily::Drilling,
        }
    }

    /// i18n 键（显示名称）
    pub fn label_key(self) -> String {
        format!("method.{}", self.short_code())
    }
}

impl fmt::Display for MethodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_code().to_uppercase())
    }
}

// ==========================================
// 方法大类 (Method Family)
// ==========================================
// 后端按大类划分接口：物探法/钻探法/掌子面素描/洞身素描/地表补充
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MethodFamily {
    Geophysical,
    Drilling,
    FaceSketch,
    TunnelSketch,
    SurfaceSupplement,
}

impl MethodFamily {
    /// 接口路径前缀
    pub fn endpoint(self) -> &'static str {
        match self {
            MethodFamily::Geophysical => "wtf",
            MethodFamily::Drilling => "ztf",
            MethodFamily::FaceSketch => "zzmsm",
            MethodFamily::TunnelSketch => "dssm",
            MethodFamily::SurfaceSupplement => "dbbc",
        }
    }
}

impl fmt::Display for MethodFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

// ==========================================
// 地质级别颜色 (Severity Color)
// ==========================================
// 绿/黄/红，任一时刻仅选中一个
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityColor {
    #[default]
    Green,
    Yellow,
    Red,
}

impl SeverityColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityColor::Green => "green",
            SeverityColor::Yellow => "yellow",
            SeverityColor::Red => "red",
        }
    }

    /// 宽松解析，未知值返回 None
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "green" | "绿色" => Some(SeverityColor::Green),
            "yellow" | "黄色" => Some(SeverityColor::Yellow),
            "red" | "红色" => Some(SeverityColor::Red),
            _ => None,
        }
    }
}

impl fmt::Display for SeverityColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 围岩等级 (Rock Grade)
// ==========================================
// 顺序: I < II < ... < VI，数值代码 1..=6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum RockGrade {
    #[default]
    I,
    II,
    III,
    IV,
    V,
    VI,
}

impl RockGrade {
    pub fn code(self) -> i64 {
        match self {
            RockGrade::I => 1,
            RockGrade::II => 2,
            RockGrade::III => 3,
            RockGrade::IV => 4,
            RockGrade::V => 5,
            RockGrade::VI => 6,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(RockGrade::I),
            2 => Some(RockGrade::II),
            3 => Some(RockGrade::III),
            4 => Some(RockGrade::IV),
            5 => Some(RockGrade::V),
            6 => Some(RockGrade::VI),
            _ => None,
        }
    }

    pub fn roman(self) -> &'static str {
        match self {
            RockGrade::I => "Ⅰ",
            RockGrade::II => "Ⅱ",
            RockGrade::III => "Ⅲ",
            RockGrade::IV => "Ⅳ",
            RockGrade::V => "Ⅴ",
            RockGrade::VI => "Ⅵ",
        }
    }
}

impl fmt::Display for RockGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.roman())
    }
}

// ==========================================
// 风险类别 (Risk Category)
// ==========================================
// 建议词表；线上字段为自由文本，不做端到端强制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    FaultZone,    // 破碎带
    Karst,        // 岩溶
    Gas,          // 瓦斯
    WaterInrush,  // 涌水
    MudInrush,    // 突泥
    InSituStress, // 地应力
    MinedOutArea, // 采空区
    Rockburst,    // 岩爆
    Other,        // 其他
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 9] = [
        RiskCategory::FaultZone,
        RiskCategory::Karst,
        RiskCategory::Gas,
        RiskCategory::WaterInrush,
        RiskCategory::MudInrush,
        RiskCategory::InSituStress,
        RiskCategory::MinedOutArea,
        RiskCategory::Rockburst,
        RiskCategory::Other,
    ];

    /// 线上文本（与后端一致的中文词）
    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::FaultZone => "破碎带",
            RiskCategory::Karst => "岩溶",
            RiskCategory::Gas => "瓦斯",
            RiskCategory::WaterInrush => "涌水",
            RiskCategory::MudInrush => "突泥",
            RiskCategory::InSituStress => "地应力",
            RiskCategory::MinedOutArea => "采空区",
            RiskCategory::Rockburst => "岩爆",
            RiskCategory::Other => "其他",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        RiskCategory::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ==========================================
// 辅助点类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointKind {
    SonarPoint,         // 陆地声呐测点
    SurveyLine,         // 电磁波反射测线
    Electrode,          // 高分辨直流电电极
    AdvancedBorehole,   // 加深炮孔
    HorizontalBorehole, // 超前水平钻孔
}

// ==========================================
// 上报标志 (submitFlag)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitFlag {
    #[default]
    Draft, // 0 = 草稿/已撤回
    Submitted, // 1 = 已上报
}

impl SubmitFlag {
    pub fn code(self) -> i64 {
        match self {
            SubmitFlag::Draft => 0,
            SubmitFlag::Submitted => 1,
        }
    }

    /// 非 1 一律视为草稿
    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            SubmitFlag::Submitted
        } else {
            SubmitFlag::Draft
        }
    }
}

// ==========================================
// 电极类型（高分辨直流电）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectrodeKind {
    PowerSupply, // 1 = 供电电极
    Measurement, // 2 = 测量电极
}

impl ElectrodeKind {
    pub fn code(self) -> i64 {
        match self {
            ElectrodeKind::PowerSupply => 1,
            ElectrodeKind::Measurement => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ElectrodeKind::PowerSupply),
            2 => Some(ElectrodeKind::Measurement),
            _ => None,
        }
    }
}

// ==========================================
// 采集装置类型（瞬变电磁）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemLoopKind {
    Overlapping, // 1 = 重叠回线
    CenterLoop,  // 2 = 中心回线
    Dipole,      // 3 = 偶极装置
}

impl TemLoopKind {
    pub fn code(self) -> i64 {
        match self {
            TemLoopKind::Overlapping => 1,
            TemLoopKind::CenterLoop => 2,
            TemLoopKind::Dipole => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(TemLoopKind::Overlapping),
            2 => Some(TemLoopKind::CenterLoop),
            3 => Some(TemLoopKind::Dipole),
            _ => None,
        }
    }
}

// ==========================================
// 开挖位置（地震波反射 kwwz）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExcavationSide {
    Left,  // 1
    Right, // 2
    Both,  // 3
}

impl ExcavationSide {
    pub fn code(self) -> i64 {
        match self {
            ExcavationSide::Left => 1,
            ExcavationSide::Right => 2,
            ExcavationSide::Both => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ExcavationSide::Left),
            2 => Some(ExcavationSide::Right),
            3 => Some(ExcavationSide::Both),
            _ => None,
        }
    }
}

// ==========================================
// 开挖方法（掌子面素描 kwfs）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExcavationMethod {
    FullFace,        // 1 = 全断面法
    Bench,           // 2 = 台阶法
    CrossDiaphragm,  // 3 = CD法
    DoubleSideDrift, // 4 = 双侧壁导坑法
}

impl ExcavationMethod {
    pub fn code(self) -> i64 {
        match self {
            ExcavationMethod::FullFace => 1,
            ExcavationMethod::Bench => 2,
            ExcavationMethod::CrossDiaphragm => 3,
            ExcavationMethod::DoubleSideDrift => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ExcavationMethod::FullFace),
            2 => Some(ExcavationMethod::Bench),
            3 => Some(ExcavationMethod::CrossDiaphragm),
            4 => Some(ExcavationMethod::DoubleSideDrift),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_code_roundtrip_is_unique() {
        for method in MethodTag::ALL {
            assert_eq!(MethodTag::from_code(method.code()), Some(method));
            assert_eq!(MethodTag::from_short_code(method.short_code()), Some(method));
        }
        assert_eq!(MethodTag::from_code(8), None);
        assert_eq!(MethodTag::from_code(99), None);
    }

    #[test]
    fn test_method_family() {
        assert_eq!(MethodTag::TransientEm.family(), MethodFamily::Geophysical);
        assert_eq!(MethodTag::DrillingAdvanced.family(), MethodFamily::Drilling);
        assert_eq!(MethodTag::SurfaceSupplement.family().endpoint(), "dbbc");
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(SeverityColor::parse(" Yellow "), Some(SeverityColor::Yellow));
        assert_eq!(SeverityColor::parse("红色"), Some(SeverityColor::Red));
        assert_eq!(SeverityColor::parse(""), None);
        assert_eq!(SeverityColor::default(), SeverityColor::Green);
    }

    #[test]
    fn test_rock_grade_order() {
        assert!(RockGrade::I < RockGrade::VI);
        assert_eq!(RockGrade::from_code(4), Some(RockGrade::IV));
        assert_eq!(RockGrade::from_code(0), None);
        assert_eq!(RockGrade::V.to_string(), "Ⅴ");
    }

    #[test]
    fn test_risk_category_labels() {
        assert_eq!(RiskCategory::from_label("岩溶"), Some(RiskCategory::Karst));
        assert_eq!(RiskCategory::from_label("未知"), None);
    }

    #[test]
    fn test_submit_flag() {
        assert_eq!(SubmitFlag::from_code(1), SubmitFlag::Submitted);
        assert_eq!(SubmitFlag::from_code(0), SubmitFlag::Draft);
        assert_eq!(SubmitFlag::from_code(7), SubmitFlag::Draft);
    }
}
