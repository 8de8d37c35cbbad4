// ==========================================
// 隧道超前地质预报 - 方法模式注册表
// ==========================================
// 职责: 预报方法 -> 基本信息字段 / 方法特有字段 / 必填规则 /
//       辅助点列表形状 / 标识字段约定 / 表单分组
// 说明: 各方法只在变体字段与点列表形状上不同，
//       合并/校验逻辑对注册表保持通用
// ==========================================

use crate::domain::types::{MethodTag, PointKind};
use crate::engine::coercion::{
    canonical_timestamp, decimal_value, integer_value, parse_number, text_of,
};
use serde_json::Value;

// ==========================================
// 字段类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    /// 小数，precision 为保留位数
    Decimal { precision: u32 },
    /// 整数（计数类）
    Integer,
    /// 数值代码，缺失/越界时取 fallback
    Code { allowed: &'static [i64], fallback: i64 },
    Timestamp,
    /// 附件文件名（"" 或 "1" 均表示无文件）
    Attachment,
}

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Decimal { .. } | FieldKind::Integer | FieldKind::Code { .. }
        )
    }
}

// ==========================================
// 字段定义
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// 线上字段名
    pub key: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub unit: Option<&'static str>,
    pub max_len: Option<usize>,
}

impl FieldSpec {
    const fn new(key: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            kind,
            required: false,
            unit: None,
            max_len: None,
        }
    }

    pub const fn text(key: &'static str) -> Self {
        Self::new(key, FieldKind::Text)
    }

    pub const fn decimal(key: &'static str, precision: u32) -> Self {
        Self::new(key, FieldKind::Decimal { precision })
    }

    pub const fn integer(key: &'static str) -> Self {
        Self::new(key, FieldKind::Integer)
    }

    pub const fn code(key: &'static str, allowed: &'static [i64], fallback: i64) -> Self {
        Self::new(key, FieldKind::Code { allowed, fallback })
    }

    pub const fn timestamp(key: &'static str) -> Self {
        Self::new(key, FieldKind::Timestamp)
    }

    pub const fn attachment(key: &'static str) -> Self {
        Self::new(key, FieldKind::Attachment)
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn unit(self, unit: &'static str) -> Self {
        Self {
            unit: Some(unit),
            ..self
        }
    }

    pub const fn max_len(self, len: usize) -> Self {
        Self {
            max_len: Some(len),
            ..self
        }
    }

    /// 规整为线上值（构建用，不失败）
    ///
    /// 缺失字段写出为空串/零值，不省略
    pub fn coerce(&self, value: Option<&Value>) -> Value {
        let value = value.unwrap_or(&Value::Null);
        match self.kind {
            FieldKind::Text | FieldKind::Attachment => Value::String(text_of(value)),
            FieldKind::Decimal { precision } => {
                decimal_value(parse_number(value).unwrap_or(0.0), precision)
            }
            FieldKind::Integer => integer_value(parse_number(value).unwrap_or(0.0)),
            FieldKind::Code { allowed, fallback } => {
                let code = parse_number(value)
                    .map(|v| v.round() as i64)
                    .filter(|c| allowed.contains(c))
                    .unwrap_or(fallback);
                Value::from(code)
            }
            FieldKind::Timestamp => match canonical_timestamp(value) {
                Ok(ts) => Value::String(ts),
                Err(_) => Value::String(text_of(value).trim().to_string()),
            },
        }
    }

    /// 宽松读取（解析详情用）：类型不符的值丢弃为 None
    pub fn lenient(&self, value: &Value) -> Option<Value> {
        if value.is_null() {
            return None;
        }
        match self.kind {
            FieldKind::Text | FieldKind::Attachment => Some(Value::String(text_of(value))),
            FieldKind::Decimal { .. } => parse_number(value)
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            FieldKind::Integer | FieldKind::Code { .. } => {
                parse_number(value).map(|v| Value::from(v.round() as i64))
            }
            FieldKind::Timestamp => match canonical_timestamp(value) {
                Ok(ts) if ts.is_empty() => None,
                Ok(ts) => Some(Value::String(ts)),
                Err(_) => Some(Value::String(text_of(value))),
            },
        }
    }
}

// ==========================================
// 表单分组（展示用，同组字段一并校验）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    /// i18n 键
    pub title_key: &'static str,
    pub fields: &'static [&'static str],
}

// ==========================================
// 辅助点列表形状
// ==========================================
/// 序号字段规则
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelRule {
    /// 整数序号，默认 位置+1
    Numeric { key: &'static str },
    /// 带前缀的文本序号，默认 如 DJ001
    Prefixed {
        key: &'static str,
        prefix: &'static str,
        width: usize,
    },
}

impl LabelRule {
    pub fn key(&self) -> &'static str {
        match self {
            LabelRule::Numeric { key } | LabelRule::Prefixed { key, .. } => key,
        }
    }

    /// 位置对应的默认序号
    pub fn default_label(&self, position: usize) -> Value {
        match self {
            LabelRule::Numeric { .. } => Value::from((position + 1) as i64),
            LabelRule::Prefixed { prefix, width, .. } => Value::String(format!(
                "{}{:0width$}",
                prefix,
                position + 1,
                width = *width
            )),
        }
    }

    /// 显式序号 -> 线上值（整数序号尽量保持为数字）
    pub fn explicit_label(&self, label: &str) -> Value {
        match self {
            LabelRule::Numeric { .. } => match label.trim().parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(label.to_string()),
            },
            LabelRule::Prefixed { .. } => Value::String(label.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointShape {
    pub kind: PointKind,
    /// 提交列表名（…DTOList）
    pub list_key: &'static str,
    /// 详情列表名（…VOList）
    pub detail_list_key: &'static str,
    pub pk_key: &'static str,
    pub id_key: &'static str,
    /// 指向父记录的标识字段
    pub parent_key: &'static str,
    pub label: Option<LabelRule>,
    pub fields: &'static [FieldSpec],
}

impl PointShape {
    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }
}

// ==========================================
// 标识字段约定
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Zero,
    Null,
}

impl Sentinel {
    pub fn value(self) -> Value {
        match self {
            Sentinel::Zero => Value::from(0),
            Sentinel::Null => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRule {
    /// 更新时保留已知标识
    Preserve,
    /// 更新时同样写出哨兵值
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityRule {
    pub on_create: Sentinel,
    pub on_update: UpdateRule,
}

impl IdentityRule {
    pub const ZERO_THEN_PRESERVE: IdentityRule = IdentityRule {
        on_create: Sentinel::Zero,
        on_update: UpdateRule::Preserve,
    };

    pub const ALWAYS_NULL: IdentityRule = IdentityRule {
        on_create: Sentinel::Null,
        on_update: UpdateRule::Reset,
    };

    /// 计算最终线上值
    ///
    /// - is_update: 记录是否已持久化
    /// - known: 已知标识（未持久化的子记录为 None）
    pub fn resolve(&self, is_update: bool, known: Option<&Value>) -> Value {
        if !is_update {
            return self.on_create.value();
        }
        match self.on_update {
            UpdateRule::Reset => self.on_create.value(),
            UpdateRule::Preserve => match known {
                Some(v) if !v.is_null() => v.clone(),
                _ => self.on_create.value(),
            },
        }
    }
}

/// 各标识字段的哨兵约定（逐字段保留，不统一）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityPolicy {
    /// ybPk
    pub record_pk: IdentityRule,
    /// ybId 以及方法级标识（hspPk/hspId 等）
    pub record_id: IdentityRule,
    /// 分段 ybjgPk
    pub segment_pk: IdentityRule,
    /// 分段 ybPk
    pub segment_parent: IdentityRule,
}

impl IdentityPolicy {
    pub const STANDARD: IdentityPolicy = IdentityPolicy {
        record_pk: IdentityRule::ZERO_THEN_PRESERVE,
        record_id: IdentityRule::ZERO_THEN_PRESERVE,
        segment_pk: IdentityRule::ZERO_THEN_PRESERVE,
        segment_parent: IdentityRule::ZERO_THEN_PRESERVE,
    };

    /// 地表补充：主键与分段标识一律为 null，更新目标通过网关参数传递
    pub const NULL_KEYS: IdentityPolicy = IdentityPolicy {
        record_pk: IdentityRule::ALWAYS_NULL,
        record_id: IdentityRule::ZERO_THEN_PRESERVE,
        segment_pk: IdentityRule::ALWAYS_NULL,
        segment_parent: IdentityRule::ALWAYS_NULL,
    };
}

// ==========================================
// 方法模式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodSchema {
    pub method: MethodTag,
    pub variant_fields: &'static [FieldSpec],
    /// 方法级标识字段（新增为0，更新保留）
    pub identity_fields: &'static [&'static str],
    /// 恒定写出为空列表的字段
    pub empty_lists: &'static [&'static str],
    pub point_shape: Option<&'static PointShape>,
    pub identity: IdentityPolicy,
    /// 预报长度由变体字段给出（基本信息 ybLength 非必填）
    pub length_in_variant: bool,
    pub sections: &'static [Section],
}

impl MethodSchema {
    pub fn header_fields(&self) -> &'static [FieldSpec] {
        HEADER_FIELDS
    }

    pub fn segment_fields(&self) -> &'static [FieldSpec] {
        SEGMENT_FIELDS
    }

    /// 基本信息 + 变体字段
    pub fn all_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        HEADER_FIELDS.iter().chain(self.variant_fields.iter())
    }

    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.all_fields().find(|f| f.key == key)
    }

    pub fn variant_field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.variant_fields.iter().find(|f| f.key == key)
    }

    pub fn is_required(&self, spec: &FieldSpec) -> bool {
        if self.length_in_variant && spec.key == LENGTH_KEY {
            return false;
        }
        spec.required
    }

    pub fn required_fields(&self) -> Vec<&'static FieldSpec> {
        self.all_fields().filter(|f| self.is_required(f)).collect()
    }

    pub fn variant_keys(&self) -> Vec<&'static str> {
        self.variant_fields.iter().map(|f| f.key).collect()
    }

    /// 附件字段
    pub fn attachment_keys(&self) -> Vec<&'static str> {
        self.variant_fields
            .iter()
            .filter(|f| f.kind == FieldKind::Attachment)
            .map(|f| f.key)
            .collect()
    }

    pub fn has_points(&self) -> bool {
        self.point_shape.is_some()
    }

    /// 所在分组（未归组的字段返回 None）
    pub fn section_of(&self, key: &str) -> Option<&'static Section> {
        self.sections.iter().find(|s| s.fields.contains(&key))
    }
}

// ==========================================
// 公共字段集合
// ==========================================

pub const RECORD_PK_KEY: &str = "ybPk";
pub const RECORD_ID_KEY: &str = "ybId";
pub const METHOD_KEY: &str = "method";
pub const SUBMIT_FLAG_KEY: &str = "submitFlag";
pub const LENGTH_KEY: &str = "ybLength";

pub const SEGMENT_LIST_KEY: &str = "ybjgDTOList";
/// 详情接口可能返回的分段列表名
pub const SEGMENT_DETAIL_LIST_KEYS: [&str; 2] = ["ybjgVOList", "ybjgList"];
pub const SEGMENT_PK_KEY: &str = "ybjgPk";
pub const SEGMENT_ID_KEY: &str = "ybjgId";
pub const SEGMENT_PARENT_KEY: &str = "ybPk";
pub const SEGMENT_CONCLUSION_KEY: &str = "jlresult";

/// 分段结论默认最大长度
pub const DEFAULT_CONCLUSION_MAX_LEN: usize = 500;

pub const HEADER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("siteId"),
    FieldSpec::text("dkname").required(),
    FieldSpec::decimal("dkilo", 2).required().unit("m"),
    FieldSpec::decimal("dkiloPlus", 2).unit("m"),
    FieldSpec::decimal("ybLength", 2).required().unit("m"),
    FieldSpec::timestamp("monitordate").required(),
    FieldSpec::timestamp("createdate"),
    FieldSpec::text("testname"),
    FieldSpec::text("testno"),
    FieldSpec::text("testtel"),
    FieldSpec::text("monitorname"),
    FieldSpec::text("monitorno"),
    FieldSpec::text("monitortel"),
    FieldSpec::text("supervisorname"),
    FieldSpec::text("supervisorno"),
    FieldSpec::text("supervisortel"),
    FieldSpec::text("conclusionyb"),
    FieldSpec::text("suggestion"),
    FieldSpec::text("solution"),
    FieldSpec::text("remark"),
    FieldSpec::integer("flag"),
    FieldSpec::code("submitFlag", &[0, 1], 0),
];

pub const SEGMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("dkname").required(),
    FieldSpec::decimal("sdkilo", 2).required().unit("m"),
    FieldSpec::decimal("edkilo", 2).required().unit("m"),
    FieldSpec::timestamp("ybjgTime").required(),
    FieldSpec::text("risklevel").required(),
    FieldSpec::text("dzjb"),
    FieldSpec::code("grade", &[1, 2, 3, 4, 5, 6], 1).required(),
    FieldSpec::code("wylevel", &[1, 2, 3, 4, 5, 6], 1),
    FieldSpec::text("jlresult")
        .required()
        .max_len(DEFAULT_CONCLUSION_MAX_LEN),
];

const BASIC_SECTIONS: [&str; 8] = [
    "siteId",
    "dkname",
    "dkilo",
    "dkiloPlus",
    "ybLength",
    "monitordate",
    "createdate",
    "flag",
];

const PERSONNEL_SECTION: [&str; 9] = [
    "testname",
    "testno",
    "testtel",
    "monitorname",
    "monitorno",
    "monitortel",
    "supervisorname",
    "supervisorno",
    "supervisortel",
];

const CONCLUSION_SECTION: [&str; 4] = ["conclusionyb", "suggestion", "solution", "remark"];

// ==========================================
// 各方法变体字段
// ==========================================

const OTHER_FIELDS: &[FieldSpec] = &[];

const TSP_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("jfpknum"),
    FieldSpec::decimal("jfpksd", 2).unit("m"),
    FieldSpec::decimal("jfpkzj", 0).unit("mm"),
    FieldSpec::decimal("jfpkjdmgd", 2).unit("m"),
    FieldSpec::decimal("jfpkjj", 2).unit("m"),
    FieldSpec::integer("jspknum"),
    FieldSpec::decimal("jspksd", 2).unit("m"),
    FieldSpec::decimal("jspkzj", 0).unit("mm"),
    FieldSpec::decimal("jspkjdmgd", 2).unit("m"),
    FieldSpec::text("sbName"),
    FieldSpec::code("kwwz", &[1, 2, 3], 1),
    FieldSpec::decimal("leftkilo", 2).unit("m"),
    FieldSpec::decimal("rightkilo", 2).unit("m"),
    FieldSpec::decimal("leftjgdczjl", 2).unit("m"),
    FieldSpec::decimal("rightjgdczjl", 2).unit("m"),
    FieldSpec::decimal("leftzxjl", 2).unit("m"),
    FieldSpec::decimal("rightzxjl", 2).unit("m"),
    FieldSpec::decimal("leftjdmgd", 2).unit("m"),
    FieldSpec::decimal("rightjdmgd", 2).unit("m"),
    FieldSpec::decimal("leftks", 2).unit("m"),
    FieldSpec::decimal("rightks", 2).unit("m"),
    FieldSpec::decimal("leftqj", 2).unit("°"),
    FieldSpec::decimal("rightqj", 2).unit("°"),
];

const HSP_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("cqnum").required(),
    FieldSpec::integer("cdnum").required(),
    FieldSpec::text("jsfs").required(),
    FieldSpec::text("sbName").required(),
    FieldSpec::attachment("pic1"),
    FieldSpec::attachment("pic2"),
];

const LAND_SONAR_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("sbName").required(),
    FieldSpec::integer("cxnum").required(),
];

const EM_REFLECTION_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("sbName").required(),
    FieldSpec::integer("cxnum").required(),
    FieldSpec::decimal("gzpl", 1).required().unit("MHz"),
];

const RESISTIVITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("gddjnum"),
    FieldSpec::integer("cldjnum"),
    FieldSpec::text("sbName").required(),
    FieldSpec::decimal("gddy", 1).unit("V"),
    FieldSpec::decimal("gddl", 1).unit("A"),
    FieldSpec::attachment("pic1"),
    FieldSpec::attachment("pic2"),
    FieldSpec::attachment("pic3"),
];

const TRANSIENT_EM_FIELDS: &[FieldSpec] = &[
    FieldSpec::code("sbdcType", &[1, 2, 3], 1),
    FieldSpec::decimal("fskwzlc", 2).unit("m"),
    FieldSpec::decimal("fskc", 1).unit("m"),
    FieldSpec::decimal("fskk", 1).unit("m"),
    FieldSpec::integer("jfxqzs"),
    FieldSpec::decimal("jskc", 1).unit("m"),
    FieldSpec::decimal("jskk", 1).unit("m"),
    FieldSpec::integer("jskzs"),
    FieldSpec::decimal("jsxqdxmj", 1).unit("m²"),
    FieldSpec::decimal("sf", 1).unit("m"),
    FieldSpec::text("sbName").required(),
    FieldSpec::decimal("fspl", 1).unit("Hz"),
    FieldSpec::decimal("gddl", 1).unit("A"),
    FieldSpec::decimal("clsj", 1).unit("s"),
    FieldSpec::decimal("mqfw", 1).unit("m"),
    FieldSpec::text("cxbzms"),
    FieldSpec::attachment("pic1"),
    FieldSpec::attachment("pic2"),
    FieldSpec::attachment("pic3"),
];

const MICRO_SEISMIC_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("cumEventnum"),
    FieldSpec::decimal("cumEnergy", 2).unit("J"),
    FieldSpec::decimal("cumAppvol", 2).unit("m³"),
    FieldSpec::decimal("eventRate", 2),
    FieldSpec::decimal("energyRate", 2),
    FieldSpec::decimal("appvolRate", 2),
    FieldSpec::text("hdtzfxyms"),
    FieldSpec::attachment("wzsjfbtzt"),
];

const FACE_SKETCH_FIELDS: &[FieldSpec] = &[
    FieldSpec::code("kwfs", &[1, 2, 3, 4], 1).required(),
    FieldSpec::decimal("kwgd", 2).unit("m"),
    FieldSpec::decimal("kwkd", 2).unit("m"),
    FieldSpec::decimal("kwmj", 2).unit("m²"),
    FieldSpec::integer("bwnum"),
    FieldSpec::text("zzmzt"),
    FieldSpec::text("zzmms"),
    FieldSpec::text("ytwzztpd"),
    FieldSpec::text("ytlx"),
    FieldSpec::integer("zzmsmType"),
    FieldSpec::text("tmc"),
    FieldSpec::text("tttz"),
    FieldSpec::text("dznd"),
    FieldSpec::text("ttys"),
    FieldSpec::text("ttjg"),
    FieldSpec::text("cy"),
    FieldSpec::text("sd"),
    FieldSpec::text("msd"),
    FieldSpec::text("sx"),
    FieldSpec::text("yd"),
    FieldSpec::code("basicwylevel", &[1, 2, 3, 4, 5, 6], 1),
    FieldSpec::integer("jgmzs"),
    FieldSpec::text("dxspd"),
    FieldSpec::decimal("pjjj", 2).unit("m"),
    FieldSpec::text("pgjz"),
    FieldSpec::code("fixwylevel", &[1, 2, 3, 4, 5, 6], 1),
    FieldSpec::text("csdylpd"),
    FieldSpec::text("dzgzyl"),
    FieldSpec::attachment("images"),
    FieldSpec::attachment("photo"),
    FieldSpec::attachment("addition"),
];

const TUNNEL_BODY_SKETCH_FIELDS: &[FieldSpec] = &[
    FieldSpec::decimal("beginkilo", 2).unit("m"),
    FieldSpec::decimal("dssmLength", 2).required().unit("m"),
    FieldSpec::code("sjwydj", &[1, 2, 3, 4, 5, 6], 1),
    FieldSpec::code("sgwydj", &[1, 2, 3, 4, 5, 6], 1),
    FieldSpec::text("sjdzms"),
    FieldSpec::text("sgdztz"),
    FieldSpec::text("sggztz"),
    FieldSpec::text("shswtz"),
    FieldSpec::text("dgdcjyx"),
    FieldSpec::text("nextMethod"),
    FieldSpec::timestamp("nextForecastDate"),
    FieldSpec::attachment("zbqsmt"),
    FieldSpec::attachment("zbqxct"),
    FieldSpec::attachment("ybqsmt"),
    FieldSpec::attachment("ybqxct"),
    FieldSpec::attachment("gbsmt"),
    FieldSpec::attachment("gbxct"),
    FieldSpec::attachment("addition"),
];

const SURFACE_SUPPLEMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::decimal("beginkilo", 2).unit("m"),
    FieldSpec::decimal("beginkiloStart", 2).unit("m"),
    FieldSpec::decimal("beginkiloEnd", 2).unit("m"),
    FieldSpec::decimal("dbbcLength", 2).required().unit("m"),
    FieldSpec::code("sjwydj", &[1, 2, 3, 4, 5, 6], 1),
    FieldSpec::text("sjqk"),
    FieldSpec::text("dcyx"),
    FieldSpec::text("dbry"),
    FieldSpec::text("tsdz"),
    FieldSpec::text("rwdk"),
    FieldSpec::text("dzpj"),
    FieldSpec::attachment("addition"),
];

const DRILLING_FIELDS: &[FieldSpec] = &[FieldSpec::attachment("images")];

// ==========================================
// 点列表形状
// ==========================================

static SONAR_POINT_SHAPE: PointShape = PointShape {
    kind: PointKind::SonarPoint,
    list_key: "ldsnResultinfoDTOList",
    detail_list_key: "ldsnResultinfoVOList",
    pk_key: "ldsnResultinfoPk",
    id_key: "ldsnResultinfoId",
    parent_key: "ldsnPk",
    label: Some(LabelRule::Numeric { key: "cdxh" }),
    fields: &[
        FieldSpec::decimal("jgdjl", 2).unit("m"),
        FieldSpec::decimal("jzxjl", 2).unit("m"),
    ],
};

static SURVEY_LINE_SHAPE: PointShape = PointShape {
    kind: PointKind::SurveyLine,
    list_key: "dcbfsResultinfoDTOList",
    detail_list_key: "dcbfsResultinfoVOList",
    pk_key: "dcbfsResultinfoPk",
    id_key: "dcbfsResultinfoId",
    parent_key: "dcbfsPk",
    label: Some(LabelRule::Numeric { key: "cxxh" }),
    fields: &[
        FieldSpec::decimal("qdzbx", 2).required(),
        FieldSpec::decimal("qdzby", 2).required(),
        FieldSpec::decimal("zdzbx", 2).required(),
        FieldSpec::decimal("zdzby", 2).required(),
    ],
};

static ELECTRODE_SHAPE: PointShape = PointShape {
    kind: PointKind::Electrode,
    list_key: "gfbzldResultinfoDTOList",
    detail_list_key: "gfbzldResultinfoVOList",
    pk_key: "gfbzldResultinfoPk",
    id_key: "gfbzldResultinfoId",
    parent_key: "gfbzldPk",
    label: Some(LabelRule::Prefixed {
        key: "djxh",
        prefix: "DJ",
        width: 3,
    }),
    fields: &[
        FieldSpec::code("gfbzldResultinfoType", &[1, 2], 1),
        FieldSpec::decimal("jzzmjl", 2).unit("m"),
    ],
};

static ADVANCED_BOREHOLE_SHAPE: PointShape = PointShape {
    kind: PointKind::AdvancedBorehole,
    list_key: "jspkZkzzDTOList",
    detail_list_key: "jspkZkzzVOList",
    pk_key: "jspkZkzzPk",
    id_key: "jspkZkzzId",
    parent_key: "ybPk",
    label: None,
    fields: &[
        FieldSpec::text("zkwz").required(),
        FieldSpec::decimal("wcj", 1).unit("°"),
        FieldSpec::decimal("zkcd", 2).unit("m"),
        FieldSpec::text("dzqkjs"),
    ],
};

static HORIZONTAL_BOREHOLE_SHAPE: PointShape = PointShape {
    kind: PointKind::HorizontalBorehole,
    list_key: "cqspzZkzzDTOList",
    detail_list_key: "cqspzZkzzVOList",
    pk_key: "cqspzZkzzPk",
    id_key: "cqspzZkzzId",
    parent_key: "ybPk",
    label: None,
    fields: &[
        FieldSpec::text("kwbh").required(),
        FieldSpec::decimal("kwpjangle", 1).unit("°"),
        FieldSpec::decimal("jgdjl", 2).unit("m"),
        FieldSpec::text("zjcode"),
    ],
};

/// 按点类型取形状
pub fn point_shape_of(kind: PointKind) -> &'static PointShape {
    match kind {
        PointKind::SonarPoint => &SONAR_POINT_SHAPE,
        PointKind::SurveyLine => &SURVEY_LINE_SHAPE,
        PointKind::Electrode => &ELECTRODE_SHAPE,
        PointKind::AdvancedBorehole => &ADVANCED_BOREHOLE_SHAPE,
        PointKind::HorizontalBorehole => &HORIZONTAL_BOREHOLE_SHAPE,
    }
}

// ==========================================
// 方法模式表
// ==========================================

const COMMON_SECTIONS: [Section; 3] = [
    Section {
        title_key: "section.basic",
        fields: &BASIC_SECTIONS,
    },
    Section {
        title_key: "section.personnel",
        fields: &PERSONNEL_SECTION,
    },
    Section {
        title_key: "section.conclusion",
        fields: &CONCLUSION_SECTION,
    },
];

static OTHER_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::Other,
    variant_fields: OTHER_FIELDS,
    identity_fields: &[],
    empty_lists: &[],
    point_shape: None,
    identity: IdentityPolicy::STANDARD,
    length_in_variant: false,
    sections: &COMMON_SECTIONS,
};

static TSP_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::Tsp,
    variant_fields: TSP_FIELDS,
    identity_fields: &[],
    empty_lists: &["tspPddataDTOList", "tspBxdataDTOList"],
    point_shape: None,
    identity: IdentityPolicy::STANDARD,
    length_in_variant: false,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.tsp_excitation",
            fields: &["jfpknum", "jfpksd", "jfpkzj", "jfpkjdmgd", "jfpkjj"],
        },
        Section {
            title_key: "section.tsp_receiver",
            fields: &[
                "jspknum",
                "jspksd",
                "jspkzj",
                "jspkjdmgd",
                "leftkilo",
                "rightkilo",
                "leftjgdczjl",
                "rightjgdczjl",
                "leftzxjl",
                "rightzxjl",
                "leftjdmgd",
                "rightjdmgd",
                "leftks",
                "rightks",
                "leftqj",
                "rightqj",
            ],
        },
        Section {
            title_key: "section.device",
            fields: &["sbName", "kwwz"],
        },
        COMMON_SECTIONS[1],
        COMMON_SECTIONS[2],
    ],
};

static HSP_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::Hsp,
    variant_fields: HSP_FIELDS,
    identity_fields: &["hspPk", "hspId"],
    empty_lists: &[],
    point_shape: None,
    identity: IdentityPolicy::STANDARD,
    length_in_variant: false,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.observation",
            fields: &["cqnum", "cdnum", "jsfs"],
        },
        Section {
            title_key: "section.device",
            fields: &["sbName"],
        },
        Section {
            title_key: "section.attachments",
            fields: &["pic1", "pic2"],
        },
        COMMON_SECTIONS[1],
        COMMON_SECTIONS[2],
    ],
};

static LAND_SONAR_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::LandSonar,
    variant_fields: LAND_SONAR_FIELDS,
    identity_fields: &["ldsnPk", "ldsnId"],
    empty_lists: &[],
    point_shape: Some(&SONAR_POINT_SHAPE),
    identity: IdentityPolicy::STANDARD,
    length_in_variant: false,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.observation",
            fields: &["cxnum"],
        },
        Section {
            title_key: "section.device",
            fields: &["sbName"],
        },
        COMMON_SECTIONS[1],
        COMMON_SECTIONS[2],
    ],
};

static EM_REFLECTION_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::EmReflection,
    variant_fields: EM_REFLECTION_FIELDS,
    identity_fields: &["dcbfsPk", "dcbfsId"],
    empty_lists: &["dcbfsResultpicDTOList"],
    point_shape: Some(&SURVEY_LINE_SHAPE),
    identity: IdentityPolicy::STANDARD,
    length_in_variant: false,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.observation",
            fields: &["cxnum"],
        },
        Section {
            title_key: "section.device",
            fields: &["sbName", "gzpl"],
        },
        COMMON_SECTIONS[1],
        COMMON_SECTIONS[2],
    ],
};

static RESISTIVITY_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::HighResResistivity,
    variant_fields: RESISTIVITY_FIELDS,
    identity_fields: &["gfbzldPk", "gfbzldId"],
    empty_lists: &[],
    point_shape: Some(&ELECTRODE_SHAPE),
    identity: IdentityPolicy::STANDARD,
    length_in_variant: false,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.observation",
            fields: &["gddjnum", "cldjnum"],
        },
        Section {
            title_key: "section.device",
            fields: &["sbName", "gddy", "gddl"],
        },
        Section {
            title_key: "section.attachments",
            fields: &["pic1", "pic2", "pic3"],
        },
        COMMON_SECTIONS[1],
        COMMON_SECTIONS[2],
    ],
};

static TRANSIENT_EM_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::TransientEm,
    variant_fields: TRANSIENT_EM_FIELDS,
    identity_fields: &["sbdcPk", "sbdcId"],
    empty_lists: &[],
    point_shape: None,
    identity: IdentityPolicy::STANDARD,
    length_in_variant: false,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.observation",
            fields: &[
                "sbdcType", "fskwzlc", "fskc", "fskk", "jfxqzs", "jskc", "jskk", "jskzs",
                "jsxqdxmj", "sf",
            ],
        },
        Section {
            title_key: "section.device",
            fields: &["sbName", "fspl", "gddl", "clsj", "mqfw", "cxbzms"],
        },
        Section {
            title_key: "section.attachments",
            fields: &["pic1", "pic2", "pic3"],
        },
        COMMON_SECTIONS[1],
        COMMON_SECTIONS[2],
    ],
};

static MICRO_SEISMIC_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::MicroSeismic,
    variant_fields: MICRO_SEISMIC_FIELDS,
    identity_fields: &[],
    empty_lists: &[],
    point_shape: None,
    identity: IdentityPolicy::STANDARD,
    length_in_variant: false,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.monitoring",
            fields: &[
                "cumEventnum",
                "cumEnergy",
                "cumAppvol",
                "eventRate",
                "energyRate",
                "appvolRate",
                "hdtzfxyms",
            ],
        },
        Section {
            title_key: "section.attachments",
            fields: &["wzsjfbtzt"],
        },
        COMMON_SECTIONS[1],
        COMMON_SECTIONS[2],
    ],
};

static FACE_SKETCH_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::FaceSketch,
    variant_fields: FACE_SKETCH_FIELDS,
    identity_fields: &[],
    empty_lists: &[],
    point_shape: None,
    identity: IdentityPolicy::STANDARD,
    length_in_variant: true,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.excavation",
            fields: &["kwfs", "kwgd", "kwkd", "kwmj", "bwnum"],
        },
        Section {
            title_key: "section.rock",
            fields: &[
                "zzmzt", "zzmms", "ytwzztpd", "ytlx", "zzmsmType", "tmc", "tttz", "dznd", "ttys",
                "ttjg", "cy", "sd", "msd", "sx", "yd",
            ],
        },
        Section {
            title_key: "section.grading",
            fields: &[
                "basicwylevel",
                "jgmzs",
                "dxspd",
                "pjjj",
                "pgjz",
                "fixwylevel",
                "csdylpd",
                "dzgzyl",
            ],
        },
        Section {
            title_key: "section.attachments",
            fields: &["images", "photo", "addition"],
        },
        COMMON_SECTIONS[1],
    ],
};

static TUNNEL_BODY_SKETCH_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::TunnelBodySketch,
    variant_fields: TUNNEL_BODY_SKETCH_FIELDS,
    identity_fields: &[],
    empty_lists: &[],
    point_shape: None,
    identity: IdentityPolicy::STANDARD,
    length_in_variant: true,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.sketch",
            fields: &[
                "beginkilo",
                "dssmLength",
                "sjwydj",
                "sgwydj",
                "sjdzms",
                "sgdztz",
                "sggztz",
                "shswtz",
                "dgdcjyx",
                "nextMethod",
                "nextForecastDate",
            ],
        },
        Section {
            title_key: "section.attachments",
            fields: &[
                "zbqsmt", "zbqxct", "ybqsmt", "ybqxct", "gbsmt", "gbxct", "addition",
            ],
        },
        COMMON_SECTIONS[1],
    ],
};

static SURFACE_SUPPLEMENT_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::SurfaceSupplement,
    variant_fields: SURFACE_SUPPLEMENT_FIELDS,
    identity_fields: &[],
    empty_lists: &[],
    point_shape: None,
    identity: IdentityPolicy::NULL_KEYS,
    length_in_variant: true,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.surface",
            fields: &[
                "beginkilo",
                "beginkiloStart",
                "beginkiloEnd",
                "dbbcLength",
                "sjwydj",
                "sjqk",
                "dcyx",
                "dbry",
                "tsdz",
                "rwdk",
                "dzpj",
            ],
        },
        Section {
            title_key: "section.attachments",
            fields: &["addition"],
        },
        COMMON_SECTIONS[1],
    ],
};

static DRILLING_HORIZONTAL_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::DrillingHorizontal,
    variant_fields: DRILLING_FIELDS,
    identity_fields: &[],
    empty_lists: &[],
    point_shape: Some(&HORIZONTAL_BOREHOLE_SHAPE),
    identity: IdentityPolicy::STANDARD,
    length_in_variant: false,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.attachments",
            fields: &["images"],
        },
        COMMON_SECTIONS[1],
        COMMON_SECTIONS[2],
    ],
};

static DRILLING_ADVANCED_SCHEMA: MethodSchema = MethodSchema {
    method: MethodTag::DrillingAdvanced,
    variant_fields: DRILLING_FIELDS,
    identity_fields: &[],
    empty_lists: &[],
    point_shape: Some(&ADVANCED_BOREHOLE_SHAPE),
    identity: IdentityPolicy::STANDARD,
    length_in_variant: false,
    sections: &[
        COMMON_SECTIONS[0],
        Section {
            title_key: "section.attachments",
            fields: &["images"],
        },
        COMMON_SECTIONS[1],
        COMMON_SECTIONS[2],
    ],
};

/// 按方法取模式
pub fn schema_for(method: MethodTag) -> &'static MethodSchema {
    match method {
        MethodTag::Other => &OTHER_SCHEMA,
        MethodTag::Tsp => &TSP_SCHEMA,
        MethodTag::Hsp => &HSP_SCHEMA,
        MethodTag::LandSonar => &LAND_SONAR_SCHEMA,
        MethodTag::EmReflection => &EM_REFLECTION_SCHEMA,
        MethodTag::HighResResistivity => &RESISTIVITY_SCHEMA,
        MethodTag::TransientEm => &TRANSIENT_EM_SCHEMA,
        MethodTag::MicroSeismic => &MICRO_SEISMIC_SCHEMA,
        MethodTag::FaceSketch => &FACE_SKETCH_SCHEMA,
        MethodTag::TunnelBodySketch => &TUNNEL_BODY_SKETCH_SCHEMA,
        MethodTag::SurfaceSupplement => &SURFACE_SUPPLEMENT_SCHEMA,
        MethodTag::DrillingHorizontal => &DRILLING_HORIZONTAL_SCHEMA,
        MethodTag::DrillingAdvanced => &DRILLING_ADVANCED_SCHEMA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_every_method_has_schema() {
        for method in MethodTag::ALL {
            let schema = schema_for(method);
            assert_eq!(schema.method, method);

            // 变体字段名在方法内唯一，且不与基本信息字段重名
            let mut seen = HashSet::new();
            for f in schema.all_fields() {
                assert!(seen.insert(f.key), "{}: 重复字段 {}", method, f.key);
            }
        }
    }

    #[test]
    fn test_point_shapes_by_method() {
        assert!(schema_for(MethodTag::Tsp).point_shape.is_none());
        assert_eq!(
            schema_for(MethodTag::LandSonar).point_shape.map(|s| s.kind),
            Some(PointKind::SonarPoint)
        );
        assert_eq!(
            schema_for(MethodTag::DrillingHorizontal)
                .point_shape
                .map(|s| s.list_key),
            Some("cqspzZkzzDTOList")
        );
        assert_eq!(
            schema_for(MethodTag::DrillingAdvanced)
                .point_shape
                .map(|s| s.kind),
            Some(PointKind::AdvancedBorehole)
        );
    }

    #[test]
    fn test_length_requirement_moves_to_variant() {
        let length = HEADER_FIELDS
            .iter()
            .find(|f| f.key == LENGTH_KEY)
            .unwrap();
        assert!(schema_for(MethodTag::Tsp).is_required(length));
        assert!(!schema_for(MethodTag::TunnelBodySketch).is_required(length));
        assert!(!schema_for(MethodTag::SurfaceSupplement).is_required(length));

        let required: Vec<&str> = schema_for(MethodTag::SurfaceSupplement)
            .required_fields()
            .iter()
            .map(|f| f.key)
            .collect();
        assert!(required.contains(&"dbbcLength"));
        assert!(!required.contains(&"ybLength"));
    }

    #[test]
    fn test_coerce_fills_missing_values() {
        assert_eq!(FieldSpec::text("remark").coerce(None), json!(""));
        assert_eq!(FieldSpec::decimal("dkilo", 2).coerce(None), json!(0.0));
        assert_eq!(FieldSpec::integer("cqnum").coerce(Some(&json!("3"))), json!(3));
        assert_eq!(
            FieldSpec::code("kwwz", &[1, 2, 3], 1).coerce(Some(&json!(9))),
            json!(1)
        );
        assert_eq!(
            FieldSpec::timestamp("monitordate").coerce(Some(&json!("2024-05-06 07:08:09"))),
            json!("2024-05-06T07:08:09")
        );
        assert_eq!(
            FieldSpec::attachment("pic1").coerce(Some(&json!("1"))),
            json!("1")
        );
    }

    #[test]
    fn test_coerce_is_stable() {
        let spec = FieldSpec::decimal("dkilo", 2);
        let once = spec.coerce(Some(&json!("123.456")));
        let twice = spec.coerce(Some(&once));
        assert_eq!(once, json!(123.46));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_lenient_drops_garbage() {
        assert_eq!(FieldSpec::decimal("fspl", 1).lenient(&json!("abc")), None);
        assert_eq!(
            FieldSpec::integer("cxnum").lenient(&json!("4")),
            Some(json!(4))
        );
        assert_eq!(FieldSpec::text("sbName").lenient(&Value::Null), None);
    }

    #[test]
    fn test_label_rules() {
        let electrode = point_shape_of(PointKind::Electrode).label.unwrap();
        assert_eq!(electrode.default_label(0), json!("DJ001"));
        assert_eq!(electrode.default_label(11), json!("DJ012"));

        let sonar = point_shape_of(PointKind::SonarPoint).label.unwrap();
        assert_eq!(sonar.default_label(2), json!(3));
        assert_eq!(sonar.explicit_label("7"), json!(7));
    }

    #[test]
    fn test_identity_rules() {
        let known = json!(42);
        let std_rule = IdentityRule::ZERO_THEN_PRESERVE;
        assert_eq!(std_rule.resolve(false, Some(&known)), json!(0));
        assert_eq!(std_rule.resolve(true, Some(&known)), json!(42));
        assert_eq!(std_rule.resolve(true, None), json!(0));

        let null_rule = IdentityRule::ALWAYS_NULL;
        assert_eq!(null_rule.resolve(false, None), Value::Null);
        assert_eq!(null_rule.resolve(true, Some(&known)), Value::Null);
    }
}
