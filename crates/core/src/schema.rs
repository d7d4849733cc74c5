//! Parameter schema and validator.
//!
//! Every query attribute the rental backend understands is a [`Dimension`].
//! Raw text (from the rule extractor, an LLM reply or configuration) only
//! becomes a [`SlotValue`] through [`validate`], which coerces numbers,
//! checks closed value sets and rejects keys that are not part of the schema.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;

/// Maximum length of a free-text value, in characters.
pub const MAX_TEXT_CHARS: usize = 64;

/// Separators accepted between elements of a multi-valued dimension.
const SET_DELIMITERS: [char; 3] = [',', '，', '、'];

/// One recognized query attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    District,
    Area,
    MinPrice,
    MaxPrice,
    Bedrooms,
    RentalType,
    Decoration,
    Orientation,
    Elevator,
    MinArea,
    MaxArea,
    PropertyType,
    SubwayLine,
    MaxSubwayDist,
    SubwayStation,
    UtilitiesType,
    AvailableFromBefore,
    CommuteToXierqiMax,
    SortBy,
    SortOrder,
    ListingPlatform,
    Page,
    PageSize,
    Community,
    Landmark,
    LandmarkId,
    MaxDistance,
}

/// The declared value type of a dimension, with its constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    /// Trimmed, non-empty, at most [`MAX_TEXT_CHARS`] characters.
    Text,
    Integer { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    /// One of a closed set, matched case-sensitively.
    Enumerated(&'static [&'static str]),
    /// `YYYY-MM-DD`.
    Date,
    /// Delimiter-joined elements, each validated as `element`.
    Set(ElementKind),
    /// `true` or `false`.
    Boolean,
}

/// Element type of a multi-valued dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Text,
    /// Administrative district; a trailing `区` is dropped.
    District,
    Integer { min: i64, max: i64 },
}

pub const RENTAL_TYPES: &[&str] = &["整租", "合租"];
pub const DECORATIONS: &[&str] = &["精装", "简装", "豪华", "毛坯", "空房"];
pub const ORIENTATIONS: &[&str] = &[
    "朝南", "朝北", "朝东", "朝西", "南北", "东西", "东南", "西南", "东北", "西北",
];
pub const LISTING_PLATFORMS: &[&str] = &["链家", "安居客", "58同城"];
pub const SORT_KEYS: &[&str] = &["price", "area", "subway"];
pub const SORT_ORDERS: &[&str] = &["asc", "desc"];
pub const BOOLEAN_TOKENS: &[&str] = &["true", "false"];

impl Dimension {
    /// Every dimension, in declaration order.
    pub const ALL: [Dimension; 27] = [
        Dimension::District,
        Dimension::Area,
        Dimension::MinPrice,
        Dimension::MaxPrice,
        Dimension::Bedrooms,
        Dimension::RentalType,
        Dimension::Decoration,
        Dimension::Orientation,
        Dimension::Elevator,
        Dimension::MinArea,
        Dimension::MaxArea,
        Dimension::PropertyType,
        Dimension::SubwayLine,
        Dimension::MaxSubwayDist,
        Dimension::SubwayStation,
        Dimension::UtilitiesType,
        Dimension::AvailableFromBefore,
        Dimension::CommuteToXierqiMax,
        Dimension::SortBy,
        Dimension::SortOrder,
        Dimension::ListingPlatform,
        Dimension::Page,
        Dimension::PageSize,
        Dimension::Community,
        Dimension::Landmark,
        Dimension::LandmarkId,
        Dimension::MaxDistance,
    ];

    /// The wire name used by the rental backend and in LLM replies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::District => "district",
            Self::Area => "area",
            Self::MinPrice => "min_price",
            Self::MaxPrice => "max_price",
            Self::Bedrooms => "bedrooms",
            Self::RentalType => "rental_type",
            Self::Decoration => "decoration",
            Self::Orientation => "orientation",
            Self::Elevator => "elevator",
            Self::MinArea => "min_area",
            Self::MaxArea => "max_area",
            Self::PropertyType => "property_type",
            Self::SubwayLine => "subway_line",
            Self::MaxSubwayDist => "max_subway_dist",
            Self::SubwayStation => "subway_station",
            Self::UtilitiesType => "utilities_type",
            Self::AvailableFromBefore => "available_from_before",
            Self::CommuteToXierqiMax => "commute_to_xierqi_max",
            Self::SortBy => "sort_by",
            Self::SortOrder => "sort_order",
            Self::ListingPlatform => "listing_platform",
            Self::Page => "page",
            Self::PageSize => "page_size",
            Self::Community => "community",
            Self::Landmark => "landmark",
            Self::LandmarkId => "landmark_id",
            Self::MaxDistance => "max_distance",
        }
    }

    /// Declared value type and constraint.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::District => ValueKind::Set(ElementKind::District),
            Self::Area => ValueKind::Set(ElementKind::Text),
            Self::Bedrooms => ValueKind::Set(ElementKind::Integer { min: 1, max: 9 }),
            Self::MinPrice | Self::MaxPrice => ValueKind::Integer {
                min: 0,
                max: 1_000_000,
            },
            Self::MinArea | Self::MaxArea => ValueKind::Integer { min: 0, max: 10_000 },
            Self::MaxSubwayDist => ValueKind::Integer { min: 0, max: 50_000 },
            Self::CommuteToXierqiMax => ValueKind::Integer { min: 1, max: 300 },
            Self::Page => ValueKind::Integer { min: 1, max: 10_000 },
            Self::PageSize => ValueKind::Integer { min: 1, max: 10_000 },
            Self::MaxDistance => ValueKind::Float {
                min: 1.0,
                max: 50_000.0,
            },
            Self::RentalType => ValueKind::Enumerated(RENTAL_TYPES),
            Self::Decoration => ValueKind::Enumerated(DECORATIONS),
            Self::Orientation => ValueKind::Enumerated(ORIENTATIONS),
            Self::ListingPlatform => ValueKind::Enumerated(LISTING_PLATFORMS),
            Self::SortBy => ValueKind::Enumerated(SORT_KEYS),
            Self::SortOrder => ValueKind::Enumerated(SORT_ORDERS),
            Self::Elevator => ValueKind::Boolean,
            Self::AvailableFromBefore => ValueKind::Date,
            Self::PropertyType
            | Self::SubwayLine
            | Self::SubwayStation
            | Self::UtilitiesType
            | Self::Community
            | Self::Landmark
            | Self::LandmarkId => ValueKind::Text,
        }
    }

    /// Human-readable description, used when asking an LLM for this schema.
    pub fn description(&self) -> &'static str {
        match self {
            Self::District => "行政区，如 海淀、朝阳（多个用逗号分隔）",
            Self::Area => "商圈，如 西二旗、上地、国贸、望京",
            Self::MinPrice => "最低月租金（整数，元）",
            Self::MaxPrice => "最高月租金（整数，元）",
            Self::Bedrooms => "卧室数，如 \"1\" 或 \"1,2\"",
            Self::RentalType => "整租 或 合租",
            Self::Decoration => "装修：精装/简装/豪华/毛坯/空房",
            Self::Orientation => "朝向，如 朝南、南北",
            Self::Elevator => "是否有电梯：\"true\" 或 \"false\"",
            Self::MinArea => "最小面积（整数，平米）",
            Self::MaxArea => "最大面积（整数，平米）",
            Self::PropertyType => "物业类型，如 住宅",
            Self::SubwayLine => "地铁线路，如 13号线",
            Self::MaxSubwayDist => "离地铁最大距离（米），近地铁填 800",
            Self::SubwayStation => "地铁站名，如 车公庄站",
            Self::UtilitiesType => "水电类型，如 民水民电",
            Self::AvailableFromBefore => "最晚可入住日期 YYYY-MM-DD",
            Self::CommuteToXierqiMax => "到西二旗通勤时间上限（整数，分钟）",
            Self::SortBy => "排序字段：price/area/subway",
            Self::SortOrder => "排序方向：asc/desc",
            Self::ListingPlatform => "挂牌平台：链家/安居客/58同城",
            Self::Page => "页码（从 1 开始）",
            Self::PageSize => "每页条数",
            Self::Community => "小区名（用户明确说查某小区时填）",
            Self::Landmark => "用户说「xx附近」「靠近xx」时的地标名，如 西二旗站、国贸",
            Self::LandmarkId => "地标 ID，如 SS_001",
            Self::MaxDistance => "距地标最大直线距离（米）",
        }
    }

    /// Validate a raw value for this dimension.
    pub fn validate(&self, raw: &str) -> Result<SlotValue, SchemaError> {
        validate(*self, raw)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = SchemaError;

    /// Parses a wire name. Unknown names are rejected so arbitrary keys can
    /// never reach the rental backend.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        if key == "landmark_nearby" {
            return Ok(Dimension::Landmark);
        }
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == key)
            .ok_or_else(|| SchemaError::UnknownDimension(key.to_string()))
    }
}

/// A validated, normalized value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SlotValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDate),
    Set(Vec<String>),
    Bool(bool),
}

impl SlotValue {
    /// Render the value the way the rental backend expects it in a query string.
    pub fn to_query_value(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Float(x) if x.fract() == 0.0 => format!("{x:.0}"),
            Self::Float(x) => x.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Set(items) => items.join(","),
            Self::Bool(b) => b.to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_value())
    }
}

/// Validate and normalize a raw textual value for `dimension`.
///
/// Pure: no side effects, same input gives the same output.
pub fn validate(dimension: Dimension, raw: &str) -> Result<SlotValue, SchemaError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(SchemaError::Empty { dimension });
    }

    match dimension.kind() {
        ValueKind::Text => text(dimension, value).map(SlotValue::Text),
        ValueKind::Integer { min, max } => integer(dimension, value, min, max).map(SlotValue::Integer),
        ValueKind::Float { min, max } => float(dimension, value, min, max).map(SlotValue::Float),
        ValueKind::Enumerated(allowed) => {
            if allowed.contains(&value) {
                Ok(SlotValue::Text(value.to_string()))
            } else {
                Err(SchemaError::NotInSet {
                    dimension,
                    value: value.to_string(),
                    allowed: allowed.to_vec(),
                })
            }
        }
        ValueKind::Date => date(dimension, value).map(SlotValue::Date),
        ValueKind::Boolean => match value {
            "true" => Ok(SlotValue::Bool(true)),
            "false" => Ok(SlotValue::Bool(false)),
            other => Err(SchemaError::NotInSet {
                dimension,
                value: other.to_string(),
                allowed: BOOLEAN_TOKENS.to_vec(),
            }),
        },
        ValueKind::Set(element) => set(dimension, value, element).map(SlotValue::Set),
    }
}

/// Validate a JSON value (as found in an LLM reply).
///
/// `null` and blank strings mean "not stated" and yield `Ok(None)`.
pub fn validate_json(
    dimension: Dimension,
    raw: &serde_json::Value,
) -> Result<Option<SlotValue>, SchemaError> {
    use serde_json::Value;

    let text = match raw {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
            if parts.is_empty() {
                return Ok(None);
            }
            parts.join(",")
        }
        Value::Object(_) => {
            return Err(SchemaError::WrongType {
                dimension,
                found: "object",
            });
        }
    };

    validate(dimension, &text).map(Some)
}

fn text(dimension: Dimension, value: &str) -> Result<String, SchemaError> {
    if value.chars().count() > MAX_TEXT_CHARS {
        return Err(SchemaError::TooLong {
            dimension,
            max_chars: MAX_TEXT_CHARS,
        });
    }
    Ok(value.to_string())
}

fn integer(dimension: Dimension, value: &str, min: i64, max: i64) -> Result<i64, SchemaError> {
    let parsed = match value.parse::<i64>() {
        Ok(n) => n,
        // LLM replies sometimes carry "5000.0"
        Err(_) => match value.parse::<f64>() {
            Ok(x) if x.is_finite() && x.fract() == 0.0 => x as i64,
            _ => {
                return Err(SchemaError::NotNumeric {
                    dimension,
                    value: value.to_string(),
                });
            }
        },
    };

    if parsed < min || parsed > max {
        return Err(SchemaError::OutOfRange {
            dimension,
            value: parsed.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(parsed)
}

fn float(dimension: Dimension, value: &str, min: f64, max: f64) -> Result<f64, SchemaError> {
    let parsed = value
        .parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .ok_or_else(|| SchemaError::NotNumeric {
            dimension,
            value: value.to_string(),
        })?;

    if parsed < min || parsed > max {
        return Err(SchemaError::OutOfRange {
            dimension,
            value: parsed.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(parsed)
}

fn date(dimension: Dimension, value: &str) -> Result<NaiveDate, SchemaError> {
    let invalid = || SchemaError::InvalidDate {
        dimension,
        value: value.to_string(),
    };

    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())
}

fn set(dimension: Dimension, value: &str, element: ElementKind) -> Result<Vec<String>, SchemaError> {
    let mut items: Vec<String> = Vec::new();

    for part in value.split(SET_DELIMITERS.as_slice()) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let normalized = match element {
            ElementKind::Text => text(dimension, part)?,
            ElementKind::District => {
                let name = part.strip_suffix('区').filter(|s| !s.is_empty()).unwrap_or(part);
                text(dimension, name)?
            }
            ElementKind::Integer { min, max } => integer(dimension, part, min, max)?.to_string(),
        };
        if !items.contains(&normalized) {
            items.push(normalized);
        }
    }

    if items.is_empty() {
        return Err(SchemaError::Empty { dimension });
    }
    Ok(items)
}

/// The closed set of platforms a listing can be published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingPlatform {
    #[serde(rename = "链家")]
    Lianjia,
    #[serde(rename = "安居客")]
    Anjuke,
    #[serde(rename = "58同城")]
    Tongcheng58,
}

impl ListingPlatform {
    pub const ALL: [ListingPlatform; 3] = [Self::Lianjia, Self::Anjuke, Self::Tongcheng58];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lianjia => "链家",
            Self::Anjuke => "安居客",
            Self::Tongcheng58 => "58同城",
        }
    }

    /// Find the first platform named in free text.
    ///
    /// A bare "58" counts as 58同城 unless it is part of a longer number or
    /// identifier (`5800`, `HF_2058`).
    pub fn mentioned_in(text: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter_map(|p| text.find(p.as_str()).map(|pos| (pos, p)))
            .chain(standalone_58(text).map(|pos| (pos, Self::Tongcheng58)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, p)| p)
    }
}

fn standalone_58(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    text.match_indices("58").map(|(pos, _)| pos).find(|&pos| {
        let before = pos.checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(pos + 2).copied();
        !before.is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
            && !after.is_some_and(|b| b.is_ascii_digit())
    })
}

impl fmt::Display for ListingPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingPlatform {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == value)
            .ok_or_else(|| SchemaError::NotInSet {
                dimension: Dimension::ListingPlatform,
                value: value.to_string(),
                allowed: LISTING_PLATFORMS.to_vec(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_dimension_roundtrips_through_its_wire_name() {
        for dim in Dimension::ALL {
            assert_eq!(dim.as_str().parse::<Dimension>().unwrap(), dim);
        }
    }

    #[test]
    fn landmark_nearby_is_an_alias() {
        assert_eq!("landmark_nearby".parse::<Dimension>().unwrap(), Dimension::Landmark);
    }

    #[test]
    fn unknown_dimension_is_rejected() {
        let err = "drop_table".parse::<Dimension>().unwrap_err();
        assert_eq!(err, SchemaError::UnknownDimension("drop_table".into()));
    }

    #[test]
    fn numeric_text_is_coerced() {
        assert_eq!(validate(Dimension::MaxPrice, " 5000 ").unwrap(), SlotValue::Integer(5000));
        assert_eq!(validate(Dimension::MaxPrice, "5000.0").unwrap(), SlotValue::Integer(5000));
        assert!(matches!(
            validate(Dimension::MaxPrice, "五千"),
            Err(SchemaError::NotNumeric { .. })
        ));
    }

    #[test]
    fn fractional_numbers_are_rejected() {
        assert!(matches!(
            validate(Dimension::MaxPrice, "5000.7"),
            Err(SchemaError::NotNumeric { .. })
        ));
        assert!(validate(Dimension::Bedrooms, "1.5").is_err());
        assert!(validate_json(Dimension::MaxPrice, &serde_json::json!(4999.5)).is_err());
    }

    #[test]
    fn page_size_is_capped() {
        assert!(validate(Dimension::PageSize, "10000").is_ok());
        assert!(matches!(
            validate(Dimension::PageSize, "10001"),
            Err(SchemaError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate(Dimension::PageSize, "0"),
            Err(SchemaError::OutOfRange { .. })
        ));
    }

    #[test]
    fn enumerations_are_case_sensitive() {
        assert!(validate(Dimension::SortOrder, "asc").is_ok());
        assert!(validate(Dimension::SortOrder, "ASC").is_err());
        assert!(validate(Dimension::RentalType, "整租").is_ok());
        assert!(validate(Dimension::RentalType, "短租").is_err());
        assert!(validate(Dimension::ListingPlatform, "58同城").is_ok());
        assert!(validate(Dimension::ListingPlatform, "闲鱼").is_err());
    }

    #[test]
    fn sets_drop_empty_elements_and_duplicates() {
        assert_eq!(
            validate(Dimension::District, "海淀区,,朝阳，海淀").unwrap(),
            SlotValue::Set(vec!["海淀".into(), "朝阳".into()])
        );
        assert_eq!(
            validate(Dimension::Bedrooms, "1、2").unwrap(),
            SlotValue::Set(vec!["1".into(), "2".into()])
        );
        assert!(validate(Dimension::Bedrooms, "1,x").is_err());
        assert!(matches!(
            validate(Dimension::Area, " , ,"),
            Err(SchemaError::Empty { .. })
        ));
    }

    #[test]
    fn dates_require_fixed_form() {
        assert!(validate(Dimension::AvailableFromBefore, "2026-03-01").is_ok());
        assert!(validate(Dimension::AvailableFromBefore, "2026-3-1").is_err());
        assert!(validate(Dimension::AvailableFromBefore, "2026/03/01").is_err());
        assert!(validate(Dimension::AvailableFromBefore, "2026-02-30").is_err());
    }

    #[test]
    fn elevator_accepts_only_canonical_tokens() {
        assert_eq!(validate(Dimension::Elevator, "true").unwrap(), SlotValue::Bool(true));
        assert_eq!(validate(Dimension::Elevator, "false").unwrap(), SlotValue::Bool(false));
        assert!(validate(Dimension::Elevator, "yes").is_err());
        assert!(validate(Dimension::Elevator, "1").is_err());
    }

    #[test]
    fn text_is_bounded() {
        let long = "园".repeat(MAX_TEXT_CHARS + 1);
        assert!(matches!(
            validate(Dimension::Community, &long),
            Err(SchemaError::TooLong { .. })
        ));
        assert_eq!(
            validate(Dimension::Community, "建清园(南区)").unwrap(),
            SlotValue::Text("建清园(南区)".into())
        );
    }

    #[test]
    fn json_values_are_validated() {
        use serde_json::json;
        assert_eq!(validate_json(Dimension::MaxPrice, &json!(null)).unwrap(), None);
        assert_eq!(validate_json(Dimension::Community, &json!("  ")).unwrap(), None);
        assert_eq!(
            validate_json(Dimension::MaxPrice, &json!(5000.0)).unwrap(),
            Some(SlotValue::Integer(5000))
        );
        assert_eq!(
            validate_json(Dimension::Bedrooms, &json!([1, 2])).unwrap(),
            Some(SlotValue::Set(vec!["1".into(), "2".into()]))
        );
        assert_eq!(
            validate_json(Dimension::Elevator, &json!(true)).unwrap(),
            Some(SlotValue::Bool(true))
        );
        assert!(validate_json(Dimension::District, &json!({"name": "海淀"})).is_err());
    }

    #[test]
    fn query_values_render_for_the_backend() {
        assert_eq!(SlotValue::Float(2000.0).to_query_value(), "2000");
        assert_eq!(SlotValue::Float(1500.5).to_query_value(), "1500.5");
        assert_eq!(SlotValue::Set(vec!["1".into(), "2".into()]).to_query_value(), "1,2");
        assert_eq!(SlotValue::Bool(false).to_query_value(), "false");
    }

    #[test]
    fn platform_mentions() {
        assert_eq!(ListingPlatform::mentioned_in("通过安居客"), Some(ListingPlatform::Anjuke));
        assert_eq!(ListingPlatform::mentioned_in("用58吧"), Some(ListingPlatform::Tongcheng58));
        assert_eq!(ListingPlatform::mentioned_in("链家的那套"), Some(ListingPlatform::Lianjia));
        assert_eq!(ListingPlatform::mentioned_in("随便"), None);
        assert_eq!(ListingPlatform::mentioned_in("租 HF_2058"), None);
        assert_eq!(ListingPlatform::mentioned_in("5800以内"), None);
        assert_eq!("安居客".parse::<ListingPlatform>().unwrap(), ListingPlatform::Anjuke);
    }
}
