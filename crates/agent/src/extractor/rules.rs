//! Deterministic, keyword-driven slot extraction.
//!
//! Location vocabularies (districts, landmarks, commute destination) come from
//! [`ExtractorConfig`]; the numeric and literal phrase patterns are fixed.
//! Extraction never fails: anything the patterns or the validator reject is
//! left out of the update.

use async_trait::async_trait;
use regex_lite::Regex;
use tracing::debug;

use rentwise_config::ExtractorConfig;
use rentwise_core::error::{Error, ExtractionError, Result};
use rentwise_core::{Dimension, ListingPlatform, SlotSet};

use super::{ExtractionInput, SlotExtractor};

/// Units that mark a number as something other than a monthly rent.
const MEASURE_UNITS: &[&str] = &[
    "平", "㎡", "分钟", "米", "号线", "页", "室", "居", "个", "层", "楼", "天", "年",
];

/// Leading verbs stripped from a `xx小区` capture.
const COMMUNITY_PREFIXES: &[&str] = &[
    "我想要", "我想", "我要", "帮我", "查一下", "查询", "查", "看一下", "看看", "看", "找", "想在",
    "想", "在", "住",
];

/// Captures that are never a community name.
const COMMUNITY_STOPWORDS: &[&str] = &["这个", "那个", "哪个", "什么", "哪些", "这些", "那些"];

const DECORATION_PHRASES: &[(&str, &str)] = &[
    ("精装", "精装"),
    ("简装", "简装"),
    ("豪华装修", "豪华"),
    ("豪装", "豪华"),
    ("毛坯", "毛坯"),
];

const SORT_PHRASES: &[(&str, &str, &str)] = &[
    ("最便宜", "price", "asc"),
    ("价格最低", "price", "asc"),
    ("最贵", "price", "desc"),
    ("价格最高", "price", "desc"),
    ("面积最大", "area", "desc"),
    ("面积最小", "area", "asc"),
    ("离地铁最近", "subway", "asc"),
    ("地铁最近", "subway", "asc"),
];

struct Patterns {
    price_range: Regex,
    price_max: Regex,
    price_cap: Regex,
    price_min: Regex,
    price_floor: Regex,
    price_plain: Regex,
    bedrooms: Regex,
    subway_line: Regex,
    orientation_axis: Regex,
    orientation_facing: Regex,
    orientation_direction: Regex,
    elevator_without: Regex,
    elevator_with: Regex,
    area_range: Regex,
    area_max: Regex,
    area_min: Regex,
    community_suffix: Regex,
    community_prefix: Regex,
    date: Regex,
    page: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Config {
        message: format!("invalid extractor pattern {pattern:?}: {e}"),
    })
}

impl Patterns {
    fn compile() -> Result<Self> {
        const AREA_UNIT: &str = r"(?:平方米|平米|平方|平|㎡)";
        Ok(Self {
            price_range: compile(r"(\d+)\s*(?:元|块)?\s*(?:-|~|～|到|至)\s*(\d+)")?,
            price_max: compile(r"(\d+)\s*(?:元|块)?\s*(?:以内|以下|之内)")?,
            price_cap: compile(r"(?:不超过|不高于|最多|预算|最高)\s*(\d+)")?,
            price_min: compile(r"(\d+)\s*(?:元|块)?\s*以上")?,
            price_floor: compile(r"(?:不低于|至少|最低)\s*(\d+)")?,
            price_plain: compile(r"(\d+)\s*(?:元|块)")?,
            bedrooms: compile(r"([一二两三四五1-9])\s*(?:居|室)")?,
            subway_line: compile(r"(\d{1,2})\s*号线")?,
            orientation_axis: compile(r"(南北|东西)(?:通透|向|朝向)")?,
            orientation_facing: compile(r"朝(东南|西南|东北|西北|南|北|东|西)")?,
            orientation_direction: compile(r"(东南|西南|东北|西北|南|北|东|西)向")?,
            elevator_without: compile(r"(?:无|没有|没|不要|不带)电梯")?,
            elevator_with: compile(r"(?:有|带)电梯|电梯房")?,
            area_range: compile(&format!(
                r"(\d+)\s*{AREA_UNIT}?\s*(?:-|~|～|到|至)\s*(\d+)\s*{AREA_UNIT}"
            ))?,
            area_max: compile(&format!(
                r"(\d+)\s*{AREA_UNIT}\s*(?:以内|以下|之内)|(?:不超过|不大于)\s*(\d+)\s*{AREA_UNIT}"
            ))?,
            area_min: compile(&format!(
                r"(\d+)\s*{AREA_UNIT}\s*以上|(?:不小于|至少)\s*(\d+)\s*{AREA_UNIT}"
            ))?,
            community_suffix: compile(r"([^\s，,。、！？!?]+?)小区")?,
            community_prefix: compile(r#"小区(?:名)?\s*[:：]?\s*[「"']?([^」"'\s，,。、！？!?]+)"#)?,
            date: compile(r"(\d{4}-\d{2}-\d{2})\s*(?:之前|以前|前)?")?,
            page: compile(r"第\s*(\d+)\s*页")?,
        })
    }
}

/// Rule-based slot extractor.
pub struct RuleExtractor {
    districts: Option<Regex>,
    landmarks: Option<Regex>,
    commute: Option<Regex>,
    proximity_markers: Vec<String>,
    near_subway_phrases: Vec<String>,
    near_subway_distance: u32,
    patterns: Patterns,
}

/// `(?:a|b|c)` over `words`, longest first so `西二旗站` wins over `西二旗`.
fn alternation(words: &[String]) -> Option<String> {
    let mut words: Vec<&str> = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }
    words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    words.dedup();
    let escaped: Vec<String> = words.into_iter().map(regex_lite::escape).collect();
    Some(format!("(?:{})", escaped.join("|")))
}

fn put(slots: &mut SlotSet, dimension: Dimension, raw: &str) {
    if let Err(err) = slots.set(dimension, raw) {
        debug!(%dimension, %err, "Dropping rule match that failed validation");
    }
}

/// Whether the number ending at `end` is followed by a non-currency unit.
fn is_measure(text: &str, end: usize) -> bool {
    let rest = text[end..].trim_start();
    MEASURE_UNITS.iter().any(|unit| rest.starts_with(unit))
}

fn bedroom_count(token: &str) -> Option<&str> {
    match token {
        "一" => Some("1"),
        "二" | "两" => Some("2"),
        "三" => Some("3"),
        "四" => Some("4"),
        "五" => Some("5"),
        digit if digit.len() == 1 && digit.as_bytes()[0].is_ascii_digit() => Some(digit),
        _ => None,
    }
}

/// First non-empty capture group of a match.
fn first_group<'t>(caps: &regex_lite::Captures<'t>) -> Option<&'t str> {
    caps.iter().skip(1).flatten().map(|m| m.as_str()).next()
}

impl RuleExtractor {
    pub fn from_config(config: &ExtractorConfig) -> Result<Self> {
        let districts = alternation(&config.districts)
            .map(|alt| compile(&alt))
            .transpose()?;
        let landmarks = alternation(&config.landmarks)
            .map(|alt| compile(&alt))
            .transpose()?;

        let mut commute_heads: Vec<String> = Vec::new();
        let destination = config.commute_destination.trim();
        if !destination.is_empty() {
            commute_heads.push(format!("到?{}", regex_lite::escape(destination)));
        }
        commute_heads.extend(
            config
                .commute_phrases
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(regex_lite::escape),
        );
        let commute = if commute_heads.is_empty() {
            None
        } else {
            Some(compile(&format!(
                r"(?:{})(?:时间)?\s*(?:在|不超过|小于|以内)?\s*(\d+)\s*分钟",
                commute_heads.join("|")
            ))?)
        };

        Ok(Self {
            districts,
            landmarks,
            commute,
            proximity_markers: config.proximity_markers.clone(),
            near_subway_phrases: config.near_subway_phrases.clone(),
            near_subway_distance: config.near_subway_distance,
            patterns: Patterns::compile()?,
        })
    }

    /// Extract every recognizable condition from `text`.
    pub fn extract_text(&self, text: &str) -> SlotSet {
        let mut slots = SlotSet::new();
        let text = text.trim();
        if text.is_empty() {
            return slots;
        }

        // Dates would otherwise read as price ranges ("2025-03").
        let numeric = self.patterns.date.replace_all(text, " ");

        let commute_span = self.commute(text, &mut slots);
        self.locations(text, commute_span, &mut slots);
        self.prices(&numeric, &mut slots);
        self.layout(text, &mut slots);
        self.subway(text, &mut slots);
        self.features(text, &mut slots);
        self.area_size(&numeric, &mut slots);
        self.community(text, &mut slots);
        self.ordering(text, &mut slots);
        self.availability(text, &mut slots);

        slots
    }

    fn commute(&self, text: &str, slots: &mut SlotSet) -> Option<(usize, usize)> {
        let caps = self.commute.as_ref()?.captures(text)?;
        let whole = caps.get(0)?;
        put(slots, Dimension::CommuteToXierqiMax, caps.get(1)?.as_str());
        Some((whole.start(), whole.end()))
    }

    fn locations(&self, text: &str, commute_span: Option<(usize, usize)>, slots: &mut SlotSet) {
        if let Some(re) = &self.districts {
            let names: Vec<&str> = re.find_iter(text).map(|m| m.as_str()).collect();
            if !names.is_empty() {
                put(slots, Dimension::District, &names.join(","));
            }
        }

        let Some(re) = &self.landmarks else { return };
        let names: Vec<&str> = re
            .find_iter(text)
            .filter(|m| !commute_span.is_some_and(|(s, e)| m.start() >= s && m.end() <= e))
            .map(|m| m.as_str())
            .collect();
        let Some(first) = names.first() else { return };

        let proximity = self.proximity_markers.iter().any(|p| text.contains(p.as_str()));
        if proximity {
            put(slots, Dimension::Landmark, first);
        } else {
            put(slots, Dimension::Area, &names.join(","));
        }
    }

    fn prices(&self, text: &str, slots: &mut SlotSet) {
        let p = &self.patterns;

        if let Some(caps) = p
            .price_range
            .captures_iter(text)
            .find(|c| c.get(0).is_some_and(|m| !is_measure(text, m.end())))
        {
            put(slots, Dimension::MinPrice, &caps[1]);
            put(slots, Dimension::MaxPrice, &caps[2]);
            return;
        }

        let max = p.price_max.captures(text).or_else(|| {
            p.price_cap
                .captures_iter(text)
                .find(|c| c.get(0).is_some_and(|m| !is_measure(text, m.end())))
        });
        if let Some(caps) = &max {
            put(slots, Dimension::MaxPrice, &caps[1]);
        }

        let min = p.price_min.captures(text).or_else(|| {
            p.price_floor
                .captures_iter(text)
                .find(|c| c.get(0).is_some_and(|m| !is_measure(text, m.end())))
        });
        if let Some(caps) = &min {
            put(slots, Dimension::MinPrice, &caps[1]);
        }

        if max.is_none() && min.is_none() {
            if let Some(caps) = p.price_plain.captures(text) {
                put(slots, Dimension::MaxPrice, &caps[1]);
            }
        }
    }

    fn layout(&self, text: &str, slots: &mut SlotSet) {
        let counts: Vec<&str> = self
            .patterns
            .bedrooms
            .captures_iter(text)
            .filter_map(|c| c.get(1).and_then(|m| bedroom_count(m.as_str())))
            .collect();
        if !counts.is_empty() {
            put(slots, Dimension::Bedrooms, &counts.join(","));
        }

        if text.contains("合租") {
            put(slots, Dimension::RentalType, "合租");
        } else if text.contains("整租") {
            put(slots, Dimension::RentalType, "整租");
        }
    }

    fn subway(&self, text: &str, slots: &mut SlotSet) {
        if self
            .near_subway_phrases
            .iter()
            .any(|phrase| !phrase.is_empty() && text.contains(phrase.as_str()))
        {
            put(
                slots,
                Dimension::MaxSubwayDist,
                &self.near_subway_distance.to_string(),
            );
        }

        if let Some(caps) = self.patterns.subway_line.captures(text) {
            put(slots, Dimension::SubwayLine, &format!("{}号线", &caps[1]));
        }
    }

    fn features(&self, text: &str, slots: &mut SlotSet) {
        let p = &self.patterns;

        if let Some((_, value)) = DECORATION_PHRASES
            .iter()
            .find(|(phrase, _)| text.contains(phrase))
        {
            put(slots, Dimension::Decoration, value);
        }

        let orientation = p
            .orientation_axis
            .captures(text)
            .map(|c| c[1].to_string())
            .or_else(|| {
                p.orientation_facing
                    .captures(text)
                    .or_else(|| p.orientation_direction.captures(text))
                    .map(|c| {
                        let dir = &c[1];
                        if dir.chars().count() == 1 {
                            format!("朝{dir}")
                        } else {
                            dir.to_string()
                        }
                    })
            });
        if let Some(orientation) = orientation {
            put(slots, Dimension::Orientation, &orientation);
        }

        if p.elevator_without.is_match(text) {
            put(slots, Dimension::Elevator, "false");
        } else if p.elevator_with.is_match(text) {
            put(slots, Dimension::Elevator, "true");
        }

        if let Some(platform) = ListingPlatform::ALL
            .iter()
            .find(|platform| text.contains(platform.as_str()))
        {
            put(slots, Dimension::ListingPlatform, platform.as_str());
        }
    }

    fn area_size(&self, text: &str, slots: &mut SlotSet) {
        let p = &self.patterns;
        if let Some(caps) = p.area_range.captures(text) {
            put(slots, Dimension::MinArea, &caps[1]);
            put(slots, Dimension::MaxArea, &caps[2]);
            return;
        }
        if let Some(value) = p.area_max.captures(text).as_ref().and_then(first_group) {
            put(slots, Dimension::MaxArea, value);
        }
        if let Some(value) = p.area_min.captures(text).as_ref().and_then(first_group) {
            put(slots, Dimension::MinArea, value);
        }
    }

    fn community(&self, text: &str, slots: &mut SlotSet) {
        let p = &self.patterns;
        let candidate = p
            .community_suffix
            .captures_iter(text)
            .filter_map(|c| c.get(1).map(|m| self.clean_community(m.as_str())))
            .find(|name| self.is_community_name(name))
            .or_else(|| {
                p.community_prefix
                    .captures_iter(text)
                    .filter_map(|c| c.get(1).map(|m| self.clean_community(m.as_str())))
                    .find(|name| self.is_community_name(name))
            });
        if let Some(name) = candidate {
            put(slots, Dimension::Community, &name);
        }
    }

    fn clean_community(&self, raw: &str) -> String {
        let mut name = raw.trim_matches(|c| matches!(c, '「' | '」' | '"' | '\'' | ' '));
        loop {
            let stripped = COMMUNITY_PREFIXES
                .iter()
                .find_map(|prefix| name.strip_prefix(prefix));
            match stripped {
                Some(rest) => name = rest,
                None => break,
            }
        }
        name.trim().to_string()
    }

    fn is_community_name(&self, name: &str) -> bool {
        if name.chars().count() < 2 || name.ends_with('的') || COMMUNITY_STOPWORDS.contains(&name) {
            return false;
        }
        let is_district = self
            .districts
            .as_ref()
            .and_then(|re| re.find(name))
            .is_some_and(|m| {
                let rest = &name[m.end()..];
                m.start() == 0 && (rest.is_empty() || rest == "区")
            });
        !is_district
    }

    fn ordering(&self, text: &str, slots: &mut SlotSet) {
        if let Some((_, key, order)) = SORT_PHRASES.iter().find(|(phrase, _, _)| text.contains(phrase)) {
            put(slots, Dimension::SortBy, key);
            put(slots, Dimension::SortOrder, order);
        }
        if let Some(caps) = self.patterns.page.captures(text) {
            put(slots, Dimension::Page, &caps[1]);
        }
    }

    fn availability(&self, text: &str, slots: &mut SlotSet) {
        let Some(caps) = self.patterns.date.captures(text) else {
            return;
        };
        let has_deadline = caps
            .get(0)
            .is_some_and(|m| m.as_str().trim_end().ends_with('前'));
        if has_deadline {
            put(slots, Dimension::AvailableFromBefore, &caps[1]);
        }
    }
}

#[async_trait]
impl SlotExtractor for RuleExtractor {
    fn name(&self) -> &str {
        "rules"
    }

    async fn extract(
        &self,
        input: &ExtractionInput<'_>,
    ) -> std::result::Result<SlotSet, ExtractionError> {
        Ok(self.extract_text(input.text))
    }
}
