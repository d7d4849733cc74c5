//! Turn intents that bypass the search pipeline.

use regex_lite::Regex;

use rentwise_core::error::{Error, Result};
use rentwise_core::{ListingPlatform, Operation};

/// Messages shorter than this that mention a house id are detail requests.
const SHORT_MESSAGE_CHARS: usize = 30;

/// Past-tense statements about renting; never an instruction.
const ASSERTIONS: &[&str] = &["已经租", "已租", "租过", "租了"];

const RESET_WORDS: &[&str] = &["重置", "初始化"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Clear the session and reset the backend's data.
    Reset,
    /// A mutating operation on one house.
    Action {
        operation: Operation,
        house_id: String,
        platform: Option<ListingPlatform>,
    },
    /// Names the platform an open proposal is waiting for.
    SupplyPlatform(ListingPlatform),
    /// Every platform listing of a house.
    Listings { house_id: String },
    Detail { house_id: String },
    Stats,
    Search,
}

pub struct IntentClassifier {
    house_id: Regex,
    rent: Regex,
    terminate: Regex,
    offline: Regex,
    init_word: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Internal(format!("intent pattern {pattern:?}: {e}")))
}

impl IntentClassifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            house_id: compile(r"[A-Z]+_\d+")?,
            rent: compile(r"(?:租赁|租下|租)\s*([A-Z]+_\d+)")?,
            terminate: compile(r"退租\s*([A-Z]+_\d+)")?,
            offline: compile(r"下架\s*([A-Z]+_\d+)")?,
            init_word: compile(r"(?i)\binit\b")?,
        })
    }

    /// Classify one message. `awaiting_platform` is true while the session's
    /// action gate holds a proposal without a platform.
    pub fn classify(&self, text: &str, awaiting_platform: bool) -> Intent {
        let text = text.trim();

        if RESET_WORDS.iter().any(|w| text.contains(w)) || self.init_word.is_match(text) {
            return Intent::Reset;
        }

        if let Some((operation, house_id)) = self.action(text) {
            return Intent::Action {
                operation,
                house_id,
                platform: ListingPlatform::mentioned_in(text),
            };
        }

        if awaiting_platform {
            if let Some(platform) = ListingPlatform::mentioned_in(text) {
                return Intent::SupplyPlatform(platform);
            }
        }

        if let Some(m) = self.house_id.find(text) {
            let house_id = m.as_str().to_string();
            if text.contains("挂牌") || text.contains("平台") {
                return Intent::Listings { house_id };
            }
            if ["详情", "介绍", "看看"].iter().any(|w| text.contains(w))
                || text.chars().count() < SHORT_MESSAGE_CHARS
            {
                return Intent::Detail { house_id };
            }
        }

        if text.contains("统计") {
            return Intent::Stats;
        }

        Intent::Search
    }

    fn action(&self, text: &str) -> Option<(Operation, String)> {
        if ASSERTIONS.iter().any(|a| text.contains(a)) {
            return None;
        }
        let captured = |re: &Regex| re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().to_string());

        if let Some(id) = captured(&self.terminate) {
            return Some((Operation::Terminate, id));
        }
        if let Some(id) = captured(&self.offline) {
            return Some((Operation::Offline, id));
        }
        if !text.contains('退') {
            if let Some(id) = captured(&self.rent) {
                return Some((Operation::Rent, id));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Intent {
        IntentClassifier::new().unwrap().classify(text, false)
    }

    #[test]
    fn reset_words() {
        assert_eq!(classify("重置一下"), Intent::Reset);
        assert_eq!(classify("请初始化房源"), Intent::Reset);
        assert_eq!(classify("INIT"), Intent::Reset);
        assert_eq!(classify("请 init 一下"), Intent::Reset);
    }

    #[test]
    fn init_inside_a_word_is_not_a_reset() {
        assert_eq!(classify("definitely 海淀"), Intent::Search);
        assert_eq!(classify("infinite budget"), Intent::Search);
    }

    #[test]
    fn rent_without_platform() {
        assert_eq!(
            classify("租 HF_2001"),
            Intent::Action {
                operation: Operation::Rent,
                house_id: "HF_2001".into(),
                platform: None,
            }
        );
    }

    #[test]
    fn operations_with_platform() {
        assert_eq!(
            classify("退租HF_12 链家"),
            Intent::Action {
                operation: Operation::Terminate,
                house_id: "HF_12".into(),
                platform: Some(ListingPlatform::Lianjia),
            }
        );
        assert_eq!(
            classify("下架 HF_7，58同城"),
            Intent::Action {
                operation: Operation::Offline,
                house_id: "HF_7".into(),
                platform: Some(ListingPlatform::Tongcheng58),
            }
        );
    }

    #[test]
    fn assertions_never_act() {
        assert!(!matches!(classify("我已经租了 HF_2001"), Intent::Action { .. }));
        assert!(!matches!(classify("HF_2001 我租过"), Intent::Action { .. }));
    }

    #[test]
    fn platform_follow_up_only_when_awaiting() {
        let classifier = IntentClassifier::new().unwrap();
        assert_eq!(
            classifier.classify("通过安居客", true),
            Intent::SupplyPlatform(ListingPlatform::Anjuke)
        );
        assert_eq!(classifier.classify("通过安居客", false), Intent::Search);
    }

    #[test]
    fn house_queries() {
        assert_eq!(
            classify("HF_2001 在哪些平台挂牌"),
            Intent::Listings {
                house_id: "HF_2001".into()
            }
        );
        assert_eq!(
            classify("HF_2001"),
            Intent::Detail {
                house_id: "HF_2001".into()
            }
        );
        assert_eq!(classify("房源统计"), Intent::Stats);
    }

    #[test]
    fn everything_else_searches() {
        assert_eq!(classify("我想在海淀租"), Intent::Search);
        assert_eq!(classify("5000以内 一居 整租 近地铁"), Intent::Search);
    }
}
