use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identity of a record: generated locally and not yet stored, or assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    Pending(Uuid),
    Persisted(String),
}

impl RecordId {
    pub fn fresh() -> Self {
        RecordId::Pending(Uuid::new_v4())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RecordId::Pending(_))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Pending(u) => write!(f, "{u}"),
            RecordId::Persisted(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleRecord {
    pub id: RecordId,
    pub start: f64,
    pub end: f64,
    pub content: Content,
}

impl SubtitleRecord {
    pub fn pending(start: f64, end: f64, content: Content) -> Self {
        Self {
            id: RecordId::fresh(),
            start,
            end,
            content,
        }
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }

    /// Moves `start`, never past `end`.
    pub fn set_start(&mut self, v: f64) {
        self.start = v.min(self.end);
    }

    /// Moves `end`, never before `start`.
    pub fn set_end(&mut self, v: f64) {
        self.end = v.max(self.start);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub chinese: String,
    #[serde(rename = "translateList", default)]
    pub translate_list: Vec<TranslateUnit>,
}

impl Default for Content {
    fn default() -> Self {
        Self {
            chinese: String::new(),
            translate_list: vec![TranslateUnit::default()],
        }
    }
}

impl Content {
    pub fn with_text(chinese: impl Into<String>) -> Self {
        Self {
            chinese: chinese.into(),
            ..Self::default()
        }
    }

    /// Reads a stored or imported payload, tolerating missing fields and legacy names.
    pub fn from_value(v: &Value) -> Self {
        let Some(obj) = v.as_object() else {
            return Self::default();
        };

        let chinese = obj
            .get("chinese")
            .and_then(|x| x.as_str())
            .unwrap_or("")
            .to_string();

        let translate_list: Vec<TranslateUnit> = obj
            .get("translateList")
            .and_then(|x| x.as_array())
            .map(|arr| arr.iter().map(TranslateUnit::from_value).collect())
            .unwrap_or_default();

        let mut content = Self {
            chinese,
            translate_list,
        };
        content.ensure_unit();
        content
    }

    pub fn to_value(&self) -> Value {
        // Content only holds strings and vectors of strings.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn ensure_unit(&mut self) {
        if self.translate_list.is_empty() {
            self.translate_list.push(TranslateUnit::default());
        }
    }

    /// First translation unit, synthesized if the list is empty.
    pub fn first_unit_mut(&mut self) -> &mut TranslateUnit {
        self.ensure_unit();
        &mut self.translate_list[0]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslateUnit {
    #[serde(default)]
    pub ja: String,
    #[serde(default)]
    pub fiftytones: String,
    #[serde(default)]
    pub romaji: String,
}

impl TranslateUnit {
    pub fn from_value(v: &Value) -> Self {
        let field = |name: &str| v.get(name).and_then(|x| x.as_str()).map(str::to_string);

        Self {
            ja: field("ja").unwrap_or_default(),
            fiftytones: field("fiftytones").unwrap_or_default(),
            romaji: field("romaji")
                .or_else(|| field("fiftytonesromaji"))
                .unwrap_or_default(),
        }
    }
}

/// Stable sort by start time.
pub fn sort_by_start(records: &mut [SubtitleRecord]) {
    records.sort_by(|a, b| a.start.total_cmp(&b.start));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn romaji_falls_back_to_legacy_field() {
        let u = TranslateUnit::from_value(&json!({"ja": "x", "fiftytonesromaji": "y"}));
        assert_eq!(
            u,
            TranslateUnit {
                ja: "x".into(),
                fiftytones: "".into(),
                romaji: "y".into(),
            }
        );
    }

    #[test]
    fn romaji_wins_over_legacy_field() {
        let u = TranslateUnit::from_value(&json!({"romaji": "new", "fiftytonesromaji": "old"}));
        assert_eq!(u.romaji, "new");
    }

    #[test]
    fn empty_translate_list_gets_one_unit() {
        let c = Content::from_value(&json!({"chinese": "你好", "translateList": []}));
        assert_eq!(c.chinese, "你好");
        assert_eq!(c.translate_list, vec![TranslateUnit::default()]);
    }

    #[test]
    fn null_content_is_default() {
        let c = Content::from_value(&Value::Null);
        assert_eq!(c, Content::default());
    }

    #[test]
    fn written_payload_uses_romaji_only() {
        let mut c = Content::default();
        c.first_unit_mut().romaji = "konnichiwa".into();
        let v = c.to_value();
        assert_eq!(v["translateList"][0]["romaji"], "konnichiwa");
        assert!(v["translateList"][0].get("fiftytonesromaji").is_none());
    }

    #[test]
    fn edits_keep_end_after_start() {
        let mut r = SubtitleRecord::pending(2.0, 4.0, Content::default());
        r.set_start(10.0);
        assert_eq!((r.start, r.end), (4.0, 4.0));
        r.set_end(1.0);
        assert_eq!((r.start, r.end), (4.0, 4.0));
        r.set_end(6.5);
        r.set_start(3.0);
        assert_eq!((r.start, r.end), (3.0, 6.5));
        assert!(r.end >= r.start);
    }

    #[test]
    fn sort_is_stable() {
        let mut v = vec![
            SubtitleRecord::pending(5.0, 6.0, Content::with_text("b")),
            SubtitleRecord::pending(1.0, 2.0, Content::with_text("a")),
            SubtitleRecord::pending(5.0, 7.0, Content::with_text("c")),
        ];
        sort_by_start(&mut v);
        let texts: Vec<&str> = v.iter().map(|r| r.content.chinese.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }
}
