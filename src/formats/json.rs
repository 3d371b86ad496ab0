use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    formats::time::parse_time_or_seconds,
    model::{Content, RecordId, SubtitleRecord, sort_by_start},
};

/// One element of the JSON exchange array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pending: bool,
    pub start: Value,
    pub end: Value,
    #[serde(default)]
    pub content: Value,
}

fn is_false(b: &bool) -> bool {
    !*b
}

pub fn write_json(records: &[SubtitleRecord], pretty: bool) -> Result<String> {
    let rows: Vec<JsonRecord> = records
        .iter()
        .map(|r| JsonRecord {
            id: Some(r.id.to_string()),
            pending: r.id.is_pending(),
            start: Value::from(r.start),
            end: Value::from(r.end),
            content: r.content.to_value(),
        })
        .collect();

    if pretty {
        Ok(serde_json::to_string_pretty(&rows)?)
    } else {
        Ok(serde_json::to_string(&rows)?)
    }
}

/// Reads a JSON record array. Any malformed element fails the whole import.
pub fn parse_json(input: &str) -> Result<Vec<SubtitleRecord>> {
    let v: Value = serde_json::from_str(input)?;
    let arr = v
        .as_array()
        .ok_or_else(|| anyhow!("expected a JSON array of subtitle records"))?;

    let mut records = Vec::with_capacity(arr.len());
    for (i, item) in arr.iter().enumerate() {
        let row: JsonRecord = serde_json::from_value(item.clone())
            .map_err(|e| anyhow!("record {i}: {e}"))?;
        records.push(record_from_json(row).map_err(|e| anyhow!("record {i}: {e}"))?);
    }

    sort_by_start(&mut records);
    Ok(records)
}

fn record_from_json(row: JsonRecord) -> Result<SubtitleRecord> {
    let start = decode_time(&row.start)?;
    let end = decode_time(&row.end)?;

    let id = match row.id.filter(|s| !s.is_empty()) {
        None => RecordId::fresh(),
        Some(s) if row.pending => Uuid::parse_str(&s)
            .map(RecordId::Pending)
            .unwrap_or_else(|_| RecordId::fresh()),
        Some(s) => RecordId::Persisted(s),
    };

    Ok(SubtitleRecord {
        id,
        start,
        end: end.max(start),
        content: Content::from_value(&row.content),
    })
}

fn decode_time(v: &Value) -> Result<f64> {
    match v {
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .ok_or_else(|| anyhow!("bad numeric time: {n}")),
        Value::String(s) => {
            parse_time_or_seconds(s).ok_or_else(|| anyhow!("bad time string: '{s}'"))
        }
        _ => Err(anyhow!("unsupported time type")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ids_get_fresh_pending_ids() {
        let recs = parse_json(
            r#"[{"id":"p1_00:00:01.000","start":1,"end":2,"content":{"chinese":"a"}},
                {"start":0.5,"end":0.75,"content":{"chinese":"b","translateList":[]}}]"#,
        )
        .unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs[0].id.is_pending());
        assert_eq!(recs[0].content.chinese, "b");
        assert_eq!(recs[0].content.translate_list.len(), 1);
        assert_eq!(recs[1].id, RecordId::Persisted("p1_00:00:01.000".into()));
    }

    #[test]
    fn accepts_timecode_strings() {
        let recs = parse_json(r#"[{"start":"00:00:01,500","end":"2.25"}]"#).unwrap();
        assert_eq!((recs[0].start, recs[0].end), (1.5, 2.25));
        assert_eq!(recs[0].content, Content::default());
    }

    #[test]
    fn legacy_romaji_is_read() {
        let recs = parse_json(
            r#"[{"start":0,"end":1,"content":{"chinese":"","translateList":[{"ja":"x","fiftytonesromaji":"y"}]}}]"#,
        )
        .unwrap();
        let u = &recs[0].content.translate_list[0];
        assert_eq!((u.ja.as_str(), u.fiftytones.as_str(), u.romaji.as_str()), ("x", "", "y"));
    }

    #[test]
    fn whole_file_errors() {
        assert!(parse_json("{not json").is_err());
        assert!(parse_json(r#"{"cues":[]}"#).is_err());
        assert!(parse_json(r#"[{"start":0,"end":1},{"start":"soon","end":1}]"#).is_err());
    }

    #[test]
    fn export_then_import_keeps_identity_kind() {
        let persisted = SubtitleRecord {
            id: RecordId::Persisted("p_00:00:00.000".into()),
            start: 0.0,
            end: 1.0,
            content: Content::with_text("x"),
        };
        let pending = SubtitleRecord::pending(2.0, 3.0, Content::with_text("y"));
        let text = write_json(&[persisted.clone(), pending.clone()], true).unwrap();
        assert!(!text.contains("fiftytonesromaji"));

        let back = parse_json(&text).unwrap();
        assert_eq!(back, vec![persisted, pending]);
    }
}
