use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    formats::time::{format_srt_timestamp, parse_time},
    model::{Content, SubtitleRecord, sort_by_start},
};

static BLOCK_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").expect("valid block regex"));

static TIMING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}:\d{2}:\d{2}[.,]\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}[.,]\d{3})")
        .expect("valid timing regex")
});

/// Best-effort SRT reader: blocks without a usable timing line are dropped.
pub fn parse_srt(input: &str) -> Vec<SubtitleRecord> {
    let normalized = input.replace('\r', "");
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for block in BLOCK_SPLIT_RE.split(&normalized) {
        let lines: Vec<&str> = block.split('\n').filter(|l| !l.is_empty()).collect();
        if lines.len() < 2 {
            continue;
        }

        let (timing, text_lines) = if lines[0].contains("-->") {
            (lines[0], &lines[1..])
        } else {
            (lines[1], &lines[2..])
        };

        let Some((start, end)) = parse_timing_line(timing) else {
            skipped += 1;
            continue;
        };

        records.push(SubtitleRecord::pending(
            start,
            end,
            Content::with_text(text_lines.join("\n")),
        ));
    }

    if skipped > 0 {
        tracing::debug!(skipped, "dropped SRT blocks without a timing line");
    }

    sort_by_start(&mut records);
    records
}

fn parse_timing_line(line: &str) -> Option<(f64, f64)> {
    let caps = TIMING_RE.captures(line)?;
    Some((parse_time(&caps[1])?, parse_time(&caps[2])?))
}

/// Numbered SRT blocks in start order. Only the primary text line is written.
pub fn write_srt(records: &[SubtitleRecord]) -> String {
    let mut sorted: Vec<&SubtitleRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    sorted
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}\n{} --> {}\n{}",
                i + 1,
                format_srt_timestamp(r.start),
                format_srt_timestamp(r.end),
                r.content.chinese
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_CUES: &str = "1\r\n00:00:01,000 --> 00:00:02,500\r\nHello\r\nworld\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nSecond\r\n";

    #[test]
    fn parses_blocks_with_index_and_crlf() {
        let recs = parse_srt(TWO_CUES);
        assert_eq!(recs.len(), 2);
        assert_eq!((recs[0].start, recs[0].end), (1.0, 2.5));
        assert_eq!(recs[0].content.chinese, "Hello\nworld");
        assert_eq!(recs[0].content.translate_list.len(), 1);
        assert!(recs[0].id.is_pending());
        assert_ne!(recs[0].id, recs[1].id);
    }

    #[test]
    fn index_line_is_optional() {
        let recs = parse_srt("00:00:05.000 --> 00:00:06.000\nno index\n");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].start, 5.0);
        assert_eq!(recs[0].content.chinese, "no index");
    }

    #[test]
    fn drops_block_without_arrow() {
        let doc = "1\n00:00:01,000 --> 00:00:02,000\nkept\n\n2\n00:00:03,000 00:00:04,000\nlost\n";
        let recs = parse_srt(doc);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].content.chinese, "kept");
    }

    #[test]
    fn skips_short_and_garbage_blocks() {
        let doc = "\n\n\n7\n\nnot a timing line\nfoo\n\n1\n00:00:01,000 --> 00:00:02,000\n";
        let recs = parse_srt(doc);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].content.chinese, "");
    }

    #[test]
    fn output_is_sorted_by_start() {
        let doc = "1\n00:00:09,000 --> 00:00:10,000\nlate\n\n2\n00:00:01,000 --> 00:00:02,000\nearly\n";
        let recs = parse_srt(doc);
        assert_eq!(recs[0].content.chinese, "early");
        assert_eq!(recs[1].content.chinese, "late");
    }

    #[test]
    fn writes_numbered_blocks_in_start_order() {
        let recs = vec![
            SubtitleRecord::pending(3.0, 4.0, Content::with_text("b")),
            SubtitleRecord::pending(1.0, 2.25, Content::with_text("a")),
        ];
        assert_eq!(
            write_srt(&recs),
            "1\n00:00:01,000 --> 00:00:02,250\na\n\n2\n00:00:03,000 --> 00:00:04,000\nb"
        );
    }

    #[test]
    fn translations_are_not_exported() {
        let mut c = Content::with_text("primary");
        c.first_unit_mut().ja = "日本語".into();
        let out = write_srt(&[SubtitleRecord::pending(0.0, 1.0, c)]);
        assert!(!out.contains("日本語"));
    }

    #[test]
    fn srt_round_trip_keeps_timing_and_text() {
        let recs = parse_srt(TWO_CUES);
        let out = write_srt(&recs);
        assert_eq!(
            out,
            "1\n00:00:01,000 --> 00:00:02,500\nHello\nworld\n\n2\n00:00:03,000 --> 00:00:04,000\nSecond"
        );
        let again = parse_srt(&out);
        assert_eq!(again.len(), 2);
        for (a, b) in recs.iter().zip(&again) {
            assert_eq!((a.start, a.end), (b.start, b.end));
            assert_eq!(a.content.chinese, b.content.chinese);
        }
    }
}
