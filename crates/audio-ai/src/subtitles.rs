//! Subtitle generation in SRT and VTT formats.
//!
//! Highlight mode produces several events per caption group; those are
//! collapsed into one cue spanning the group. Zero-length cues are skipped.

use std::path::Path;

use captioneer_caption_model::CaptionEvent;
use captioneer_common::error::CaptioneerResult;

/// One subtitle cue.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Collapse caption events into cues, one per caption group.
pub fn cues_from_events(events: &[CaptionEvent]) -> Vec<Cue> {
    let mut cues: Vec<(usize, Cue)> = Vec::new();
    for event in events {
        if let Some((group, cue)) = cues.last_mut() {
            if *group == event.group_index {
                cue.start = cue.start.min(event.start);
                cue.end = cue.end.max(event.end);
                continue;
            }
        }
        cues.push((
            event.group_index,
            Cue {
                start: event.start,
                end: event.end,
                text: event.text(),
            },
        ));
    }
    cues.into_iter()
        .map(|(_, cue)| cue)
        .filter(|cue| cue.end > cue.start)
        .collect()
}

/// Generate SRT subtitle content from caption events.
pub fn generate_srt(events: &[CaptionEvent]) -> String {
    let mut output = String::new();

    for (i, cue) in cues_from_events(events).iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(cue.start),
            format_srt_time(cue.end),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// Generate WebVTT subtitle content from caption events.
pub fn generate_vtt(events: &[CaptionEvent]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for cue in cues_from_events(events) {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(cue.start),
            format_vtt_time(cue.end),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

fn split_millis(secs: f64) -> (u64, u64, u64, u64) {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    (
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000,
    )
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
fn format_srt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_millis(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Format seconds as VTT timestamp: HH:MM:SS.mmm
fn format_vtt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_millis(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Save subtitles to a file; `.vtt` selects WebVTT, anything else SRT.
pub fn save_subtitles(events: &[CaptionEvent], path: &Path) -> CaptioneerResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("vtt") => generate_vtt(events),
        _ => generate_srt(events),
    };
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "Wrote subtitles");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use captioneer_caption_model::Color;

    fn event(words: &[&str], start: f64, end: f64, group: usize, hl: Option<usize>) -> CaptionEvent {
        CaptionEvent {
            words: words.iter().map(|w| w.to_string()).collect(),
            start,
            end,
            highlight_index: hl,
            has_transition: hl.map_or(true, |i| i == 0),
            color: Color::WHITE,
            group_index: group,
        }
    }

    #[test]
    fn test_srt_generation() {
        let events = vec![
            event(&["Hello", "world"], 0.0, 2.5, 0, None),
            event(&["This", "is", "a", "test"], 3.0, 5.0, 1, None),
        ];

        let srt = generate_srt(&events);
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,500\nHello world"));
        assert!(srt.contains("2\n00:00:03,000 --> 00:00:05,000\nThis is a test"));
    }

    #[test]
    fn test_vtt_generation() {
        let events = vec![event(&["One", "minute", "in"], 61.5, 63.0, 0, None)];

        let vtt = generate_vtt(&events);
        assert!(vtt.starts_with("WEBVTT\n"));
        assert!(vtt.contains("00:01:01.500 --> 00:01:03.000"));
    }

    #[test]
    fn test_highlight_events_collapse_per_group() {
        let words = ["Hi", "there"];
        let events = vec![
            event(&words, 0.0, 0.3, 0, Some(0)),
            event(&words, 0.3, 0.8, 0, Some(1)),
            event(&["friend"], 0.8, 1.5, 1, None),
        ];
        let cues = cues_from_events(&events);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0], Cue { start: 0.0, end: 0.8, text: "Hi there".into() });
    }

    #[test]
    fn test_zero_length_cues_skipped() {
        let events = vec![event(&["blink"], 1.0, 1.0, 0, None)];
        assert_eq!(generate_srt(&events), "");
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(3661.5), "01:01:01,500");
        assert_eq!(format_vtt_time(3661.5), "01:01:01.500");
        assert_eq!(format_srt_time(-1.0), "00:00:00,000");
    }

    #[test]
    fn test_save_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let events = vec![event(&["Hi"], 0.0, 1.0, 0, None)];

        let vtt = dir.path().join("out.vtt");
        save_subtitles(&events, &vtt).unwrap();
        assert!(std::fs::read_to_string(&vtt).unwrap().starts_with("WEBVTT"));

        let srt = dir.path().join("out.srt");
        save_subtitles(&events, &srt).unwrap();
        assert!(std::fs::read_to_string(&srt).unwrap().starts_with("1\n"));
    }
}
