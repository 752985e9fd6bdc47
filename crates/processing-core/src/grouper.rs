//! Caption grouping: the word-to-event timing algorithm.
//!
//! # Algorithm
//!
//! 1. **Filter** each segment, dropping words whose trimmed text is empty.
//! 2. **Pack** consecutive words into groups of `group_size`; a trailing
//!    partial group is flushed at the segment boundary. Groups never span
//!    two segments.
//! 3. **Emit** events per group:
//!    - highlighting on, `group_size > 1` and more than one word: one event
//!      per word, each showing the whole group with that word emphasized,
//!      timed to the word itself; only the first carries the transition.
//!    - otherwise: one event spanning the whole group.
//! 4. **Color** each group with the next palette entry; every event of a
//!    group shares it.

use captioneer_caption_model::{
    CaptionConfig, CaptionEvent, CaptionGroup, Color, Palette, Segment,
};

/// Configuration for the caption grouper.
#[derive(Debug, Clone)]
pub struct GrouperConfig {
    /// Words per caption. Zero is treated as one.
    pub group_size: usize,

    /// Emit per-word highlight events.
    pub highlight_words: bool,

    /// Colors cycled once per group.
    pub palette: Palette,
}

impl Default for GrouperConfig {
    fn default() -> Self {
        Self {
            group_size: 1,
            highlight_words: false,
            palette: Palette::default(),
        }
    }
}

impl From<&CaptionConfig> for GrouperConfig {
    fn from(config: &CaptionConfig) -> Self {
        Self {
            group_size: config.number_of_words,
            highlight_words: config.highlight_words,
            palette: config.palette(),
        }
    }
}

/// The caption grouper.
pub struct CaptionGrouper {
    config: GrouperConfig,
}

impl CaptionGrouper {
    /// Create a new grouper with the given configuration.
    pub fn new(config: GrouperConfig) -> Self {
        Self { config }
    }

    /// Create a grouper with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(GrouperConfig::default())
    }

    /// Effective group size (never zero).
    pub fn group_size(&self) -> usize {
        self.config.group_size.max(1)
    }

    /// Group segments into ordered caption events.
    pub fn group(&self, segments: &[Segment]) -> Vec<CaptionEvent> {
        let (events, _) = self.group_with_diagnostics(segments);
        events
    }

    /// Group segments and also return the caption groups that were built.
    pub fn group_with_diagnostics(
        &self,
        segments: &[Segment],
    ) -> (Vec<CaptionEvent>, Vec<CaptionGroup>) {
        let size = self.group_size();
        let groups: Vec<CaptionGroup> = segments
            .iter()
            .flat_map(|segment| group_words(segment, size))
            .collect();

        let mut palette = self.config.palette.clone();
        let highlight = self.config.highlight_words && size > 1;
        let mut events = Vec::with_capacity(groups.len());

        for (group_index, group) in groups.iter().enumerate() {
            let color = palette.next_color();
            if highlight && group.len() > 1 {
                events.extend(highlight_events(group, group_index, color));
            } else {
                events.push(CaptionEvent {
                    words: group.word_texts(),
                    start: group.start(),
                    end: group.end(),
                    highlight_index: None,
                    has_transition: true,
                    color,
                    group_index,
                });
            }
        }

        let zero_duration = events.iter().filter(|e| e.duration() <= 0.0).count();
        if zero_duration > 0 {
            tracing::debug!(zero_duration, "Caption events with zero duration will not be shown");
        }
        tracing::debug!(
            groups = groups.len(),
            events = events.len(),
            group_size = size,
            highlight,
            "Grouped transcript into captions"
        );

        (events, groups)
    }
}

fn highlight_events(
    group: &CaptionGroup,
    group_index: usize,
    color: Color,
) -> impl Iterator<Item = CaptionEvent> + '_ {
    let texts = group.word_texts();
    group.words.iter().enumerate().map(move |(i, word)| CaptionEvent {
        words: texts.clone(),
        start: word.start,
        end: word.end,
        highlight_index: Some(i),
        has_transition: i == 0,
        color,
        group_index,
    })
}

/// Split one segment's visible words into groups of at most `size` words.
pub fn group_words(segment: &Segment, size: usize) -> Vec<CaptionGroup> {
    let size = size.max(1);
    let words: Vec<_> = segment.visible_words().cloned().collect();
    words
        .chunks(size)
        .filter_map(|chunk| CaptionGroup::new(chunk.to_vec()))
        .collect()
}

/// Convenience: group with an explicit size, highlight flag and palette.
pub fn group(
    segments: &[Segment],
    group_size: usize,
    highlight_words: bool,
    palette: Palette,
) -> Vec<CaptionEvent> {
    CaptionGrouper::new(GrouperConfig {
        group_size,
        highlight_words,
        palette,
    })
    .group(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use captioneer_caption_model::Word;

    fn seg(words: &[(&str, f64, f64)]) -> Segment {
        Segment::new(
            words
                .iter()
                .map(|(t, s, e)| Word::new(t, *s, *e))
                .collect(),
        )
    }

    fn palette() -> Palette {
        Palette::new(vec![Color::rgb(1, 0, 0), Color::rgb(0, 2, 0), Color::rgb(0, 0, 3)])
    }

    #[test]
    fn test_single_word_groups() {
        let segments = vec![seg(&[("a", 0.0, 0.5), ("b", 0.5, 1.0)])];
        let events = group(&segments, 1, false, palette());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].text(), "a");
        assert_eq!(events[1].color, Color::rgb(0, 2, 0));
        assert!(events.iter().all(|e| e.has_transition && e.highlight_index.is_none()));
    }

    #[test]
    fn test_groups_do_not_span_segments() {
        let segments = vec![
            seg(&[("one", 0.0, 0.2), ("two", 0.2, 0.4), ("three", 0.4, 0.6)]),
            seg(&[("four", 1.0, 1.2)]),
        ];
        let events = group(&segments, 2, false, palette());
        let texts: Vec<String> = events.iter().map(CaptionEvent::text).collect();
        assert_eq!(texts, vec!["one two", "three", "four"]);
        assert_eq!(events[2].group_index, 2);
    }

    #[test]
    fn test_blank_words_dropped() {
        let segments = vec![seg(&[("a", 0.0, 0.1), ("  ", 0.1, 0.2), ("b", 0.2, 0.3)])];
        let events = group(&segments, 2, false, palette());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].words, vec!["a", "b"]);
        assert_eq!(events[0].end, 0.3);
    }

    #[test]
    fn test_highlight_mode_emits_per_word_events() {
        let segments = vec![seg(&[("Hi", 0.0, 0.3), ("there", 0.3, 0.8), ("friend", 0.8, 1.5)])];
        let events = group(&segments, 3, true, palette());
        assert_eq!(events.len(), 3);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.highlight_index, Some(i));
            assert_eq!(event.has_transition, i == 0);
            assert_eq!(event.words, vec!["Hi", "there", "friend"]);
            assert_eq!(event.color, Color::rgb(1, 0, 0));
        }
        assert_eq!((events[1].start, events[1].end), (0.3, 0.8));
    }

    #[test]
    fn test_highlight_ignored_for_group_size_one() {
        let segments = vec![seg(&[("a", 0.0, 0.5), ("b", 0.5, 1.0)])];
        let events = group(&segments, 1, true, palette());
        assert!(events.iter().all(|e| e.highlight_index.is_none()));
    }

    #[test]
    fn test_highlight_single_word_trailing_group() {
        let segments = vec![seg(&[("a", 0.0, 0.5), ("b", 0.5, 1.0), ("c", 1.0, 1.2)])];
        let events = group(&segments, 2, true, palette());
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].highlight_index, None);
        assert!(events[2].has_transition);
        assert_eq!(events[2].color, Color::rgb(0, 2, 0));
    }

    #[test]
    fn test_zero_group_size_treated_as_one() {
        let segments = vec![seg(&[("a", 0.0, 0.5), ("b", 0.5, 1.0)])];
        assert_eq!(group(&segments, 0, false, palette()).len(), 2);
    }

    #[test]
    fn test_zero_duration_word_yields_zero_duration_event() {
        let segments = vec![seg(&[("pop", 2.0, 2.0)])];
        let events = group(&segments, 1, false, palette());
        assert_eq!(events[0].duration(), 0.0);
    }

    #[test]
    fn test_palette_wraps() {
        let segments = vec![seg(&[
            ("a", 0.0, 0.1),
            ("b", 0.1, 0.2),
            ("c", 0.2, 0.3),
            ("d", 0.3, 0.4),
        ])];
        let events = group(&segments, 1, false, palette());
        assert_eq!(events[3].color, events[0].color);
    }

    #[test]
    fn test_diagnostics_report_groups() {
        let segments = vec![seg(&[("a", 0.0, 0.1), ("b", 0.1, 0.2), ("c", 0.2, 0.3)])];
        let grouper = CaptionGrouper::new(GrouperConfig {
            group_size: 2,
            highlight_words: true,
            palette: palette(),
        });
        let (events, groups) = grouper.group_with_diagnostics(&segments);
        assert_eq!(groups.len(), 2);
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_from_caption_config() {
        let config = CaptionConfig {
            number_of_words: 4,
            highlight_words: true,
            ..CaptionConfig::default()
        };
        let grouper = CaptionGrouper::new(GrouperConfig::from(&config));
        assert_eq!(grouper.group_size(), 4);
    }
}
