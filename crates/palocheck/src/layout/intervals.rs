use super::Line;
use crate::strokes::{Mark, Stroke};

/// Number of timed intervals on a sheet.
pub const INTERVAL_COUNT: usize = 5;

/// Interval assignment parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// Delimiter matching tolerance as a multiple of the stroke height.
    pub line_tolerance_factor: f64,
    /// Only the first this many detected marks act as delimiters.
    pub max_delimiters: usize,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            line_tolerance_factor: 0.6,
            max_delimiters: INTERVAL_COUNT - 1,
        }
    }
}

/// How strokes were assigned to intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalSource {
    /// Delimiter marks split the stroke sequence.
    Marks,
    /// No usable marks; equal contiguous chunks.
    EqualChunks,
}

impl IntervalSource {
    pub fn for_marks(marks: &[Mark]) -> Self {
        if marks.is_empty() {
            Self::EqualChunks
        } else {
            Self::Marks
        }
    }
}

/// One timed bucket of strokes.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Interval {
    pub strokes: Vec<Stroke>,
}

impl Interval {
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

fn equal_chunks(ordered: Vec<Stroke>) -> Vec<Interval> {
    let n = ordered.len();
    let chunk = (n / INTERVAL_COUNT).max(1);
    let mut intervals = vec![Interval::default(); INTERVAL_COUNT];
    for (i, stroke) in ordered.into_iter().enumerate() {
        let idx = (i / chunk).min(INTERVAL_COUNT - 1);
        intervals[idx].strokes.push(stroke);
    }
    intervals
}

/// Index of the interval a stroke at `(px, py)` belongs to.
fn interval_index(stroke: &Stroke, delimiters: &[&Mark], cfg: &IntervalConfig) -> usize {
    let [px, py] = stroke.center;
    let tol = stroke.height * cfg.line_tolerance_factor;
    let mut idx = 0;
    for (i, mark) in delimiters.iter().enumerate() {
        let [mx, my] = mark.center;
        if py < my - tol || ((py - my).abs() <= tol && px < mx) {
            idx = i;
            break;
        }
        idx = i + 1;
    }
    idx.min(INTERVAL_COUNT - 1)
}

/// Partition the line-ordered strokes into exactly five intervals.
///
/// With delimiter marks, a stroke belongs to the first delimiter it precedes
/// (above it, or on its line and to its left); strokes after every delimiter
/// fall into the interval following the last one. Without marks the sequence
/// is cut into equal chunks, the last absorbing the remainder.
pub fn segment_intervals(lines: &[Line], marks: &[Mark], cfg: &IntervalConfig) -> Vec<Interval> {
    let ordered: Vec<Stroke> = lines.iter().flat_map(|l| l.strokes.iter().cloned()).collect();
    if ordered.is_empty() {
        return vec![Interval::default(); INTERVAL_COUNT];
    }
    if marks.is_empty() {
        tracing::warn!("no delimiter marks; splitting strokes into equal chunks");
        return equal_chunks(ordered);
    }

    let mut delimiters: Vec<&Mark> = marks.iter().take(cfg.max_delimiters).collect();
    delimiters.sort_by(|a, b| {
        a.center[1]
            .total_cmp(&b.center[1])
            .then(a.center[0].total_cmp(&b.center[0]))
    });

    let mut intervals = vec![Interval::default(); INTERVAL_COUNT];
    for stroke in ordered {
        let idx = interval_index(&stroke, &delimiters, cfg);
        intervals[idx].strokes.push(stroke);
    }
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{cluster_lines, LineClusterConfig};
    use crate::strokes::BBox;

    fn grid(rows: u32, cols: u32) -> Vec<Stroke> {
        let mut out = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let id = out.len() + 1;
                out.push(Stroke::from_bbox(id, BBox::new(50 + c * 20, 100 + r * 100, 3, 40)));
            }
        }
        out
    }

    fn lines_of(strokes: &[Stroke]) -> Vec<Line> {
        cluster_lines(strokes, 1000, &LineClusterConfig::default())
    }

    fn counts(intervals: &[Interval]) -> Vec<usize> {
        intervals.iter().map(Interval::len).collect()
    }

    #[test]
    fn equal_chunks_without_marks() {
        let strokes = grid(1, 23);
        let intervals = segment_intervals(&lines_of(&strokes), &[], &IntervalConfig::default());
        assert_eq!(counts(&intervals), vec![4, 4, 4, 4, 7]);
    }

    #[test]
    fn fewer_strokes_than_intervals() {
        let strokes = grid(1, 3);
        let intervals = segment_intervals(&lines_of(&strokes), &[], &IntervalConfig::default());
        assert_eq!(counts(&intervals), vec![1, 1, 1, 0, 0]);
    }

    #[test]
    fn no_strokes_gives_five_empty_intervals() {
        let intervals = segment_intervals(&[], &[], &IntervalConfig::default());
        assert_eq!(counts(&intervals), vec![0; 5]);
    }

    #[test]
    fn marks_at_row_ends_split_rows() {
        // Five rows of 10; a mark after the last stroke of each of the first four rows.
        let strokes = grid(5, 10);
        let marks: Vec<Mark> = (0..4u32)
            .map(|r| Mark::from_bbox(r as usize + 1, BBox::new(260, 115 + r * 100, 30, 6)))
            .collect();
        let intervals = segment_intervals(&lines_of(&strokes), &marks, &IntervalConfig::default());
        assert_eq!(counts(&intervals), vec![10, 10, 10, 10, 10]);
        assert_eq!(intervals[1].strokes[0].id, 11);
    }

    #[test]
    fn strokes_past_the_last_of_two_marks_are_kept() {
        let strokes = grid(5, 10);
        let marks: Vec<Mark> = (0..2u32)
            .map(|r| Mark::from_bbox(r as usize + 1, BBox::new(260, 115 + r * 100, 30, 6)))
            .collect();
        let intervals = segment_intervals(&lines_of(&strokes), &marks, &IntervalConfig::default());
        assert_eq!(counts(&intervals), vec![10, 10, 30, 0, 0]);
        assert_eq!(intervals.iter().map(Interval::len).sum::<usize>(), strokes.len());
        assert_eq!(intervals[2].strokes.last().map(|s| s.id), Some(50));
    }

    #[test]
    fn mid_line_mark_splits_a_row() {
        let strokes = grid(2, 10);
        // Between columns 3 and 4 of the first row.
        let marks = vec![Mark::from_bbox(1, BBox::new(115, 117, 20, 6))];
        let intervals = segment_intervals(&lines_of(&strokes), &marks, &IntervalConfig::default());
        assert_eq!(counts(&intervals), vec![4, 16, 0, 0, 0]);
    }

    #[test]
    fn only_first_four_marks_are_used() {
        let strokes = grid(1, 10);
        let marks: Vec<Mark> = (0..6u32)
            .map(|k| Mark::from_bbox(k as usize + 1, BBox::new(55 + k * 20, 117, 20, 6)))
            .collect();
        let intervals = segment_intervals(&lines_of(&strokes), &marks, &IntervalConfig::default());
        assert_eq!(intervals.iter().map(Interval::len).sum::<usize>(), 10);
        // Strokes past the fourth delimiter all land in the last interval.
        assert_eq!(counts(&intervals), vec![1, 1, 1, 1, 6]);
    }
}
