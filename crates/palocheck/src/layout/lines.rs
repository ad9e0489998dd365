use crate::strokes::Stroke;

/// Line grouping parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LineClusterConfig {
    /// Tolerance as a multiple of the mean stroke height.
    pub tolerance_factor: f64,
}

impl Default for LineClusterConfig {
    fn default() -> Self {
        Self {
            tolerance_factor: 0.6,
        }
    }
}

/// Strokes sharing a horizontal band, ordered left to right.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Line {
    pub strokes: Vec<Stroke>,
}

impl Line {
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Mean vertical center of the line's strokes.
    pub fn mean_y(&self) -> f64 {
        if self.strokes.is_empty() {
            return 0.0;
        }
        self.strokes.iter().map(|s| s.center[1]).sum::<f64>() / self.strokes.len() as f64
    }
}

fn close_line(mut strokes: Vec<Stroke>) -> Line {
    strokes.sort_by(|a, b| a.center[0].total_cmp(&b.center[0]));
    Line { strokes }
}

/// Greedy single-pass grouping of strokes into writing lines.
///
/// Strokes are visited top to bottom; a stroke joins the open line when its
/// vertical distance to the line's running mean center is strictly below the
/// tolerance, otherwise it opens a new line. The tolerance depends on the
/// mean stroke height only; the page height does not bound it.
pub fn cluster_lines(strokes: &[Stroke], _page_height: u32, cfg: &LineClusterConfig) -> Vec<Line> {
    if strokes.is_empty() {
        return Vec::new();
    }
    let mean_height = strokes.iter().map(|s| s.height).sum::<f64>() / strokes.len() as f64;
    let tolerance = mean_height * cfg.tolerance_factor;

    let mut sorted: Vec<&Stroke> = strokes.iter().collect();
    sorted.sort_by(|a, b| a.center[1].total_cmp(&b.center[1]));

    let mut lines = Vec::new();
    let mut current: Vec<Stroke> = Vec::new();
    let mut sum_y = 0.0;
    for s in sorted {
        if !current.is_empty() {
            let mean = sum_y / current.len() as f64;
            if (s.center[1] - mean).abs() >= tolerance {
                lines.push(close_line(std::mem::take(&mut current)));
                sum_y = 0.0;
            }
        }
        sum_y += s.center[1];
        current.push(s.clone());
    }
    if !current.is_empty() {
        lines.push(close_line(current));
    }
    tracing::debug!(lines = lines.len(), tolerance, "strokes clustered into lines");
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strokes::BBox;

    fn stroke(id: usize, x: u32, y: u32) -> Stroke {
        Stroke::from_bbox(id, BBox::new(x, y, 3, 40))
    }

    #[test]
    fn rows_become_lines_sorted_left_to_right() {
        let strokes = vec![
            stroke(1, 300, 105),
            stroke(2, 100, 100),
            stroke(3, 200, 210),
            stroke(4, 50, 212),
            stroke(5, 200, 98),
        ];
        let lines = cluster_lines(&strokes, 1000, &LineClusterConfig::default());
        assert_eq!(lines.len(), 2);
        let ids: Vec<usize> = lines[0].strokes.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 5, 1]);
        let ids: Vec<usize> = lines[1].strokes.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[test]
    fn distance_equal_to_tolerance_opens_a_new_line() {
        // Heights 40 -> tolerance 24; centers 120 and 144 are exactly 24 apart.
        let strokes = vec![stroke(1, 10, 100), stroke(2, 20, 124)];
        let lines = cluster_lines(&strokes, 1000, &LineClusterConfig::default());
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn running_mean_decides_membership() {
        // Centers 120, 140, 150: the last is 30 from the first but 20 from the mean.
        let strokes = vec![stroke(1, 10, 100), stroke(2, 20, 120), stroke(3, 30, 130)];
        let lines = cluster_lines(&strokes, 1000, &LineClusterConfig::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 3);
    }

    #[test]
    fn tall_strokes_widen_the_tolerance() {
        // Heights 100 -> tolerance 60; centers 55 apart share one line even
        // though that exceeds 5% of the page height.
        let strokes = vec![
            Stroke::from_bbox(1, BBox::new(10, 100, 3, 100)),
            Stroke::from_bbox(2, BBox::new(20, 155, 3, 100)),
        ];
        let lines = cluster_lines(&strokes, 1000, &LineClusterConfig::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 2);
    }

    #[test]
    fn empty_input_has_no_lines() {
        assert!(cluster_lines(&[], 1000, &LineClusterConfig::default()).is_empty());
    }
}
