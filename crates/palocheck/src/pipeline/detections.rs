use crate::config::AnalysisConfig;
use crate::region::Region;
use crate::strokes::{Mark, Provenance, Stroke};

use super::run::{aggregate, SheetAnalysis};

/// Editable detections of one sheet.
///
/// Produced by an analysis, amended by manual correction, then fed back to
/// [`DetectionSet::recompute`], which repeats clustering, segmentation and
/// metrics without touching the image.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectionSet {
    pub image_size: [u32; 2],
    pub region: Region,
    pub strokes: Vec<Stroke>,
    pub marks: Vec<Mark>,
    /// Scale recorded with the original analysis.
    #[serde(default)]
    pub scale_mm_per_px: Option<f64>,
    /// Counters of the original detection run.
    #[serde(default)]
    pub provenance: Provenance,
}

impl DetectionSet {
    /// Add a stroke; returns `false` when its id is already present.
    pub fn add_stroke(&mut self, stroke: Stroke) -> bool {
        if self.strokes.iter().any(|s| s.id == stroke.id) {
            return false;
        }
        self.strokes.push(stroke);
        true
    }

    pub fn remove_stroke(&mut self, id: usize) -> Option<Stroke> {
        let pos = self.strokes.iter().position(|s| s.id == id)?;
        Some(self.strokes.remove(pos))
    }

    /// Add a mark; returns `false` when its id is already present.
    pub fn add_mark(&mut self, mark: Mark) -> bool {
        if self.marks.iter().any(|m| m.id == mark.id) {
            return false;
        }
        self.marks.push(mark);
        true
    }

    pub fn remove_mark(&mut self, id: usize) -> Option<Mark> {
        let pos = self.marks.iter().position(|m| m.id == id)?;
        Some(self.marks.remove(pos))
    }

    /// Next unused stroke id.
    pub fn next_stroke_id(&self) -> usize {
        self.strokes.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    /// Next unused mark id.
    pub fn next_mark_id(&self) -> usize {
        self.marks.iter().map(|m| m.id).max().unwrap_or(0) + 1
    }

    /// Re-aggregate the current strokes and marks.
    ///
    /// Marks are used in their stored order, like freshly detected ones.
    pub fn recompute(&self, cfg: &AnalysisConfig) -> SheetAnalysis {
        let mut provenance = self.provenance.clone();
        provenance.kept_in_region = self.strokes.len();
        provenance.marks_detected = self.marks.len();
        let agg = aggregate(
            &self.strokes,
            &self.marks,
            self.image_size[1],
            self.region.confidence,
            &provenance,
            self.scale_mm_per_px,
            cfg,
        );
        tracing::info!(
            strokes = self.strokes.len(),
            marks = self.marks.len(),
            "detections recomputed"
        );
        SheetAnalysis {
            image_size: self.image_size,
            region: self.region.clone(),
            validation: None,
            strokes: self.strokes.clone(),
            marks: self.marks.clone(),
            line_count: agg.line_count,
            interval_source: agg.interval_source,
            provenance,
            metrics: agg.metrics,
            scale_mm_per_px: self.scale_mm_per_px,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::IntervalSource;
    use crate::metrics::{MetricsStatus, ReasonCode};
    use crate::region::RegionSource;
    use crate::strokes::BBox;

    fn region(confidence: f64) -> Region {
        Region {
            x: 20,
            y: 100,
            width: 660,
            height: 800,
            confidence,
            source: RegionSource::Structural,
            separator_found: true,
            separator_y: Some(90),
            adaptive_cutoff: Some(120),
        }
    }

    /// Five rows of ten strokes.
    fn set(confidence: f64) -> DetectionSet {
        let mut strokes = Vec::new();
        for r in 0..5u32 {
            for c in 0..10u32 {
                let id = strokes.len() + 1;
                strokes.push(Stroke::from_bbox(id, BBox::new(60 + c * 25, 150 + r * 120, 3, 40)));
            }
        }
        DetectionSet {
            image_size: [700, 1000],
            region: region(confidence),
            strokes,
            marks: Vec::new(),
            scale_mm_per_px: None,
            provenance: Provenance::default(),
        }
    }

    #[test]
    fn recompute_follows_edits() {
        let mut s = set(1.0);
        let before = s.recompute(&AnalysisConfig::default());
        assert_eq!(before.metrics.total, Some(50));
        assert_eq!(before.metrics.interval_counts, Some(vec![10; 5]));

        assert!(s.remove_stroke(1).is_some());
        assert!(s.remove_stroke(1).is_none());
        let after = s.recompute(&AnalysisConfig::default());
        assert_eq!(after.metrics.total, Some(49));
        assert_eq!(after.provenance.kept_in_region, 49);
        assert_eq!(
            after.metrics.interval_counts.map(|c| c.iter().sum::<usize>()),
            Some(49)
        );
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let mut s = set(1.0);
        let dup = Stroke::from_bbox(3, BBox::new(500, 150, 3, 40));
        assert!(!s.add_stroke(dup));
        assert_eq!(s.strokes.len(), 50);

        let id = s.next_stroke_id();
        assert_eq!(id, 51);
        assert!(s.add_stroke(Stroke::from_bbox(id, BBox::new(500, 150, 3, 40))));
        assert_eq!(s.recompute(&AnalysisConfig::default()).metrics.total, Some(51));

        let mark = Mark::from_bbox(1, BBox::new(320, 167, 40, 6));
        assert!(s.add_mark(mark.clone()));
        assert!(!s.add_mark(mark));
        assert_eq!(s.next_mark_id(), 2);
    }

    #[test]
    fn added_marks_switch_to_mark_segmentation() {
        let mut s = set(1.0);
        for r in 0..4u32 {
            let id = s.next_mark_id();
            s.add_mark(Mark::from_bbox(id, BBox::new(320, 167 + r * 120, 40, 6)));
        }
        let a = s.recompute(&AnalysisConfig::default());
        assert_eq!(a.interval_source, IntervalSource::Marks);
        assert_eq!(a.metrics.interval_counts, Some(vec![10; 5]));
        assert!(s.remove_mark(2).is_some());
        let a = s.recompute(&AnalysisConfig::default());
        assert_eq!(a.metrics.interval_counts, Some(vec![10, 20, 10, 10, 0]));
    }

    #[test]
    fn missing_scale_uses_300_dpi() {
        let a = set(1.0).recompute(&AnalysisConfig::default());
        let stats = a.metrics.stroke_stats.expect("stats");
        // 40 px at 300 DPI.
        assert_eq!(stats.mean_height_mm, Some(3.39));
    }

    #[test]
    fn low_confidence_set_stays_gated() {
        let a = set(0.6).recompute(&AnalysisConfig::default());
        assert_eq!(a.metrics.status, MetricsStatus::NeedsReview);
        assert_eq!(a.metrics.reason_code, Some(ReasonCode::LowConfidenceRoi));
        assert_eq!(a.metrics.interval_counts, None);
        assert_eq!(a.metrics.total, None);
    }

    #[test]
    fn detection_set_round_trips_through_json() {
        let s = set(1.0);
        let json = serde_json::to_string(&s).expect("json");
        let back: DetectionSet = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, s);
    }
}
