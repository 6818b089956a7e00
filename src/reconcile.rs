//! Exact-timestamp reconciliation of real and simulated series.
//!
//! An overlay point is only meaningful superimposed exactly on a real
//! sample's time slot; anything else is discarded, never interpolated,
//! never snapped to the nearest sample. The merged output therefore always
//! has one record per in-window real sample, no more and no less.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::{MergedRecord, MergedSeries, MetricPoint, Overlay, TimeWindow};
use crate::scale::normalize;

/// Merge a loaded real series with a loaded overlay, scoped to the active
/// window.
///
/// The real series seeds the record set (duplicate timestamps collapse,
/// last write wins); overlay points then fill `simulated` on exact
/// timestamp hits only. Records come out ascending by timestamp.
pub fn merge(real: &[MetricPoint], overlay: &Overlay, window: &TimeWindow) -> MergedSeries {
    let mut by_ts: BTreeMap<DateTime<Utc>, MergedRecord> = BTreeMap::new();

    for point in real.iter().filter(|p| window.contains(p.ts)) {
        by_ts.insert(
            point.ts,
            MergedRecord {
                ts: point.ts,
                real: normalize(point.value),
                simulated: None,
            },
        );
    }

    let mut matched = 0usize;
    for point in &overlay.points {
        // Lookup miss: the forecast has no corresponding real sample; drop it
        if let Some(record) = by_ts.get_mut(&point.ts) {
            record.simulated = normalize(point.value);
            matched += 1;
        }
    }

    if !overlay.is_empty() && matched == 0 {
        tracing::debug!(
            metric = %overlay.metric,
            overlay_points = overlay.points.len(),
            "no forecast point aligned with a real sample in this window"
        );
    }

    MergedSeries {
        records: by_ts.into_values().collect(),
        has_overlay: matched > 0,
    }
}
