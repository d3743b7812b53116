//! Quality-code filtering of raw points.
//!
//! [`QualityFilterState`] pairs a [`FilterType`] with a set of quality codes and
//! maps each raw point either to a cleaned point or to nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::Point;

/// Filtering mode applied to points read from a backing store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    /// Points are returned unchanged.
    #[default]
    PassThrough,
    /// Only points whose quality code is in the code set are kept.
    WhiteList,
    /// Points whose quality code is in the code set are dropped.
    BlackList,
    /// The value is replaced by the quality code.
    CodesToValues,
    /// The confidence is replaced by the quality code.
    CodesToConfidence,
}

/// Filter mode plus the code set it consults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFilterState {
    /// Active mode.
    pub filter_type: FilterType,
    /// Quality codes consulted by the white and black lists.
    pub codes: BTreeSet<u32>,
}

impl QualityFilterState {
    /// Creates a filter state.
    #[must_use]
    pub fn new(filter_type: FilterType, codes: impl IntoIterator<Item = u32>) -> Self {
        Self {
            filter_type,
            codes: codes.into_iter().collect(),
        }
    }

    /// Applies the filter to one point; `None` means the point is dropped.
    #[must_use]
    pub fn apply(&self, p: Point) -> Option<Point> {
        let overridden = p.with_quality(Point::QUALITY_OVERRIDE);
        match self.filter_type {
            FilterType::PassThrough => Some(p),
            FilterType::WhiteList => self.codes.contains(&p.quality).then_some(overridden),
            FilterType::BlackList => (!self.codes.contains(&p.quality)).then_some(overridden),
            FilterType::CodesToValues => Some(Point {
                value: f64::from(p.quality),
                ..overridden
            }),
            FilterType::CodesToConfidence => Some(Point {
                confidence: f64::from(p.quality),
                ..overridden
            }),
        }
    }

    /// Applies the filter to a sequence, keeping only surviving points.
    #[must_use]
    pub fn apply_all(&self, points: Vec<Point>) -> Vec<Point> {
        if self.filter_type == FilterType::PassThrough {
            return points;
        }
        points.into_iter().filter_map(|p| self.apply(p)).collect()
    }
}
