//! Slider crossfade between successful results.
//!
//! A continuous cursor moves over the successful items of a batch, in their
//! original label order. Each item gets a linear weight `max(0, 1 - |cursor - index|)`,
//! so at most two neighbours are visible at once and their weights sum to one.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::generation::{Batch, Label};

/// Blend weight of the item at `index` for a cursor position.
///
/// `items` must be the non-empty, order-preserving sequence of successful
/// items. With a single item the slider cannot blend and the item stays fully
/// opaque at every position.
pub fn compute_weight<T>(items: &[T], cursor: f64, index: usize) -> f64 {
    weight_for_count(items.len(), cursor, index)
}

fn weight_for_count(count: usize, cursor: f64, index: usize) -> f64 {
    if count == 1 {
        return 1.0;
    }
    let distance = (cursor - index as f64).abs();
    (1.0 - distance).max(0.0)
}

/// Weights for every item at a cursor position.
pub fn weights<T>(items: &[T], cursor: f64) -> Vec<f64> {
    (0..items.len())
        .map(|index| compute_weight(items, cursor, index))
        .collect()
}

/// Valid cursor range for `count` successful items.
///
/// `[0, count - 1]` with two or more items, otherwise `[0, 1]`.
pub fn slider_range(count: usize) -> RangeInclusive<f64> {
    if count >= 2 {
        0.0..=(count - 1) as f64
    } else {
        0.0..=1.0
    }
}

/// Clamp a cursor into the slider range. NaN maps to the start.
pub fn clamp_cursor(count: usize, cursor: f64) -> f64 {
    if cursor.is_nan() {
        return 0.0;
    }
    let range = slider_range(count);
    cursor.clamp(*range.start(), *range.end())
}

/// Index of the item closest to the cursor, the one the slider names.
pub fn nearest_index(count: usize, cursor: f64) -> Option<usize> {
    if count == 0 {
        return None;
    }
    let position = clamp_cursor(count, cursor).round() as usize;
    Some(position.min(count - 1))
}

/// One successful item and its weight at the current cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossfadeLayer {
    pub index: usize,
    pub label: Label,
    pub weight: f64,
}

/// Blend state of a settled batch at one cursor position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crossfade {
    /// Cursor after clamping to `range`.
    pub cursor: f64,
    pub range: (f64, f64),
    /// Position of the item the slider names.
    pub nearest: usize,
    pub layers: Vec<CrossfadeLayer>,
}

impl Crossfade {
    /// Build the blend for a batch's successful items.
    ///
    /// Returns `None` when nothing succeeded; there is nothing to blend.
    pub fn from_batch(batch: &Batch, cursor: f64) -> Option<Self> {
        let items = batch.successful();
        let count = items.len();
        let nearest = nearest_index(count, cursor)?;
        let cursor = clamp_cursor(count, cursor);
        let range = slider_range(count);

        let layers = items
            .iter()
            .enumerate()
            .map(|(index, item)| CrossfadeLayer {
                index,
                label: item.label.clone(),
                weight: compute_weight(&items, cursor, index),
            })
            .collect();

        Some(Self {
            cursor,
            range: (*range.start(), *range.end()),
            nearest,
            layers,
        })
    }

    /// Layers that are at least partly visible.
    pub fn visible(&self) -> impl Iterator<Item = &CrossfadeLayer> {
        self.layers.iter().filter(|layer| layer.weight > 0.0)
    }
}
