//! Ordered channel maps.

use indexmap::IndexMap;
use indexmap::map::{Iter, IterMut};
use ndarray::ArrayD;

/// Reserved key of the ground-truth depth entry.
pub const GT_DEPTH_KEY: &str = "gt_depth";

/// Channel name → array, iterated in insertion order.
///
/// Single-channel arrays are (H, W); color arrays are (H, W, C). The order of
/// insertion is the order of the channels in the assembled tensor.
#[derive(Debug, Clone, Default)]
pub struct ChannelSet {
    channels: IndexMap<String, ArrayD<f32>>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a channel. A replaced channel keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, array: ArrayD<f32>) -> Option<ArrayD<f32>> {
        self.channels.insert(key.into(), array)
    }

    /// Remove a channel, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<ArrayD<f32>> {
        self.channels.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&ArrayD<f32>> {
        self.channels.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ArrayD<f32>> {
        self.channels.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.channels.contains_key(key)
    }

    /// The ground-truth depth entry, if present.
    pub fn target(&self) -> Option<&ArrayD<f32>> {
        self.channels.get(GT_DEPTH_KEY)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn iter(&self) -> Iter<'_, String, ArrayD<f32>> {
        self.channels.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, String, ArrayD<f32>> {
        self.channels.iter_mut()
    }

    /// Every entry except the ground-truth depth, in order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &ArrayD<f32>)> {
        self.channels
            .iter()
            .filter(|(key, _)| key.as_str() != GT_DEPTH_KEY)
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Two sets are equal when they hold the same keys in the same order with equal arrays.
impl PartialEq for ChannelSet {
    fn eq(&self, other: &Self) -> bool {
        self.channels.len() == other.channels.len()
            && self
                .channels
                .iter()
                .zip(other.channels.iter())
                .all(|(a, b)| a == b)
    }
}
