//! Set reconciliation between two image inventories

use crate::registry::ImageReference;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Deref;

/// Images present in a source inventory and absent from a target one,
/// deduplicated and sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MissingSet(Vec<ImageReference>);

impl Deref for MissingSet {
    type Target = [ImageReference];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a MissingSet {
    type Item = &'a ImageReference;
    type IntoIter = std::slice::Iter<'a, ImageReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Compute the images of `source` that `target` lacks.
///
/// Every distinct source image scores `+1`; every target occurrence
/// subtracts one. Exactly the images still at `+1` are missing. Source
/// duplicates count once, and images only in `target` end up negative and
/// are never reported.
pub fn missing(source: &[ImageReference], target: &[ImageReference]) -> MissingSet {
    let mut scores: HashMap<&ImageReference, i64> = HashMap::with_capacity(source.len());

    for image in source {
        scores.insert(image, 1);
    }
    for image in target {
        *scores.entry(image).or_insert(0) -= 1;
    }

    let mut missing: Vec<ImageReference> = scores
        .into_iter()
        .filter(|&(_, score)| score == 1)
        .map(|(image, _)| image.clone())
        .collect();
    missing.sort_unstable();

    MissingSet(missing)
}
