//! Several layered plans addressed as one index space.

use std::fmt::Debug;

use itertools::Itertools;
use mneme_error::{MnemeResult, ResultExt, mneme_bail, mneme_err};

use crate::displs::Displacements;
use crate::plan::{Layer, LayeredPlan};

/// Concatenates layered plans, e.g. one per partition, into one element index space.
///
/// Every plan must have been built from the same sequence of layer keys. Partition `k` owns the
/// elements `plan_offset(k)..plan_offset(k) + plan(k).len()`.
#[derive(Clone, Debug)]
pub struct CombinedLayeredPlan<K> {
    plans: Vec<LayeredPlan<K>>,
    offsets: Vec<usize>,
}

impl<K: Clone + PartialEq + Debug> CombinedLayeredPlan<K> {
    /// Combine `plans` in order.
    ///
    /// ## Errors
    ///
    /// Fails if the plans do not share the same layer keys in the same order.
    pub fn try_new(plans: Vec<LayeredPlan<K>>) -> MnemeResult<Self> {
        if let Some(first) = plans.first() {
            for (idx, plan) in plans.iter().enumerate().skip(1) {
                if !plan.keys().eq(first.keys()) {
                    mneme_bail!(
                        "Plan {} has layers {:?}, expected {:?}",
                        idx,
                        plan.keys().collect_vec(),
                        first.keys().collect_vec()
                    );
                }
            }
        }

        let offsets = plans
            .iter()
            .scan(0, |offset, plan| {
                let start = *offset;
                *offset += plan.len();
                Some(start)
            })
            .collect();

        Ok(Self { plans, offsets })
    }

    /// The displacement table over all partitions.
    ///
    /// Each plan's table starts at zero, so the per-element counts are concatenated and summed
    /// again rather than merging raw offsets.
    pub fn layout(&self) -> Displacements {
        let counts = self
            .plans
            .iter()
            .flat_map(|plan| plan.layout().counts())
            .collect_vec();
        log::debug!(
            "Combined layout of {} plans: {} elements",
            self.plans.len(),
            counts.len()
        );
        Displacements::new(&counts)
    }

    /// The extent of layer `key` of partition `plan_idx`, in global element indices.
    pub fn layer(&self, key: &K, plan_idx: usize) -> MnemeResult<Layer> {
        let local = self
            .plans
            .get(plan_idx)
            .ok_or_else(|| mneme_err!(OutOfBounds: plan_idx, 0, self.plans.len()))
            .map(|plan| plan.layer(key));
        let layer = ResultExt::flatten(local)?;
        Ok(Layer::new(
            layer.num_elements,
            layer.offset + self.offsets[plan_idx],
        ))
    }

    /// The total number of elements over all partitions.
    pub fn len(&self) -> usize {
        self.plans.iter().map(LayeredPlan::len).sum()
    }

    /// Whether no partition holds any element.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of combined plans.
    pub fn nplans(&self) -> usize {
        self.plans.len()
    }

    /// The plan of partition `plan_idx`.
    pub fn plan(&self, plan_idx: usize) -> Option<&LayeredPlan<K>> {
        self.plans.get(plan_idx)
    }

    /// The global index of the first element of partition `plan_idx`.
    pub fn plan_offset(&self, plan_idx: usize) -> Option<usize> {
        self.offsets.get(plan_idx).copied()
    }
}
