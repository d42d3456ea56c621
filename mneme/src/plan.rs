//! Per-element item counts and the layered plans built from them.

use std::fmt::Debug;
use std::ops::Range;
use std::sync::OnceLock;

use mneme_error::{MnemeResult, mneme_bail, mneme_err};

use crate::displs::Displacements;

/// Assigns a number of items ("degrees of freedom") to each of `N` elements.
///
/// The derived [`Displacements`] table is cached until the counts change.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    dofs: Vec<usize>,
    layout: OnceLock<Displacements>,
}

impl Plan {
    /// Create a plan for `num_elements` elements, each owning zero items.
    pub fn new(num_elements: usize) -> Self {
        Self {
            dofs: vec![0; num_elements],
            layout: OnceLock::new(),
        }
    }

    /// Set the number of items owned by `element`.
    pub fn set_dof(&mut self, element: usize, dof: usize) -> MnemeResult<()> {
        let len = self.dofs.len();
        let slot = self
            .dofs
            .get_mut(element)
            .ok_or_else(|| mneme_err!(OutOfBounds: element, 0, len))?;
        if *slot != dof {
            *slot = dof;
            self.layout.take();
        }
        Ok(())
    }

    /// The number of items owned by `element`, if it exists.
    pub fn dof(&self, element: usize) -> Option<usize> {
        self.dofs.get(element).copied()
    }

    /// All per-element item counts.
    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.dofs.len()
    }

    /// Whether the plan has no elements.
    pub fn is_empty(&self) -> bool {
        self.dofs.is_empty()
    }

    /// Truncate or extend the plan; new elements own zero items.
    pub fn resize(&mut self, num_elements: usize) {
        if num_elements != self.dofs.len() {
            self.dofs.resize(num_elements, 0);
            self.layout.take();
        }
    }

    /// The displacement table of the current counts.
    ///
    /// Repeated calls without an intervening mutation return the same table.
    pub fn layout(&self) -> &Displacements {
        self.layout.get_or_init(|| Displacements::new(&self.dofs))
    }
}

/// A contiguous range of elements inside a plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layer {
    /// The number of elements in the layer.
    pub num_elements: usize,
    /// The index of the layer's first element.
    pub offset: usize,
}

impl Layer {
    /// Create a layer of `num_elements` elements starting at `offset`.
    pub const fn new(num_elements: usize, offset: usize) -> Self {
        Self {
            num_elements,
            offset,
        }
    }

    /// One past the layer's last element.
    pub const fn end(&self) -> usize {
        self.offset + self.num_elements
    }

    /// The element range covered by the layer.
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// Whether the layer holds no elements.
    pub const fn is_empty(&self) -> bool {
        self.num_elements == 0
    }
}

/// A [`Plan`] built from named, back-to-back layers.
///
/// Layers are keyed by values of `K`, typically a fieldless enum such as
/// `enum Zone { Ghost, Copy, Interior }`. Every layer starts where the previous one ended, so the
/// layers cover `0..len()` exactly once.
#[derive(Clone, Debug)]
pub struct LayeredPlan<K> {
    layers: Vec<(K, Layer)>,
    cur_offset: usize,
    num_elements: usize,
    plan: Plan,
}

impl<K> Default for LayeredPlan<K> {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            cur_offset: 0,
            num_elements: 0,
            plan: Plan::default(),
        }
    }
}

impl<K: Clone + PartialEq + Debug> LayeredPlan<K> {
    /// Create a plan without layers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new plan with one more layer `key` of `num_elements` elements.
    ///
    /// `dofs(j)` gives the number of items of the layer's `j`-th element. `self` is unchanged.
    pub fn with_layer<F>(&self, key: K, num_elements: usize, dofs: F) -> MnemeResult<Self>
    where
        F: FnMut(usize) -> usize,
    {
        if self.layers.iter().any(|(k, _)| *k == key) {
            mneme_bail!("Layer {:?} was already added to the plan", key);
        }

        let mut next = self.clone();
        let layer = Layer::new(num_elements, self.cur_offset);
        next.cur_offset += num_elements;
        next.num_elements += num_elements;
        next.plan.resize(next.num_elements);
        for (element, dof) in layer.range().zip((0..num_elements).map(dofs)) {
            next.plan.set_dof(element, dof)?;
        }
        next.layers.push((key, layer));
        Ok(next)
    }

    /// The extent of layer `key`.
    pub fn layer(&self, key: &K) -> MnemeResult<Layer> {
        self.layers
            .iter()
            .find_map(|(k, layer)| (k == key).then_some(*layer))
            .ok_or_else(|| mneme_err!(MissingLayer: "Layer {:?} was never added to the plan", key))
    }

    /// The layers in the order they were added.
    pub fn layers(&self) -> impl ExactSizeIterator<Item = (&K, &Layer)> + '_ {
        self.layers.iter().map(|(key, layer)| (key, layer))
    }

    /// The layer keys in the order they were added.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.layers.iter().map(|(key, _)| key)
    }

    /// The displacement table of the whole plan, cached until the plan changes.
    pub fn layout(&self) -> &Displacements {
        self.plan.layout()
    }

    /// The element index at which the next layer will start.
    pub fn offset(&self) -> usize {
        self.cur_offset
    }

    /// The total number of elements over all layers.
    pub fn len(&self) -> usize {
        self.num_elements
    }

    /// Whether the plan holds no elements.
    pub fn is_empty(&self) -> bool {
        self.num_elements == 0
    }

    /// The underlying plan.
    pub fn plan(&self) -> &Plan {
        &self.plan
    }
}

#[cfg(test)]
mod test {
    use mneme_error::MnemeError;
    use rstest::rstest;

    use super::{Layer, LayeredPlan, Plan};

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Zone {
        Ghost,
        Copy,
        Interior,
    }

    fn zones(n_ghost: usize, n_copy: usize, n_interior: usize) -> LayeredPlan<Zone> {
        LayeredPlan::new()
            .with_layer(Zone::Ghost, n_ghost, |_| 1)
            .and_then(|p| p.with_layer(Zone::Copy, n_copy, |j| j + 1))
            .and_then(|p| p.with_layer(Zone::Interior, n_interior, |_| 4))
            .unwrap()
    }

    #[test]
    fn plan_starts_empty() {
        let plan = Plan::new(5);
        assert_eq!(plan.dofs(), &[0; 5]);
        assert_eq!(plan.layout().total(), 0);
        assert_eq!(plan.layout().len(), 5);
    }

    #[test]
    fn set_dof_out_of_bounds() {
        let mut plan = Plan::new(3);
        assert!(matches!(
            plan.set_dof(3, 1),
            Err(MnemeError::OutOfBounds(3, 0, 3, _))
        ));
    }

    #[test]
    fn layout_cached_until_mutation() {
        let mut plan = Plan::new(4);
        plan.set_dof(1, 3).unwrap();
        let first: *const _ = plan.layout();
        assert!(std::ptr::eq(first, plan.layout()));

        // Writing the same value keeps the cached table.
        plan.set_dof(1, 3).unwrap();
        assert!(std::ptr::eq(first, plan.layout()));
        assert_eq!(plan.layout().as_slice(), &[0, 0, 3, 3, 3]);

        plan.set_dof(2, 2).unwrap();
        assert_eq!(plan.layout().as_slice(), &[0, 0, 3, 5, 5]);
    }

    #[test]
    fn resize_pads_with_zero() {
        let mut plan = Plan::new(2);
        plan.set_dof(0, 2).unwrap();
        plan.set_dof(1, 2).unwrap();
        assert_eq!(plan.layout().total(), 4);

        plan.resize(4);
        assert_eq!(plan.dofs(), &[2, 2, 0, 0]);
        assert_eq!(plan.layout().as_slice(), &[0, 2, 4, 4, 4]);

        plan.resize(1);
        assert_eq!(plan.layout().as_slice(), &[0, 2]);
    }

    #[rstest]
    #[case(5, 10, 100)]
    #[case(0, 3, 7)]
    #[case(2, 0, 0)]
    fn layer_offsets(#[case] n1: usize, #[case] n2: usize, #[case] n3: usize) {
        let plan = zones(n1, n2, n3);
        assert_eq!(plan.layer(&Zone::Ghost).unwrap(), Layer::new(n1, 0));
        assert_eq!(plan.layer(&Zone::Copy).unwrap(), Layer::new(n2, n1));
        assert_eq!(plan.layer(&Zone::Interior).unwrap(), Layer::new(n3, n1 + n2));
        assert_eq!(plan.len(), n1 + n2 + n3);
        assert_eq!(plan.offset(), n1 + n2 + n3);
        assert_eq!(
            plan.keys().copied().collect::<Vec<_>>(),
            vec![Zone::Ghost, Zone::Copy, Zone::Interior]
        );
    }

    #[test]
    fn layer_dofs_use_local_index() {
        let plan = zones(2, 3, 1);
        assert_eq!(plan.plan().dofs(), &[1, 1, 1, 2, 3, 4]);
        assert_eq!(plan.layout().as_slice(), &[0, 1, 2, 3, 5, 8, 12]);
    }

    #[test]
    fn missing_layer() {
        let plan = LayeredPlan::new()
            .with_layer(Zone::Ghost, 3, |_| 1)
            .unwrap();
        assert!(matches!(
            plan.layer(&Zone::Interior),
            Err(MnemeError::MissingLayer(..))
        ));
    }

    #[test]
    fn duplicate_layer() {
        let plan = LayeredPlan::new()
            .with_layer(Zone::Ghost, 3, |_| 1)
            .unwrap();
        assert!(plan.with_layer(Zone::Ghost, 1, |_| 1).is_err());
    }

    #[test]
    fn layered_layout_is_cached() {
        let plan = zones(3, 4, 5);
        let first: *const _ = plan.layout();
        assert!(std::ptr::eq(first, plan.layout()));
    }

    #[test]
    fn appending_keeps_earlier_layout() {
        let base = LayeredPlan::new()
            .with_layer(Zone::Ghost, 2, |_| 3)
            .and_then(|p| p.with_layer(Zone::Copy, 2, |j| j))
            .unwrap();
        let before = base.layout().clone();

        let extended = base.with_layer(Zone::Interior, 3, |_| 2).unwrap();
        assert_eq!(extended.layout().len(), 7);
        assert_eq!(
            &extended.layout().as_slice()[..=before.len()],
            before.as_slice()
        );
        assert_eq!(extended.layout().total(), before.total() + 6);

        // The base plan is untouched and its cache still valid.
        assert_eq!(base.len(), 4);
        assert_eq!(base.layout(), &before);
    }
}
