use std::borrow::Cow;
use std::fmt::Debug;
use std::marker::PhantomData;

use itertools::Itertools;
use mneme_error::{MnemeResult, mneme_bail, mneme_err};

use super::{DYNAMIC_STRIDE, DenseView, GeneralView, StridedView};
use crate::combined::CombinedLayeredPlan;
use crate::displs::Displacements;
use crate::plan::{Layer, LayeredPlan};
use crate::storage::{Offset, Storage};

/// A plan the [`ViewFactory`] can look layers up in.
pub trait LayerSource {
    /// The layer key type.
    type Key;

    /// The element extent of layer `key`, in the index space of [`LayerSource::displacements`].
    fn extent(&self, key: &Self::Key, partition: Option<usize>) -> MnemeResult<Layer>;

    /// The displacement table over all elements.
    fn displacements(&self) -> Cow<'_, Displacements>;
}

impl<K: Clone + PartialEq + Debug> LayerSource for LayeredPlan<K> {
    type Key = K;

    /// A single plan is partition `0`.
    fn extent(&self, key: &K, partition: Option<usize>) -> MnemeResult<Layer> {
        match partition {
            None | Some(0) => self.layer(key),
            Some(partition) => Err(mneme_err!(OutOfBounds: partition, 0, 1)),
        }
    }

    fn displacements(&self) -> Cow<'_, Displacements> {
        Cow::Borrowed(self.layout())
    }
}

impl<K: Clone + PartialEq + Debug> LayerSource for CombinedLayeredPlan<K> {
    type Key = K;

    fn extent(&self, key: &K, partition: Option<usize>) -> MnemeResult<Layer> {
        let Some(partition) = partition else {
            mneme_bail!(
                "A view into a combined plan of {} partitions needs a partition id",
                self.nplans()
            );
        };
        self.layer(key, partition)
    }

    fn displacements(&self) -> Cow<'_, Displacements> {
        Cow::Owned(self.layout())
    }
}

/// Marks a [`ViewFactory`] setting that has not been chosen yet.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unset;

/// Marks the stride chosen for a [`ViewFactory`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Stride<const N: usize>;

/// Builds views over the layer of a plan.
///
/// Each setting is chosen once and recorded in the factory's type, so the `create_*` methods only
/// exist once everything they need is set:
///
/// ```
/// use mneme::{Field, LayeredPlan, Natural, SingleStorage, ViewFactory};
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum Zone {
///     Ghost,
///     Interior,
/// }
///
/// struct Dof;
/// impl Field for Dof {
///     type Type = f64;
///     type Alloc = Natural;
/// }
///
/// let plan = LayeredPlan::new()
///     .with_layer(Zone::Ghost, 2, |_| 1)
///     .and_then(|plan| plan.with_layer(Zone::Interior, 3, |_| 2))
///     .unwrap();
/// let mut storage = SingleStorage::<Dof>::try_new(plan.layout().total()).unwrap();
///
/// let mut view = ViewFactory::new()
///     .with_stride::<2>()
///     .with_plan(&plan)
///     .with_storage(&mut storage)
///     .create_strided_view(&Zone::Interior)
///     .unwrap();
/// view.get_mut(0)[1] = 1.0;
/// assert_eq!(storage.as_slice()[3], 1.0);
/// ```
///
/// Asking for a view before the stride is chosen does not compile:
///
/// ```compile_fail
/// use mneme::{Field, LayeredPlan, Natural, SingleStorage, ViewFactory};
///
/// struct Dof;
/// impl Field for Dof {
///     type Type = f64;
///     type Alloc = Natural;
/// }
///
/// let plan = LayeredPlan::new().with_layer(0u8, 2, |_| 1).unwrap();
/// let mut storage = SingleStorage::<Dof>::try_new(2).unwrap();
/// let _view = ViewFactory::new()
///     .with_plan(&plan)
///     .with_storage(&mut storage)
///     .create_strided_view(&0);
/// ```
#[derive(Debug)]
pub struct ViewFactory<St = Unset, P = Unset, S = Unset> {
    stride: PhantomData<St>,
    plan: P,
    storage: S,
    partition: Option<usize>,
}

impl ViewFactory {
    /// A factory with nothing chosen.
    pub fn new() -> Self {
        Self {
            stride: PhantomData,
            plan: Unset,
            storage: Unset,
            partition: None,
        }
    }
}

impl Default for ViewFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, S> ViewFactory<Unset, P, S> {
    /// Build views in which every element owns `N` items.
    pub fn with_stride<const N: usize>(self) -> ViewFactory<Stride<N>, P, S> {
        ViewFactory {
            stride: PhantomData,
            plan: self.plan,
            storage: self.storage,
            partition: self.partition,
        }
    }

    /// Build views in which every element owns one item.
    pub fn dense(self) -> ViewFactory<Stride<1>, P, S> {
        self.with_stride::<1>()
    }

    /// Build strided views taking the stride from the layer's first element.
    pub fn dynamic_stride(self) -> ViewFactory<Stride<DYNAMIC_STRIDE>, P, S> {
        self.with_stride::<DYNAMIC_STRIDE>()
    }
}

impl<St, S> ViewFactory<St, Unset, S> {
    /// Look layers up in `plan`.
    pub fn with_plan<P: LayerSource>(self, plan: &P) -> ViewFactory<St, &P, S> {
        ViewFactory {
            stride: self.stride,
            plan,
            storage: self.storage,
            partition: self.partition,
        }
    }
}

impl<St, P> ViewFactory<St, P, Unset> {
    /// View into `storage`.
    pub fn with_storage<T: Storage>(self, storage: &mut T) -> ViewFactory<St, P, &mut T> {
        ViewFactory {
            stride: self.stride,
            plan: self.plan,
            storage,
            partition: self.partition,
        }
    }
}

impl<St, P, S> ViewFactory<St, P, S> {
    /// Select the partition of a combined plan.
    pub fn with_partition(mut self, partition: usize) -> Self {
        self.partition = Some(partition);
        self
    }
}

impl<'p, 's, P: LayerSource, T: Storage, const N: usize> ViewFactory<Stride<N>, &'p P, &'s mut T> {
    /// A strided view over the elements of layer `key`.
    pub fn create_strided_view(self, key: &P::Key) -> MnemeResult<StridedView<'s, T, N>> {
        let layer = self.plan.extent(key, self.partition)?;
        let layout = self.plan.displacements();
        StridedView::try_new(&*layout, self.storage, layer.offset, layer.end())
    }

    /// Strided views over the elements of several layers, in the order of `keys`.
    ///
    /// The views divide the storage between them, so they can be used at the same time, and from
    /// different threads.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if two of the layers overlap; otherwise as
    /// [`ViewFactory::create_strided_view`].
    pub fn create_strided_views(
        self,
        keys: &[P::Key],
    ) -> MnemeResult<Vec<StridedView<'s, T, N>>> {
        let layout = self.plan.displacements();
        split_layers(self.plan, self.partition, &layout, self.storage, keys)?
            .into_iter()
            .map(|(layer, offset)| {
                StridedView::try_from_offset(&*layout, offset, layer.offset, layer.end())
            })
            .collect()
    }
}

impl<'p, 's, P: LayerSource, T: Storage> ViewFactory<Stride<1>, &'p P, &'s mut T> {
    /// A dense view over the elements of layer `key`.
    pub fn create_dense_view(self, key: &P::Key) -> MnemeResult<DenseView<'s, T>> {
        let layer = self.plan.extent(key, self.partition)?;
        let layout = self.plan.displacements();
        DenseView::try_new(&*layout, self.storage, layer.offset, layer.end())
    }

    /// Dense views over the elements of several layers, in the order of `keys`.
    ///
    /// ## Errors
    ///
    /// As [`ViewFactory::create_strided_views`].
    pub fn create_dense_views(self, keys: &[P::Key]) -> MnemeResult<Vec<DenseView<'s, T>>> {
        let layout = self.plan.displacements();
        split_layers(self.plan, self.partition, &layout, self.storage, keys)?
            .into_iter()
            .map(|(layer, offset)| {
                DenseView::try_from_offset(&*layout, offset, layer.offset, layer.end())
            })
            .collect()
    }
}

impl<'p, 's, St, P: LayerSource, T: Storage> ViewFactory<St, &'p P, &'s mut T> {
    /// A general view over the elements of layer `key`. The stride setting is ignored.
    pub fn create_general_view(self, key: &P::Key) -> MnemeResult<GeneralView<'s, T>> {
        let layer = self.plan.extent(key, self.partition)?;
        let layout = self.plan.displacements();
        GeneralView::try_new(&*layout, self.storage, layer.offset, layer.end())
    }

    /// General views over the elements of several layers, in the order of `keys`.
    ///
    /// ## Errors
    ///
    /// As [`ViewFactory::create_strided_views`].
    pub fn create_general_views(self, keys: &[P::Key]) -> MnemeResult<Vec<GeneralView<'s, T>>> {
        let layout = self.plan.displacements();
        split_layers(self.plan, self.partition, &layout, self.storage, keys)?
            .into_iter()
            .map(|(layer, offset)| {
                GeneralView::try_from_offset(&*layout, offset, layer.offset, layer.end())
            })
            .collect()
    }
}

/// Hand each layer in `keys` its own part of `storage`, in the order of `keys`.
///
/// A part reaches from the end of the previous layer's items to the end of its own, so the views
/// built on it can advance to the first item of the layer.
fn split_layers<'s, P: LayerSource, T: Storage>(
    plan: &P,
    partition: Option<usize>,
    layout: &Displacements,
    storage: &'s mut T,
    keys: &[P::Key],
) -> MnemeResult<Vec<(Layer, Offset<'s, T>)>> {
    let mut layers = keys
        .iter()
        .map(|key| plan.extent(key, partition))
        .enumerate()
        .map(|(idx, layer)| layer.map(|layer| (idx, layer)))
        .collect::<MnemeResult<Vec<_>>>()?;
    layers.sort_by_key(|(_, layer)| layer.offset);
    for ((_, lo), (_, hi)) in layers.iter().tuple_windows() {
        if lo.end() > hi.offset {
            mneme_bail!(
                "Layers over elements {}..{} and {}..{} overlap",
                lo.offset,
                lo.end(),
                hi.offset,
                hi.end()
            );
        }
    }

    let mut rest = storage.offset(0)?;
    let mut parts = Vec::with_capacity(layers.len());
    for (idx, layer) in layers {
        if layer.end() > layout.len() {
            mneme_bail!(OutOfBounds: layer.end(), 0, layout.len());
        }
        let mid = layout[layer.end()]
            .saturating_sub(rest.start())
            .min(rest.len());
        let (part, tail) = rest.split_at_mut(mid);
        parts.push((idx, layer, part));
        rest = tail;
    }
    parts.sort_by_key(|(idx, ..)| *idx);
    Ok(parts
        .into_iter()
        .map(|(_, layer, part)| (layer, part))
        .collect())
}
