//! Tensor type with gradient-tracking flags.
//!
//! A tensor here is plain data plus bookkeeping: the computation graph
//! owns everything backward-related (the tape and the accumulated leaf
//! gradients), keyed by [`TensorId`]. A tensor only knows whether it
//! wants gradients and whether an operation produced it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::with_graph;

/// Unique identifier tying tensors to their tape entries and gradients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorId(u64);

impl TensorId {
    /// Generate a new unique tensor ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        TensorId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

/// An `f32` tensor, row-major.
///
/// Leaf tensors (created directly, not by an operation) with gradient
/// tracking enabled receive accumulated gradients in the graph after
/// `backward()`; read them out with [`get_grad`](super::get_grad).
///
/// The perturbation in the attack layer is such a leaf: created once per
/// search, mutated in place between gradient evaluations (the ID, and
/// with it the gradient slot, stays stable), and returned by value.
#[derive(Clone)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Vec<usize>,
    requires_grad: bool,
    is_leaf: bool,
    id: TensorId,
}

impl Tensor {
    /// Create a tensor from a slice with the given shape.
    ///
    /// Gradient tracking starts disabled.
    ///
    /// # Panics
    ///
    /// Panics if the data length doesn't match the product of the shape
    /// dimensions.
    #[must_use]
    pub fn new(data: &[f32], shape: &[usize]) -> Self {
        let expected_len: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected_len,
            "Data length {} doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            expected_len
        );

        Self {
            data: data.to_vec(),
            shape: shape.to_vec(),
            requires_grad: false,
            is_leaf: true,
            id: TensorId::new(),
        }
    }

    /// Create a 1D tensor from a slice.
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self::new(data, &[data.len()])
    }

    /// Create a tensor filled with zeros.
    #[must_use]
    pub fn zeros(shape: &[usize]) -> Self {
        let len: usize = shape.iter().product();
        Self::new(&vec![0.0; len], shape)
    }

    /// Create a tensor filled with ones.
    #[must_use]
    pub fn ones(shape: &[usize]) -> Self {
        let len: usize = shape.iter().product();
        Self::new(&vec![1.0; len], shape)
    }

    /// Create a zero tensor congruent in shape with another.
    #[must_use]
    pub fn zeros_like(other: &Tensor) -> Self {
        Self::zeros(&other.shape)
    }

    /// Enable gradient tracking, returning self for chaining.
    #[must_use]
    pub fn requires_grad(mut self) -> Self {
        self.requires_grad = true;
        self
    }

    /// Enable or disable gradient tracking in place.
    pub fn requires_grad_(&mut self, requires: bool) -> &mut Self {
        self.requires_grad = requires;
        self
    }

    /// Check if this tensor requires gradient computation.
    #[must_use]
    pub fn requires_grad_enabled(&self) -> bool {
        self.requires_grad
    }

    /// Check if this is a leaf tensor (not created by an operation).
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// Mark this tensor as produced by a recorded operation.
    pub(crate) fn mark_non_leaf(&mut self) {
        self.is_leaf = false;
    }

    /// Get the tensor's unique identifier.
    #[must_use]
    pub fn id(&self) -> TensorId {
        self.id
    }

    /// Get the shape of the tensor.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the total number of elements.
    #[must_use]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Get the number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get a reference to the underlying data.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Get a mutable reference to the underlying data.
    ///
    /// Mutating through this handle bypasses the tape; callers must do so
    /// inside a [`no_grad`](super::no_grad) scope or between graph clears.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Detach from gradient tracking: a fresh leaf with the same data.
    #[must_use]
    pub fn detach(&self) -> Tensor {
        Tensor::new(&self.data, &self.shape)
    }

    /// Get a scalar value (for 1-element tensors).
    ///
    /// # Panics
    ///
    /// Panics if the tensor has more than one element.
    #[must_use]
    pub fn item(&self) -> f32 {
        assert_eq!(
            self.numel(),
            1,
            "item() only works on tensors with exactly 1 element, got {}",
            self.numel()
        );
        self.data[0]
    }

    /// Backpropagate from a scalar output, seeding with gradient 1.
    ///
    /// # Panics
    ///
    /// Panics if called on a tensor with more than one element.
    pub fn backward(&self) {
        assert_eq!(
            self.numel(),
            1,
            "backward() requires scalar output, got shape {:?}",
            self.shape
        );

        with_graph(|graph| {
            graph.backward(self.id, Tensor::ones(&self.shape));
        });
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("requires_grad", &self.requires_grad)
            .field("is_leaf", &self.is_leaf)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
