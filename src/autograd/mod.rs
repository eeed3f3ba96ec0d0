//! Reverse-mode automatic differentiation engine.
//!
//! Tape-based, define-by-run: operations are recorded to a thread-local
//! tape during the forward pass and gradients are computed in reverse
//! order during the backward pass. This is the substrate for both the
//! classifier training loop and the perturbation search, which needs the
//! gradient of a summed loss with respect to a leaf input tensor.
//!
//! # Example
//!
//! ```
//! use adversario::autograd::{clear_graph, get_grad, Tensor};
//!
//! clear_graph();
//! let x = Tensor::from_slice(&[1.0, 2.0, 3.0]).requires_grad();
//! let x_id = x.id();
//!
//! let y = x.mul_scalar(2.0).sum();
//! y.backward();
//!
//! let grad = get_grad(x_id).expect("gradient");
//! assert_eq!(grad.data(), &[2.0, 2.0, 2.0]);
//! ```

pub(crate) mod grad_fn;
mod graph;
mod ops;
mod tensor;

pub use grad_fn::GradFn;
pub use graph::ComputationGraph;
pub use tensor::{Tensor, TensorId};

use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    /// Global computation graph for the current thread.
    static GRAPH: RefCell<ComputationGraph> = RefCell::new(ComputationGraph::new());

    /// Flag to disable gradient tracking (for inference and in-place updates).
    static GRAD_ENABLED: RefCell<bool> = const { RefCell::new(true) };
}

/// Execute a closure without gradient tracking.
///
/// Used for evaluation and for the perturbation-update arithmetic between
/// gradient evaluations: updates applied inside this scope are invisible to
/// the tape.
pub fn no_grad<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    GRAD_ENABLED.with(|enabled| {
        let prev = *enabled.borrow();
        *enabled.borrow_mut() = false;
        let result = f();
        *enabled.borrow_mut() = prev;
        result
    })
}

/// Check if gradient tracking is currently enabled.
#[must_use]
pub fn is_grad_enabled() -> bool {
    GRAD_ENABLED.with(|enabled| *enabled.borrow())
}

/// Get a reference to the thread-local computation graph.
pub(crate) fn with_graph<F, R>(f: F) -> R
where
    F: FnOnce(&mut ComputationGraph) -> R,
{
    GRAPH.with(|graph| f(&mut graph.borrow_mut()))
}

/// Attach a computed result to the tape.
///
/// Shared by every differentiable operation: when tracking is on and any
/// input wants gradients, the result is flagged as tracked, grad-wanting
/// leaf inputs are registered as gradient destinations, and the grad
/// function goes on the tape. Otherwise this is a no-op and the result
/// stays a plain leaf.
pub(crate) fn record_operation(result: &mut Tensor, inputs: &[&Tensor], grad_fn: Arc<dyn GradFn>) {
    if !is_grad_enabled() || !inputs.iter().any(|t| t.requires_grad_enabled()) {
        return;
    }

    result.requires_grad_(true);
    result.mark_non_leaf();

    let input_ids: Vec<TensorId> = inputs.iter().map(|t| t.id()).collect();
    with_graph(|graph| {
        for tensor in inputs {
            graph.register_leaf(tensor);
        }
        graph.record(result.id(), grad_fn, input_ids);
    });
}

/// Clear the computation graph (called after each backward/read cycle).
pub fn clear_graph() {
    GRAPH.with(|graph| graph.borrow_mut().clear());
}

/// Get the accumulated gradient for a leaf tensor by ID.
#[must_use]
pub fn get_grad(id: TensorId) -> Option<Tensor> {
    with_graph(|graph| graph.get_grad(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_grad_context() {
        assert!(is_grad_enabled());

        no_grad(|| {
            assert!(!is_grad_enabled());
        });

        assert!(is_grad_enabled());
    }

    #[test]
    fn test_nested_no_grad() {
        no_grad(|| {
            assert!(!is_grad_enabled());
            no_grad(|| {
                assert!(!is_grad_enabled());
            });
            assert!(!is_grad_enabled());
        });

        assert!(is_grad_enabled());
    }
}
