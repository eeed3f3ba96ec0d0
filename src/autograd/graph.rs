//! Computation tape and gradient storage.
//!
//! The graph records one [`TapeEntry`] per differentiable operation and
//! holds the accumulated gradients for grad-requiring leaves. Tensors
//! themselves carry no backward state; everything is keyed by
//! [`TensorId`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::grad_fn::GradFn;
use super::tensor::{Tensor, TensorId};

/// One recorded operation: output, gradient function, inputs.
pub(crate) struct TapeEntry {
    pub output_id: TensorId,
    pub grad_fn: Arc<dyn GradFn>,
    pub input_ids: Vec<TensorId>,
}

/// Tape of recorded operations plus per-leaf gradient accumulators.
///
/// Each thread owns one graph (thread-local storage in the parent
/// module), so recording needs no synchronization. The attack loop
/// clears the graph once per iteration: the tape for one search step is
/// discarded as soon as the perturbation gradient has been read out.
pub struct ComputationGraph {
    /// Recorded operations, forward order
    tape: Vec<TapeEntry>,

    /// Leaves that asked for gradients
    leaves: HashSet<TensorId>,

    /// Accumulated leaf gradients, populated by `backward`
    grads: HashMap<TensorId, Tensor>,
}

impl ComputationGraph {
    /// Create a new empty computation graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tape: Vec::new(),
            leaves: HashSet::new(),
            grads: HashMap::new(),
        }
    }

    /// Drop the tape, the leaf set, and all accumulated gradients.
    pub fn clear(&mut self) {
        self.tape.clear();
        self.leaves.clear();
        self.grads.clear();
    }

    /// Note a tensor as a gradient destination if it is a leaf that
    /// wants gradients; anything else is ignored.
    pub fn register_leaf(&mut self, tensor: &Tensor) {
        if tensor.requires_grad_enabled() && tensor.is_leaf() {
            self.leaves.insert(tensor.id());
        }
    }

    /// Record an operation to the tape.
    pub fn record(
        &mut self,
        output_id: TensorId,
        grad_fn: Arc<dyn GradFn>,
        input_ids: Vec<TensorId>,
    ) {
        self.tape.push(TapeEntry {
            output_id,
            grad_fn,
            input_ids,
        });
    }

    /// Reverse-mode backward pass.
    ///
    /// Seeds `output_id` with `grad_output`, walks the tape in reverse,
    /// and applies each grad function. An input reached through several
    /// paths sums its contributions. Gradients arriving at registered
    /// leaves accumulate into the graph; repeated backward calls without
    /// an intervening clear keep adding.
    pub fn backward(&mut self, output_id: TensorId, grad_output: Tensor) {
        let mut flowing: HashMap<TensorId, Tensor> = HashMap::new();
        flowing.insert(output_id, grad_output);

        for entry in self.tape.iter().rev() {
            let Some(grad_out) = flowing.get(&entry.output_id).cloned() else {
                continue;
            };

            let input_grads = entry.grad_fn.backward(&grad_out);
            for (input_id, input_grad) in entry.input_ids.iter().zip(input_grads) {
                accumulate(&mut flowing, *input_id, input_grad);
            }
        }

        for (id, grad) in flowing {
            if self.leaves.contains(&id) {
                accumulate(&mut self.grads, id, grad);
            }
        }
    }

    /// Get the number of recorded operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tape.len()
    }

    /// Check if the tape is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tape.is_empty()
    }

    /// Get the accumulated gradient for a leaf (after backward).
    #[must_use]
    pub fn get_grad(&self, id: TensorId) -> Option<Tensor> {
        self.grads.get(&id).cloned()
    }
}

impl Default for ComputationGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum `grad` into whatever the map already holds for `id`.
fn accumulate(map: &mut HashMap<TensorId, Tensor>, id: TensorId, grad: Tensor) {
    map.entry(id)
        .and_modify(|existing| {
            let summed: Vec<f32> = existing
                .data()
                .iter()
                .zip(grad.data().iter())
                .map(|(a, b)| a + b)
                .collect();
            *existing = Tensor::new(&summed, grad.shape());
        })
        .or_insert(grad);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::grad_fn::MulScalarBackward;

    #[test]
    fn test_graph_creation() {
        let graph = ComputationGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
    }

    #[test]
    fn test_graph_clear_drops_gradients() {
        let mut graph = ComputationGraph::new();

        let input = Tensor::from_slice(&[1.0]).requires_grad();
        let input_id = input.id();
        graph.register_leaf(&input);

        let out_id = TensorId::new();
        graph.record(out_id, Arc::new(MulScalarBackward { scalar: 2.0 }), vec![input_id]);
        graph.backward(out_id, Tensor::from_slice(&[1.0]));
        assert!(graph.get_grad(input_id).is_some());

        graph.clear();
        assert!(graph.is_empty());
        assert!(graph.get_grad(input_id).is_none());
    }

    #[test]
    fn test_backward_simple() {
        let mut graph = ComputationGraph::new();

        let input = Tensor::from_slice(&[1.0, 2.0]).requires_grad();
        let input_id = input.id();
        graph.register_leaf(&input);

        let out_id = TensorId::new();
        graph.record(
            out_id,
            Arc::new(MulScalarBackward { scalar: -1.0 }),
            vec![input_id],
        );

        graph.backward(out_id, Tensor::from_slice(&[1.0, 1.0]));

        let grad = graph.get_grad(input_id).expect("grad");
        assert_eq!(grad.data(), &[-1.0, -1.0]);
    }

    #[test]
    fn test_backward_accumulates_shared_input() {
        // the same input feeding two tape entries sums its contributions
        let mut graph = ComputationGraph::new();

        let input = Tensor::from_slice(&[3.0]).requires_grad();
        let input_id = input.id();
        graph.register_leaf(&input);

        let out_id = TensorId::new();
        graph.record(out_id, Arc::new(MulScalarBackward { scalar: -1.0 }), vec![input_id]);
        graph.record(out_id, Arc::new(MulScalarBackward { scalar: -1.0 }), vec![input_id]);

        graph.backward(out_id, Tensor::from_slice(&[1.0]));

        let grad = graph.get_grad(input_id).expect("grad");
        assert_eq!(grad.data(), &[-2.0]);
    }

    #[test]
    fn test_non_leaf_receives_no_gradient() {
        let mut graph = ComputationGraph::new();

        let mut intermediate = Tensor::from_slice(&[1.0]).requires_grad();
        intermediate.mark_non_leaf();
        let id = intermediate.id();
        graph.register_leaf(&intermediate);

        let out_id = TensorId::new();
        graph.record(out_id, Arc::new(MulScalarBackward { scalar: 1.0 }), vec![id]);
        graph.backward(out_id, Tensor::from_slice(&[1.0]));

        assert!(graph.get_grad(id).is_none());
    }

    #[test]
    fn test_backward_no_matching_output() {
        let mut graph = ComputationGraph::new();
        graph.backward(TensorId::new(), Tensor::from_slice(&[1.0]));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_get_grad_missing() {
        let graph = ComputationGraph::new();
        assert!(graph.get_grad(TensorId::new()).is_none());
    }
}
