use crate::assignment::Assignment;
use crate::factor::Factor;
use crate::model::Model;
use crate::pgm::{Neighbor, Node, NodeKind};

/// One point of a factor's joint configuration space.
pub struct ValuesStep<'a> {
    factor: &'a dyn Factor,
    assignment: Assignment,
    score: f64,
    tensor: Vec<f64>,
}

impl<'a> ValuesStep<'a> {
    pub fn factor(&self) -> &'a dyn Factor {
        self.factor
    }

    /// Values of the enumerated neighbours at this step.
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// One-hot encoding of the joint configuration, row-major over the
    /// enumerated neighbours.
    pub fn tensor(&self) -> &[f64] {
        &self.tensor
    }

    pub fn into_assignment(self) -> Assignment {
        self.assignment
    }
}

/// Enumerates every joint value of a factor's discrete neighbours.
///
/// The iterator is consumed as it runs; enumerate again by requesting a
/// new one. Neighbours that are collections keep their current values.
pub struct ValuesIterator<'a> {
    factor: &'a dyn Factor,
    model: &'a Model,
    nodes: Vec<Node>,
    dims: Vec<usize>,
    size: usize,
    position: usize,
}

impl<'a> ValuesIterator<'a> {
    pub fn new(factor: &'a dyn Factor, model: &'a Model) -> Self {
        let mut nodes = Vec::new();
        for neighbor in factor.variables() {
            if let Neighbor::Variable(node) = neighbor {
                if node.kind() == NodeKind::Discrete && !nodes.contains(node) {
                    nodes.push(*node);
                }
            }
        }
        let dims: Vec<usize> = nodes
            .iter()
            .map(|node| match model.domain_size(*node) {
                Some(size) => size,
                None => panic!("factor neighbour {} is not in the model", node.id()),
            })
            .collect();
        let size = dims.iter().product();
        Self {
            factor,
            model,
            nodes,
            dims,
            size,
            position: 0,
        }
    }

    /// Number of configurations in the full enumeration.
    pub fn size(&self) -> usize {
        self.size
    }

    fn assignment_at(&self, mut flat: usize) -> Assignment {
        let mut assignment = Assignment::new();
        for (node, dim) in self.nodes.iter().zip(self.dims.iter()).rev() {
            assignment.insert(*node, flat % dim);
            flat /= dim;
        }
        assignment
    }
}

impl<'a> Iterator for ValuesIterator<'a> {
    type Item = ValuesStep<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.size {
            return None;
        }
        let flat = self.position;
        self.position += 1;

        let assignment = self.assignment_at(flat);
        let values = self.model.state().overlaid(&assignment);
        let score = self.factor.score(&values, self.model.parameters());
        let mut tensor = vec![0.0; self.size];
        tensor[flat] = 1.0;
        Some(ValuesStep {
            factor: self.factor,
            assignment,
            score,
            tensor,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.size - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ValuesIterator<'_> {}
