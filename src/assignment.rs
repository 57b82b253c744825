use crate::pgm::{DiscreteVariable, Node};
use std::collections::HashMap;

/// Values for a set of discrete nodes.
///
/// Used both as the model's current state and as a hypothetical
/// configuration that is scored without being committed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignment {
    values: HashMap<Node, usize>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an assignment from `(variable, value)` pairs.
    pub fn from_pairs<I, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, usize)>,
        N: Into<Node>,
    {
        let values = pairs
            .into_iter()
            .map(|(node, value)| (node.into(), value))
            .collect();
        Self { values }
    }

    pub fn get(&self, node: impl Into<Node>) -> Option<usize> {
        self.values.get(&node.into()).copied()
    }

    /// Returns the value of `node`. Panics if the node is unassigned.
    pub fn value(&self, node: impl Into<Node>) -> usize {
        let node = node.into();
        match self.values.get(&node) {
            Some(value) => *value,
            None => panic!("node {} has no value in assignment", node.id()),
        }
    }

    /// Sets a discrete variable, checking the value against its domain.
    pub fn set(&mut self, var: DiscreteVariable, value: usize) {
        if value >= var.domain_size() {
            panic!(
                "value {} outside domain of size {}",
                value,
                var.domain_size()
            );
        }
        self.values.insert(var.node(), value);
    }

    pub(crate) fn insert(&mut self, node: Node, value: usize) {
        self.values.insert(node, value);
    }

    pub fn contains(&self, node: impl Into<Node>) -> bool {
        self.values.contains_key(&node.into())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Node, &usize)> {
        self.values.iter()
    }

    /// Returns a copy of `self` where every value in `other` takes precedence.
    pub fn overlaid(&self, other: &Assignment) -> Assignment {
        let mut values = self.values.clone();
        values.extend(other.values.iter().map(|(node, value)| (*node, *value)));
        Assignment { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_prefers_hypothetical_values() {
        let x = DiscreteVariable::new(3);
        let z = DiscreteVariable::new(2);
        let mut current = Assignment::new();
        current.set(x, 2);
        current.set(z, 0);

        let hypothetical = Assignment::from_pairs([(z, 1)]);
        let merged = current.overlaid(&hypothetical);
        assert_eq!(merged.value(x), 2);
        assert_eq!(merged.value(z), 1);
        assert_eq!(current.value(z), 0);
    }

    #[test]
    #[should_panic]
    fn set_rejects_out_of_domain_values() {
        let x = DiscreteVariable::new(2);
        let mut state = Assignment::new();
        state.set(x, 2);
    }
}
