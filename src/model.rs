use crate::assignment::Assignment;
use crate::errors::FactorError;
use crate::factor::{Factor, same_factor};
use crate::pgm::{DiscreteVariable, Node, NodeKind, ProportionsVariable};
use crate::proportions::{ParameterStore, Proportions};
use std::collections::HashMap;
use std::sync::Arc;

/// Variables, their current values, component parameters and the factors
/// over them.
///
/// Factors are deduplicated on insertion: adding a factor structurally
/// equal to one already present is a no-op.
#[derive(Default)]
pub struct Model {
    variables: HashMap<Node, DiscreteVariable>,
    state: Assignment,
    parameters: ParameterStore,
    factors: Vec<Arc<dyn Factor>>,
    buckets: HashMap<u64, Vec<usize>>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a discrete variable with its initial value.
    pub fn add_variable(&mut self, var: DiscreteVariable, initial: usize) -> Result<(), FactorError> {
        if initial >= var.domain_size() {
            return Err(FactorError::ValueOutOfDomain {
                value: initial,
                domain_size: var.domain_size(),
            });
        }
        self.variables.insert(var.node(), var);
        self.state.set(var, initial);
        Ok(())
    }

    pub fn add_parameter<P>(&mut self, var: ProportionsVariable, proportions: P)
    where
        P: Proportions + 'static,
    {
        self.parameters.insert(var, proportions);
    }

    /// Adds a factor, returning `false` if an equal factor was already present.
    pub fn add_factor(&mut self, factor: Arc<dyn Factor>) -> Result<bool, FactorError> {
        for neighbor in factor.variables() {
            for node in neighbor.nodes() {
                match node.kind() {
                    NodeKind::Discrete if !self.variables.contains_key(node) => {
                        return Err(FactorError::UnknownVariable(node.id()));
                    }
                    NodeKind::Proportions if !self.parameters.contains(*node) => {
                        return Err(FactorError::UnknownParameter(node.id()));
                    }
                    _ => {}
                }
            }
        }
        factor.validate(&self.parameters)?;

        let hash = factor.identity().hash_code();
        if let Some(indices) = self.buckets.get(&hash) {
            if indices
                .iter()
                .any(|&i| same_factor(self.factors[i].as_ref(), factor.as_ref()))
            {
                log::debug!("skipping duplicate factor {:?}", factor.as_ref());
                return Ok(false);
            }
        }
        self.buckets.entry(hash).or_default().push(self.factors.len());
        self.factors.push(factor);
        Ok(true)
    }

    pub fn factors(&self) -> &[Arc<dyn Factor>] {
        &self.factors
    }

    /// Every factor with `node` among its neighbours, in insertion order.
    pub fn factors_touching(&self, node: impl Into<Node>) -> Vec<&Arc<dyn Factor>> {
        let node = node.into();
        self.factors
            .iter()
            .filter(|factor| factor.variables().iter().any(|n| n.touches(node)))
            .collect()
    }

    pub fn variable(&self, node: impl Into<Node>) -> Option<DiscreteVariable> {
        self.variables.get(&node.into()).copied()
    }

    pub fn domain_size(&self, node: impl Into<Node>) -> Option<usize> {
        self.variable(node).map(|var| var.domain_size())
    }

    /// Current value of a registered variable.
    pub fn value(&self, var: DiscreteVariable) -> usize {
        self.state.value(var)
    }

    /// Checks that `value` could be committed for `var` without writing it.
    pub fn check(&self, var: DiscreteVariable, value: usize) -> Result<(), FactorError> {
        if !self.variables.contains_key(&var.node()) {
            return Err(FactorError::UnknownVariable(var.node().id()));
        }
        if value >= var.domain_size() {
            return Err(FactorError::ValueOutOfDomain {
                value,
                domain_size: var.domain_size(),
            });
        }
        Ok(())
    }

    /// Commits a new value for a registered variable.
    pub fn set(&mut self, var: DiscreteVariable, value: usize) -> Result<(), FactorError> {
        self.check(var, value)?;
        self.state.set(var, value);
        Ok(())
    }

    pub fn state(&self) -> &Assignment {
        &self.state
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterStore {
        &mut self.parameters
    }

    /// Splits the model so a factor can read values while updating parameters.
    pub fn state_and_parameters_mut(&mut self) -> (&Assignment, &mut ParameterStore) {
        (&self.state, &mut self.parameters)
    }

    /// Total log score of the current state.
    pub fn score(&self) -> f64 {
        self.factors
            .iter()
            .map(|factor| factor.current_score(self))
            .sum()
    }
}
