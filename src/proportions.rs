use crate::errors::FactorError;
use crate::pgm::{Node, ProportionsVariable};
use rand::{Rng, RngCore};
use std::collections::HashMap;
use std::ops::Index;

/// A probability vector over a finite index range.
pub trait Proportions {
    /// Number of outcomes.
    fn len(&self) -> usize;

    fn probability_at(&self, index: usize) -> f64;

    /// Draws an index by inverting the cumulative distribution.
    fn sample_index(&self, rng: &mut dyn RngCore) -> usize {
        let draw: f64 = rng.random();
        let mut cumulative = 0.0;
        for idx in 0..self.len() {
            cumulative += self.probability_at(idx);
            if draw <= cumulative {
                return idx;
            }
        }
        self.len() - 1
    }

    /// Access to the mass accumulator, for proportions that have one.
    fn as_accumulator_mut(&mut self) -> Option<&mut dyn MassAccumulator> {
        None
    }
}

/// Proportions backed by accumulated masses that collapsed updates can add to.
pub trait MassAccumulator {
    fn increment_mass(&mut self, index: usize, weight: f64);
    fn mass_at(&self, index: usize) -> f64;
    fn mass_total(&self) -> f64;
}

/// Fixed, normalized proportions.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseProportions {
    probabilities: Vec<f64>,
}

impl DenseProportions {
    /// Normalizes `weights` into a probability vector.
    pub fn new(weights: Vec<f64>) -> Result<Self, FactorError> {
        if weights.is_empty() {
            return Err(FactorError::InvalidProportions(
                "proportions need at least one outcome".into(),
            ));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(FactorError::InvalidProportions(
                "weights must be finite and non-negative".into(),
            ));
        }
        let sum: f64 = weights.iter().sum();
        if sum <= 0.0 {
            return Err(FactorError::InvalidProportions(
                "weights must not all be zero".into(),
            ));
        }
        let probabilities = weights.iter().map(|w| w / sum).collect();
        Ok(Self { probabilities })
    }

    /// Uniform proportions over `len` outcomes.
    pub fn uniform(len: usize) -> Result<Self, FactorError> {
        Self::new(vec![1.0; len])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.probabilities
    }
}

impl Proportions for DenseProportions {
    fn len(&self) -> usize {
        self.probabilities.len()
    }

    fn probability_at(&self, index: usize) -> f64 {
        self.probabilities[index]
    }
}

/// Proportions estimated from accumulated masses under a symmetric
/// Dirichlet prior: `p[i] = (m[i] + alpha) / (M + alpha * len)`.
#[derive(Clone, Debug, PartialEq)]
pub struct DirichletProportions {
    alpha: f64,
    masses: Vec<f64>,
    total: f64,
}

impl DirichletProportions {
    pub fn new(len: usize, alpha: f64) -> Result<Self, FactorError> {
        if len == 0 {
            return Err(FactorError::InvalidProportions(
                "proportions need at least one outcome".into(),
            ));
        }
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(FactorError::InvalidProportions(format!(
                "Dirichlet alpha must be positive, got {}",
                alpha
            )));
        }
        Ok(Self {
            alpha,
            masses: vec![0.0; len],
            total: 0.0,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Proportions for DirichletProportions {
    fn len(&self) -> usize {
        self.masses.len()
    }

    fn probability_at(&self, index: usize) -> f64 {
        let denom = self.total + self.alpha * self.masses.len() as f64;
        (self.masses[index] + self.alpha) / denom
    }

    fn as_accumulator_mut(&mut self) -> Option<&mut dyn MassAccumulator> {
        Some(self)
    }
}

impl MassAccumulator for DirichletProportions {
    fn increment_mass(&mut self, index: usize, weight: f64) {
        let updated = self.masses[index] + weight;
        assert!(
            updated >= 0.0,
            "mass at {} would become negative ({})",
            index,
            updated
        );
        self.masses[index] = updated;
        self.total += weight;
    }

    fn mass_at(&self, index: usize) -> f64 {
        self.masses[index]
    }

    fn mass_total(&self) -> f64 {
        self.total
    }
}

/// Externally owned proportions, keyed by their variable.
///
/// Factors hold only `ProportionsVariable` handles; every operation that
/// reads or updates component parameters receives the store explicitly.
#[derive(Default)]
pub struct ParameterStore {
    entries: HashMap<Node, Box<dyn Proportions>>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P>(&mut self, var: ProportionsVariable, proportions: P)
    where
        P: Proportions + 'static,
    {
        self.entries.insert(var.node(), Box::new(proportions));
    }

    pub fn get(&self, node: impl Into<Node>) -> Option<&dyn Proportions> {
        self.entries.get(&node.into()).map(|p| p.as_ref())
    }

    pub fn get_mut(&mut self, node: impl Into<Node>) -> Option<&mut (dyn Proportions + 'static)> {
        self.entries.get_mut(&node.into()).map(|p| p.as_mut())
    }

    pub fn contains(&self, node: impl Into<Node>) -> bool {
        self.entries.contains_key(&node.into())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Index<Node> for ParameterStore {
    type Output = dyn Proportions;

    fn index(&self, node: Node) -> &Self::Output {
        match self.entries.get(&node) {
            Some(proportions) => proportions.as_ref(),
            None => panic!("missing proportions for node {}", node.id()),
        }
    }
}
