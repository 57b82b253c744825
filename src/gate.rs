//! Exact maximization of a mixture gate.
//!
//! A gate whose only neighbours are a prior over the gate and a mixture
//! likelihood can be maximized by scoring every index of its domain.

use crate::errors::{FactorError, InferenceError};
use crate::factor::{GateRole, MixtureLikelihood, PriorFactor};
use crate::model::Model;
use crate::pgm::DiscreteVariable;

/// Gate values chosen by a batched inference, not yet committed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GateAssignment {
    values: Vec<(DiscreteVariable, usize)>,
}

impl GateAssignment {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, gate: DiscreteVariable) -> Option<usize> {
        self.values
            .iter()
            .find(|(var, _)| *var == gate)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(DiscreteVariable, usize)> {
        self.values.iter()
    }

    /// Writes every maximized value into the model.
    ///
    /// Every value is checked before the first write, so a failing commit
    /// leaves the model untouched.
    pub fn commit(&self, model: &mut Model) -> Result<(), InferenceError> {
        let fatal = |err: FactorError| InferenceError::Fatal(err.to_string());
        for (gate, value) in &self.values {
            model.check(*gate, *value).map_err(fatal)?;
        }
        for (gate, value) in &self.values {
            model.set(*gate, *value).map_err(fatal)?;
        }
        Ok(())
    }
}

/// Stateless argmax inference over a gate's two-factor neighbourhood.
pub struct GateMaximizer;

impl GateMaximizer {
    /// Index of the gate value maximizing `prior(i) * likelihood(i)`.
    ///
    /// Returns `NotApplicable` unless the gate touches exactly one prior over
    /// itself and one mixture gated by itself, in either order. A gate the
    /// model has never seen touches no factors and is likewise not applicable.
    pub fn max_index(gate: DiscreteVariable, model: &Model) -> Result<usize, InferenceError> {
        let domain_size = gate.domain_size();
        let (prior, mixture) = Self::neighbourhood(gate, model)?;
        if mixture.num_components() != domain_size {
            return Err(InferenceError::Fatal(format!(
                "mixture has {} components but gate domain has {}",
                mixture.num_components(),
                domain_size
            )));
        }

        let (state, parameters) = (model.state(), model.parameters());
        let mut best_score = f64::NEG_INFINITY;
        let mut best_index = 0;
        for i in 0..domain_size {
            let score = prior.component_probability(parameters, i)
                * mixture.probability_choosing(state, parameters, i);
            log::trace!("gate {} index {} score {}", gate.node().id(), i, score);
            if score > best_score {
                best_score = score;
                best_index = i;
            }
        }
        Ok(best_index)
    }

    /// Maximizes the gate and commits the result to the model.
    ///
    /// Callers of `apply` have already established that the gate's
    /// neighbourhood fits, so any failure here panics.
    pub fn apply(gate: DiscreteVariable, model: &mut Model) -> usize {
        let index = match Self::max_index(gate, model) {
            Ok(index) => index,
            Err(err) => panic!("cannot maximize gate {}: {}", gate.node().id(), err),
        };
        if let Err(err) = model.set(gate, index) {
            panic!("cannot commit gate {}: {}", gate.node().id(), err);
        }
        index
    }

    /// Maximizes every gate, or none: the first failure is returned and no
    /// partial assignment escapes.
    pub fn infer(
        gates: &[DiscreteVariable],
        model: &Model,
    ) -> Result<GateAssignment, InferenceError> {
        let mut values = Vec::with_capacity(gates.len());
        for &gate in gates {
            values.push((gate, Self::max_index(gate, model)?));
        }
        Ok(GateAssignment { values })
    }

    fn neighbourhood(
        gate: DiscreteVariable,
        model: &Model,
    ) -> Result<(&dyn PriorFactor, &dyn MixtureLikelihood), InferenceError> {
        let factors = model.factors_touching(gate);
        if factors.len() != 2 {
            log::debug!(
                "gate {} has {} neighbouring factors, expected 2",
                gate.node().id(),
                factors.len()
            );
            return Err(InferenceError::NotApplicable(format!(
                "gate has {} neighbouring factors, expected 2",
                factors.len()
            )));
        }

        let mut prior = None;
        let mut mixture = None;
        for factor in factors {
            match factor.gate_role() {
                Some(GateRole::Prior(p)) if p.gate() == gate && prior.is_none() => {
                    prior = Some(p)
                }
                Some(GateRole::Mixture(m)) if m.gate() == gate && mixture.is_none() => {
                    mixture = Some(m)
                }
                _ => {}
            }
        }

        match (prior, mixture) {
            (Some(prior), Some(mixture)) => Ok((prior, mixture)),
            _ => {
                log::debug!(
                    "gate {} neighbours are not a prior/mixture pair",
                    gate.node().id()
                );
                Err(InferenceError::NotApplicable(
                    "neighbouring factors are not a prior and a mixture over this gate".into(),
                ))
            }
        }
    }
}
