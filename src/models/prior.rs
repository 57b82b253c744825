use crate::assignment::Assignment;
use crate::errors::FactorError;
use crate::factor::{Factor, FactorClass, FactorIdentity, GateRole, PriorFactor, Statistics};
use crate::pgm::{DiscreteVariable, ProportionsVariable};
use crate::proportions::{ParameterStore, Proportions};

/// Factor scoring a discrete variable against a single probability vector.
pub struct DiscretePriorFactor {
    identity: FactorIdentity,
    gate: DiscreteVariable,
    proportions: ProportionsVariable,
}

impl DiscretePriorFactor {
    pub const CLASS: FactorClass = FactorClass::new("discrete-prior");

    pub fn new(gate: DiscreteVariable, proportions: ProportionsVariable) -> Self {
        Self {
            identity: FactorIdentity::new(Self::CLASS, vec![gate.into(), proportions.into()]),
            gate,
            proportions,
        }
    }

    pub fn proportions(&self) -> ProportionsVariable {
        self.proportions
    }
}

impl Factor for DiscretePriorFactor {
    fn identity(&self) -> &FactorIdentity {
        &self.identity
    }

    fn score(&self, values: &Assignment, parameters: &ParameterStore) -> f64 {
        self.component_probability(parameters, values.value(self.gate)).ln()
    }

    fn validate(&self, parameters: &ParameterStore) -> Result<(), FactorError> {
        let len = parameters[self.proportions.node()].len();
        if len != self.gate.domain_size() {
            return Err(FactorError::ShapeMismatch(format!(
                "prior has {} outcomes but gate domain has {}",
                len,
                self.gate.domain_size()
            )));
        }
        Ok(())
    }

    fn statistics(&self) -> Option<&dyn Statistics> {
        Some(self)
    }

    fn gate_role(&self) -> Option<GateRole<'_>> {
        Some(GateRole::Prior(self))
    }
}

impl Statistics for DiscretePriorFactor {
    /// One-hot indicator of the gate value.
    fn statistics(&self, values: &Assignment) -> Vec<f64> {
        let mut stats = vec![0.0; self.gate.domain_size()];
        stats[values.value(self.gate)] = 1.0;
        stats
    }
}

impl PriorFactor for DiscretePriorFactor {
    fn gate(&self) -> DiscreteVariable {
        self.gate
    }

    fn component_probability(&self, parameters: &ParameterStore, index: usize) -> f64 {
        parameters[self.proportions.node()].probability_at(index)
    }
}
