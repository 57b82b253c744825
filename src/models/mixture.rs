use crate::assignment::Assignment;
use crate::errors::FactorError;
use crate::factor::{
    Factor, FactorClass, FactorIdentity, GateRole, MixtureLikelihood, Statistics,
};
use crate::pgm::{DiscreteVariable, Neighbor, ProportionsVariable};
use crate::proportions::{ParameterStore, Proportions};
use rand::RngCore;

/// A categorical child drawn from the component a gate selects.
///
/// Neighbours are `(child, components, gate)`, where the components form a
/// single collection position. The proportions themselves live in a
/// `ParameterStore` passed to every operation that reads or updates them.
pub struct MixtureFactor {
    identity: FactorIdentity,
    child: DiscreteVariable,
    components: Vec<ProportionsVariable>,
    gate: DiscreteVariable,
}

impl MixtureFactor {
    pub const CLASS: FactorClass = FactorClass::new("mixture");

    /// Panics unless there is one component per gate value.
    pub fn new(
        child: DiscreteVariable,
        components: Vec<ProportionsVariable>,
        gate: DiscreteVariable,
    ) -> Self {
        if components.len() != gate.domain_size() {
            panic!(
                "Mixture needs one component per gate value ({} vs {})",
                components.len(),
                gate.domain_size()
            );
        }
        let neighbors = vec![
            child.into(),
            Neighbor::collection(components.iter().copied()),
            gate.into(),
        ];
        Self {
            identity: FactorIdentity::new(Self::CLASS, neighbors),
            child,
            components,
            gate,
        }
    }

    /// Returns the categorical variable the mixture generates.
    pub fn child(&self) -> DiscreteVariable {
        self.child
    }

    /// Returns the variable selecting the active component.
    pub fn gate(&self) -> DiscreteVariable {
        self.gate
    }

    /// Returns the component proportions, one per gate value.
    pub fn components(&self) -> &[ProportionsVariable] {
        &self.components
    }

    /// Likelihood of outcome `x` under the component selected by `z`.
    pub fn probability(&self, parameters: &ParameterStore, x: usize, z: usize) -> f64 {
        parameters[self.components[z].node()].probability_at(x)
    }

    /// Draws a child outcome from the component selected by `z`.
    pub fn sample(&self, parameters: &ParameterStore, z: usize, rng: &mut dyn RngCore) -> usize {
        parameters[self.components[z].node()].sample_index(rng)
    }

    /// Likelihood of the current child value if the gate chose
    /// `mixture_index`.
    pub fn probability_choosing(
        &self,
        values: &Assignment,
        parameters: &ParameterStore,
        mixture_index: usize,
    ) -> f64 {
        self.probability(parameters, values.value(self.child), mixture_index)
    }

    /// Adds `weight` to the mass of the current child value in the
    /// component the gate currently selects.
    ///
    /// Fails without touching anything if that component cannot accumulate.
    pub fn collapsed_update(
        &self,
        values: &Assignment,
        parameters: &mut ParameterStore,
        weight: f64,
    ) -> Result<(), FactorError> {
        let component = self.components[values.value(self.gate)].node();
        let x = values.value(self.child);
        let proportions = parameters
            .get_mut(component)
            .ok_or(FactorError::UnknownParameter(component.id()))?;
        let accumulator = proportions
            .as_accumulator_mut()
            .ok_or(FactorError::MissingAccumulator(component.id()))?;
        accumulator.increment_mass(x, weight);
        log::trace!(
            "collapsed update: component {} outcome {} += {}",
            component.id(),
            x,
            weight
        );
        Ok(())
    }
}

impl Factor for MixtureFactor {
    fn identity(&self) -> &FactorIdentity {
        &self.identity
    }

    fn score(&self, values: &Assignment, parameters: &ParameterStore) -> f64 {
        self.probability(parameters, values.value(self.child), values.value(self.gate))
            .ln()
    }

    fn validate(&self, parameters: &ParameterStore) -> Result<(), FactorError> {
        for component in &self.components {
            let len = parameters[component.node()].len();
            if len != self.child.domain_size() {
                return Err(FactorError::ShapeMismatch(format!(
                    "component has {} outcomes but child domain has {}",
                    len,
                    self.child.domain_size()
                )));
            }
        }
        Ok(())
    }

    fn statistics(&self) -> Option<&dyn Statistics> {
        Some(self)
    }

    fn gate_role(&self) -> Option<GateRole<'_>> {
        Some(GateRole::Mixture(self))
    }
}

impl Statistics for MixtureFactor {
    /// One-hot indicator of `(gate, child)` laid out gate-major.
    fn statistics(&self, values: &Assignment) -> Vec<f64> {
        let width = self.child.domain_size();
        let mut stats = vec![0.0; self.components.len() * width];
        stats[values.value(self.gate) * width + values.value(self.child)] = 1.0;
        stats
    }
}

impl MixtureLikelihood for MixtureFactor {
    fn gate(&self) -> DiscreteVariable {
        self.gate
    }

    fn num_components(&self) -> usize {
        self.components.len()
    }

    fn probability_choosing(
        &self,
        values: &Assignment,
        parameters: &ParameterStore,
        index: usize,
    ) -> f64 {
        MixtureFactor::probability_choosing(self, values, parameters, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::proportions::{DenseProportions, DirichletProportions, MassAccumulator};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    struct Fixture {
        model: Model,
        child: DiscreteVariable,
        gate: DiscreteVariable,
        mixture: Arc<MixtureFactor>,
    }

    fn fixture() -> Fixture {
        let child = DiscreteVariable::new(3);
        let gate = DiscreteVariable::new(2);
        let phi = [ProportionsVariable::new(), ProportionsVariable::new()];
        let mut model = Model::new();
        model.add_variable(child, 2).unwrap();
        model.add_variable(gate, 1).unwrap();
        model.add_parameter(phi[0], DenseProportions::new(vec![0.1, 0.2, 0.7]).unwrap());
        model.add_parameter(phi[1], DenseProportions::new(vec![0.6, 0.3, 0.1]).unwrap());
        let mixture = Arc::new(MixtureFactor::new(child, phi.to_vec(), gate));
        model.add_factor(mixture.clone()).unwrap();
        Fixture {
            model,
            child,
            gate,
            mixture,
        }
    }

    #[test]
    fn probability_reads_selected_component() {
        let f = fixture();
        let params = f.model.parameters();
        assert!(close(f.mixture.probability(params, 2, 0), 0.7));
        assert!(close(f.mixture.probability(params, 0, 1), 0.6));
    }

    #[test]
    fn probability_choosing_ignores_gate_value() {
        let f = fixture();
        let (state, params) = (f.model.state(), f.model.parameters());
        assert!(close(f.mixture.probability_choosing(state, params, 0), 0.7));
        assert!(close(f.mixture.probability_choosing(state, params, 1), 0.1));
        assert_eq!(f.model.value(f.gate), 1);
    }

    #[test]
    fn score_and_statistics_follow_current_values() {
        let f = fixture();
        assert!(close(f.mixture.current_score(&f.model), 0.1f64.ln()));
        let stats = f.mixture.current_statistics(&f.model).unwrap();
        assert_eq!(stats.len(), 6);
        assert_eq!(stats[5], 1.0);
        assert_eq!(stats.iter().sum::<f64>(), 1.0);

        let hypothetical = Assignment::from_pairs([(f.gate, 0)]);
        assert!(close(
            f.mixture.assignment_score(&f.model, &hypothetical),
            0.7f64.ln()
        ));
        assert_eq!(f.model.value(f.child), 2);
    }

    #[test]
    fn sample_draws_from_selected_component() {
        let child = DiscreteVariable::new(3);
        let gate = DiscreteVariable::new(2);
        let phi = [ProportionsVariable::new(), ProportionsVariable::new()];
        let mut params = ParameterStore::new();
        params.insert(phi[0], DenseProportions::new(vec![1.0, 0.0, 0.0]).unwrap());
        params.insert(phi[1], DenseProportions::new(vec![0.0, 0.0, 1.0]).unwrap());
        let mixture = MixtureFactor::new(child, phi.to_vec(), gate);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(mixture.sample(&params, 0, &mut rng), 0);
            assert_eq!(mixture.sample(&params, 1, &mut rng), 2);
        }
    }

    #[test]
    fn collapsed_update_targets_current_component() {
        let child = DiscreteVariable::new(3);
        let gate = DiscreteVariable::new(2);
        let phi = [ProportionsVariable::new(), ProportionsVariable::new()];
        let mut model = Model::new();
        model.add_variable(child, 1).unwrap();
        model.add_variable(gate, 1).unwrap();
        for p in phi {
            model.add_parameter(p, DirichletProportions::new(3, 0.5).unwrap());
        }
        let mixture = Arc::new(MixtureFactor::new(child, phi.to_vec(), gate));
        model.add_factor(mixture.clone()).unwrap();

        let (state, params) = model.state_and_parameters_mut();
        mixture.collapsed_update(state, params, 1.0).unwrap();

        let updated = model.parameters_mut().get_mut(phi[1]).unwrap();
        let masses = updated.as_accumulator_mut().unwrap();
        assert_eq!(masses.mass_at(1), 1.0);
        assert_eq!(masses.mass_total(), 1.0);
        let untouched = model.parameters_mut().get_mut(phi[0]).unwrap();
        assert_eq!(untouched.as_accumulator_mut().unwrap().mass_total(), 0.0);
    }

    #[test]
    fn collapsed_update_requires_accumulator() {
        let mut f = fixture();
        let component = f.mixture.components()[1].node().id();
        let (state, params) = f.model.state_and_parameters_mut();
        let err = f.mixture.collapsed_update(state, params, 1.0).unwrap_err();
        assert_eq!(err, FactorError::MissingAccumulator(component));
    }

    #[test]
    fn equal_component_lists_dedupe() {
        let mut f = fixture();
        let duplicate = MixtureFactor::new(f.child, f.mixture.components().to_vec(), f.gate);
        assert!(!f.model.add_factor(Arc::new(duplicate)).unwrap());
    }

    #[test]
    #[should_panic]
    fn component_count_must_match_gate() {
        let child = DiscreteVariable::new(3);
        let gate = DiscreteVariable::new(3);
        let _ = MixtureFactor::new(child, vec![ProportionsVariable::new()], gate);
    }
}
