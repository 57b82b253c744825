use mixgate::{
    DenseProportions, DirichletProportions, DiscretePriorFactor, DiscreteVariable, Factor,
    GateMaximizer, InferenceError, MixtureFactor, Model, ProportionsVariable,
};
use proptest::prelude::*;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Gated {
    child: DiscreteVariable,
    gate: DiscreteVariable,
    mixture: Arc<MixtureFactor>,
}

/// Adds a child/gate pair with its prior and mixture factor to `model`.
fn add_gated(
    model: &mut Model,
    prior: Vec<f64>,
    components: &[Vec<f64>],
    child_value: usize,
) -> Gated {
    let child = DiscreteVariable::new(components[0].len());
    let gate = DiscreteVariable::new(components.len());
    let theta = ProportionsVariable::new();
    let phi: Vec<_> = components.iter().map(|_| ProportionsVariable::new()).collect();
    model.add_variable(child, child_value).unwrap();
    model.add_variable(gate, 0).unwrap();
    model.add_parameter(theta, DenseProportions::new(prior).unwrap());
    for (var, weights) in phi.iter().zip(components) {
        model.add_parameter(*var, DenseProportions::new(weights.clone()).unwrap());
    }
    let mixture = Arc::new(MixtureFactor::new(child, phi, gate));
    model.add_factor(mixture.clone()).unwrap();
    model
        .add_factor(Arc::new(DiscretePriorFactor::new(gate, theta)))
        .unwrap();
    Gated {
        child,
        gate,
        mixture,
    }
}

#[test]
fn worked_example_selects_first_component() {
    init_logging();
    let mut model = Model::new();
    let g = add_gated(
        &mut model,
        vec![0.5, 0.5],
        &[vec![0.1, 0.2, 0.7], vec![0.6, 0.3, 0.1]],
        2,
    );
    let (state, params) = (model.state(), model.parameters());
    assert!((g.mixture.probability_choosing(state, params, 0) - 0.7).abs() < 1e-12);
    assert!((g.mixture.probability_choosing(state, params, 1) - 0.1).abs() < 1e-12);
    assert_eq!(model.value(g.child), 2);

    assert_eq!(GateMaximizer::max_index(g.gate, &model), Ok(0));
    model.set(g.gate, 1).unwrap();
    assert_eq!(GateMaximizer::apply(g.gate, &mut model), 0);
    assert_eq!(model.value(g.gate), 0);
}

#[test]
fn extra_neighbour_makes_gate_inapplicable() {
    init_logging();
    let mut model = Model::new();
    let g = add_gated(&mut model, vec![0.5, 0.5], &[vec![0.9, 0.1], vec![0.1, 0.9]], 0);
    let other_child = DiscreteVariable::new(2);
    model.add_variable(other_child, 0).unwrap();
    let extra = MixtureFactor::new(other_child, g.mixture.components().to_vec(), g.gate);
    model.add_factor(Arc::new(extra)).unwrap();

    let err = GateMaximizer::max_index(g.gate, &model).unwrap_err();
    assert!(err.is_not_applicable());
}

#[test]
fn infer_is_all_or_nothing() {
    init_logging();
    let mut model = Model::new();
    let first = add_gated(&mut model, vec![0.2, 0.8], &[vec![0.5, 0.5], vec![0.5, 0.5]], 0);
    let second = add_gated(&mut model, vec![0.9, 0.1], &[vec![0.5, 0.5], vec![0.5, 0.5]], 1);

    let result = GateMaximizer::infer(&[first.gate, second.gate], &model).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result.get(first.gate), Some(1));
    assert_eq!(result.get(second.gate), Some(0));
    assert_eq!(model.value(first.gate), 0);

    result.commit(&mut model).unwrap();
    assert_eq!(model.value(first.gate), 1);

    let orphan = DiscreteVariable::new(2);
    model.add_variable(orphan, 0).unwrap();
    let err = GateMaximizer::infer(&[first.gate, orphan, second.gate], &model).unwrap_err();
    assert!(matches!(err, InferenceError::NotApplicable(_)));
}

#[test]
fn collapsed_updates_shift_the_maximum() {
    init_logging();
    let child = DiscreteVariable::new(2);
    let gate = DiscreteVariable::new(2);
    let theta = ProportionsVariable::new();
    let phi = vec![ProportionsVariable::new(), ProportionsVariable::new()];
    let mut model = Model::new();
    model.add_variable(child, 1).unwrap();
    model.add_variable(gate, 1).unwrap();
    model.add_parameter(theta, DenseProportions::uniform(2).unwrap());
    for p in &phi {
        model.add_parameter(*p, DirichletProportions::new(2, 1.0).unwrap());
    }
    let mixture = Arc::new(MixtureFactor::new(child, phi, gate));
    model.add_factor(mixture.clone()).unwrap();
    model
        .add_factor(Arc::new(DiscretePriorFactor::new(gate, theta)))
        .unwrap();

    // Uniform everywhere: ties resolve to the first index.
    assert_eq!(GateMaximizer::max_index(gate, &model), Ok(0));

    let (state, params) = model.state_and_parameters_mut();
    mixture.collapsed_update(state, params, 3.0).unwrap();
    assert_eq!(GateMaximizer::max_index(gate, &model), Ok(1));
}

fn weights(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01f64..1.0, len)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn max_index_matches_brute_force(
        (prior, components, child_value) in (2usize..6, 2usize..5).prop_flat_map(|(k, v)| {
            (weights(k), prop::collection::vec(weights(v), k), 0..v)
        })
    ) {
        let mut model = Model::new();
        let g = add_gated(&mut model, prior.clone(), &components, child_value);

        let theta = DenseProportions::new(prior).unwrap();
        let mut best = (0, f64::NEG_INFINITY);
        for (i, weights) in components.iter().enumerate() {
            let phi = DenseProportions::new(weights.clone()).unwrap();
            let score = theta.as_slice()[i] * phi.as_slice()[child_value];
            if score > best.1 {
                best = (i, score);
            }
        }
        prop_assert_eq!(GateMaximizer::max_index(g.gate, &model), Ok(best.0));

        // The joint score of the chosen gate value is never beaten.
        GateMaximizer::apply(g.gate, &mut model);
        let chosen = model.score();
        for i in 0..components.len() {
            model.set(g.gate, i).unwrap();
            prop_assert!(model.score() <= chosen + 1e-9);
        }
        prop_assert!(g.mixture.num_variables() == 3);
    }
}
