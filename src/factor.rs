use crate::assignment::Assignment;
use crate::errors::FactorError;
use crate::model::Model;
use crate::pgm::{DiscreteVariable, Neighbor};
use crate::proportions::ParameterStore;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::OnceLock;

/// Token naming the structural shape of a factor.
///
/// Two factors can only be equal when their classes are equal, so every
/// concrete factor type must use a distinct name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FactorClass(&'static str);

impl FactorClass {
    /// Creates a class token from a name unique to one factor type.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the class name.
    pub fn name(self) -> &'static str {
        self.0
    }

    fn token_hash(self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        hasher.finish()
    }
}

/// The ordered, immutable neighbour list of a factor plus its cached hash.
///
/// Neighbours cannot be changed after construction, which is what makes
/// caching the hash on first use sound.
pub struct FactorIdentity {
    class: FactorClass,
    neighbors: Box<[Neighbor]>,
    hash: OnceLock<u64>,
}

impl FactorIdentity {
    pub fn new(class: FactorClass, neighbors: Vec<Neighbor>) -> Self {
        Self {
            class,
            neighbors: neighbors.into_boxed_slice(),
            hash: OnceLock::new(),
        }
    }

    pub fn class(&self) -> FactorClass {
        self.class
    }

    pub fn neighbors(&self) -> &[Neighbor] {
        &self.neighbors
    }

    /// `class + Σ (31 * i + hash(neighbor_i))`, computed once.
    pub fn hash_code(&self) -> u64 {
        *self.hash.get_or_init(|| {
            self.neighbors
                .iter()
                .enumerate()
                .fold(self.class.token_hash(), |acc, (i, neighbor)| {
                    acc.wrapping_add(
                        (31u64.wrapping_mul(i as u64)).wrapping_add(neighbor.identity_hash()),
                    )
                })
        })
    }

    /// Whether the hash has been computed yet.
    pub fn is_hashed(&self) -> bool {
        self.hash.get().is_some()
    }
}

impl fmt::Debug for FactorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactorIdentity")
            .field("class", &self.class.name())
            .field("neighbors", &self.neighbors)
            .finish()
    }
}

/// Sufficient-statistics representation of a factor's configuration.
pub trait Statistics {
    fn statistics(&self, values: &Assignment) -> Vec<f64>;
}

/// A factor that scores its gate variable alone.
pub trait PriorFactor {
    fn gate(&self) -> DiscreteVariable;
    fn component_probability(&self, parameters: &ParameterStore, index: usize) -> f64;
}

/// A factor whose likelihood depends on which mixture component a gate selects.
pub trait MixtureLikelihood {
    fn gate(&self) -> DiscreteVariable;
    fn num_components(&self) -> usize;

    /// Likelihood of the current child value under component `index`,
    /// regardless of the gate's current value.
    fn probability_choosing(
        &self,
        values: &Assignment,
        parameters: &ParameterStore,
        index: usize,
    ) -> f64;
}

/// The part a factor can play in a gate's neighbourhood.
#[derive(Clone, Copy)]
pub enum GateRole<'a> {
    Prior(&'a dyn PriorFactor),
    Mixture(&'a dyn MixtureLikelihood),
}

/// Base trait for factors: a score over a fixed, ordered set of neighbours.
pub trait Factor {
    fn identity(&self) -> &FactorIdentity;

    /// Log score of the configuration given by `values`.
    fn score(&self, values: &Assignment, parameters: &ParameterStore) -> f64;

    /// Checks the factor's shape against the proportions it reads.
    fn validate(&self, _parameters: &ParameterStore) -> Result<(), FactorError> {
        Ok(())
    }

    fn statistics(&self) -> Option<&dyn Statistics> {
        None
    }

    fn gate_role(&self) -> Option<GateRole<'_>> {
        None
    }

    fn class(&self) -> FactorClass {
        self.identity().class()
    }

    fn variables(&self) -> &[Neighbor] {
        self.identity().neighbors()
    }

    fn num_variables(&self) -> usize {
        self.variables().len()
    }

    fn variable(&self, index: usize) -> &Neighbor {
        &self.variables()[index]
    }

    fn current_score(&self, model: &Model) -> f64 {
        self.score(model.state(), model.parameters())
    }

    /// Scores `assignment` on top of the model's current values without
    /// committing anything.
    fn assignment_score(&self, model: &Model, assignment: &Assignment) -> f64 {
        self.score(&model.state().overlaid(assignment), model.parameters())
    }

    fn current_statistics(&self, model: &Model) -> Result<Vec<f64>, FactorError> {
        match self.statistics() {
            Some(stats) => Ok(stats.statistics(model.state())),
            None => Err(FactorError::UnsupportedStatistics(self.class().name())),
        }
    }

    fn assignment_statistics(
        &self,
        model: &Model,
        assignment: &Assignment,
    ) -> Result<Vec<f64>, FactorError> {
        match self.statistics() {
            Some(stats) => Ok(stats.statistics(&model.state().overlaid(assignment))),
            None => Err(FactorError::UnsupportedStatistics(self.class().name())),
        }
    }
}

/// Structural equality: same instance, or same class, same hash and
/// position-by-position equal neighbours.
pub fn same_factor(a: &dyn Factor, b: &dyn Factor) -> bool {
    if std::ptr::addr_eq(a, b) {
        return true;
    }
    let (left, right) = (a.identity(), b.identity());
    left.class() == right.class()
        && left.hash_code() == right.hash_code()
        && left.neighbors().len() == right.neighbors().len()
        && left
            .neighbors()
            .iter()
            .zip(right.neighbors().iter())
            .all(|(l, r)| l == r)
}

impl PartialEq for dyn Factor + '_ {
    fn eq(&self, other: &Self) -> bool {
        same_factor(self, other)
    }
}

impl Eq for dyn Factor + '_ {}

impl Hash for dyn Factor + '_ {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.identity().hash_code());
    }
}

impl fmt::Debug for dyn Factor + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.class().name(), self.variables())
    }
}
