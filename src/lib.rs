//! Factor identity, sparse mixture counts and exact gate maximization for
//! factor-graph mixture models.

pub mod assignment;
pub mod counts;
pub mod errors;
pub mod factor;
pub mod gate;
pub mod model;
pub mod models;
pub mod pgm;
pub mod proportions;
pub mod values;

pub use assignment::Assignment;
pub use counts::{CountEntry, MixtureCountStore, SparseCountTable};
pub use errors::{FactorError, InferenceError};
pub use factor::{
    Factor, FactorClass, FactorIdentity, GateRole, MixtureLikelihood, PriorFactor, Statistics,
    same_factor,
};
pub use gate::{GateAssignment, GateMaximizer};
pub use model::Model;
pub use models::mixture::MixtureFactor;
pub use models::prior::DiscretePriorFactor;
pub use pgm::{DiscreteVariable, Neighbor, Node, NodeKind, ProportionsVariable};
pub use proportions::{
    DenseProportions, DirichletProportions, MassAccumulator, ParameterStore, Proportions,
};
pub use values::{ValuesIterator, ValuesStep};
