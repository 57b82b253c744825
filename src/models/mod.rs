pub mod mixture;
pub mod prior;

pub use mixture::*;
pub use prior::*;
