pub mod generation;
pub mod options;
pub mod output;
pub mod selection;

pub use generation::*;
pub use options::{catalog, OptionCatalog};
pub use output::*;
pub use selection::*;
