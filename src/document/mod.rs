//! Document model and parser.
//!
//! - [`model`] - Definitions, tests, objects, states and criteria trees
//! - [`parse`](mod@parse) - Turns raw bytes into a [`Document`]

pub mod model;
pub mod parse;

pub use model::{
    CriteriaNode, CriteriaOperator, Definition, Document, FileLocator, Metadata, Object,
    ObjectLocator, RegistryLocator, State, StateEntity, Test,
};
pub use parse::parse;
