//! Phenotype terms: trait modules derived from ICD-10 code lists.

pub mod traits;

pub use traits::{TRAIT_MODULES_COLUMN, TraitModuleSpec, TraitModules, create_trait_modules};
