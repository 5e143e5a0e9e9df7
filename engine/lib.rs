#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
//! Identifier remapping and re-aggregation for REGENIE burden-test inputs.
//!
//! The engine modules (`value`, `table`, `index`, `resolve`, `join`,
//! `duplicates`, `aggregate`) know nothing about files. The `regenie`, `terms`
//! and `config` modules wrap them with the on-disk formats and run settings.

pub mod aggregate;
pub mod duplicates;
pub mod index;
pub mod join;
pub mod resolve;
pub mod table;
pub mod value;

#[path = "../regenie/mod.rs"]
pub mod regenie;

#[path = "../terms/mod.rs"]
pub mod terms;

#[path = "../shared/config.rs"]
pub mod config;
