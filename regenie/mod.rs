//! REGENIE set-file formats and the conversions built on them.
//!
//! `io` reads and writes the headerless tab-separated set files and discovers
//! them on disk, `tables` loads the header'd relation tables in an explicitly
//! chosen format, `convert` remaps one chromosome at a time, and `analyze` runs
//! the cross-file integrity diagnostics.

pub mod analyze;
pub mod convert;
pub mod io;
pub mod tables;

pub use io::LoadError;
pub use tables::TableFormat;
