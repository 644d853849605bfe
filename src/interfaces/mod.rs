//! Outer surfaces: the CSV cut-script format read by the binary and the
//! routing-table dump it prints.

pub mod csv;
