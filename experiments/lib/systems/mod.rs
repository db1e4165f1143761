//! Collection of pre-defined systems.

pub mod cavity_transmon;
