#![allow(dead_code, non_snake_case, non_upper_case_globals)]

pub use ndarray_npy;

pub mod utils;
pub mod error;
pub mod hilbert;
pub mod dynamics;
pub mod cost;
pub mod schrodinger;
pub mod grape;
pub mod saves;
