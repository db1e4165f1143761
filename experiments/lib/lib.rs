#![allow(dead_code, non_snake_case, non_upper_case_globals)]

pub mod systems;
