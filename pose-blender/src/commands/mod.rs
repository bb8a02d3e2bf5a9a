//! Command implementations

pub mod blend;
pub mod flip_name;
pub mod inspect;
