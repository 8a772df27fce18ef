//! Foreign-language surfaces.
pub mod python;
