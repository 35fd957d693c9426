//! Domain logic for Arbor

pub mod taxonomy;
