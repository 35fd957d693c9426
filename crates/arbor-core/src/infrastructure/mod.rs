//! Infrastructure implementations of domain repositories

pub mod taxonomy;
