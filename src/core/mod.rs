//! Core data types: library descriptors and the binary-object layout seam.

pub mod descriptor;
pub mod layout;
