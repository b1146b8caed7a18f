//! Binary-format adapters for the [`crate::core::layout::BinaryLayout`] seam.

pub mod object;
