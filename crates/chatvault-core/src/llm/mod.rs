//! Completion provider abstractions.

pub mod box_provider;
pub mod provider;

#[cfg(test)]
pub(crate) mod stub;
