pub mod data;
pub(crate) mod error;
pub mod nn;
pub mod prelude;
pub(crate) mod rep3;
#[cfg(test)]
pub(crate) mod tests;
pub(crate) mod traits;
pub(crate) mod types;
