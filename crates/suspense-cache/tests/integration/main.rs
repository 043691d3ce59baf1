// See <https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html>

pub mod components;
pub mod failures;
pub mod utils;

pub use utils::*;
