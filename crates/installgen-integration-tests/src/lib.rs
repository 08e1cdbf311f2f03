/// Host crate for the end-to-end loader tests.
///
/// `build.rs` runs installgen over this package and its path dependencies;
/// [`wiring::Loader::load_all`] is the generated result.

pub mod container;
pub mod wiring;
