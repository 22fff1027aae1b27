pub mod sync;
#[cfg(feature = "visualization")]
pub mod viewer;
