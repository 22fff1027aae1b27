pub mod states;
pub mod params;
pub mod kernel;
pub mod backend;
pub mod scenario;
pub mod engine;
