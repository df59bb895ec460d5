pub mod generator;
pub mod normalizer;
pub mod runner;
pub mod topics;
