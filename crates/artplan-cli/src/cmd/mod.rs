pub mod config;
pub mod graph;
pub mod iterations;
pub mod plan;
pub mod score;
