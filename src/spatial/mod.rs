//! Spatial partitioning for proximity queries

pub mod grid;

pub use grid::SpatialGrid;
