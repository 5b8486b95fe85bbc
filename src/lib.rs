//! Raster image annotation editor: shapes drawn over a zoomable base image,
//! undo/redo history, and flattened PNG export.

pub mod app;
pub mod canvas;
pub mod clipboard;
pub mod config;
pub mod export;
pub mod geometry;
pub mod hit_test;
pub mod history;
pub mod ingest;
pub mod interaction;
pub mod render;
pub mod session;
pub mod shape;
