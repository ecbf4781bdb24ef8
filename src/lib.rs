pub mod cli;
pub mod config;
pub mod ctx;
pub mod error;
pub mod geneset;
pub mod hvg;
pub mod io;
pub mod math;
pub mod matrix;
pub mod model;
pub mod pipeline;
pub mod qc;
pub mod schema;
