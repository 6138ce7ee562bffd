//! Tabular export — Polars DataFrames and Parquet files.

pub mod frame;

pub use frame::{dated_frame, portfolio_frame, read_parquet, write_parquet, FrameError};
