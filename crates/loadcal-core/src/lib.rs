//! Core types and engine for the load calendar.
//!
//! Capacity resolution, load aggregation, heatmap building and overload
//! detection all run against the [`store::LoadStore`] trait. This crate has
//! no HTTP or database dependencies.

#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod alert;
pub mod assign;
pub mod calendar;
pub mod capacity;
pub mod directory;
pub mod entity;
pub mod error;
pub mod heat;
pub mod heatmap;
pub mod load;
pub mod store;

pub use error::{Error, Result};
