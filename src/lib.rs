//! Electricity bills from declarative tariffs.
//!
//! A [`catalog::Catalog`] holds the tariff definitions.  One billing
//! period is priced with [`engine::evaluate`], a year of consumption is
//! ranked across tariffs with [`annual::compare_catalog`], and
//! [`api::router`] puts both behind HTTP.

pub mod annual;
pub mod api;
pub mod catalog;
pub mod config;
pub mod energy;
pub mod engine;
pub mod error;
pub mod format;
pub mod models;
pub mod power;
pub mod reactive;
pub mod tax;
