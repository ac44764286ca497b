//! `hybrid-cg` library crate.
//!
//! Mixed discrete/continuous Bayesian networks: a parametric model (PM) that
//! fixes node kinds, parent partitions and discretization cutpoints; an
//! instantiated model (IM) holding CPTs and linear-Gaussian regressions; a
//! maximum-likelihood estimator; and ancestral sampling.
//!
//! The binary (`hcg`) is a thin wrapper around this library.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
