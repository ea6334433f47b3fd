//! Dispatcher integration tests.
//!
//! These tests drive the public [`iap_dispatch::Dispatcher`] API against a
//! registry of in-process storefront engines.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod harness;
mod invocation_styles;
