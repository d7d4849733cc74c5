//! Rental listing backend client for rentwise.
//!
//! Implements `rentwise_core::HouseApi` and `rentwise_core::LandmarkLookup`
//! over HTTP.

pub mod client;

pub use client::HttpRentalClient;
