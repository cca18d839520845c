//! Byelinear Linear - source side of the migration
//!
//! Walks every issue in a Linear workspace newest-first over the GraphQL
//! API, enriching each one with its relationships before handing the page to
//! the migration driver.

mod client;
mod error;
mod pages;
mod relations;

pub use client::{LinearClient, LINEAR_ENDPOINT};
pub use error::{Error, Result};
