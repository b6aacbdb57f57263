// src/services/mod.rs

pub mod identity;
pub mod catalog;    // service lifecycle, developer authorization
pub mod index;      // composite-key projections + pagination
pub mod mashup;     // incentive payouts happen here
pub mod calltime;
pub mod reward;

pub use catalog::{NewService, ServiceEdit};
pub use index::Page;
pub use mashup::NewMashup;
