//! Acquisition pipeline for award-flight availability.
//!
//! Periodically polls an airline loyalty program's availability endpoint,
//! normalizes its dictionary-encoded responses into stable flight records,
//! and hands them to an idempotent persistence delegate. Session lifecycle
//! (cookie expiry detection and browser-automated re-login) is managed
//! internally; storage and scheduling are external collaborators reached
//! through narrow capability traits.

pub mod api;
pub mod error;
pub mod login;
pub mod model;
pub mod normalize;
pub mod scan;
pub mod session;
pub mod store;

pub use error::{Error, Result};
pub use model::{AirportRef, CodeName, FlightAward, FlightSegment, Layover, ReferenceEntries};
pub use scan::{ScanConfig, Scanner};
