//! # lorica-core
//!
//! Core item model for the lorica probe runtime.
//!
//! Provides the seams the collection cache is built against:
//! - The [`ProbeItem`] trait (content fingerprint, structural equality,
//!   stamp slot)
//! - A concrete [`Record`] item type for probes that produce named records
//! - Content digest helpers (xxh3)
//! - Process-global unique-ID minting
//! - The [`Collector`] destination seam and [`ItemFilter`] predicate seam

pub mod collected;
pub mod fingerprint;
pub mod identity;
pub mod item;

pub use collected::{CollectError, CollectedObject, Collector, ItemFilter};
pub use item::{FieldValue, ProbeItem, Record};
