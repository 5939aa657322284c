//! Wire format codecs.
//!
//! # Responsibility
//! - `rest`: structured per-entity JSON served by the HTTP handlers.
//! - `record`: generic native-record <-> flat-object transcoder used for
//!   dump/load interchange.
//!
//! # Invariants
//! - The two shapes never mix on one surface: HTTP speaks `rest` only.
//! - Shape choices (listing vs detail, single vs many) are explicit enum
//!   arguments, never inferred from runtime input.

pub mod record;
pub mod rest;

/// Depth of an encoded entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation<R> {
    /// Id and scalar fields only; used by collection endpoints.
    Listing,
    /// Scalar fields plus embedded related collections `R`.
    Detail(R),
}
