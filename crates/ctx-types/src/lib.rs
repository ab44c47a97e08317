//! Core types and traits for the Alchemyst context API.
//!
//! Request/response DTOs keep the service's JSON field names exactly, so the
//! same values can be posted by any client implementing [`ContextStore`].

mod dto;
mod traits;

pub use dto::*;
pub use traits::*;
