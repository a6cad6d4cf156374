//! Outward-facing API.
//!
//! Everything external callers may do to a document goes through here.
//! Collaborators never reach into the block manager directly.

mod blocks;

pub use blocks::BlocksApi;
