//! rendition-core — Pure types and audio/text helpers.
//!
//! No async runtime, no I/O, no platform dependencies.

pub mod pcm;
pub mod text_prep;
pub mod types;
pub mod validate;
pub mod wav;
