//! Utility modules

pub mod codec;
pub mod image;
