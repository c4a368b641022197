//! Protocol implementations
//!
//! This module contains the command sequences understood by 5 V parallel
//! flash parts.

mod jedec;

pub use jedec::*;
