//! Value types shared between the simulator client and its front ends.

pub mod domain;
pub mod error;
pub mod protocol;
