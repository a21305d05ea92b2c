//! Keyed hashing shared by the commitment, share, seal and identity layers.

#![forbid(unsafe_code)]

pub mod kmac;
