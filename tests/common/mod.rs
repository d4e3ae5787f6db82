//! Shared helpers for the cross-crate tests

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;
