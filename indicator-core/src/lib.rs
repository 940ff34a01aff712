#![no_std]

// Shared logic for the charging indicator feature set.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and exposing abstractions the other crates can adopt.

pub mod buttons;
pub mod clock;
pub mod events;
pub mod machine;
pub mod stages;
