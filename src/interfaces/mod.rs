//! Adapters exposing the central system to the outside world.

pub mod ws;
