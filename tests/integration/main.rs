//! Integration tests: full tournaments driven through the public API.

mod scripted_policy;
mod simulation;
