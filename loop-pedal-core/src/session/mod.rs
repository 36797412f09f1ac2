pub mod controller;
pub mod stream_slots;

#[cfg(test)]
mod scenario_tests;
