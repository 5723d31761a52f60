// Ingestion: input side of the vehicle.
// Pulls commands from a network or device source and publishes the latest
// (speed, angle) pair into the shared command state.

pub mod command;
pub mod command_state;
pub mod source;
pub mod multicast;
pub mod joystick;
pub mod task;
