//! # rc_drive
//!
//! Open-loop actuation for a remotely driven vehicle.
//!
//! Command source (multicast datagram or joystick) → ingestion thread → shared
//! command state → fixed-period control loop → mappers → actuator port.
//!
//! Only the freshest steering intent matters: commands are overwritten in place,
//! never queued.

pub mod ingestion;
pub mod actuation;
pub mod utils;
