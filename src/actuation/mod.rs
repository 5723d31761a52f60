// Actuation: output side of the vehicle.
// Fixed-period control loop, raw-to-actuator mappers and the actuator port.

pub mod port;
pub mod mapping;
pub mod control_loop;
#[cfg(feature = "gpio")]
pub mod gpio;
