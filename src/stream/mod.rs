//! Stream combinators for rate control.

mod gate;

pub use gate::{Gate, GateExt, fps_interval};
