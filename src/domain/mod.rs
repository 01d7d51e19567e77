// Domain layer: shared models and ports (interfaces) used by both the client and server halves.

pub mod model;
pub mod ports;
