// Domain layer: pipeline payloads and the ports the handlers are written against.

pub mod model;
pub mod ports;
