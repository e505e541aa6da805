// Integrations with the outside world: camera, inference models and client transport

pub mod capture;
pub mod pose;
pub mod transport;
