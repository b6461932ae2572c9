pub mod errors;
pub mod queries;

pub trait RoutingAlgorithm: Sized {}
