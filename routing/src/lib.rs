pub mod algorithms;
pub mod optimize;
pub mod paretoset;
pub mod path;
pub mod raptor;
pub mod transfers;
pub mod transit;
