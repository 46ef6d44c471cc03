pub mod client;
pub mod sim;
pub mod transport;
