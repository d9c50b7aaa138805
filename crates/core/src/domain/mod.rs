pub mod client;
pub mod contract;
pub mod invoice;
pub mod project;
pub mod user;
