pub mod fss;
pub mod network;
