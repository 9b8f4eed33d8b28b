pub mod error;
pub mod image;
pub mod layout;
pub mod mapper;
pub mod ports;
pub mod service;
pub mod store;
pub mod subscription;
