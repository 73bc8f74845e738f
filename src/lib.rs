pub mod config;
pub mod connector;
pub mod dao;
pub mod filter;
pub mod model;
pub mod observer;
pub mod validate;
