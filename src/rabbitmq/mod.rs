// src/rabbitmq/mod.rs
// RabbitMQ implementation for our messaging abstractions

pub mod channel;
pub mod connection;

pub use channel::RabbitMqChannel;
pub use connection::{RabbitMqBroker, RabbitMqConnection};
