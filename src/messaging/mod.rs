// src/messaging/mod.rs
// Broker-independent messaging abstractions

pub mod error;
pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use error::{ErrorKind, PublishError, Result};
pub use types::{
    BrokerAddress, DeclaredQueue, HeaderValue, Headers, MessageProperties,
    MessagePropertiesBuilder, OutgoingMessage, QueueDeclaration, DEFAULT_EXCHANGE,
};

/// Opens connections to a message broker.
#[async_trait]
pub trait Broker: Send + Sync {
    type Connection: BrokerConnection;

    async fn connect(&self, address: &BrokerAddress) -> Result<Self::Connection>;
}

/// An open broker connection.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    type Channel: BrokerChannel;

    async fn open_channel(&self) -> Result<Self::Channel>;

    /// Releases the connection. Consumes the handle so it cannot be reused.
    async fn close(self) -> Result<()>;
}

/// A channel opened on a [`BrokerConnection`].
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    async fn declare_queue(&self, declaration: &QueueDeclaration) -> Result<DeclaredQueue>;

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: &OutgoingMessage,
    ) -> Result<()>;

    async fn close(self) -> Result<()>;
}
