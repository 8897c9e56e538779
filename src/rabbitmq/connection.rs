// src/rabbitmq/connection.rs
use async_trait::async_trait;
use lapin::{Connection, ConnectionProperties};
use tracing::{debug, error, info};

use super::channel::RabbitMqChannel;
use crate::messaging::{Broker, BrokerAddress, BrokerConnection, PublishError, Result};

/// Opens lapin connections, announcing `connection_name` to the broker.
pub struct RabbitMqBroker {
    connection_name: String,
}

impl RabbitMqBroker {
    pub fn new(connection_name: impl Into<String>) -> Self {
        Self {
            connection_name: connection_name.into(),
        }
    }
}

#[async_trait]
impl Broker for RabbitMqBroker {
    type Connection = RabbitMqConnection;

    async fn connect(&self, address: &BrokerAddress) -> Result<RabbitMqConnection> {
        info!(
            host = address.host(),
            port = address.port(),
            vhost = address.vhost(),
            "Connecting to RabbitMQ"
        );

        let properties = ConnectionProperties::default()
            .with_connection_name(self.connection_name.clone().into());

        let connection = Connection::connect_uri(address.uri().clone(), properties)
            .await
            .map_err(|e| {
                error!(error = %e, broker = %address, "Failed to connect to RabbitMQ");
                PublishError::ConnectionError(e.to_string())
            })?;

        info!(broker = %address, "Successfully connected to RabbitMQ");

        Ok(RabbitMqConnection {
            connection,
            broker: address.to_string(),
        })
    }
}

pub struct RabbitMqConnection {
    connection: Connection,
    broker: String,
}

impl RabbitMqConnection {
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }
}

#[async_trait]
impl BrokerConnection for RabbitMqConnection {
    type Channel = RabbitMqChannel;

    async fn open_channel(&self) -> Result<RabbitMqChannel> {
        let channel = self.connection.create_channel().await.map_err(|e| {
            error!(error = %e, broker = %self.broker, "Failed to create RabbitMQ channel");
            PublishError::ChannelError(e.to_string())
        })?;

        debug!(channel_id = channel.id(), "Channel created");
        Ok(RabbitMqChannel::new(channel))
    }

    async fn close(self) -> Result<()> {
        if !self.is_connected() {
            debug!(broker = %self.broker, "Connection already closed");
            return Ok(());
        }

        info!(broker = %self.broker, "Closing RabbitMQ connection");
        self.connection
            .close(200, "Normal shutdown")
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to close RabbitMQ connection gracefully");
                PublishError::ConnectionError(e.to_string())
            })
    }
}
