// src/rabbitmq/channel.rs
use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::{AMQPValue, FieldTable},
    BasicProperties, Channel,
};
use tracing::{debug, error, info};

use crate::messaging::{
    BrokerChannel, DeclaredQueue, HeaderValue, MessageProperties, OutgoingMessage, PublishError,
    QueueDeclaration, Result,
};

pub struct RabbitMqChannel {
    channel: Channel,
}

impl RabbitMqChannel {
    pub(crate) fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

fn to_amqp_value(value: &HeaderValue) -> AMQPValue {
    match value {
        HeaderValue::String(s) => AMQPValue::LongString(s.clone().into()),
        HeaderValue::Int(i) => AMQPValue::LongLongInt(*i),
        HeaderValue::Float(f) => AMQPValue::Double(*f),
        HeaderValue::Bool(b) => AMQPValue::Boolean(*b),
    }
}

pub(crate) fn to_basic_properties(properties: &MessageProperties) -> BasicProperties {
    let mut basic = BasicProperties::default();

    if let Some(content_type) = properties.content_type() {
        basic = basic.with_content_type(content_type.into());
    }

    if !properties.headers().is_empty() {
        let mut table = FieldTable::default();
        for (key, value) in properties.headers().iter() {
            table.insert(key.into(), to_amqp_value(value));
        }
        basic = basic.with_headers(table);
    }

    basic
}

#[async_trait]
impl BrokerChannel for RabbitMqChannel {
    async fn declare_queue(&self, declaration: &QueueDeclaration) -> Result<DeclaredQueue> {
        let options = QueueDeclareOptions {
            durable: declaration.durable,
            exclusive: declaration.exclusive,
            auto_delete: declaration.auto_delete,
            ..QueueDeclareOptions::default()
        };

        let queue = self
            .channel
            .queue_declare(declaration.name(), options, FieldTable::default())
            .await
            .map_err(|e| {
                error!(error = %e, queue = declaration.name(), "Failed to declare queue");
                PublishError::DeclarationError(e.to_string())
            })?;

        info!(
            queue = declaration.name(),
            messages = queue.message_count(),
            consumers = queue.consumer_count(),
            "Queue declared"
        );

        Ok(DeclaredQueue {
            name: queue.name().as_str().to_string(),
            message_count: queue.message_count(),
            consumer_count: queue.consumer_count(),
        })
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: &OutgoingMessage,
    ) -> Result<()> {
        // No confirm_select on this channel, so the returned confirm is not awaited.
        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &message.payload,
                to_basic_properties(&message.properties),
            )
            .await
            .map_err(|e| {
                error!(error = %e, routing_key, "Failed to publish message");
                PublishError::PublishError(e.to_string())
            })?;

        info!(
            exchange,
            routing_key,
            body_length = message.payload.len(),
            "Message published"
        );
        Ok(())
    }

    async fn close(self) -> Result<()> {
        let channel_id = self.channel.id();
        if !self.channel.status().connected() {
            // Closed by the broker, e.g. after a failed declare.
            debug!(channel_id, "Channel already closed");
            return Ok(());
        }

        self.channel
            .close(200, "Normal shutdown")
            .await
            .map_err(|e| {
                error!(error = %e, channel_id, "Failed to close channel gracefully");
                PublishError::ChannelError(e.to_string())
            })?;

        debug!(channel_id, "Channel closed");
        Ok(())
    }
}
