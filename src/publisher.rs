// src/publisher.rs
//! The publish sequence: connect, open a channel, declare, publish, release.
//!
//! Connection and channel are released on every path out of the sequence,
//! channel first. When both the work and a release fail, the work's error is
//! returned and the release failure is only logged.

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::messaging::{
    Broker, BrokerAddress, BrokerChannel, BrokerConnection, DeclaredQueue, MessageProperties,
    OutgoingMessage, QueueDeclaration, Result, DEFAULT_EXCHANGE,
};
use crate::rabbitmq::RabbitMqBroker;

pub const HELLO_WORLD_BODY: &str = "Hello World!";

/// Everything one publish run needs, already validated.
#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub address: BrokerAddress,
    pub queue: QueueDeclaration,
    pub connection_name: String,
}

/// `"Hello World!"` as `text/plain` with header `key = "value"`.
pub fn hello_world() -> Result<OutgoingMessage> {
    let properties = MessageProperties::builder()
        .content_type("text/plain")
        .header("key", "value")
        .build()?;
    Ok(OutgoingMessage::new(HELLO_WORLD_BODY, properties))
}

/// Combines the outcome of a scope's work with the outcome of releasing it.
fn finish<T>(outcome: Result<T>, released: Result<()>, resource: &str) -> Result<T> {
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_err)) => {
            warn!(error = %release_err, resource, "Release failed after an earlier error");
            Err(e)
        }
    }
}

async fn declare_and_publish<C: BrokerChannel>(
    channel: &C,
    queue: &QueueDeclaration,
    message: &OutgoingMessage,
) -> Result<DeclaredQueue> {
    let declared = channel.declare_queue(queue).await?;
    channel
        .publish(DEFAULT_EXCHANGE, declared.name.as_str(), message)
        .await?;
    Ok(declared)
}

async fn with_channel<C: BrokerConnection>(
    connection: &C,
    queue: &QueueDeclaration,
    message: &OutgoingMessage,
) -> Result<DeclaredQueue> {
    let channel = connection.open_channel().await?;
    let outcome = declare_and_publish(&channel, queue, message).await;
    let released = channel.close().await;
    finish(outcome, released, "channel")
}

async fn run<B: Broker>(
    broker: &B,
    settings: &PublisherSettings,
    message: &OutgoingMessage,
) -> Result<DeclaredQueue> {
    let connection = broker.connect(&settings.address).await?;
    let outcome = with_channel(&connection, &settings.queue, message).await;
    let released = connection.close().await;
    let declared = finish(outcome, released, "connection")?;

    info!(
        queue = %declared.name,
        body_length = message.payload.len(),
        "Publish complete"
    );
    Ok(declared)
}

/// Publishes `message` once to the queue in `settings` through `broker`.
pub async fn publish_once<B: Broker>(
    broker: &B,
    settings: &PublisherSettings,
    message: &OutgoingMessage,
) -> Result<DeclaredQueue> {
    let span = info_span!("publish", run_id = %Uuid::new_v4(), queue = settings.queue.name());
    run(broker, settings, message).instrument(span).await
}

/// Publishes the hello-world message to RabbitMQ.
pub async fn publisher(settings: &PublisherSettings) -> Result<DeclaredQueue> {
    let broker = RabbitMqBroker::new(settings.connection_name.clone());
    let message = hello_world()?;
    publish_once(&broker, settings, &message).await
}
