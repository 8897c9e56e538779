// src/messaging/memory.rs
//! In-process broker used to exercise the publish sequence without RabbitMQ.
//!
//! Queues, stored messages and every connection/channel lifecycle step are
//! kept in shared state so a test can inspect them after the run.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::{
    Broker, BrokerAddress, BrokerChannel, BrokerConnection, DeclaredQueue, OutgoingMessage,
    PublishError, QueueDeclaration, Result, DEFAULT_EXCHANGE,
};

/// Lifecycle and traffic recorded by a [`MemoryBroker`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    ConnectionOpened { connection: u32 },
    ChannelOpened { connection: u32, channel: u32 },
    QueueDeclared { channel: u32, queue: String },
    MessagePublished { channel: u32, routing_key: String },
    ChannelClosed { channel: u32 },
    ConnectionClosed { connection: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub exchange: String,
    pub routing_key: String,
    pub message: OutgoingMessage,
}

#[derive(Debug)]
struct StoredQueue {
    declaration: QueueDeclaration,
    messages: Vec<StoredMessage>,
}

#[derive(Debug, Default)]
struct MemoryState {
    unreachable: bool,
    refuse_channels: bool,
    reject_publish: bool,
    fail_channel_close: bool,
    next_connection: u32,
    next_channel: u32,
    open_channels: HashSet<u32>,
    queues: HashMap<String, StoredQueue>,
    events: Vec<BrokerEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }

    /// Make every subsequent `connect` fail as if the host were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Make every subsequent `open_channel` fail as if channel_max were hit.
    pub fn set_refuse_channels(&self, refuse: bool) {
        self.state().refuse_channels = refuse;
    }

    /// Make every subsequent `publish` fail as a broker-side rejection.
    pub fn set_reject_publish(&self, reject: bool) {
        self.state().reject_publish = reject;
    }

    /// Make every subsequent channel `close` fail after recording the attempt.
    pub fn set_fail_channel_close(&self, fail: bool) {
        self.state().fail_channel_close = fail;
    }

    /// Create a queue directly, as another client would have.
    pub fn seed_queue(&self, declaration: QueueDeclaration) {
        self.state().queues.insert(
            declaration.name().to_string(),
            StoredQueue {
                declaration,
                messages: Vec::new(),
            },
        );
    }

    pub fn queue_exists(&self, name: &str) -> bool {
        self.state().queues.contains_key(name)
    }

    pub fn messages(&self, queue: &str) -> Vec<StoredMessage> {
        self.state()
            .queues
            .get(queue)
            .map(|q| q.messages.clone())
            .unwrap_or_default()
    }

    pub fn events(&self) -> Vec<BrokerEvent> {
        self.state().events.clone()
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Broker for MemoryBroker {
    type Connection = MemoryConnection;

    async fn connect(&self, address: &BrokerAddress) -> Result<MemoryConnection> {
        let mut state = self.state();
        if state.unreachable {
            return Err(PublishError::ConnectionError(format!(
                "{}:{} is unreachable",
                address.host(),
                address.port()
            )));
        }

        state.next_connection += 1;
        let id = state.next_connection;
        state.events.push(BrokerEvent::ConnectionOpened { connection: id });
        debug!(connection = id, vhost = address.vhost(), "memory connection opened");

        Ok(MemoryConnection {
            id,
            state: self.state.clone(),
        })
    }
}

pub struct MemoryConnection {
    id: u32,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl BrokerConnection for MemoryConnection {
    type Channel = MemoryChannel;

    async fn open_channel(&self) -> Result<MemoryChannel> {
        let mut state = lock(&self.state);
        if state.refuse_channels {
            return Err(PublishError::ChannelError(
                "broker refused to open a channel".to_string(),
            ));
        }

        state.next_channel += 1;
        let id = state.next_channel;
        state.open_channels.insert(id);
        state.events.push(BrokerEvent::ChannelOpened {
            connection: self.id,
            channel: id,
        });

        Ok(MemoryChannel {
            id,
            state: self.state.clone(),
        })
    }

    async fn close(self) -> Result<()> {
        lock(&self.state)
            .events
            .push(BrokerEvent::ConnectionClosed { connection: self.id });
        Ok(())
    }
}

pub struct MemoryChannel {
    id: u32,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl BrokerChannel for MemoryChannel {
    async fn declare_queue(&self, declaration: &QueueDeclaration) -> Result<DeclaredQueue> {
        let mut state = lock(&self.state);
        if !state.open_channels.contains(&self.id) {
            return Err(PublishError::DeclarationError(format!(
                "channel {} is closed",
                self.id
            )));
        }

        let existing = state
            .queues
            .get(declaration.name())
            .map(|q| (q.declaration.matches(declaration), q.messages.len() as u32));

        let message_count = match existing {
            Some((false, _)) => {
                // A real broker answers PRECONDITION_FAILED and closes the channel.
                state.open_channels.remove(&self.id);
                return Err(PublishError::DeclarationError(format!(
                    "PRECONDITION_FAILED - inequivalent arg for queue '{}'",
                    declaration.name()
                )));
            }
            Some((true, count)) => count,
            None => 0,
        };

        if existing.is_none() {
            state.queues.insert(
                declaration.name().to_string(),
                StoredQueue {
                    declaration: declaration.clone(),
                    messages: Vec::new(),
                },
            );
        }
        state.events.push(BrokerEvent::QueueDeclared {
            channel: self.id,
            queue: declaration.name().to_string(),
        });

        Ok(DeclaredQueue {
            name: declaration.name().to_string(),
            message_count,
            consumer_count: 0,
        })
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: &OutgoingMessage,
    ) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.open_channels.contains(&self.id) {
            return Err(PublishError::PublishError(format!(
                "channel {} is closed",
                self.id
            )));
        }
        if state.reject_publish {
            state.open_channels.remove(&self.id);
            return Err(PublishError::PublishError(format!(
                "broker rejected publish to '{}'",
                routing_key
            )));
        }
        if exchange != DEFAULT_EXCHANGE {
            state.open_channels.remove(&self.id);
            return Err(PublishError::PublishError(format!(
                "NOT_FOUND - no exchange '{}'",
                exchange
            )));
        }

        state.events.push(BrokerEvent::MessagePublished {
            channel: self.id,
            routing_key: routing_key.to_string(),
        });
        // Unroutable messages are dropped, as without the mandatory flag.
        if let Some(queue) = state.queues.get_mut(routing_key) {
            queue.messages.push(StoredMessage {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                message: message.clone(),
            });
        }
        Ok(())
    }

    async fn close(self) -> Result<()> {
        let mut state = lock(&self.state);
        state.open_channels.remove(&self.id);
        state.events.push(BrokerEvent::ChannelClosed { channel: self.id });
        if state.fail_channel_close {
            return Err(PublishError::ChannelError(format!(
                "channel {} close was not acknowledged",
                self.id
            )));
        }
        Ok(())
    }
}
