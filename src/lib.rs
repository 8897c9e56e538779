//! Publishes a single message to an AMQP broker.
//!
//! The sequence lives in [`publisher`], behind the broker traits in
//! [`messaging`]. [`rabbitmq`] implements those traits with lapin, and
//! [`messaging::memory`] implements them in-process for tests.

pub mod config;
pub mod env;
pub mod messaging;
pub mod publisher;
pub mod rabbitmq;

// Re-export specific items to simplify imports elsewhere
pub use config::{ConfigError, PublisherConfig};
pub use messaging::{ErrorKind, PublishError};
pub use publisher::{hello_world, publish_once, publisher, PublisherSettings};
