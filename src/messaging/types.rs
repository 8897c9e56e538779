// src/messaging/types.rs
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use lapin::uri::{AMQPScheme, AMQPUri};

use super::error::{PublishError, Result};

/// AMQP short strings carry a one-byte length prefix.
pub const SHORT_STRING_MAX: usize = 255;

/// Routes by queue name.
pub const DEFAULT_EXCHANGE: &str = "";

fn check_short_string(what: &str, value: &str) -> Result<()> {
    if value.len() > SHORT_STRING_MAX {
        return Err(PublishError::InvalidProperty(format!(
            "{} is {} bytes, limit is {}",
            what,
            value.len(),
            SHORT_STRING_MAX
        )));
    }
    Ok(())
}

/// A parsed broker URI. Formatting never shows the password.
#[derive(Clone)]
pub struct BrokerAddress {
    uri: AMQPUri,
}

impl BrokerAddress {
    pub fn parse(raw: &str) -> Result<Self> {
        let uri = AMQPUri::from_str(raw)
            .map_err(|e| PublishError::ConnectionError(format!("Malformed broker URI: {}", e)))?;
        Ok(Self { uri })
    }

    pub fn host(&self) -> &str {
        &self.uri.authority.host
    }

    pub fn port(&self) -> u16 {
        self.uri.authority.port
    }

    pub fn vhost(&self) -> &str {
        &self.uri.vhost
    }

    pub fn username(&self) -> &str {
        &self.uri.authority.userinfo.username
    }

    pub fn uri(&self) -> &AMQPUri {
        &self.uri
    }

    fn scheme(&self) -> &'static str {
        match self.uri.scheme {
            AMQPScheme::AMQP => "amqp",
            AMQPScheme::AMQPS => "amqps",
        }
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}@{}:{}/{}",
            self.scheme(),
            self.username(),
            self.host(),
            self.port(),
            self.vhost()
        )
    }
}

impl fmt::Debug for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BrokerAddress")
            .field(&self.to_string())
            .finish()
    }
}

/// Queue name and attributes for a declare.
///
/// Attribute defaults are all `false`, the same as lapin's
/// `QueueDeclareOptions::default()`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueDeclaration {
    name: String,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
}

impl QueueDeclaration {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_short_string("queue name", &name)?;
        Ok(Self {
            name,
            ..Self::default()
        })
    }

    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    pub fn auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when redeclaring `self` over `other` would be accepted by a broker.
    pub fn matches(&self, other: &QueueDeclaration) -> bool {
        self.durable == other.durable
            && self.exclusive == other.exclusive
            && self.auto_delete == other.auto_delete
    }
}

/// What the broker reported back for a declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredQueue {
    pub name: String,
    pub message_count: u32,
    pub consumer_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::String(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::String(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Int(value)
    }
}

impl From<f64> for HeaderValue {
    fn from(value: f64) -> Self {
        HeaderValue::Float(value)
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        HeaderValue::Bool(value)
    }
}

/// Message headers. Keys are checked on insert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Headers {
    entries: BTreeMap<String, HeaderValue>,
}

impl Headers {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(PublishError::InvalidProperty(
                "header key cannot be empty".to_string(),
            ));
        }
        check_short_string("header key", &key)?;
        self.entries.insert(key, value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageProperties {
    content_type: Option<String>,
    headers: Headers,
}

impl MessageProperties {
    pub fn builder() -> MessagePropertiesBuilder {
        MessagePropertiesBuilder::default()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

/// Collects properties and reports the first invalid one from `build`.
#[derive(Debug, Default)]
pub struct MessagePropertiesBuilder {
    content_type: Option<String>,
    headers: Headers,
    error: Option<PublishError>,
}

impl MessagePropertiesBuilder {
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        if self.error.is_none() {
            match check_short_string("content type", &content_type) {
                Ok(()) => self.content_type = Some(content_type),
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.headers.insert(key, value) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn build(self) -> Result<MessageProperties> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(MessageProperties {
            content_type: self.content_type,
            headers: self.headers,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub payload: Vec<u8>,
    pub properties: MessageProperties,
}

impl OutgoingMessage {
    pub fn new(payload: impl Into<Vec<u8>>, properties: MessageProperties) -> Self {
        Self {
            payload: payload.into(),
            properties,
        }
    }
}
