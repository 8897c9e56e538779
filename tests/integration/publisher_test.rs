// Scoped publish behaviour against the in-memory broker.

use simple_publisher::messaging::memory::{BrokerEvent, MemoryBroker};
use simple_publisher::messaging::{HeaderValue, QueueDeclaration};
use simple_publisher::{hello_world, publish_once, ErrorKind, PublisherConfig, PublisherSettings};

fn settings() -> PublisherSettings {
    PublisherConfig::default()
        .settings()
        .expect("default config is valid")
}

fn release_events(events: &[BrokerEvent]) -> Vec<&BrokerEvent> {
    events
        .iter()
        .filter(|e| {
            matches!(
                e,
                BrokerEvent::ChannelClosed { .. } | BrokerEvent::ConnectionClosed { .. }
            )
        })
        .collect()
}

#[tokio::test]
async fn publishes_hello_world_to_simple_queue() {
    let broker = MemoryBroker::new();
    let message = hello_world().unwrap();

    let declared = publish_once(&broker, &settings(), &message).await.unwrap();
    assert_eq!(declared.name, "simple_queue");

    let stored = broker.messages("simple_queue");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].exchange, "");
    assert_eq!(stored[0].routing_key, "simple_queue");
    assert_eq!(stored[0].message.payload, b"Hello World!".to_vec());
    assert_eq!(stored[0].message.properties.content_type(), Some("text/plain"));
    assert_eq!(
        stored[0].message.properties.headers().get("key"),
        Some(&HeaderValue::String("value".to_string()))
    );
}

#[tokio::test]
async fn releases_channel_then_connection_on_success() {
    let broker = MemoryBroker::new();
    publish_once(&broker, &settings(), &hello_world().unwrap())
        .await
        .unwrap();

    assert_eq!(
        broker.events(),
        vec![
            BrokerEvent::ConnectionOpened { connection: 1 },
            BrokerEvent::ChannelOpened {
                connection: 1,
                channel: 1
            },
            BrokerEvent::QueueDeclared {
                channel: 1,
                queue: "simple_queue".to_string()
            },
            BrokerEvent::MessagePublished {
                channel: 1,
                routing_key: "simple_queue".to_string()
            },
            BrokerEvent::ChannelClosed { channel: 1 },
            BrokerEvent::ConnectionClosed { connection: 1 },
        ]
    );
}

#[tokio::test]
async fn unreachable_broker_is_connection_error() {
    let broker = MemoryBroker::new();
    broker.set_unreachable(true);

    let err = publish_once(&broker, &settings(), &hello_world().unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(!broker.queue_exists("simple_queue"));
    assert!(broker.events().is_empty());
}

#[tokio::test]
async fn refused_channel_still_releases_connection() {
    let broker = MemoryBroker::new();
    broker.set_refuse_channels(true);

    let err = publish_once(&broker, &settings(), &hello_world().unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Channel);
    assert_eq!(
        broker.events(),
        vec![
            BrokerEvent::ConnectionOpened { connection: 1 },
            BrokerEvent::ConnectionClosed { connection: 1 },
        ]
    );
}

#[tokio::test]
async fn existing_queue_with_same_attributes_is_reused() {
    let broker = MemoryBroker::new();
    broker.seed_queue(QueueDeclaration::new("simple_queue").unwrap());

    let declared = publish_once(&broker, &settings(), &hello_world().unwrap())
        .await
        .unwrap();

    assert_eq!(declared.message_count, 0);
    assert_eq!(broker.messages("simple_queue").len(), 1);
}

#[tokio::test]
async fn conflicting_queue_fails_and_publishes_nothing() {
    let broker = MemoryBroker::new();
    broker.seed_queue(QueueDeclaration::new("simple_queue").unwrap().durable(true));

    let err = publish_once(&broker, &settings(), &hello_world().unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Declaration);
    assert!(broker.messages("simple_queue").is_empty());

    let events = broker.events();
    assert!(!events
        .iter()
        .any(|e| matches!(e, BrokerEvent::MessagePublished { .. })));
    assert_eq!(
        release_events(&events),
        vec![
            &BrokerEvent::ChannelClosed { channel: 1 },
            &BrokerEvent::ConnectionClosed { connection: 1 },
        ]
    );
}

#[tokio::test]
async fn two_runs_store_two_messages() {
    let broker = MemoryBroker::new();
    let message = hello_world().unwrap();

    publish_once(&broker, &settings(), &message).await.unwrap();
    let second = publish_once(&broker, &settings(), &message).await.unwrap();

    assert_eq!(second.message_count, 1);
    assert_eq!(broker.messages("simple_queue").len(), 2);
    assert_eq!(release_events(&broker.events()).len(), 4);
}

#[tokio::test]
async fn custom_queue_from_config() {
    let broker = MemoryBroker::new();
    let config = PublisherConfig {
        queue: "orders".to_string(),
        ..PublisherConfig::default()
    };

    publish_once(&broker, &config.settings().unwrap(), &hello_world().unwrap())
        .await
        .unwrap();

    assert_eq!(broker.messages("orders").len(), 1);
    assert!(!broker.queue_exists("simple_queue"));
}

#[tokio::test]
async fn rejected_publish_releases_and_stores_nothing() {
    let broker = MemoryBroker::new();
    broker.set_reject_publish(true);

    let err = publish_once(&broker, &settings(), &hello_world().unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Publish);
    assert!(broker.messages("simple_queue").is_empty());
    assert_eq!(
        release_events(&broker.events()),
        vec![
            &BrokerEvent::ChannelClosed { channel: 1 },
            &BrokerEvent::ConnectionClosed { connection: 1 },
        ]
    );
}

#[tokio::test]
async fn publish_error_wins_over_failed_channel_close() {
    let broker = MemoryBroker::new();
    broker.set_reject_publish(true);
    broker.set_fail_channel_close(true);

    let err = publish_once(&broker, &settings(), &hello_world().unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Publish);
    assert_eq!(
        release_events(&broker.events()),
        vec![
            &BrokerEvent::ChannelClosed { channel: 1 },
            &BrokerEvent::ConnectionClosed { connection: 1 },
        ]
    );
}

#[tokio::test]
async fn failed_channel_close_after_publish_is_channel_error() {
    let broker = MemoryBroker::new();
    broker.set_fail_channel_close(true);

    let err = publish_once(&broker, &settings(), &hello_world().unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Channel);
    assert_eq!(broker.messages("simple_queue").len(), 1);
    assert_eq!(
        broker.events().last(),
        Some(&BrokerEvent::ConnectionClosed { connection: 1 })
    );
}
