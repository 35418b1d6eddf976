use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio::time;

use subvisor::{
    Event, EventKind, HandlerError, HandlerFn, HandlerRef, MemoryBroker, SubscribeError,
    SubscriberManager, Transport, TransportError, TransportStream,
};

const WAIT: Duration = Duration::from_secs(2);

type Calls = mpsc::UnboundedReceiver<(String, String)>;

fn recording(name: &'static str) -> (HandlerRef, Calls) {
    let (tx, rx) = mpsc::unbounded_channel();
    let h: HandlerRef = HandlerFn::arc(name, move |channel: String, payload: String| {
        let tx = tx.clone();
        async move {
            let _ = tx.send((channel, payload));
            Ok::<_, HandlerError>(())
        }
    });
    (h, rx)
}

async fn next_call(rx: &mut Calls) -> (String, String) {
    time::timeout(WAIT, rx.recv())
        .await
        .expect("handler not invoked in time")
        .expect("recorder dropped")
}

async fn wait_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind, channel: &str) -> Event {
    time::timeout(WAIT, async {
        loop {
            let ev = rx.recv().await.expect("bus closed");
            if ev.kind == kind && ev.is_for(channel) {
                return ev;
            }
        }
    })
    .await
    .expect("event not observed in time")
}

/// Transport that refuses every subscription.
struct RefusingTransport;

#[async_trait]
impl Transport for RefusingTransport {
    async fn subscribe(&self, _channel: &str) -> Result<Box<dyn TransportStream>, TransportError> {
        Err(TransportError::Rejected {
            reason: "NOAUTH authentication required".to_string(),
        })
    }

    async fn publish(&self, _channel: &str, _payload: &str) -> Result<usize, TransportError> {
        Err(TransportError::Closed)
    }
}

#[tokio::test]
async fn game_result_is_delivered_exactly_once() {
    let broker = MemoryBroker::arc();
    let manager = SubscriberManager::new(broker.clone());
    let (h, mut calls) = recording("game-results-recorder");

    manager.subscribe("game-results", h).await.unwrap();
    assert!(manager.is_subscribed("game-results").await);

    let payload = r#"{"game_id":"g1","player_id":"p1","result":"win","score":10,"timestamp":"t1"}"#;
    assert_eq!(broker.publish("game-results", payload).await.unwrap(), 1);

    let (channel, got) = next_call(&mut calls).await;
    assert_eq!(channel, "game-results");
    assert_eq!(got, payload);

    manager.unsubscribe("game-results").await.unwrap();
    assert!(calls.try_recv().is_err(), "handler invoked more than once");
}

#[tokio::test]
async fn channels_do_not_cross_deliver() {
    let broker = MemoryBroker::arc();
    let manager = Arc::new(SubscriberManager::new(broker.clone()));
    let (chat, mut chat_calls) = recording("chat");
    let (actions, mut action_calls) = recording("actions");

    let (a, b) = tokio::join!(
        manager.subscribe("chat-messages", chat),
        manager.subscribe("player-actions", actions),
    );
    a.unwrap();
    b.unwrap();

    broker.publish("chat-messages", "hello room").await.unwrap();
    broker.publish("player-actions", "jump").await.unwrap();

    assert_eq!(
        next_call(&mut chat_calls).await,
        ("chat-messages".to_string(), "hello room".to_string())
    );
    assert_eq!(
        next_call(&mut action_calls).await,
        ("player-actions".to_string(), "jump".to_string())
    );

    manager.unsubscribe_all().await;
    assert!(chat_calls.try_recv().is_err());
    assert!(action_calls.try_recv().is_err());
}

#[tokio::test]
async fn unsubscribe_waits_for_in_flight_handler() {
    let broker = MemoryBroker::arc();
    let manager = Arc::new(SubscriberManager::new(broker.clone()));

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let finished = Arc::new(AtomicBool::new(false));
    let invocations = Arc::new(AtomicUsize::new(0));

    let h: HandlerRef = {
        let (entered, release) = (entered.clone(), release.clone());
        let (finished, invocations) = (finished.clone(), invocations.clone());
        HandlerFn::arc("slow-chat", move |_channel: String, _payload: String| {
            let (entered, release) = (entered.clone(), release.clone());
            let (finished, invocations) = (finished.clone(), invocations.clone());
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                entered.notify_one();
                release.notified().await;
                finished.store(true, Ordering::SeqCst);
                Ok::<_, HandlerError>(())
            }
        })
    };

    manager.subscribe("chat-messages", h).await.unwrap();
    broker.publish("chat-messages", "first").await.unwrap();
    broker.publish("chat-messages", "second").await.unwrap();
    time::timeout(WAIT, entered.notified()).await.unwrap();

    let unsub = tokio::spawn({
        let manager = manager.clone();
        async move { manager.unsubscribe("chat-messages").await }
    });

    time::sleep(Duration::from_millis(50)).await;
    assert!(!unsub.is_finished(), "unsubscribe returned while handler was running");
    assert!(!finished.load(Ordering::SeqCst));

    release.notify_one();
    time::timeout(WAIT, unsub).await.unwrap().unwrap().unwrap();

    assert!(finished.load(Ordering::SeqCst));
    assert!(!manager.is_subscribed("chat-messages").await);
    // The queued "second" message is never handled.
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(broker.publish("chat-messages", "third").await.unwrap(), 0);
}

#[tokio::test]
async fn unsubscribe_unknown_channel_leaves_registry_alone() {
    let manager = SubscriberManager::new(MemoryBroker::arc());
    let (h, _calls) = recording("results");
    manager.subscribe("game-results", h).await.unwrap();

    let err = manager.unsubscribe("chat-messages").await.unwrap_err();
    assert_eq!(
        err,
        SubscribeError::NotSubscribed {
            channel: "chat-messages".into()
        }
    );
    assert_eq!(
        manager.subscribed_channels().await.into_iter().collect::<Vec<_>>(),
        vec!["game-results".to_string()]
    );
    manager.unsubscribe_all().await;
}

#[tokio::test]
async fn failed_message_does_not_stop_the_next_one() {
    let broker = MemoryBroker::arc();
    let manager = SubscriberManager::new(broker.clone());
    let mut events = manager.events();

    let (tx, mut seen) = mpsc::unbounded_channel();
    let h: HandlerRef = HandlerFn::arc("picky", move |_channel: String, payload: String| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(payload.clone());
            if payload == "bad" {
                return Err(HandlerError::fail("cannot process"));
            }
            Ok::<_, HandlerError>(())
        }
    });

    manager.subscribe("player-actions", h).await.unwrap();
    broker.publish("player-actions", "bad").await.unwrap();
    broker.publish("player-actions", "good").await.unwrap();

    let failed = wait_for(&mut events, EventKind::HandlerFailed, "player-actions").await;
    assert_eq!(failed.reason.as_deref(), Some("handling failed: cannot process"));

    let first = time::timeout(WAIT, seen.recv()).await.unwrap();
    let second = time::timeout(WAIT, seen.recv()).await.unwrap();
    assert_eq!(first.as_deref(), Some("bad"));
    assert_eq!(second.as_deref(), Some("good"));
    assert_eq!(manager.is_listening("player-actions").await, Some(true));

    manager.unsubscribe("player-actions").await.unwrap();
}

#[tokio::test]
async fn unsubscribe_all_signals_every_listener() {
    let broker = MemoryBroker::arc();
    let manager = SubscriberManager::new(broker.clone());
    let mut events = manager.events();

    for channel in ["game-results", "player-actions", "chat-messages"] {
        let (h, _calls) = recording("recorder");
        manager.subscribe(channel, h).await.unwrap();
    }
    assert_eq!(manager.len().await, 3);

    manager.unsubscribe_all().await;

    assert!(manager.subscribed_channels().await.is_empty());
    // Emitted after every teardown completed.
    let mut stopped = 0;
    time::timeout(WAIT, async {
        loop {
            let ev = events.recv().await.expect("bus closed");
            match ev.kind {
                EventKind::ListenerStopped => stopped += 1,
                EventKind::AllUnsubscribed => break,
                _ => {}
            }
        }
    })
    .await
    .expect("AllUnsubscribed not observed");
    assert_eq!(stopped, 3);
    for channel in ["game-results", "player-actions", "chat-messages"] {
        assert_eq!(broker.stream_count(channel).await, 0);
    }

    // Idempotent on an empty registry.
    manager.unsubscribe_all().await;
    assert!(manager.is_empty().await);
}

#[tokio::test]
async fn refused_subscription_is_reported_to_the_caller() {
    let manager = SubscriberManager::new(Arc::new(RefusingTransport));
    let mut events = manager.events();
    let (h, _calls) = recording("recorder");

    let err = manager.subscribe("game-results", h).await.unwrap_err();
    match err {
        SubscribeError::SubscriptionFailed { channel, reason } => {
            assert_eq!(channel, "game-results");
            assert!(reason.contains("NOAUTH"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!manager.is_subscribed("game-results").await);

    let ev = wait_for(&mut events, EventKind::SubscribeRejected, "game-results").await;
    assert_eq!(ev.reason.as_deref(), Some("subscription_failed"));
}

#[tokio::test]
async fn closed_stream_leaves_a_stale_entry() {
    let broker = MemoryBroker::arc();
    let manager = SubscriberManager::new(broker.clone());
    let mut events = manager.events();
    let (h, _calls) = recording("recorder");

    manager.subscribe("game-results", h.clone()).await.unwrap();
    assert_eq!(broker.disconnect("game-results").await, 1);

    wait_for(&mut events, EventKind::TransportClosed, "game-results").await;
    wait_for(&mut events, EventKind::ListenerStopped, "game-results").await;

    time::timeout(WAIT, async {
        while manager.is_listening("game-results").await != Some(false) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("listener should finish after the stream closed");
    assert!(manager.is_subscribed("game-results").await);
    assert!(matches!(
        manager.subscribe("game-results", h.clone()).await,
        Err(SubscribeError::AlreadySubscribed { .. })
    ));

    manager.unsubscribe("game-results").await.unwrap();
    manager.subscribe("game-results", h).await.unwrap();
    assert_eq!(manager.is_listening("game-results").await, Some(true));
    manager.unsubscribe_all().await;
}
