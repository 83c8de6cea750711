//! Broker ports and an in-memory broker.
//!
//! The traits mirror an AMQP-style client: a connection opens channels, a
//! channel declares queues, publishes, receives deliveries and settles them
//! with ack/nack. Deliveries left unsettled when a channel closes go back to
//! the head of their queue.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;

use crate::error::BrokerError;

/// A message handed to a consumer, awaiting ack or nack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub body: Vec<u8>,
    /// 1 on first delivery, incremented on every redelivery
    pub attempt: u32,
}

#[async_trait]
pub trait BrokerConnection: Send + Sync {
    async fn open_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError>;

    /// Closes the connection and every channel opened from it.
    async fn close(&self) -> Result<(), BrokerError>;
}

#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Creates the queue if it does not exist yet.
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError>;

    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), BrokerError>;

    /// Waits for the next message on `queue`; `None` once the channel closes.
    ///
    /// Cancel safe: dropping the future never loses a message.
    async fn next_delivery(&self, queue: &str) -> Result<Option<Delivery>, BrokerError>;

    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError>;

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError>;

    async fn close(&self) -> Result<(), BrokerError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// == In-Memory Broker ==
#[derive(Debug, Clone)]
struct QueuedMessage {
    body: Vec<u8>,
    deliveries: u32,
}

#[derive(Debug, Default)]
struct Queue {
    messages: Mutex<VecDeque<QueuedMessage>>,
    available: Notify,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: Mutex<HashMap<String, Arc<Queue>>>,
    next_tag: AtomicU64,
    open_connections: AtomicUsize,
}

impl BrokerState {
    fn queue(&self, name: &str) -> Result<Arc<Queue>, BrokerError> {
        lock(&self.queues)
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownQueue(name.to_string()))
    }
}

/// Process-local broker with per-queue FIFO delivery.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<BrokerState>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) -> InMemoryConnection {
        self.state.open_connections.fetch_add(1, Ordering::SeqCst);
        InMemoryConnection {
            state: Arc::clone(&self.state),
            channels: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of connections not yet closed.
    pub fn open_connections(&self) -> usize {
        self.state.open_connections.load(Ordering::SeqCst)
    }

    /// Messages waiting on `queue` (not counting unsettled deliveries).
    pub fn queue_len(&self, queue: &str) -> usize {
        self.state
            .queue(queue)
            .map(|q| lock(&q.messages).len())
            .unwrap_or(0)
    }

    /// Copies of the bodies waiting on `queue`, head first.
    pub fn peek(&self, queue: &str) -> Vec<Vec<u8>> {
        self.state
            .queue(queue)
            .map(|q| lock(&q.messages).iter().map(|m| m.body.clone()).collect())
            .unwrap_or_default()
    }
}

pub struct InMemoryConnection {
    state: Arc<BrokerState>,
    channels: Mutex<Vec<Arc<InMemoryChannel>>>,
    closed: AtomicBool,
}

#[async_trait]
impl BrokerConnection for InMemoryConnection {
    async fn open_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::ChannelClosed("connection is closed".to_string()));
        }
        let channel = Arc::new(InMemoryChannel {
            state: Arc::clone(&self.state),
            unacked: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            closing: Notify::new(),
        });
        lock(&self.channels).push(Arc::clone(&channel));
        Ok(channel)
    }

    async fn close(&self) -> Result<(), BrokerError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let channels: Vec<_> = lock(&self.channels).drain(..).collect();
        for channel in channels {
            channel.shutdown();
        }
        self.state.open_connections.fetch_sub(1, Ordering::SeqCst);
        debug!("Broker connection closed");
        Ok(())
    }
}

struct InMemoryChannel {
    state: Arc<BrokerState>,
    unacked: Mutex<HashMap<u64, (Arc<Queue>, QueuedMessage)>>,
    closed: AtomicBool,
    closing: Notify,
}

impl InMemoryChannel {
    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BrokerError::ChannelClosed("channel is closed".to_string()))
        } else {
            Ok(())
        }
    }

    /// Marks the channel closed and returns unsettled deliveries to their queues.
    fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.closing.notify_waiters();
        let unacked: Vec<_> = lock(&self.unacked).drain().collect();
        for (_, (queue, message)) in unacked {
            lock(&queue.messages).push_front(message);
            queue.available.notify_one();
        }
    }

    fn take_unacked(&self, delivery_tag: u64) -> Result<(Arc<Queue>, QueuedMessage), BrokerError> {
        lock(&self.unacked)
            .remove(&delivery_tag)
            .ok_or(BrokerError::UnknownDelivery(delivery_tag))
    }
}

#[async_trait]
impl BrokerChannel for InMemoryChannel {
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        self.ensure_open()?;
        lock(&self.state.queues)
            .entry(queue.to_string())
            .or_default();
        Ok(())
    }

    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let target = self.state.queue(queue)?;
        lock(&target.messages).push_back(QueuedMessage { body, deliveries: 0 });
        target.available.notify_one();
        Ok(())
    }

    async fn next_delivery(&self, queue: &str) -> Result<Option<Delivery>, BrokerError> {
        let source = self.state.queue(queue)?;
        loop {
            // Register for the close signal before checking the flag
            let closing = self.closing.notified();
            tokio::pin!(closing);
            closing.as_mut().enable();

            if self.closed.load(Ordering::SeqCst) {
                return Ok(None);
            }

            let next = lock(&source.messages).pop_front();
            if let Some(mut message) = next {
                message.deliveries += 1;
                let delivery_tag = self.state.next_tag.fetch_add(1, Ordering::SeqCst) + 1;
                let delivery = Delivery {
                    delivery_tag,
                    body: message.body.clone(),
                    attempt: message.deliveries,
                };
                lock(&self.unacked).insert(delivery_tag, (Arc::clone(&source), message));
                return Ok(Some(delivery));
            }

            tokio::select! {
                _ = source.available.notified() => {}
                _ = &mut closing => {}
            }
        }
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.take_unacked(delivery_tag).map(|_| ())
    }

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let (queue, message) = self.take_unacked(delivery_tag)?;
        if requeue {
            lock(&queue.messages).push_back(message);
            queue.available.notify_one();
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.shutdown();
        Ok(())
    }
}
