//! Queue consumer dispatching typed messages to a handler.
//!
//! A receiver owns its broker connection. `run` opens one channel, consumes
//! deliveries one at a time and acks each only after its handler returned
//! `Ok`. A failed delivery is requeued until it has been delivered
//! `max_deliveries` times, then moved to `{queue}.dead-letter`. Payloads that
//! do not decode are dead-lettered straight away.
//!
//! Cancelling the shutdown token stops the loop between deliveries; a handler
//! already running is allowed to finish. The channel and the connection are
//! closed before `run` returns, on every path.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::broker::{BrokerChannel, BrokerConnection, Delivery};
use crate::error::{self, BrokerError};

/// Suffix of the queue receiving messages that could not be handled.
pub const DEAD_LETTER_SUFFIX: &str = ".dead-letter";

pub fn dead_letter_queue(queue: &str) -> String {
    format!("{queue}{DEAD_LETTER_SUFFIX}")
}

/// Processes one decoded message.
#[async_trait]
pub trait MessageHandler<T>: Send + Sync {
    async fn handle(&self, item: T) -> error::Result<()>;
}

/// Redelivery bound for failing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeliveryPolicy {
    pub max_deliveries: u32,
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self { max_deliveries: 5 }
    }
}

/// Outcome counts of a receiver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub acked: u64,
    pub requeued: u64,
    pub dead_lettered: u64,
}

pub struct MessageReceiver<T, H> {
    connection: Box<dyn BrokerConnection>,
    queue: String,
    handler: H,
    policy: RedeliveryPolicy,
    _message: PhantomData<fn() -> T>,
}

impl<T, H> MessageReceiver<T, H>
where
    T: DeserializeOwned + Send + 'static,
    H: MessageHandler<T> + 'static,
{
    pub fn new(
        connection: Box<dyn BrokerConnection>,
        queue: impl Into<String>,
        handler: H,
        policy: RedeliveryPolicy,
    ) -> Self {
        Self {
            connection,
            queue: queue.into(),
            handler,
            policy,
            _message: PhantomData,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Consumes until `shutdown` is cancelled or the channel closes, then
    /// releases the channel and the connection.
    pub async fn run(self, shutdown: CancellationToken) -> Result<ReceiverStats, BrokerError> {
        let channel = match self.connection.open_channel().await {
            Ok(channel) => channel,
            Err(err) => {
                self.release_connection().await;
                return Err(err);
            }
        };

        let result = self.consume(channel.as_ref(), &shutdown).await;

        if let Err(err) = channel.close().await {
            warn!(queue = %self.queue, error = %err, "Failed to close channel");
        }
        self.release_connection().await;

        match &result {
            Ok(stats) => info!(
                queue = %self.queue,
                acked = stats.acked,
                requeued = stats.requeued,
                dead_lettered = stats.dead_lettered,
                "Receiver stopped"
            ),
            Err(err) => error!(queue = %self.queue, error = %err, "Receiver failed"),
        }
        result
    }

    async fn release_connection(&self) {
        if let Err(err) = self.connection.close().await {
            warn!(queue = %self.queue, error = %err, "Failed to close broker connection");
        }
    }

    async fn consume(
        &self,
        channel: &dyn BrokerChannel,
        shutdown: &CancellationToken,
    ) -> Result<ReceiverStats, BrokerError> {
        let dead_letter = dead_letter_queue(&self.queue);
        channel.declare_queue(&self.queue).await?;
        channel.declare_queue(&dead_letter).await?;
        info!(queue = %self.queue, "Receiver consuming");

        let mut stats = ReceiverStats::default();
        loop {
            let delivery = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = channel.next_delivery(&self.queue) => match next? {
                    Some(delivery) => delivery,
                    None => break,
                },
            };
            self.process(channel, &dead_letter, delivery, &mut stats).await?;
        }
        Ok(stats)
    }

    async fn process(
        &self,
        channel: &dyn BrokerChannel,
        dead_letter: &str,
        delivery: Delivery,
        stats: &mut ReceiverStats,
    ) -> Result<(), BrokerError> {
        let item: T = match serde_json::from_slice(&delivery.body) {
            Ok(item) => item,
            Err(err) => {
                warn!(queue = %self.queue, error = %err, "Undecodable message");
                return self.dead_letter(channel, dead_letter, delivery, stats).await;
            }
        };

        match self.handler.handle(item).await {
            Ok(()) => {
                channel.ack(delivery.delivery_tag).await?;
                stats.acked += 1;
                debug!(queue = %self.queue, tag = delivery.delivery_tag, "Message handled");
            }
            Err(err) if delivery.attempt < self.policy.max_deliveries => {
                warn!(
                    queue = %self.queue,
                    attempt = delivery.attempt,
                    error = %err,
                    "Handler failed, requeueing"
                );
                channel.nack(delivery.delivery_tag, true).await?;
                stats.requeued += 1;
            }
            Err(err) => {
                error!(
                    queue = %self.queue,
                    attempt = delivery.attempt,
                    error = %err,
                    "Handler failed on final delivery"
                );
                self.dead_letter(channel, dead_letter, delivery, stats).await?;
            }
        }
        Ok(())
    }

    async fn dead_letter(
        &self,
        channel: &dyn BrokerChannel,
        dead_letter: &str,
        delivery: Delivery,
        stats: &mut ReceiverStats,
    ) -> Result<(), BrokerError> {
        channel.publish(dead_letter, delivery.body).await?;
        channel.ack(delivery.delivery_tag).await?;
        stats.dead_lettered += 1;
        Ok(())
    }
}

/// Spawns `receiver` as a background task.
///
/// The returned handle resolves once the receiver has released its connection.
pub fn spawn_receiver<T, H>(
    receiver: MessageReceiver<T, H>,
    shutdown: CancellationToken,
) -> JoinHandle<Result<ReceiverStats, BrokerError>>
where
    T: DeserializeOwned + Send + 'static,
    H: MessageHandler<T> + 'static,
{
    tokio::spawn(receiver.run(shutdown))
}
