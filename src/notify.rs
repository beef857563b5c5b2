//! Live notification fan-out.
//!
//! Notifications are persisted by the store first, then published to every
//! open subscription of the owning user. A user's channel exists only while
//! at least one [`Subscription`] for them is alive.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{
    models::{Notification, NotificationKind},
    remote::{NewNotification, RemoteStore},
};

#[derive(Clone)]
pub struct NotificationHub {
    channels: Arc<Mutex<HashMap<Uuid, broadcast::Sender<Notification>>>>,
    capacity: usize,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, user_id: Uuid) -> Subscription {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let receiver = channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        tracing::debug!(%user_id, "notification subscription opened");
        Subscription {
            user_id,
            receiver,
            hub: self.clone(),
        }
    }

    /// Delivers to the user's live subscriptions. Returns how many received it.
    pub fn publish(&self, notification: &Notification) -> usize {
        let channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        channels
            .get(&notification.user_id)
            .and_then(|sender| sender.send(notification.clone()).ok())
            .unwrap_or(0)
    }

    pub fn subscriber_count(&self, user_id: Uuid) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&user_id)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }

    fn release(&self, user_id: Uuid) {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // The departing receiver is still counted here.
        if channels
            .get(&user_id)
            .is_some_and(|sender| sender.receiver_count() <= 1)
        {
            channels.remove(&user_id);
        }
        tracing::debug!(%user_id, "notification subscription closed");
    }
}

pub struct Subscription {
    user_id: Uuid,
    receiver: broadcast::Receiver<Notification>,
    hub: NotificationHub,
}

impl Subscription {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Waits for the next notification. Skips over entries lost to a slow reader.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => return Some(notification),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %self.user_id, skipped, "notification subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.release(self.user_id);
    }
}

/// Persists a notification, then publishes it to the owner's live subscriptions.
pub struct Notifier<'a> {
    store: &'a dyn RemoteStore,
    hub: &'a NotificationHub,
}

impl<'a> Notifier<'a> {
    pub fn new(store: &'a dyn RemoteStore, hub: &'a NotificationHub) -> Self {
        Self { store, hub }
    }

    /// Never fails the caller: a store error is logged and yields `None`.
    pub async fn push(
        &self,
        user_id: Uuid,
        title: &str,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Option<Notification> {
        let inserted = self
            .store
            .insert_notification(NewNotification {
                user_id,
                title: title.to_string(),
                message: message.into(),
                kind,
            })
            .await;
        match inserted {
            Ok(notification) => {
                let delivered = self.hub.publish(&notification);
                tracing::debug!(%user_id, title, delivered, "notification pushed");
                Some(notification)
            }
            Err(err) => {
                tracing::warn!(error = %err, %user_id, title, "notification insert failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::NotificationKind;

    fn note(user_id: Uuid, title: &str) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            message: String::new(),
            kind: NotificationKind::Info,
            read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivers_only_to_owner() {
        let hub = NotificationHub::new(8);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut alice_sub = hub.subscribe(alice);
        let _bob_sub = hub.subscribe(bob);

        assert_eq!(hub.publish(&note(alice, "hello")), 1);
        let received = alice_sub.recv().await.expect("notification");
        assert_eq!(received.title, "hello");
    }

    #[test]
    fn dropping_last_subscription_unsubscribes() {
        let hub = NotificationHub::new(8);
        let user = Uuid::new_v4();
        let first = hub.subscribe(user);
        let second = hub.subscribe(user);
        assert_eq!(hub.subscriber_count(user), 2);

        drop(first);
        assert_eq!(hub.subscriber_count(user), 1);
        drop(second);
        assert_eq!(hub.subscriber_count(user), 0);
        assert_eq!(hub.publish(&note(user, "nobody")), 0);
    }

    #[tokio::test]
    async fn push_persists_then_publishes() -> anyhow::Result<()> {
        let store = crate::remote::MemoryStore::new();
        let hub = NotificationHub::new(8);
        let user = Uuid::new_v4();
        let mut sub = hub.subscribe(user);

        let pushed = Notifier::new(&store, &hub)
            .push(user, "Order Update", "Order is now SHIPPED", NotificationKind::Info)
            .await;
        assert!(pushed.is_some());

        let live = sub.recv().await.expect("live notification");
        assert_eq!(live.title, "Order Update");
        assert_eq!(store.list_notifications(user).await?.len(), 1);
        Ok(())
    }
}
