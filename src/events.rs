use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::protocol::{Envelope, GameEvent, Tick, Topic};

/// Outbound envelopes kept between drains. Past this the oldest are dropped.
pub const OUTBOUND_LIMIT: usize = 8192;

/// Identity of a party holding subscriptions on the bus. Used to sweep every
/// subscription an owner made in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

#[derive(Debug)]
struct Subscription {
    id: SubscriptionId,
    owner: SubscriberId,
    topics: Vec<Topic>,
    mailbox: VecDeque<Envelope>,
}

/// Typed publish/subscribe bus.
///
/// Publishing stamps the event with the current tick and time, appends it to
/// the outbound log for the tick, and copies it into the mailbox of every
/// matching subscription. Subscribers drain their own mailbox; nothing is
/// delivered through callbacks, so handlers never run mid-publish.
///
/// The outbound log is bounded by [`OUTBOUND_LIMIT`]; an owner that never
/// calls [`EventBus::take_outbound`] loses the oldest envelopes first.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriberId, String)>,
    subscriptions: Vec<Subscription>,
    outbound: VecDeque<Envelope>,
    overflowed: usize,
    next_id: u32,
    tick: Tick,
    now_ms: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named subscriber identity.
    pub fn register(&mut self, name: &str) -> SubscriberId {
        self.next_id += 1;
        let id = SubscriberId(self.next_id);
        self.subscribers.push((id, name.to_string()));
        id
    }

    pub fn subscribe(&mut self, owner: SubscriberId, topics: &[Topic]) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription {
            id,
            owner,
            topics: topics.to_vec(),
            mailbox: VecDeque::new(),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscriptions.retain(|s| s.id != id);
    }

    /// Removes every subscription held by `owner`. Returns how many were dropped.
    pub fn sweep(&mut self, owner: SubscriberId) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.owner != owner);
        let dropped = before - self.subscriptions.len();
        if dropped > 0 {
            let name = self
                .subscribers
                .iter()
                .find(|(id, _)| *id == owner)
                .map(|(_, n)| n.as_str())
                .unwrap_or("?");
            debug!("Swept {} subscription(s) of {}", dropped, name);
        }
        dropped
    }

    /// Drops every subscription; used on teardown.
    pub fn sweep_all(&mut self) {
        self.subscriptions.clear();
        self.subscribers.clear();
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Sets the stamp applied to events published from now on.
    pub fn set_time(&mut self, tick: Tick, now_ms: u64) {
        self.tick = tick;
        self.now_ms = now_ms;
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn publish(&mut self, event: GameEvent) {
        let envelope = Envelope {
            tick: self.tick,
            at_ms: self.now_ms,
            event,
        };
        let topic = envelope.event.topic();
        for sub in self.subscriptions.iter_mut().filter(|s| s.topics.contains(&topic)) {
            sub.mailbox.push_back(envelope.clone());
        }
        if self.outbound.len() == OUTBOUND_LIMIT {
            self.outbound.pop_front();
            self.overflowed += 1;
        }
        self.outbound.push_back(envelope);
    }

    /// Takes every pending envelope from one subscription's mailbox.
    pub fn drain(&mut self, id: SubscriptionId) -> Vec<Envelope> {
        self.subscriptions
            .iter_mut()
            .find(|s| s.id == id)
            .map(|s| s.mailbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Takes the outbound log: everything published since the last call.
    pub fn take_outbound(&mut self) -> Vec<Envelope> {
        if self.overflowed > 0 {
            warn!("Outbound log overflowed; dropped {} oldest event(s)", self.overflowed);
            self.overflowed = 0;
        }
        std::mem::take(&mut self.outbound).into()
    }
}
