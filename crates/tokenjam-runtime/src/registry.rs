//! Subscriber registry and snapshot fan-out.
//!
//! Each subscriber owns a bounded outbound queue drained by its transport.
//! Fan-out never blocks: a full queue drops the snapshot being offered, and
//! a closed queue or fired stop signal removes the subscriber.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokenjam_core::{Assignment, PlayerView, SessionSnapshot, SubscriberId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct Subscriber {
    tx: mpsc::Sender<PlayerView>,
    stop: CancellationToken,
    last_active: Instant,
}

/// Connected subscribers, owned by the session actor.
#[derive(Default)]
pub(crate) struct Registry {
    subscribers: BTreeMap<SubscriberId, Subscriber>,
    dropped: u64,
}

impl Registry {
    pub(crate) fn register(
        &mut self,
        id: SubscriberId,
        tx: mpsc::Sender<PlayerView>,
        stop: CancellationToken,
        now: Instant,
    ) {
        let _ = self.subscribers.insert(
            id,
            Subscriber {
                tx,
                stop,
                last_active: now,
            },
        );
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub(crate) fn remove(&mut self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Record inbound activity.
    pub(crate) fn touch(&mut self, id: SubscriberId, now: Instant) {
        if let Some(sub) = self.subscribers.get_mut(&id) {
            sub.last_active = now;
        }
    }

    /// Subscribers idle for longer than `threshold`.
    pub(crate) fn idle(&self, now: Instant, threshold: Duration) -> Vec<SubscriberId> {
        self.subscribers
            .iter()
            .filter(|(_, s)| now.saturating_duration_since(s.last_active) > threshold)
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Snapshots dropped on full queues since startup.
    pub(crate) fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Offer `snapshot` to every subscriber, stamped with its own token.
    ///
    /// Returns the subscribers removed because their queue closed or their
    /// stop signal fired.
    pub(crate) fn broadcast(
        &mut self,
        snapshot: &Arc<SessionSnapshot>,
        assignment: &Assignment,
    ) -> Vec<SubscriberId> {
        let mut departed = Vec::new();
        for (&id, sub) in &self.subscribers {
            if sub.stop.is_cancelled() {
                departed.push(id);
                continue;
            }
            let view = PlayerView::new(Arc::clone(snapshot), id, assignment.token_of(id));
            match sub.tx.try_send(view) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped += 1;
                    debug!(subscriber_id = %id, "outbound queue full, snapshot dropped");
                }
                Err(TrySendError::Closed(_)) => departed.push(id),
            }
        }
        for id in &departed {
            let _ = self.subscribers.remove(id);
        }
        departed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn snapshot() -> Arc<SessionSnapshot> {
        Arc::new(SessionSnapshot {
            puzzle_goal: "g".into(),
            eval_output: "<n/a>".into(),
            tokens: vec![],
            puzzle_id: 0,
            occupant_count: 0,
            spectator_count: 0,
            started: false,
            level_clear: false,
        })
    }

    fn sid(n: u64) -> SubscriberId {
        SubscriberId::from_raw(n)
    }

    #[test]
    fn broadcast_stamps_each_subscriber() {
        let mut reg = Registry::default();
        let mut assignment = Assignment::new(1);
        let mut rng = StdRng::seed_from_u64(1);
        let now = Instant::now();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        reg.register(sid(1), tx1, CancellationToken::new(), now);
        reg.register(sid(2), tx2, CancellationToken::new(), now);
        let _ = assignment.join(sid(1), &mut rng);
        let _ = assignment.join(sid(2), &mut rng);

        assert!(reg.broadcast(&snapshot(), &assignment).is_empty());
        let v1 = rx1.try_recv().unwrap();
        let v2 = rx2.try_recv().unwrap();
        assert_eq!(v1.subscriber_id, sid(1));
        assert_eq!(v1.assigned_token(), Some(0));
        assert_eq!(v2.assigned_token(), None);
    }

    #[test]
    fn full_queue_drops_newest() {
        let mut reg = Registry::default();
        let assignment = Assignment::new(0);
        let (tx, mut rx) = mpsc::channel(1);
        reg.register(sid(1), tx, CancellationToken::new(), Instant::now());

        let first = snapshot();
        let mut second = (*first).clone();
        second.puzzle_id = 1;
        assert!(reg.broadcast(&first, &assignment).is_empty());
        assert!(reg.broadcast(&Arc::new(second), &assignment).is_empty());

        assert_eq!(reg.dropped(), 1);
        assert_eq!(rx.try_recv().unwrap().snapshot.puzzle_id, 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn closed_queue_departs() {
        let mut reg = Registry::default();
        let (tx, rx) = mpsc::channel(1);
        reg.register(sid(1), tx, CancellationToken::new(), Instant::now());
        drop(rx);
        assert_eq!(reg.broadcast(&snapshot(), &Assignment::new(0)), vec![sid(1)]);
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn fired_stop_departs_without_delivery() {
        let mut reg = Registry::default();
        let (tx, mut rx) = mpsc::channel(1);
        let stop = CancellationToken::new();
        reg.register(sid(1), tx, stop.clone(), Instant::now());
        stop.cancel();
        assert_eq!(reg.broadcast(&snapshot(), &Assignment::new(0)), vec![sid(1)]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn idle_uses_last_activity() {
        let mut reg = Registry::default();
        let t0 = Instant::now();
        let (tx1, _rx1) = mpsc::channel(1);
        let (tx2, _rx2) = mpsc::channel(1);
        reg.register(sid(1), tx1, CancellationToken::new(), t0);
        reg.register(sid(2), tx2, CancellationToken::new(), t0);
        reg.touch(sid(2), t0 + Duration::from_millis(900));

        let later = t0 + Duration::from_millis(1500);
        assert_eq!(reg.idle(later, Duration::from_secs(1)), vec![sid(1)]);
        assert!(reg.remove(sid(1)));
        assert!(!reg.remove(sid(1)));
    }
}
