//! Subscriber ↔ token binding.
//!
//! Every connected subscriber is a member. A member holds at most one
//! token and a token is held by at most one member; members without a
//! token are spectators. Free tokens are handed out at random so whoever
//! connects first does not always get token 0.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand::seq::SliceRandom;

use crate::ids::SubscriberId;

/// A token handed to a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rebinding {
    /// New holder.
    pub subscriber: SubscriberId,
    /// Token index.
    pub token: usize,
}

/// A token moved from an idle holder to a spectator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Handover {
    /// Previous holder, now a spectator.
    pub from: SubscriberId,
    /// New holder.
    pub to: SubscriberId,
    /// Token index.
    pub token: usize,
}

/// Outcome of a subscriber leaving.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Departure {
    /// Token the subscriber held, if any.
    pub freed: Option<usize>,
    /// Bindings made by the reassignment pass that followed.
    pub rebound: Vec<Rebinding>,
}

/// Binding table for one puzzle's tokens.
#[derive(Clone, Debug, Default)]
pub struct Assignment {
    token_count: usize,
    members: BTreeMap<SubscriberId, Option<usize>>,
    unassigned: BTreeSet<usize>,
}

impl Assignment {
    /// Create a table for `token_count` tokens with no members.
    pub fn new(token_count: usize) -> Self {
        Self {
            token_count,
            members: BTreeMap::new(),
            unassigned: (0..token_count).collect(),
        }
    }

    /// Unbind every member and mark `0..token_count` unassigned.
    ///
    /// Members stay registered as spectators; follow with
    /// [`Assignment::reassign`] to hand out the new tokens.
    pub fn reset(&mut self, token_count: usize) {
        self.token_count = token_count;
        self.unassigned = (0..token_count).collect();
        for slot in self.members.values_mut() {
            *slot = None;
        }
    }

    /// Register a subscriber and bind it to a random free token, if any.
    ///
    /// Re-joining an existing member is a no-op that returns its token.
    pub fn join<R: Rng + ?Sized>(&mut self, id: SubscriberId, rng: &mut R) -> Option<usize> {
        if let Some(held) = self.members.get(&id) {
            return *held;
        }
        let token = self.take_random_free(rng);
        let _ = self.members.insert(id, token);
        token
    }

    /// Remove a subscriber; a token it held is offered to the spectators.
    pub fn leave<R: Rng + ?Sized>(&mut self, id: SubscriberId, rng: &mut R) -> Departure {
        let Some(held) = self.members.remove(&id) else {
            return Departure::default();
        };
        match held {
            Some(token) => {
                let _ = self.unassigned.insert(token);
                Departure {
                    freed: Some(token),
                    rebound: self.reassign(rng),
                }
            }
            None => Departure::default(),
        }
    }

    /// Pair spectators with free tokens at random until one side runs out.
    pub fn reassign<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<Rebinding> {
        let mut spectators: Vec<SubscriberId> = self
            .members
            .iter()
            .filter(|(_, held)| held.is_none())
            .map(|(id, _)| *id)
            .collect();
        let mut free: Vec<usize> = self.unassigned.iter().copied().collect();
        spectators.shuffle(rng);
        free.shuffle(rng);

        let rebound: Vec<Rebinding> = spectators
            .into_iter()
            .zip(free)
            .map(|(subscriber, token)| Rebinding { subscriber, token })
            .collect();
        for r in &rebound {
            let _ = self.unassigned.remove(&r.token);
            let _ = self.members.insert(r.subscriber, Some(r.token));
        }
        rebound
    }

    /// Move tokens from idle holders to random spectators.
    ///
    /// Holders listed in `stale` that hold nothing, or are not members,
    /// are skipped. Stops when spectators run out.
    pub fn hand_over_stale<R: Rng + ?Sized>(
        &mut self,
        stale: &[SubscriberId],
        rng: &mut R,
    ) -> Vec<Handover> {
        let mut spectators: Vec<SubscriberId> = self
            .members
            .iter()
            .filter(|(_, held)| held.is_none())
            .map(|(id, _)| *id)
            .collect();
        spectators.shuffle(rng);

        let mut handovers = Vec::new();
        for &from in stale {
            let Some(Some(token)) = self.members.get(&from).copied() else {
                continue;
            };
            let Some(to) = spectators.pop() else {
                break;
            };
            let _ = self.members.insert(from, None);
            let _ = self.members.insert(to, Some(token));
            handovers.push(Handover { from, to, token });
        }
        handovers
    }

    /// Token held by `id`.
    pub fn token_of(&self, id: SubscriberId) -> Option<usize> {
        self.members.get(&id).copied().flatten()
    }

    /// Whether `id` is a registered member.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.members.contains_key(&id)
    }

    /// Number of registered members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Number of members holding a token.
    pub fn occupant_count(&self) -> usize {
        self.members.values().filter(|held| held.is_some()).count()
    }

    /// Number of members without a token.
    pub fn spectator_count(&self) -> usize {
        self.member_count() - self.occupant_count()
    }

    /// Token indices nobody holds.
    pub fn unassigned(&self) -> impl Iterator<Item = usize> + '_ {
        self.unassigned.iter().copied()
    }

    /// Number of tokens this table covers.
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Bindings are unique, in range, and together with the free set
    /// cover exactly `0..token_count`.
    pub fn is_consistent(&self) -> bool {
        let mut seen = BTreeSet::new();
        for token in self.members.values().flatten() {
            if *token >= self.token_count || !seen.insert(*token) {
                return false;
            }
        }
        if self.unassigned.iter().any(|t| seen.contains(t) || *t >= self.token_count) {
            return false;
        }
        seen.len() + self.unassigned.len() == self.token_count
    }

    fn take_random_free<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if self.unassigned.is_empty() {
            return None;
        }
        let pick = rng.random_range(0..self.unassigned.len());
        let token = self.unassigned.iter().nth(pick).copied()?;
        let _ = self.unassigned.remove(&token);
        Some(token)
    }
}
