use std::collections::HashMap;

use uuid::Uuid;

use crate::session::{GameSession, SpinPlan};

/// Where a lookup step reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource<'a> {
    Owner(&'a str),
    /// Snapshot of the most recently started spin, shared by every viewer.
    Current,
    /// Owner session with the latest target time among the eligible ones.
    Newest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    HasWinner,
    HasTarget,
    Running,
}

impl Eligibility {
    fn admits(self, session: &GameSession) -> bool {
        match self {
            Eligibility::HasWinner => session.winner.is_some(),
            Eligibility::HasTarget => session.target_time.is_some(),
            Eligibility::Running => session.running && session.target_time.is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup<'a> {
    pub source: SessionSource<'a>,
    pub require: Eligibility,
}

impl<'a> Lookup<'a> {
    pub const fn new(source: SessionSource<'a>, require: Eligibility) -> Self {
        Self { source, require }
    }
}

/// Order used when a client confirms the winner after its animation ends.
pub fn confirm_chain(owner: &str) -> [Lookup<'_>; 3] {
    [
        Lookup::new(SessionSource::Owner(owner), Eligibility::HasWinner),
        Lookup::new(SessionSource::Current, Eligibility::HasWinner),
        Lookup::new(SessionSource::Newest, Eligibility::HasWinner),
    ]
}

/// Order used when a client joins and asks what is going on.
pub fn status_chain(owner: &str) -> [Lookup<'_>; 3] {
    [
        Lookup::new(SessionSource::Current, Eligibility::HasTarget),
        Lookup::new(SessionSource::Owner(owner), Eligibility::HasTarget),
        Lookup::new(SessionSource::Newest, Eligibility::Running),
    ]
}

/// One session per owner plus the `current` alias.
///
/// Not synchronized itself; the backend keeps it behind a single lock so every
/// read and write of a session, and of the alias, is serialized.
#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    sessions: HashMap<String, GameSession>,
    current: Option<GameSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the owner's session with `plan` and snapshots it into the alias.
    pub fn start(&mut self, owner: &str, plan: &SpinPlan) -> GameSession {
        let session = self
            .sessions
            .entry(owner.to_string())
            .or_insert_with(|| GameSession::idle(owner));
        session.arm(plan);
        let snapshot = session.clone();
        self.current = Some(snapshot.clone());
        snapshot
    }

    pub fn put(&mut self, session: GameSession) {
        self.current = Some(session.clone());
        self.sessions.insert(session.owner_id.clone(), session);
    }

    pub fn get(&self, owner: &str) -> Option<&GameSession> {
        self.sessions.get(owner)
    }

    pub fn current(&self) -> Option<&GameSession> {
        self.current.as_ref()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// End-transition for a spin. Only the owner entry changes; the alias keeps its snapshot.
    pub fn finish(&mut self, owner: &str, spin_id: Uuid) -> bool {
        self.sessions
            .get_mut(owner)
            .map(|s| s.finish(spin_id))
            .unwrap_or(false)
    }

    pub fn settle(&mut self, owner: &str) -> bool {
        match self.sessions.get_mut(owner) {
            Some(session) if session.running => {
                session.settle();
                true
            }
            _ => false,
        }
    }

    pub fn mark_announced(&mut self, owner: &str) {
        if let Some(session) = self.sessions.get_mut(owner) {
            session.winner_announced = true;
        }
    }

    /// Owner session with the greatest target time that has a winner.
    pub fn scan_newest_with_winner(&self) -> Option<&GameSession> {
        self.newest(Eligibility::HasWinner)
    }

    pub fn find(&self, lookup: &Lookup<'_>) -> Option<&GameSession> {
        match lookup.source {
            SessionSource::Owner(owner) => self
                .sessions
                .get(owner)
                .filter(|s| lookup.require.admits(s)),
            SessionSource::Current => self
                .current
                .as_ref()
                .filter(|s| lookup.require.admits(s)),
            SessionSource::Newest => self.newest(lookup.require),
        }
    }

    /// First session matched by `chain`, tried in order.
    pub fn resolve_active(&self, chain: &[Lookup<'_>]) -> Option<&GameSession> {
        chain.iter().find_map(|lookup| self.find(lookup))
    }

    fn newest(&self, require: Eligibility) -> Option<&GameSession> {
        self.sessions
            .values()
            .filter(|s| s.target_time.is_some() && require.admits(s))
            .max_by_key(|s| s.target_time)
    }
}
