use std::collections::VecDeque;

use crate::Outbound;

/// Proof of holding the advisory send lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockToken(u64);

impl LockToken {
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub message: Outbound,
    /// Lock the original caller presented; the retry is made on its behalf.
    pub sender: Option<LockToken>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Send now.
    Dispatch(Outbound),
    /// Held back until the lock holder is done.
    Queued,
    /// A ping arriving behind a non-empty backlog.
    Dropped,
}

/// Lock and backlog bookkeeping for the outbound message gate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GateState {
    holder: Option<LockToken>,
    issued: u64,
    queue: VecDeque<QueuedMessage>,
}

impl GateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock if nobody holds it.
    pub fn acquire(&mut self) -> Option<LockToken> {
        if self.holder.is_some() {
            return None;
        }
        self.issued += 1;
        let token = LockToken(self.issued);
        self.holder = Some(token);
        Some(token)
    }

    /// Returns true when the gate is unlocked afterwards because `token` was
    /// the holder or nobody held the lock. A foreign token changes nothing.
    pub fn release(&mut self, token: LockToken) -> bool {
        match self.holder {
            None => true,
            Some(holder) if holder == token => {
                self.holder = None;
                true
            }
            Some(_) => false,
        }
    }

    pub fn holder(&self) -> Option<LockToken> {
        self.holder
    }

    pub fn is_locked(&self) -> bool {
        self.holder.is_some()
    }

    pub fn is_locked_against(&self, sender: Option<LockToken>) -> bool {
        match self.holder {
            None => false,
            Some(holder) => sender != Some(holder),
        }
    }

    pub fn admit(&mut self, message: Outbound, sender: Option<LockToken>) -> Admission {
        if !self.is_locked_against(sender) {
            return Admission::Dispatch(message);
        }
        if message.is_ping() && !self.queue.is_empty() {
            return Admission::Dropped;
        }
        self.queue.push_back(QueuedMessage { message, sender });
        Admission::Queued
    }

    pub fn next_queued(&mut self) -> Option<QueuedMessage> {
        self.queue.pop_front()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}
