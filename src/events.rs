//! Fan-out of notifications to any number of subscribers.

use std::sync::mpsc::{self, Receiver, Sender};

/// A list of channel senders; disconnected subscribers are pruned on the next emit.
#[derive(Debug)]
pub struct Subscribers<E> {
    senders: Vec<Sender<E>>,
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self {
            senders: Vec::new(),
        }
    }
}

impl<E: Clone> Subscribers<E> {
    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    pub fn emit(&mut self, event: E) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_each_event() {
        let mut subs = Subscribers::default();
        let a = subs.subscribe();
        let b = subs.subscribe();
        subs.emit(7u32);
        assert_eq!(a.try_recv(), Ok(7));
        assert_eq!(b.try_recv(), Ok(7));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut subs = Subscribers::default();
        let keep = subs.subscribe();
        drop(subs.subscribe());
        subs.emit("x");
        assert_eq!(subs.len(), 1);
        assert_eq!(keep.try_recv(), Ok("x"));
    }
}
