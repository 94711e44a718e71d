//! In-process backend simulating several ranks with threads
use crate::{
    config::Settings,
    error::{Error, Result},
    traits::Communicator,
    types::{Element, Tag},
};
use itertools::Itertools;
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

struct Envelope {
    source: usize,
    tag: Tag,
    payload: Box<dyn Any + Send>,
}

/// One rank of a [LocalUniverse]
///
/// Sends never block. Receives match on `(source, tag)` and preserve the order in which
/// messages with the same source and tag were sent; other messages that arrive meanwhile are
/// parked until someone asks for them.
pub struct LocalComm {
    rank: usize,
    peers: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    pending: RefCell<VecDeque<Envelope>>,
    timeout: Duration,
}

impl LocalComm {
    fn check_rank(&self, rank: usize) -> Result<()> {
        if rank >= self.peers.len() {
            Err(Error::InvalidRank {
                rank,
                size: self.peers.len(),
            })
        } else {
            Ok(())
        }
    }

    fn unpack<T: Element>(envelope: Envelope) -> Result<Vec<T>> {
        let Envelope {
            source,
            tag,
            payload,
        } = envelope;
        payload
            .downcast::<Vec<T>>()
            .map(|data| *data)
            .map_err(|_| Error::TypeMismatch { from: source, tag })
    }
}

impl std::fmt::Debug for LocalComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalComm")
            .field("rank", &self.rank)
            .field("size", &self.peers.len())
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send<T: Element>(&self, data: &[T], dest: usize, tag: Tag) -> Result<()> {
        self.check_rank(dest)?;
        self.peers[dest]
            .send(Envelope {
                source: self.rank,
                tag,
                payload: Box::new(data.to_vec()),
            })
            .map_err(|_| Error::Disconnected(self.rank))
    }

    fn receive<T: Element>(&self, source: usize, tag: Tag) -> Result<Vec<T>> {
        self.check_rank(source)?;
        {
            let mut pending = self.pending.borrow_mut();
            if let Some(pos) = pending
                .iter()
                .position(|e| e.source == source && e.tag == tag)
            {
                if let Some(envelope) = pending.remove(pos) {
                    return Self::unpack(envelope);
                }
            }
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.inbox.recv_timeout(remaining) {
                Ok(envelope) if envelope.source == source && envelope.tag == tag => {
                    return Self::unpack(envelope);
                }
                Ok(envelope) => self.pending.borrow_mut().push_back(envelope),
                Err(RecvTimeoutError::Timeout) => {
                    tracing::error!(rank = self.rank, source, tag, "receive timed out");
                    return Err(Error::Timeout {
                        rank: self.rank,
                        from: source,
                        tag,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => return Err(Error::Disconnected(self.rank)),
            }
        }
    }
}

/// A group of ranks living in threads of the current process
#[derive(Debug, Clone)]
pub struct LocalUniverse {
    size: usize,
    timeout: Duration,
}

impl LocalUniverse {
    /// Universe with `size` ranks and the default receive timeout
    ///
    /// # Panics
    /// If `size` is zero.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "a universe needs at least one rank");
        Self {
            size,
            timeout: Settings::default().comm_timeout,
        }
    }

    /// Universe with `size` ranks and the receive timeout from `settings`
    pub fn with_settings(size: usize, settings: &Settings) -> Self {
        Self::new(size).with_timeout(settings.comm_timeout)
    }

    /// Set the receive timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of ranks
    pub fn size(&self) -> usize {
        self.size
    }

    /// Create one connected communicator per rank
    pub fn split(&self) -> Vec<LocalComm> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..self.size).map(|_| channel()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalComm {
                rank,
                peers: senders.clone(),
                inbox,
                pending: RefCell::new(VecDeque::new()),
                timeout: self.timeout,
            })
            .collect()
    }

    /// Run `f` on every rank, one thread per rank, and collect the results in rank order
    ///
    /// If ranks fail, the first error that is not a timeout is returned, since timeouts are
    /// usually a consequence of another rank giving up. A panicking rank is reported as
    /// [Error::RankPanicked].
    pub fn run<R, F>(&self, f: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(&LocalComm) -> Result<R> + Sync,
    {
        let comms = self.split();
        let joined = thread::scope(|scope| {
            let handles = comms
                .into_iter()
                .map(|comm| {
                    let f = &f;
                    scope.spawn(move || {
                        let _span = tracing::debug_span!("rank", rank = comm.rank()).entered();
                        f(&comm)
                    })
                })
                .collect_vec();
            handles.into_iter().map(|h| h.join()).collect_vec()
        });

        let mut results = Vec::with_capacity(self.size);
        let mut first_error = None;
        for (rank, outcome) in joined.into_iter().enumerate() {
            match outcome {
                Err(_) => return Err(Error::RankPanicked(rank)),
                Ok(Ok(value)) => results.push(value),
                Ok(Err(e)) => {
                    let replace = match &first_error {
                        None => true,
                        Some(Error::Timeout { .. }) => !matches!(e, Error::Timeout { .. }),
                        Some(_) => false,
                    };
                    if replace {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}
