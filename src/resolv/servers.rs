//! Choosing servers and counting queries.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::vec::Vec;

//------------ ServerList ----------------------------------------------------

/// The configured servers.
#[derive(Clone, Debug)]
pub(crate) struct ServerList {
    /// The actual list of servers.
    servers: Arc<[SocketAddr]>,

    /// Where to start accessing the list.
    ///
    /// In rotate mode, this value will always keep growing and will have to
    /// be used modulo `servers`’s length.
    start: Arc<AtomicUsize>,
}

impl ServerList {
    pub fn new(servers: Vec<SocketAddr>) -> Self {
        ServerList {
            servers: servers.into(),
            start: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Returns a stream over the servers.
    ///
    /// The list is run through `attempts` times. If `rotate` is set, the
    /// next stream will start one server later.
    pub fn stream(&self, attempts: usize, rotate: bool) -> ServerStream {
        let offset = if rotate {
            self.start.fetch_add(1, Ordering::Relaxed)
        } else {
            0
        };
        ServerStream::new(self.servers.clone(), offset, attempts)
    }
}

//------------ ServerStream --------------------------------------------------

/// The sequence of servers to send a question to.
///
/// This is an iterator over server addresses. It visits each server once
/// per attempt, starting at some offset into the list.
#[derive(Clone, Debug)]
pub(crate) struct ServerStream {
    servers: Arc<[SocketAddr]>,
    cur: usize,
    end: usize,
}

impl ServerStream {
    fn new(servers: Arc<[SocketAddr]>, offset: usize, attempts: usize) -> Self {
        if servers.is_empty() {
            return ServerStream {
                servers,
                cur: 0,
                end: 0,
            };
        }
        // We modulo the start value here to prevent hick-ups towards the
        // end of usize’s range.
        let cur = offset % servers.len();
        let end = cur + servers.len() * attempts;
        ServerStream { servers, cur, end }
    }

    /// Creates a stream that tries each of `servers` once in order.
    pub fn once(servers: Vec<SocketAddr>) -> Self {
        Self::new(servers.into(), 0, 1)
    }
}

impl Iterator for ServerStream {
    type Item = SocketAddr;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur >= self.end {
            return None;
        }
        let res = self.servers[self.cur % self.servers.len()];
        self.cur += 1;
        Some(res)
    }
}

//------------ Budget --------------------------------------------------------

/// The number of queries a resolution may still issue.
///
/// The budget only ever decreases.
#[derive(Debug)]
pub(crate) struct Budget {
    total: u32,
    remaining: AtomicU32,
}

impl Budget {
    pub fn new(total: u32) -> Self {
        Budget {
            total,
            remaining: AtomicU32::new(total),
        }
    }

    /// Takes one query from the budget.
    ///
    /// Returns `false` if the budget is exhausted.
    pub fn take(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Returns the number of queries issued so far.
    pub fn used(&self) -> u32 {
        self.total - self.remaining.load(Ordering::Relaxed)
    }
}

//============ Testing =======================================================
