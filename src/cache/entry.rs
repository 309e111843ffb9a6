//! The data kept for a single name and type.

use super::credibility::Credibility;
use crate::base::iana::Rtype;
use crate::base::record::Rrset;
use std::time::Duration;

/// The record type used for negative entries covering all types.
///
/// A negative entry of this type records that the name doesn’t exist at
/// all, i.e., an NXDOMAIN response.
pub const NXDOMAIN_TYPE: Rtype = Rtype::from_int(0);

//------------ CacheEntry ----------------------------------------------------

/// A cached record set or the cached absence of one.
///
/// All times are measured by the cache’s clock. An entry is expired once
/// that clock has reached `expire_at`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CacheEntry {
    /// A record set.
    Positive {
        rrset: Rrset,
        credibility: Credibility,
        expire_at: Duration,
    },

    /// The knowledge that there is no data of type `qtype`.
    ///
    /// If `qtype` is [`NXDOMAIN_TYPE`], the name doesn’t exist.
    Negative {
        qtype: Rtype,
        credibility: Credibility,
        expire_at: Duration,
    },
}

impl CacheEntry {
    /// Creates a positive entry.
    ///
    /// The entry expires after the TTL of the set but no later than
    /// `max_ttl` from `now`.
    pub(super) fn positive(
        rrset: Rrset,
        credibility: Credibility,
        now: Duration,
        max_ttl: Duration,
    ) -> Self {
        let expire_at = now + limit_ttl(rrset.ttl(), max_ttl);
        CacheEntry::Positive {
            rrset,
            credibility,
            expire_at,
        }
    }

    /// Creates a negative entry.
    pub(super) fn negative(
        qtype: Rtype,
        ttl: u32,
        credibility: Credibility,
        now: Duration,
        max_ttl: Duration,
    ) -> Self {
        CacheEntry::Negative {
            qtype,
            credibility,
            expire_at: now + limit_ttl(ttl, max_ttl),
        }
    }

    /// Returns the record type the entry is for.
    #[must_use]
    pub fn rtype(&self) -> Rtype {
        match *self {
            CacheEntry::Positive { ref rrset, .. } => rrset.rtype(),
            CacheEntry::Negative { qtype, .. } => qtype,
        }
    }

    #[must_use]
    pub fn credibility(&self) -> Credibility {
        match *self {
            CacheEntry::Positive { credibility, .. }
            | CacheEntry::Negative { credibility, .. } => credibility,
        }
    }

    #[must_use]
    pub fn expire_at(&self) -> Duration {
        match *self {
            CacheEntry::Positive { expire_at, .. }
            | CacheEntry::Negative { expire_at, .. } => expire_at,
        }
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        matches!(*self, CacheEntry::Negative { .. })
    }

    /// Returns whether the entry has expired at time `now`.
    #[must_use]
    pub fn is_expired(&self, now: Duration) -> bool {
        now >= self.expire_at()
    }

    /// Returns the record set with the TTL reduced to the remaining time.
    ///
    /// Returns `None` for negative entries.
    #[must_use]
    pub fn rrset_at(&self, now: Duration) -> Option<Rrset> {
        match *self {
            CacheEntry::Positive {
                ref rrset,
                expire_at,
                ..
            } => {
                let mut rrset = rrset.clone();
                let remaining = expire_at.saturating_sub(now).as_secs();
                rrset.set_ttl(u32::try_from(remaining).unwrap_or(u32::MAX));
                Some(rrset)
            }
            CacheEntry::Negative { .. } => None,
        }
    }

    /// Merges the data of `rrset` into a positive entry.
    ///
    /// The entry then expires at the earlier of its old expiry and the
    /// expiry of `rrset`. Negative entries are left untouched.
    pub(super) fn merge(
        &mut self,
        other: &Rrset,
        now: Duration,
        max_ttl: Duration,
    ) {
        if let CacheEntry::Positive {
            ref mut rrset,
            ref mut expire_at,
            ..
        } = *self
        {
            rrset.merge(other);
            *expire_at =
                (*expire_at).min(now + limit_ttl(other.ttl(), max_ttl));
        }
    }
}

/// Returns the lifetime for a TTL capped at `max_ttl`.
fn limit_ttl(ttl: u32, max_ttl: Duration) -> Duration {
    Duration::from_secs(ttl.into()).min(max_ttl)
}
