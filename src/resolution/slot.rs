use crate::structs::ResolvedMedia;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SlotTarget {
    index: usize,
    item_id: String,
}

#[derive(Debug, Default)]
struct SlotState {
    target: Option<SlotTarget>,
    /// Bumped on every reservation or invalidation. Prefetch results carry the
    /// generation they were started under and are dropped if it moved on.
    generation: u64,
    ready: Option<ResolvedMedia>,
}

/// Proof that a prefetch was started for a given slot target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTicket {
    index: usize,
    generation: u64,
}

impl SlotTicket {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// The single resolved-but-unconsumed link, shared between the sequencer and the
/// resolution cache.
///
/// Every operation takes the lock once, so "check the target, then consume or
/// invalidate" is atomic with respect to a concurrently completing prefetch.
#[derive(Debug, Default)]
pub struct PrefetchSlot {
    state: Mutex<SlotState>,
}

impl PrefetchSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Index the slot is currently reserved for, whether or not its link has arrived.
    pub fn target(&self) -> Option<usize> {
        self.lock().target.as_ref().map(|target| target.index)
    }

    pub fn is_ready(&self) -> bool {
        self.lock().ready.is_some()
    }

    /// Reserves the slot for `index`, superseding any other reservation.
    ///
    /// Returns `None` when the slot already targets this exact item, in which case no new
    /// prefetch should be started.
    pub fn reserve(&self, index: usize, item_id: &str) -> Option<SlotTicket> {
        let mut state = self.lock();
        let wanted = SlotTarget {
            index,
            item_id: item_id.to_string(),
        };
        if state.target.as_ref() == Some(&wanted) {
            return None;
        }
        state.generation += 1;
        state.target = Some(wanted);
        state.ready = None;
        Some(SlotTicket {
            index,
            generation: state.generation,
        })
    }

    /// Stores a prefetch result. Returns `false` (and drops the result) when the slot was
    /// re-targeted or invalidated after the ticket was issued.
    pub fn fill(&self, ticket: SlotTicket, media: ResolvedMedia) -> bool {
        let mut state = self.lock();
        let still_wanted = state.generation == ticket.generation
            && state.target.as_ref().map(|target| target.index) == Some(ticket.index);
        if still_wanted {
            state.ready = Some(media);
        }
        still_wanted
    }

    /// Releases a reservation whose prefetch failed, so a later attempt can retry it.
    pub fn abandon(&self, ticket: SlotTicket) {
        let mut state = self.lock();
        if state.generation == ticket.generation {
            state.generation += 1;
            state.target = None;
            state.ready = None;
        }
    }

    /// Takes the prefetched link for `index` if it is ready, belongs to `item_id` and is
    /// younger than `max_age`.
    ///
    /// A matching reservation that has not completed yet is invalidated: the caller is
    /// about to resolve the item itself, and the late result must not linger in the slot.
    pub fn claim(&self, index: usize, item_id: &str, max_age: Duration) -> Option<ResolvedMedia> {
        let mut state = self.lock();
        let matches = state
            .target
            .as_ref()
            .is_some_and(|target| target.index == index && target.item_id == item_id);
        if !matches {
            return None;
        }
        let ready = state.ready.take();
        state.generation += 1;
        state.target = None;

        let media = ready?;
        let age = Utc::now()
            .signed_duration_since(media.resolved_at)
            .to_std()
            .unwrap_or_default();
        (age <= max_age).then_some(media)
    }

    /// Keeps the slot only if it is reserved for `index`; otherwise invalidates it.
    pub fn retain_only(&self, index: usize) {
        let mut state = self.lock();
        if state.target.as_ref().is_some_and(|target| target.index != index) {
            state.generation += 1;
            state.target = None;
            state.ready = None;
        }
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.target = None;
        state.ready = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn media(item_id: &str) -> ResolvedMedia {
        ResolvedMedia {
            item_id: item_id.to_string(),
            url: format!("https://d.example.com/file/{item_id}"),
            resolved_at: Utc::now(),
        }
    }

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_fill_then_claim() {
        let slot = PrefetchSlot::new();
        let ticket = slot.reserve(3, "c").expect("fresh reservation");
        assert!(slot.fill(ticket, media("c")));
        assert!(slot.is_ready());

        let claimed = slot.claim(3, "c", TTL).expect("ready link");
        assert_eq!(claimed.item_id, "c");
        assert_eq!(slot.target(), None, "claim empties the slot");
    }

    #[test]
    fn test_reserving_same_target_twice_is_refused() {
        let slot = PrefetchSlot::new();
        assert!(slot.reserve(1, "a").is_some());
        assert!(slot.reserve(1, "a").is_none());
    }

    #[test]
    fn test_superseded_prefetch_is_discarded() {
        let slot = PrefetchSlot::new();
        let stale = slot.reserve(1, "a").unwrap();
        let fresh = slot.reserve(2, "b").unwrap();

        assert!(!slot.fill(stale, media("a")), "stale result must be dropped");
        assert!(!slot.is_ready());
        assert!(slot.fill(fresh, media("b")));
        assert_eq!(slot.target(), Some(2));
    }

    #[test]
    fn test_retain_only_invalidates_other_targets() {
        let slot = PrefetchSlot::new();
        let ticket = slot.reserve(4, "d").unwrap();
        slot.retain_only(4);
        assert_eq!(slot.target(), Some(4));

        slot.retain_only(0);
        assert_eq!(slot.target(), None);
        assert!(!slot.fill(ticket, media("d")));
    }

    #[test]
    fn test_claim_with_wrong_item_id_leaves_slot_untouched() {
        let slot = PrefetchSlot::new();
        let ticket = slot.reserve(2, "b").unwrap();
        slot.fill(ticket, media("b"));

        assert!(slot.claim(2, "other", TTL).is_none());
        assert!(slot.is_ready());
    }

    #[test]
    fn test_claim_of_in_flight_reservation_discards_late_result() {
        let slot = PrefetchSlot::new();
        let ticket = slot.reserve(2, "b").unwrap();

        assert!(slot.claim(2, "b", TTL).is_none());
        assert!(!slot.fill(ticket, media("b")));
        assert_eq!(slot.target(), None);
    }

    #[test]
    fn test_expired_link_is_not_handed_out() {
        let slot = PrefetchSlot::new();
        let ticket = slot.reserve(0, "a").unwrap();
        let mut old = media("a");
        old.resolved_at = Utc::now() - TimeDelta::minutes(10);
        slot.fill(ticket, old);

        assert!(slot.claim(0, "a", Duration::from_secs(60)).is_none());
        assert_eq!(slot.target(), None);
    }

    #[test]
    fn test_abandon_allows_retry() {
        let slot = PrefetchSlot::new();
        let ticket = slot.reserve(5, "e").unwrap();
        slot.abandon(ticket);
        assert!(slot.reserve(5, "e").is_some());
    }
}
