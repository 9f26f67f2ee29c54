use std::cell::Cell;
use std::fmt;

thread_local! {
    static CENSUS: CensusState = const { CensusState::new() };
}

/// Per-thread counters behind [`Census`].
///
/// The test harness runs every test on its own thread, so each test observes a census that
/// only it contributes to.
struct CensusState {
    created: Cell<usize>,
    cloned: Cell<usize>,
    dropped: Cell<usize>,

    /// Number of clones that may still succeed before the next one panics.
    clones_until_panic: Cell<Option<usize>>,

    /// Number of default constructions that may still succeed before the next one panics.
    defaults_until_panic: Cell<Option<usize>>,
}

impl CensusState {
    const fn new() -> Self {
        Self {
            created: Cell::new(0),
            cloned: Cell::new(0),
            dropped: Cell::new(0),
            clones_until_panic: Cell::new(None),
            defaults_until_panic: Cell::new(None),
        }
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(
        counter
            .get()
            .checked_add(1)
            .expect("test code never creates usize::MAX specimens"),
    );
}

/// Consumes one unit of a panic budget. Returns `true` if the budget was exhausted, in which
/// case the budget is disarmed so that later operations (including cleanup) succeed.
fn budget_exhausted(budget: &Cell<Option<usize>>) -> bool {
    match budget.get() {
        None => false,
        Some(0) => {
            budget.set(None);
            true
        }
        Some(remaining) => {
            budget.set(Some(remaining.wrapping_sub(1)));
            false
        }
    }
}

/// Access to the per-thread bookkeeping of [`Specimen`] lifetimes.
#[derive(Debug)]
pub struct Census;

impl Census {
    /// Clears all counters and disarms any pending panic injection.
    pub fn reset() {
        CENSUS.with(|census| {
            census.created.set(0);
            census.cloned.set(0);
            census.dropped.set(0);
            census.clones_until_panic.set(None);
            census.defaults_until_panic.set(None);
        });
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot() -> CensusSnapshot {
        CENSUS.with(|census| CensusSnapshot {
            created: census.created.get(),
            cloned: census.cloned.get(),
            dropped: census.dropped.get(),
        })
    }

    /// Lets `successful` more clones complete, then makes the next one panic.
    ///
    /// The injection disarms itself after firing once.
    pub fn panic_on_clone_after(successful: usize) {
        CENSUS.with(|census| census.clones_until_panic.set(Some(successful)));
    }

    /// Lets `successful` more default constructions complete, then makes the next one panic.
    ///
    /// The injection disarms itself after firing once.
    pub fn panic_on_default_after(successful: usize) {
        CENSUS.with(|census| census.defaults_until_panic.set(Some(successful)));
    }
}

/// Counter values captured by [`Census::snapshot()`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CensusSnapshot {
    created: usize,
    cloned: usize,
    dropped: usize,
}

impl CensusSnapshot {
    /// Specimens created via [`Specimen::new()`] or [`Default`].
    #[must_use]
    pub fn created(&self) -> usize {
        self.created
    }

    /// Specimens created via [`Clone`].
    #[must_use]
    pub fn cloned(&self) -> usize {
        self.cloned
    }

    /// Specimens dropped.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Specimens currently alive. Zero once every specimen has been dropped exactly once.
    ///
    /// # Panics
    ///
    /// Panics if more specimens were dropped than were ever created, which means something was
    /// dropped twice.
    #[must_use]
    pub fn live(&self) -> usize {
        self.created
            .checked_add(self.cloned)
            .and_then(|total| total.checked_sub(self.dropped))
            .unwrap_or_else(|| panic!("more specimens dropped than created: {self:?}"))
    }
}

/// An element type that reports its lifecycle to the thread's [`Census`].
///
/// Specimens carry an integer payload used for equality and ordering checks. They own no heap
/// memory, so a leaked specimen shows up only in the census and never as a real leak.
pub struct Specimen {
    value: i64,
}

impl Specimen {
    /// Creates a specimen carrying `value`.
    #[must_use]
    pub fn new(value: i64) -> Self {
        CENSUS.with(|census| bump(&census.created));
        Self { value }
    }

    /// The payload this specimen was created with.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.value
    }
}

impl Clone for Specimen {
    fn clone(&self) -> Self {
        CENSUS.with(|census| {
            assert!(
                !budget_exhausted(&census.clones_until_panic),
                "injected panic while cloning specimen {}",
                self.value
            );
            bump(&census.cloned);
        });

        Self { value: self.value }
    }
}

impl Default for Specimen {
    fn default() -> Self {
        CENSUS.with(|census| {
            assert!(
                !budget_exhausted(&census.defaults_until_panic),
                "injected panic while default-constructing a specimen"
            );
            bump(&census.created);
        });

        Self { value: 0 }
    }
}

impl Drop for Specimen {
    fn drop(&mut self) {
        CENSUS.with(|census| bump(&census.dropped));
    }
}

impl PartialEq for Specimen {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Specimen {}

impl fmt::Debug for Specimen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Specimen({})", self.value)
    }
}

/// Extracts the payloads of a sequence of specimens, for compact assertions.
#[must_use]
pub fn values<'a>(specimens: impl IntoIterator<Item = &'a Specimen>) -> Vec<i64> {
    specimens.into_iter().map(Specimen::value).collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::expect_panic;

    #[test]
    fn census_tracks_lifecycle() {
        Census::reset();

        let a = Specimen::new(1);
        let b = a.clone();
        let c = Specimen::default();

        let snapshot = Census::snapshot();
        assert_eq!(snapshot.created(), 2);
        assert_eq!(snapshot.cloned(), 1);
        assert_eq!(snapshot.live(), 3);

        drop(a);
        drop(b);
        drop(c);

        let snapshot = Census::snapshot();
        assert_eq!(snapshot.dropped(), 3);
        assert_eq!(snapshot.live(), 0);
    }

    #[test]
    fn clone_panics_on_requested_invocation() {
        Census::reset();

        let original = Specimen::new(5);
        Census::panic_on_clone_after(2);

        let first = original.clone();
        let second = original.clone();
        let message = expect_panic(|| original.clone());
        assert!(message.contains("specimen 5"));

        // The injection disarms itself.
        let third = original.clone();

        assert_eq!(values([&first, &second, &third]), vec![5, 5, 5]);
        assert_eq!(Census::snapshot().cloned(), 3);
    }

    #[test]
    fn default_panics_on_requested_invocation() {
        Census::reset();

        Census::panic_on_default_after(0);
        expect_panic(Specimen::default);

        let specimen = Specimen::default();
        assert_eq!(specimen.value(), 0);
        assert_eq!(Census::snapshot().created(), 1);
    }

    #[test]
    fn equality_uses_payload() {
        assert_eq!(Specimen::new(3), Specimen::new(3));
        assert_ne!(Specimen::new(3), Specimen::new(4));
    }
}
