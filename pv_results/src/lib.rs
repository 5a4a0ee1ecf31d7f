/*!

Results centralization for polling-station tallies (PV, *procès-verbal*).

The crate holds the arithmetic that sits behind the data entry, validation,
consolidation and simulation screens of an election operations dashboard:

* [`validate`] checks one PV for internal consistency and reports every
  violation found. It never blocks a submission: an inconsistent PV is stored
  as an anomaly for a reviewer to look at.
* [`aggregate`] sums candidate votes over any set of PVs (a bureau, a center,
  a zone or a whole election) and ranks the candidates.
* [`resolve_bureau_set`] turns a requested scope into the set of bureaus it
  covers, borrowing the bureau set of sibling elections for commune and
  department zones.
* [`project`] extends confirmed results with simulated figures for the bureaus
  that have not reported yet.

[`MemoryStore`] implements the [`ResultsRepository`] interface in memory, with
the upsert-by-(election, bureau) policy and the review status transitions.
[`consolidate`] and [`simulate`] chain the pieces for a given scope.

The long-form documentation of the command line program is in [`manual`].
*/

mod aggregation;
pub mod builder;
mod config;
mod consolidation;
pub mod manual;
mod projection;
mod scope;
mod store;
mod validation;

use log::warn;

use std::ops::{Add, AddAssign};

pub use crate::aggregation::*;
pub use crate::config::*;
pub use crate::consolidation::*;
pub use crate::projection::*;
pub use crate::scope::*;
pub use crate::store::*;
pub use crate::validation::*;

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash, Default)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);

    /// Counts coming from field data may be negative. They count for nothing.
    fn clamped(raw: i64, what: &str) -> VoteCount {
        if raw < 0 {
            warn!("{}: negative count {} treated as 0", what, raw);
            VoteCount::EMPTY
        } else {
            VoteCount(raw as u64)
        }
    }
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(VoteCount::EMPTY, |acc, vc| acc + vc)
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0.saturating_add(rhs.0))
    }
}

/// `100 * part / total`, or 0 when there is nothing to divide.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * (part as f64) / (total as f64)
    }
}

/// Rounds half away from zero to the given number of decimals.
/// Non-finite values round to 0.
pub fn round_to(value: f64, digits: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}
