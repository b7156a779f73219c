//! Lease deadline arithmetic shared by every `Queue` implementation
//! (spec §4.3).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

/// The deadline a fresh `reserve-next` assigns: `now + lease_time`.
pub fn reserve_deadline(now: DateTime<Utc>, lease_time: Duration) -> DateTime<Utc> {
    now + to_chrono(lease_time)
}

/// `extend-lease` never shortens a lease: `max(current, now + lease_time)`.
pub fn extend_deadline(
    current: DateTime<Utc>,
    now: DateTime<Utc>,
    lease_time: Duration,
) -> DateTime<Utc> {
    std::cmp::max(current, now + to_chrono(lease_time))
}

fn to_chrono(d: Duration) -> ChronoDuration {
    ChronoDuration::from_std(d).unwrap_or(ChronoDuration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_never_shortens_a_live_lease() {
        let now = Utc::now();
        let current = now + ChronoDuration::seconds(120);
        let extended = extend_deadline(current, now, Duration::from_secs(60));
        assert_eq!(extended, current);
    }

    #[test]
    fn extend_lengthens_a_lease_about_to_expire() {
        let now = Utc::now();
        let current = now + ChronoDuration::seconds(1);
        let extended = extend_deadline(current, now, Duration::from_secs(60));
        assert!(extended > current);
    }
}
