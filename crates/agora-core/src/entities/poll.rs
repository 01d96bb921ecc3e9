use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::PollKind;

/// A subject put to a vote inside a scope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Poll {
    pub id: String,
    pub scope_id: String,
    pub subject: String,
    pub kind: PollKind,
    pub begin_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub delete_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    /// Open iff `begin_time <= at < end_time` and not deleted.
    #[must_use]
    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        self.begin_time <= at
            && self.end_time.is_none_or(|end| at < end)
            && !self.is_deleted(at)
    }

    #[must_use]
    pub fn is_closed(&self, at: DateTime<Utc>) -> bool {
        self.end_time.is_some_and(|end| end <= at)
    }

    #[must_use]
    pub fn is_deleted(&self, at: DateTime<Utc>) -> bool {
        self.delete_time.is_some_and(|deleted| deleted <= at)
    }

    /// The instant a tally is taken at: the end time once closed, else `now`.
    #[must_use]
    pub fn tally_instant(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.end_time {
            Some(end) if end <= now => end,
            _ => now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn poll(end_time: Option<DateTime<Utc>>) -> Poll {
        let begin = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Poll {
            id: "pol-00000001".into(),
            scope_id: "scp-00000001".into(),
            subject: "Extend the tram line".into(),
            kind: PollKind::Adopt,
            begin_time: begin,
            end_time,
            delete_time: None,
            created_at: begin,
        }
    }

    #[test]
    fn open_window_is_half_open() {
        let p = poll(None);
        let end = p.begin_time + Duration::days(7);
        let p = Poll {
            end_time: Some(end),
            ..p
        };
        assert!(!p.is_open(p.begin_time - Duration::seconds(1)));
        assert!(p.is_open(p.begin_time));
        assert!(p.is_open(end - Duration::seconds(1)));
        assert!(!p.is_open(end));
        assert!(p.is_closed(end));
    }

    #[test]
    fn tally_instant_clamps_to_end() {
        let p = poll(None);
        let now = p.begin_time + Duration::days(3);
        assert_eq!(p.tally_instant(now), now);

        let end = p.begin_time + Duration::days(1);
        let closed = Poll {
            end_time: Some(end),
            ..p
        };
        assert_eq!(closed.tally_instant(now), end);
    }

    #[test]
    fn deleted_poll_is_not_open() {
        let p = poll(None);
        let deleted = Poll {
            delete_time: Some(p.begin_time + Duration::hours(1)),
            ..p
        };
        assert!(!deleted.is_open(deleted.begin_time + Duration::hours(2)));
    }
}
