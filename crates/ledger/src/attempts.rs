//! Attempt values stored against each ledger key

use serde::Serialize;

/// Raw value in the backing store for a successfully demuxed unit
pub const SUCCESS_VALUE: i64 = -1;

/// Raw value in the backing store for a unit that failed the max number of times
pub const ABANDONED_VALUE: i64 = -2;

/// State of one ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "failures", rename_all = "snake_case")]
pub enum Attempts {
    /// Failed this many times, still eligible for retry
    Retrying(u32),
    /// Demuxed successfully (terminal)
    Success,
    /// Failed `max_retries` times (terminal)
    Abandoned,
}

impl Attempts {
    /// Decode a raw backing-store value. Unknown negative values are rejected.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            SUCCESS_VALUE => Some(Self::Success),
            ABANDONED_VALUE => Some(Self::Abandoned),
            n => u32::try_from(n).ok().map(Self::Retrying),
        }
    }

    /// Encode for the backing store
    pub fn to_raw(self) -> i64 {
        match self {
            Self::Retrying(n) => i64::from(n),
            Self::Success => SUCCESS_VALUE,
            Self::Abandoned => ABANDONED_VALUE,
        }
    }

    /// Success and abandonment never transition again
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Retrying(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_sentinels() {
        assert_eq!(Attempts::from_raw(-1), Some(Attempts::Success));
        assert_eq!(Attempts::from_raw(-2), Some(Attempts::Abandoned));
        assert_eq!(Attempts::from_raw(0), Some(Attempts::Retrying(0)));
        assert_eq!(Attempts::from_raw(2), Some(Attempts::Retrying(2)));
        assert_eq!(Attempts::from_raw(-3), None);
        assert_eq!(Attempts::from_raw(i64::MAX), None);
    }

    #[test]
    fn test_terminal() {
        assert!(Attempts::Success.is_terminal());
        assert!(Attempts::Abandoned.is_terminal());
        assert!(!Attempts::Retrying(4).is_terminal());
    }
}
