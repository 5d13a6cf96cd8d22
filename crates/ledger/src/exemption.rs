//! Exemption policy: may this unit be scanned now?

use crate::{Attempts, Ledger, ScanKey};

/// Why a unit is skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exemption {
    /// Already demuxed
    Succeeded,
    /// Failed the max number of times
    Abandoned,
}

/// Returns the reason a key must not be scanned, if any
pub fn exemption(ledger: &Ledger, key: &ScanKey) -> Option<Exemption> {
    match ledger.attempts(key)? {
        Attempts::Success => Some(Exemption::Succeeded),
        Attempts::Abandoned => Some(Exemption::Abandoned),
        Attempts::Retrying(_) => None,
    }
}

/// True for units that already succeeded or were abandoned
pub fn is_exempt(ledger: &Ledger, key: &ScanKey) -> bool {
    ledger.contains_success(key) || ledger.contains_abandoned(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_title_success_does_not_exempt_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(temp_dir.path().join("scanRecord.txt"), 3).unwrap();

        ledger.record_success(ScanKey::disc_title("DISC1", 2));

        assert!(!is_exempt(&ledger, &ScanKey::whole("DISC1")));
        assert!(is_exempt(&ledger, &ScanKey::disc_title("DISC1", 2)));
        assert!(!is_exempt(&ledger, &ScanKey::disc_title("DISC1", 1)));
    }

    #[test]
    fn test_exemption_reasons() {
        let temp_dir = TempDir::new().unwrap();
        let mut ledger = Ledger::open(temp_dir.path().join("scanRecord.txt"), 2).unwrap();
        let retrying = ScanKey::whole("retry.mkv");
        let dead = ScanKey::whole("dead.mkv");
        let done = ScanKey::whole("done.mkv");

        ledger.record_failure(retrying.clone());
        ledger.record_failure(dead.clone());
        ledger.record_failure(dead.clone());
        ledger.record_success(done.clone());

        assert_eq!(exemption(&ledger, &retrying), None);
        assert_eq!(exemption(&ledger, &dead), Some(Exemption::Abandoned));
        assert_eq!(exemption(&ledger, &done), Some(Exemption::Succeeded));
        assert_eq!(exemption(&ledger, &ScanKey::whole("new.mkv")), None);

        for key in [&retrying, &dead, &done] {
            assert_eq!(is_exempt(&ledger, key), exemption(&ledger, key).is_some());
        }
    }

    #[test]
    fn test_exemption_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scanRecord.txt");
        let key = ScanKey::whole("movie.mkv");

        let mut ledger = Ledger::open(&path, 3).unwrap();
        for _ in 0..3 {
            ledger.record_failure(key.clone());
        }
        ledger.persist().unwrap();

        let reloaded = Ledger::open(&path, 3).unwrap();
        assert!(reloaded.contains_abandoned(&key));
        assert!(!reloaded.contains_success(&key));
        assert!(is_exempt(&reloaded, &key));
    }
}
