//! Backing store line codec
//!
//! Each record is one `\n`-terminated line: `<name>|<title-or-null>|<attempts-or-sentinel>`.
//! An absent title is always written as the literal `null`, so parsing and
//! formatting are exact inverses for every representable key.

use crate::{Attempts, ScanKey};

/// Field separator
pub const SEPARATOR: char = '|';

/// Placeholder for an absent title
pub const NULL_LITERAL: &str = "null";

/// Why a single line was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("expected 3 fields (name|title|attempts), found {0}")]
    FieldCount(usize),

    #[error("empty name")]
    EmptyName,

    #[error("invalid title number: {0:?}")]
    Title(String),

    #[error("invalid attempts value: {0:?}")]
    Attempts(String),
}

/// Parse one line without its terminator
pub fn parse_line(line: &str) -> Result<(ScanKey, Attempts), LineError> {
    let fields: Vec<&str> = line.split(SEPARATOR).collect();
    let [name, title, attempts] = fields[..] else {
        return Err(LineError::FieldCount(fields.len()));
    };
    let (title, attempts) = (title.trim(), attempts.trim());

    if name.is_empty() {
        return Err(LineError::EmptyName);
    }

    let title = if is_null(title) {
        None
    } else {
        Some(
            title
                .parse::<u32>()
                .map_err(|_| LineError::Title(title.to_string()))?,
        )
    };

    let attempts = if is_null(attempts) {
        Attempts::Retrying(0)
    } else {
        attempts
            .parse::<i64>()
            .ok()
            .and_then(Attempts::from_raw)
            .ok_or_else(|| LineError::Attempts(attempts.to_string()))?
    };

    Ok((ScanKey::new(name, title), attempts))
}

/// Format one record, including the trailing newline
pub fn format_line(key: &ScanKey, attempts: Attempts) -> String {
    let title = match key.title() {
        Some(title) => title.to_string(),
        None => NULL_LITERAL.to_string(),
    };
    format!(
        "{}{sep}{}{sep}{}\n",
        key.name(),
        title,
        attempts.to_raw(),
        sep = SEPARATOR
    )
}

fn is_null(field: &str) -> bool {
    field.is_empty() || field == NULL_LITERAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_title_written_as_null() {
        let line = format_line(&ScanKey::whole("movie.mkv"), Attempts::Success);
        assert_eq!(line, "movie.mkv|null|-1\n");
    }

    #[test]
    fn test_title_and_count() {
        let line = format_line(&ScanKey::disc_title("DISC1", 2), Attempts::Retrying(1));
        assert_eq!(line, "DISC1|2|1\n");

        let (key, attempts) = parse_line(line.trim()).unwrap();
        assert_eq!(key, ScanKey::disc_title("DISC1", 2));
        assert_eq!(attempts, Attempts::Retrying(1));
    }

    #[test]
    fn test_abandoned_sentinel() {
        let (key, attempts) = parse_line("DISC1|null|-2").unwrap();
        assert_eq!(key, ScanKey::whole("DISC1"));
        assert_eq!(attempts, Attempts::Abandoned);
    }

    #[test]
    fn test_empty_fields_mean_absent_and_zero() {
        let (key, attempts) = parse_line("movie.mkv||").unwrap();
        assert_eq!(key, ScanKey::whole("movie.mkv"));
        assert_eq!(attempts, Attempts::Retrying(0));

        let (_, attempts) = parse_line("movie.mkv|null|null").unwrap();
        assert_eq!(attempts, Attempts::Retrying(0));
    }

    #[test]
    fn test_wrong_field_count() {
        assert_eq!(parse_line("movie.mkv|-1"), Err(LineError::FieldCount(2)));
        assert_eq!(parse_line("a|b|c|d"), Err(LineError::FieldCount(4)));
        assert_eq!(parse_line("garbage"), Err(LineError::FieldCount(1)));
    }

    #[test]
    fn test_bad_numbers() {
        assert!(matches!(parse_line("x|two|1"), Err(LineError::Title(_))));
        assert!(matches!(parse_line("x|-4|1"), Err(LineError::Title(_))));
        assert!(matches!(parse_line("x|null|-7"), Err(LineError::Attempts(_))));
        assert!(matches!(parse_line("x|null|lots"), Err(LineError::Attempts(_))));
        assert_eq!(parse_line("|null|-1"), Err(LineError::EmptyName));
    }
}
