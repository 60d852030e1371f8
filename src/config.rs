// Database location parsing
//
// Accepts SQLite URLs in the common three-slash form:
//   sqlite:///:memory:        in-memory database
//   sqlite:///roster.db       path relative to the working directory
//   sqlite:////var/roster.db  absolute path
// A bare path (or ":memory:") is accepted as well.

use crate::error::StoreError;
use std::path::PathBuf;
use std::str::FromStr;

const SQLITE_SCHEME: &str = "sqlite:///";
const MEMORY: &str = ":memory:";

/// Where the store keeps its SQLite database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabaseUrl {
    #[default]
    Memory,
    File(PathBuf),
}

impl FromStr for DatabaseUrl {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let location = match s.strip_prefix(SQLITE_SCHEME) {
            Some(rest) => rest,
            None if s.contains("://") => return Err(StoreError::InvalidUrl(format!("unsupported scheme in {}", s))),
            None => s,
        };

        if location.is_empty() || location == MEMORY {
            return Ok(DatabaseUrl::Memory);
        }

        Ok(DatabaseUrl::File(PathBuf::from(location)))
    }
}

impl std::fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseUrl::Memory => write!(f, "{}{}", SQLITE_SCHEME, MEMORY),
            DatabaseUrl::File(path) => write!(f, "{}{}", SQLITE_SCHEME, path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory() {
        assert_eq!("sqlite:///:memory:".parse::<DatabaseUrl>().unwrap(), DatabaseUrl::Memory);
        assert_eq!(":memory:".parse::<DatabaseUrl>().unwrap(), DatabaseUrl::Memory);
        assert_eq!("sqlite:///".parse::<DatabaseUrl>().unwrap(), DatabaseUrl::Memory);
    }

    #[test]
    fn test_parse_relative_and_absolute() {
        assert_eq!(
            "sqlite:///roster.db".parse::<DatabaseUrl>().unwrap(),
            DatabaseUrl::File(PathBuf::from("roster.db"))
        );
        assert_eq!(
            "sqlite:////var/lib/roster.db".parse::<DatabaseUrl>().unwrap(),
            DatabaseUrl::File(PathBuf::from("/var/lib/roster.db"))
        );
        assert_eq!(
            "data/roster.db".parse::<DatabaseUrl>().unwrap(),
            DatabaseUrl::File(PathBuf::from("data/roster.db"))
        );
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        let err = "postgres://localhost/roster".parse::<DatabaseUrl>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidUrl(_)));
    }

    #[test]
    fn test_display_round_trips_memory() {
        assert_eq!(DatabaseUrl::Memory.to_string(), "sqlite:///:memory:");
        assert_eq!(
            DatabaseUrl::File(PathBuf::from("/tmp/r.db")).to_string(),
            "sqlite:////tmp/r.db"
        );
    }
}
