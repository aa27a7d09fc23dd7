use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Extension of a fully written batch file.
pub const DURABLE_EXTENSION: &str = "trn";

/// Extension of a batch file that is still being written.
pub const TEMPORARY_EXTENSION: &str = "tmp";

/// Width of the zero-padded millisecond prefix. Keeps lexical order equal to
/// chronological order for any timestamp before the year 2286.
const MILLIS_WIDTH: usize = 13;

/// Identifier of one spooled batch: `<created_millis>-<uuid>`.
///
/// Ordering is lexical on the rendered name, which sorts by creation time
/// first and falls back to the random suffix inside one millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(String);

impl BatchId {
    /// Allocate a fresh id stamped with the current wall clock time.
    pub fn generate() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(created: DateTime<Utc>) -> Self {
        let millis = created.timestamp_millis().max(0);
        BatchId(format!(
            "{:0width$}-{}",
            millis,
            Uuid::new_v4().simple(),
            width = MILLIS_WIDTH
        ))
    }

    /// Parse a bare name (no extension). Returns `None` for anything the
    /// spool did not create.
    pub fn parse(name: &str) -> Option<Self> {
        let (millis, suffix) = name.split_once('-')?;
        if millis.len() != MILLIS_WIDTH || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Uuid::try_parse(suffix).ok()?;
        Some(BatchId(name.to_string()))
    }

    /// Split a spool file path into its id and whether it is durable.
    pub fn from_path(path: &Path) -> Option<(Self, bool)> {
        let durable = match path.extension()?.to_str()? {
            DURABLE_EXTENSION => true,
            TEMPORARY_EXTENSION => false,
            _ => return None,
        };
        let stem = path.file_stem()?.to_str()?;
        Self::parse(stem).map(|id| (id, durable))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn created_millis(&self) -> i64 {
        // Validated in `parse`/`at`, so the prefix is always digits.
        self.0[..MILLIS_WIDTH].parse().unwrap_or(0)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.created_millis())
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn durable_file_name(&self) -> String {
        format!("{}.{}", self.0, DURABLE_EXTENSION)
    }

    pub fn temporary_file_name(&self) -> String {
        format!("{}.{}", self.0, TEMPORARY_EXTENSION)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
