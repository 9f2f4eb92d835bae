//! Resolution cache (C10, §4.10, §6.4, §7 `CorruptedCache`): a directory of
//! per-subject files, each holding that subject's resolved dependency list
//! plus a creation timestamp.
//!
//! **Open Question decision (§9 "cache format"):** one result per line,
//! `dependency\tstatus\tmin\tmax\tchosen\terror` (absent `max`/`chosen`/
//! `error` render as `-`), preceded by an integrity line of
//! `created_at_unix_ms\tcount\tchecksum`. The checksum is the SHA-256 hex
//! digest of the body text, verified on load so a truncated or hand-edited
//! file is rejected rather than silently misread. Textual and
//! content-addressed rather than binary, since the teacher carries no
//! binary serialization format for this crate; the checksum reuses the
//! `sha2`/`hex` pair `abi.rs` already depends on for the ABI metadata block.
//! The subject itself is not repeated per line, since §4.10 keys the whole
//! entry by subject and the file name already carries it.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use le_core::CoreError;

use crate::graph::{ResolvedResult, ResolvedStatus};
use crate::{PluginError, PluginResult};

const EMPTY_FIELD: &str = "-";
const FILE_EXTENSION: &str = "cache";

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\t', "\\t").replace('\n', "\\n")
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Replaces path separators and other filesystem-hostile characters so a
/// subject name becomes a safe single path component.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

fn encode_line(r: &ResolvedResult) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        escape(&r.dependency),
        r.status.as_str(),
        r.min.render(),
        r.max.map(|v| v.render()).unwrap_or_else(|| EMPTY_FIELD.to_string()),
        r.chosen.map(|v| v.render()).unwrap_or_else(|| EMPTY_FIELD.to_string()),
        r.error.as_deref().map(escape).unwrap_or_else(|| EMPTY_FIELD.to_string()),
    )
}

fn decode_line(subject: &str, line: &str) -> PluginResult<ResolvedResult> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 6 {
        return Err(PluginError::Core(CoreError::CorruptedCache(format!(
            "expected 6 tab-separated fields, found {}",
            fields.len()
        ))));
    }
    let status = ResolvedStatus::parse(fields[1])
        .ok_or_else(|| PluginError::Core(CoreError::CorruptedCache(format!("unknown status {:?}", fields[1]))))?;
    let min = le_core::Version::parse(fields[2]).map_err(PluginError::Core)?;
    let max = if fields[3] == EMPTY_FIELD {
        None
    } else {
        Some(le_core::Version::parse(fields[3]).map_err(PluginError::Core)?)
    };
    let chosen = if fields[4] == EMPTY_FIELD {
        None
    } else {
        Some(le_core::Version::parse(fields[4]).map_err(PluginError::Core)?)
    };
    let error = if fields[5] == EMPTY_FIELD { None } else { Some(unescape(fields[5])) };

    Ok(ResolvedResult {
        subject: subject.to_string(),
        dependency: unescape(fields[0]),
        status,
        min,
        max,
        chosen,
        error,
    })
}

/// One cache entry as read back from disk: the resolved results plus the
/// wall-clock time (milliseconds since the Unix epoch) they were stored at.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub results: Vec<ResolvedResult>,
    pub created_at_unix_ms: u64,
}

/// Directory-backed resolution cache, keyed by plugin-subject name (§4.10).
/// Created eagerly so callers never race on a missing cache directory.
pub struct ResolutionCache {
    directory: PathBuf,
}

impl ResolutionCache {
    pub fn open(directory: impl Into<PathBuf>) -> PluginResult<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|e| PluginError::Core(CoreError::FileIo(e)))?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.{FILE_EXTENSION}", sanitize_key(key)))
    }

    pub fn store(&self, key: &str, results: &[ResolvedResult]) -> PluginResult<()> {
        let created_at_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let body = results.iter().map(encode_line).collect::<Vec<_>>().join("\n");
        let checksum = hex::encode(Sha256::digest(body.as_bytes()));

        let mut out = format!("{created_at_unix_ms}\t{}\t{checksum}\n", results.len());
        out.push_str(&body);
        if !results.is_empty() {
            out.push('\n');
        }
        std::fs::write(self.path_for(key), out).map_err(|e| PluginError::Core(CoreError::FileIo(e)))
    }

    pub fn load(&self, key: &str) -> PluginResult<Vec<ResolvedResult>> {
        Ok(self.load_entry(key)?.results)
    }

    pub fn load_entry(&self, key: &str) -> PluginResult<CacheEntry> {
        let path = self.path_for(key);
        let data = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PluginError::Core(CoreError::NotFound(format!("cache entry for {key:?}")))
            } else {
                PluginError::Core(CoreError::FileIo(e))
            }
        })?;

        let mut lines = data.lines();
        let header = lines
            .next()
            .ok_or_else(|| PluginError::Core(CoreError::CorruptedCache("empty cache file".into())))?;
        let mut header_fields = header.splitn(3, '\t');
        let created_at_str = header_fields
            .next()
            .ok_or_else(|| PluginError::Core(CoreError::CorruptedCache("missing timestamp field".into())))?;
        let count_str = header_fields
            .next()
            .ok_or_else(|| PluginError::Core(CoreError::CorruptedCache("missing count field".into())))?;
        let checksum = header_fields
            .next()
            .ok_or_else(|| PluginError::Core(CoreError::CorruptedCache("missing checksum field".into())))?;

        let created_at_unix_ms: u64 = created_at_str
            .parse()
            .map_err(|_| PluginError::Core(CoreError::CorruptedCache(format!("bad timestamp {created_at_str:?}"))))?;
        let count: usize = count_str
            .parse()
            .map_err(|_| PluginError::Core(CoreError::CorruptedCache(format!("bad entry count {count_str:?}"))))?;

        let body_lines: Vec<&str> = lines.collect();
        let body = body_lines.join("\n");
        let actual_checksum = hex::encode(Sha256::digest(body.as_bytes()));
        if actual_checksum != checksum {
            return Err(PluginError::Core(CoreError::CorruptedCache("checksum mismatch".into())));
        }
        if body_lines.len() != count {
            return Err(PluginError::Core(CoreError::CorruptedCache(format!(
                "expected {count} entries, found {}",
                body_lines.len()
            ))));
        }

        let results = body_lines
            .into_iter()
            .map(|line| decode_line(key, line))
            .collect::<PluginResult<Vec<_>>>()?;

        Ok(CacheEntry { results, created_at_unix_ms })
    }

    pub fn invalidate(&self, key: &str) -> PluginResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PluginError::Core(CoreError::FileIo(e))),
        }
    }
}
