//! Parsing of `/proc/<pid>/status`.
//!
//! The status file is a sequence of newline-terminated `Key:\tValue`
//! records. The reader works on any `Read + Seek` source so a long-lived
//! file handle can be re-read without reopening it.

use ahash::AHashMap as HashMap;
use serde::Serialize;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{ProcWatchError, Result};

const SEPARATOR: &str = ":\t";

/// Identity and virtual-memory figures from `/proc/<pid>/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessStatus {
    pub name: String,
    /// `VmSize` in kB. Kernel threads have no `Vm*` keys and report 0.
    pub vm_size_kb: u64,
    /// `VmPeak` in kB, `None` when the kernel does not expose it.
    pub vm_peak_kb: Option<u64>,
    pub vm_rss_kb: Option<u64>,
    pub vm_swap_kb: Option<u64>,
    /// Raw `State` value, e.g. "S (sleeping)".
    pub state: Option<String>,
    pub ppid: Option<u32>,
    pub threads: Option<u32>,
}

impl ProcessStatus {
    /// Builds a typed status from a parsed key/value mapping.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let name = map
            .get("Name")
            .ok_or_else(|| ProcWatchError::parse("status", "missing Name field"))?
            .trim_end()
            .to_string();

        let vm_size_kb = match map.get("VmSize") {
            Some(raw) => parse_kb_field(raw)
                .ok_or_else(|| ProcWatchError::parse("VmSize", format!("invalid value {raw:?}")))?,
            None => 0,
        };

        Ok(Self {
            name,
            vm_size_kb,
            vm_peak_kb: map.get("VmPeak").and_then(|v| parse_kb_field(v)),
            vm_rss_kb: map.get("VmRSS").and_then(|v| parse_kb_field(v)),
            vm_swap_kb: map.get("VmSwap").and_then(|v| parse_kb_field(v)),
            state: map.get("State").map(|v| v.trim().to_string()),
            ppid: map.get("PPid").and_then(|v| v.trim().parse().ok()),
            threads: map.get("Threads").and_then(|v| v.trim().parse().ok()),
        })
    }
}

/// Reads a status source into a key/value mapping and rewinds it.
///
/// Parsing stops at the first line with an empty key. A line without the
/// `":\t"` separator is a `Parse` error; the source is rewound either way.
pub fn read_status_map<R: Read + Seek>(source: &mut R) -> Result<HashMap<String, String>> {
    let content = read_status_text(source).map_err(|source| ProcWatchError::Io {
        path: "status".into(),
        source,
    })?;
    parse_status(&content)
}

/// Reads the whole source as text and seeks it back to the start.
///
/// The rewind is attempted even when the read fails so the next read starts
/// from a clean position.
pub fn read_status_text<R: Read + Seek>(source: &mut R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let read = source.read_to_end(&mut buf);
    let rewind = source.seek(SeekFrom::Start(0));
    read?;
    rewind?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Parses status text into a key/value mapping.
pub fn parse_status(content: &str) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();

    for line in content.split('\n') {
        if line.is_empty() {
            break;
        }
        let Some((key, value)) = line.split_once(SEPARATOR) else {
            return Err(ProcWatchError::parse(
                "status",
                format!("line without key separator: {line:?}"),
            ));
        };
        if key.is_empty() {
            break;
        }
        map.insert(key.to_string(), value.to_string());
    }

    Ok(map)
}

/// Extracts the numeric part of a `"<number> kB"` value.
pub fn parse_kb_field(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE_STATUS: &str = "Name:\tpostgres\n\
        Umask:\t0077\n\
        State:\tS (sleeping)\n\
        Tgid:\t812\n\
        Pid:\t812\n\
        PPid:\t1\n\
        VmPeak:\t  221340 kB\n\
        VmSize:\t  219712 kB\n\
        VmRSS:\t   28744 kB\n\
        VmSwap:\t       0 kB\n\
        Threads:\t1\n";

    // -------------------------------------------------------------------------
    // Tests for parse_status / read_status_map
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_minimal_status() {
        let mut src = Cursor::new(b"Name:\tworker\nVmSize:\t  2048 kB\n".to_vec());
        let map = read_status_map(&mut src).expect("parse");
        let status = ProcessStatus::from_map(&map).expect("status");

        assert_eq!(status.name, "worker");
        assert_eq!(status.vm_size_kb, 2048);
        assert_eq!(status.vm_peak_kb, None);
    }

    #[test]
    fn test_parse_full_status() {
        let map = parse_status(SAMPLE_STATUS).expect("parse");
        let status = ProcessStatus::from_map(&map).expect("status");

        assert_eq!(status.name, "postgres");
        assert_eq!(status.vm_size_kb, 219712);
        assert_eq!(status.vm_peak_kb, Some(221340));
        assert_eq!(status.vm_rss_kb, Some(28744));
        assert_eq!(status.vm_swap_kb, Some(0));
        assert_eq!(status.state.as_deref(), Some("S (sleeping)"));
        assert_eq!(status.ppid, Some(1));
        assert_eq!(status.threads, Some(1));
    }

    #[test]
    fn test_read_rewinds_source() {
        let mut src = Cursor::new(SAMPLE_STATUS.as_bytes().to_vec());
        let first = read_status_map(&mut src).expect("first read");
        assert_eq!(src.position(), 0);
        let second = read_status_map(&mut src).expect("second read");
        assert_eq!(first, second);
    }

    #[test]
    fn test_stops_at_empty_key() {
        let map = parse_status("Name:\tfoo\n:\tignored\nVmSize:\t1 kB\n").expect("parse");
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key("VmSize"));
    }

    #[test]
    fn test_line_without_separator_is_parse_error() {
        let result = parse_status("Name:\tfoo\nVmSize 12 kB\n");
        assert!(matches!(result, Err(ProcWatchError::Parse { .. })));
    }

    #[test]
    fn test_missing_name_is_parse_error() {
        let map = parse_status("VmSize:\t12 kB\n").expect("parse");
        assert!(matches!(
            ProcessStatus::from_map(&map),
            Err(ProcWatchError::Parse { .. })
        ));
    }

    #[test]
    fn test_kernel_thread_without_vmsize() {
        let map = parse_status("Name:\tkworker/0:1\nState:\tI (idle)\n").expect("parse");
        let status = ProcessStatus::from_map(&map).expect("status");
        assert_eq!(status.vm_size_kb, 0);
        assert_eq!(status.vm_peak_kb, None);
    }

    #[test]
    fn test_invalid_vmsize_is_parse_error() {
        let map = parse_status("Name:\tfoo\nVmSize:\tlots kB\n").expect("parse");
        assert!(matches!(
            ProcessStatus::from_map(&map),
            Err(ProcWatchError::Parse { .. })
        ));
    }

    // -------------------------------------------------------------------------
    // Tests for parse_kb_field
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_kb_field() {
        assert_eq!(parse_kb_field("  2048 kB"), Some(2048));
        assert_eq!(parse_kb_field("0 kB"), Some(0));
        assert_eq!(parse_kb_field("42"), Some(42));
        assert_eq!(parse_kb_field(""), None);
        assert_eq!(parse_kb_field("kB"), None);
        assert_eq!(parse_kb_field("-1 kB"), None);
    }
}
