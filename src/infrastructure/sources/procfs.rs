//! Readers for the `/proc` files the system source needs.
//!
//! The parsers are pure functions over file content so they can be tested
//! with string inputs; [`ProcfsProbe`] does the file I/O against a
//! configurable root.

use crate::domain::errors::{CollectError, ParseError};
use async_trait::async_trait;
use std::path::PathBuf;

/// Kernel limit on `comm` length, excluding the trailing NUL.
const COMM_LEN: usize = 15;

/// Process accounting and network counters for one PID.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessStat {
    pub utime: f64,
    pub stime: f64,
    pub start_time: f64,
    pub in_octets: f64,
    pub out_octets: f64,
}

/// The fields of `/proc/[pid]/stat` the agent reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidStat {
    pub state: char,
    pub utime: u64,
    pub stime: u64,
    pub starttime: u64,
}

/// `IpExt` octet counters from `/proc/[pid]/net/netstat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IpOctets {
    pub in_octets: Option<u64>,
    pub out_octets: Option<u64>,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The comm field may itself contain spaces and parentheses, so fields are
/// counted from the last `)`.
pub fn parse_pid_stat(content: &str) -> Result<PidStat, ParseError> {
    let content = content.trim();
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("stat", "missing ')'"))?;
    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();

    if fields.len() < 20 {
        return Err(ParseError::new(
            "stat",
            format!("not enough fields: expected 20+, got {}", fields.len()),
        ));
    }

    let parse_field = |idx: usize, name: &str| -> Result<u64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new("stat", format!("invalid {}", name)))
    };

    Ok(PidStat {
        state: fields[0].chars().next().unwrap_or('?'),
        utime: parse_field(11, "utime")?,
        stime: parse_field(12, "stime")?,
        starttime: parse_field(19, "starttime")?,
    })
}

/// Parses the `IpExt` section of `/proc/[pid]/net/netstat`.
///
/// Format: each protocol has a key line followed by a value line with the
/// same prefix. Counters that are absent stay `None`.
pub fn parse_ip_octets(content: &str) -> IpOctets {
    let mut octets = IpOctets::default();
    let lines: Vec<&str> = content.lines().collect();

    for pair in lines.windows(2) {
        let keys: Vec<&str> = pair[0].split_whitespace().collect();
        let vals: Vec<&str> = pair[1].split_whitespace().collect();

        if keys.first() != Some(&"IpExt:") || vals.first() != Some(&"IpExt:") {
            continue;
        }
        // The key line is the one whose second column is not numeric.
        if keys.get(1).is_none_or(|k| k.parse::<u64>().is_ok()) {
            continue;
        }

        for (key, val) in keys.iter().zip(vals.iter()).skip(1) {
            let value = val.parse().ok();
            match *key {
                "InOctets" => octets.in_octets = value,
                "OutOctets" => octets.out_octets = value,
                _ => {}
            }
        }
        break;
    }

    octets
}

/// Process lookup and statistics, abstracted so the system source can be
/// tested without a live process.
#[async_trait]
pub trait ProcessProbe: Send + Sync {
    /// Resolve a process name to a PID, as text.
    async fn find_pid(&self, process_name: &str) -> Result<String, CollectError>;

    /// Whether `pid` still refers to a live process.
    async fn is_running(&self, pid: i32) -> bool;

    async fn read_stat(&self, pid: i32) -> Result<ProcessStat, CollectError>;
}

/// [`ProcessProbe`] backed by a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcfsProbe {
    root: PathBuf,
}

impl ProcfsProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn read(&self, path: PathBuf) -> Result<String, CollectError> {
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| CollectError::Procfs { path, source })
    }
}

#[async_trait]
impl ProcessProbe for ProcfsProbe {
    /// Lowest PID whose `comm` equals the (kernel-truncated) name.
    async fn find_pid(&self, process_name: &str) -> Result<String, CollectError> {
        let wanted = &process_name.as_bytes()[..process_name.len().min(COMM_LEN)];
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|source| CollectError::Procfs {
                path: self.root.clone(),
                source,
            })?;

        let mut found: Option<u32> = None;
        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|source| CollectError::Procfs {
                    path: self.root.clone(),
                    source,
                })?
        {
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            // Processes can exit between listing and reading.
            let Ok(comm) = tokio::fs::read(entry.path().join("comm")).await else {
                continue;
            };
            if comm.trim_ascii_end() == wanted && found.is_none_or(|f| pid < f) {
                found = Some(pid);
            }
        }

        found
            .map(|pid| pid.to_string())
            .ok_or_else(|| CollectError::ProcessNotFound {
                name: process_name.to_string(),
            })
    }

    async fn is_running(&self, pid: i32) -> bool {
        if pid <= 0 {
            return false;
        }
        match self.read(self.root.join(pid.to_string()).join("stat")).await {
            Ok(content) => {
                matches!(parse_pid_stat(&content), Ok(stat) if !matches!(stat.state, 'Z' | 'X'))
            }
            Err(_) => false,
        }
    }

    async fn read_stat(&self, pid: i32) -> Result<ProcessStat, CollectError> {
        let proc_dir = self.root.join(pid.to_string());
        let stat = parse_pid_stat(&self.read(proc_dir.join("stat")).await?)?;
        let net = parse_ip_octets(&self.read(proc_dir.join("net").join("netstat")).await?);

        Ok(ProcessStat {
            utime: stat.utime as f64,
            stime: stat.stime as f64,
            start_time: stat.starttime as f64,
            in_octets: net.in_octets.unwrap_or(0) as f64,
            out_octets: net.out_octets.unwrap_or(0) as f64,
        })
    }
}
