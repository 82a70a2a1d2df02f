use std::collections::HashMap;

use thiserror::Error;

use crate::domain::{NetworkCounters, ProcessState};
use crate::ports::ProbeError;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing field: {0}")]
    MissingField(String),
}

impl From<ParseError> for ProbeError {
    fn from(err: ParseError) -> Self {
        ProbeError::Parse(err.to_string())
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// CPU stats from /proc/stat
#[derive(Debug, Clone, Default)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    pub fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq + self.steal
    }
}

/// Parse /proc/stat (first line only for aggregate CPU)
pub fn parse_cpu_stat(content: &str) -> ParseResult<CpuStat> {
    let first_line = content
        .lines()
        .next()
        .ok_or_else(|| ParseError::Parse("Empty stat file".to_string()))?;

    if !first_line.starts_with("cpu ") {
        return Err(ParseError::Parse("Missing cpu line".to_string()));
    }

    let parts: Vec<&str> = first_line.split_whitespace().skip(1).collect();
    if parts.len() < 8 {
        return Err(ParseError::Parse("Incomplete cpu stat".to_string()));
    }

    Ok(CpuStat {
        user: parts[0].parse().map_err(|e| ParseError::Parse(format!("user: {}", e)))?,
        nice: parts[1].parse().map_err(|e| ParseError::Parse(format!("nice: {}", e)))?,
        system: parts[2].parse().map_err(|e| ParseError::Parse(format!("system: {}", e)))?,
        idle: parts[3].parse().map_err(|e| ParseError::Parse(format!("idle: {}", e)))?,
        iowait: parts[4].parse().map_err(|e| ParseError::Parse(format!("iowait: {}", e)))?,
        irq: parts[5].parse().map_err(|e| ParseError::Parse(format!("irq: {}", e)))?,
        softirq: parts[6].parse().map_err(|e| ParseError::Parse(format!("softirq: {}", e)))?,
        steal: parts[7].parse().map_err(|e| ParseError::Parse(format!("steal: {}", e)))?,
    })
}

/// Parse /proc/meminfo into a map
pub fn parse_meminfo(content: &str) -> ParseResult<HashMap<String, u64>> {
    let mut map = HashMap::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() != 2 {
            continue;
        }

        let key = parts[0].trim().to_string();
        let value_str = parts[1].trim().trim_end_matches(" kB");

        if let Ok(value) = value_str.parse::<u64>() {
            map.insert(key, value * 1024); // Convert kB to bytes
        }
    }

    Ok(map)
}

/// Fields of /proc/{pid}/stat used for sampling
#[derive(Debug, Clone)]
pub struct ProcStat {
    pub state: ProcessState,
    /// Process group, inherited by everything the process forks
    pub pgrp: u32,
    pub utime: u64,
    pub stime: u64,
    pub num_threads: u32,
    pub vsize: u64,
}

impl ProcStat {
    pub fn cpu_ticks(&self) -> u64 {
        self.utime + self.stime
    }
}

/// Parse /proc/{pid}/stat
pub fn parse_proc_stat(content: &str) -> ParseResult<ProcStat> {
    // Format: pid (comm) state ppid pgrp ... utime stime ...
    // comm may contain spaces and parentheses, so split on the last ')'
    let start = content.find('(').ok_or_else(|| ParseError::Parse("No ( found".to_string()))?;
    let end = content.rfind(')').ok_or_else(|| ParseError::Parse("No ) found".to_string()))?;
    if end < start {
        return Err(ParseError::Parse("Malformed comm field".to_string()));
    }

    let after_comm = &content[end + 1..];

    // parts[n] is field n + 3 of proc(5)
    let parts: Vec<&str> = after_comm.split_whitespace().collect();
    if parts.len() < 21 {
        return Err(ParseError::Parse("Incomplete proc stat".to_string()));
    }

    let state = parts[0]
        .chars()
        .next()
        .ok_or_else(|| ParseError::MissingField("state".to_string()))?;
    let pgrp: u32 = parts[2].parse().map_err(|e| ParseError::Parse(format!("pgrp: {}", e)))?;
    let utime: u64 = parts[11].parse().map_err(|e| ParseError::Parse(format!("utime: {}", e)))?;
    let stime: u64 = parts[12].parse().map_err(|e| ParseError::Parse(format!("stime: {}", e)))?;
    let num_threads: u32 = parts[17]
        .parse()
        .map_err(|e| ParseError::Parse(format!("num_threads: {}", e)))?;
    let vsize: u64 = parts[20].parse().map_err(|e| ParseError::Parse(format!("vsize: {}", e)))?;

    Ok(ProcStat {
        state: ProcessState::from_char(state),
        pgrp,
        utime,
        stime,
        num_threads,
        vsize,
    })
}

/// Sum the `Pss:` lines of /proc/{pid}/smaps, in bytes
pub fn parse_smaps_pss(content: &str) -> ParseResult<u64> {
    let mut total_kb = 0u64;
    let mut seen = false;

    for line in content.lines() {
        let Some(rest) = line.strip_prefix("Pss:") else {
            continue;
        };
        let value = rest.trim().trim_end_matches("kB").trim();
        let kb: u64 = value
            .parse()
            .map_err(|e| ParseError::Parse(format!("Pss: {}", e)))?;
        total_kb += kb;
        seen = true;
    }

    if !seen && !content.trim().is_empty() {
        return Err(ParseError::MissingField("Pss".to_string()));
    }

    Ok(total_kb * 1024)
}

/// Parse /proc/{pid}/net/dev, summing every interface except loopback
pub fn parse_net_dev(content: &str) -> ParseResult<NetworkCounters> {
    let (mut bytes_sent, mut packets_sent, mut bytes_recv, mut packets_recv) = (0, 0, 0, 0);

    // Two header lines precede the interface rows
    for line in content.lines().skip(2) {
        let Some((iface, stats)) = line.split_once(':') else {
            continue;
        };
        if iface.trim() == "lo" {
            continue;
        }

        let fields: Vec<&str> = stats.split_whitespace().collect();
        if fields.len() < 10 {
            return Err(ParseError::Parse(format!("Incomplete net/dev row for {}", iface.trim())));
        }

        let field = |idx: usize, name: &str| -> ParseResult<u64> {
            fields[idx]
                .parse::<u64>()
                .map_err(|e| ParseError::Parse(format!("{}: {}", name, e)))
        };

        bytes_recv += field(0, "rx_bytes")?;
        packets_recv += field(1, "rx_packets")?;
        bytes_sent += field(8, "tx_bytes")?;
        packets_sent += field(9, "tx_packets")?;
    }

    Ok(NetworkCounters::new(bytes_sent, packets_sent, bytes_recv, packets_recv))
}
