/*
 *  metrics.rs
 *
 *  NasInk - e-paper status panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  System metrics from /proc, /sys and statvfs
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
//! Gathering system metrics from /proc and /sys files.

use std::ffi::CString;
use std::fs;
use std::io;

use chrono::{DateTime, Local, TimeDelta};

const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

fn invalid<E>(e: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Reads the first float value from a given file path.
fn read_first_float_from_file(path: &str) -> io::Result<f64> {
    let content = fs::read_to_string(path)?;
    let first_word = content.split_whitespace().next().unwrap_or("0.0");
    first_word.parse::<f64>().map_err(invalid)
}

/// CPU temperature in Celsius from the first thermal zone.
pub fn cpu_temp() -> io::Result<f64> {
    // The value is in millidegrees Celsius.
    Ok(read_first_float_from_file(THERMAL_ZONE)? / 1000.0)
}

/// Seconds since boot
pub fn up_time_secs() -> io::Result<u64> {
    Ok(read_first_float_from_file("/proc/uptime")? as u64)
}

/// Local wall time of the last boot, `up_secs` before `now`
pub fn boot_time(now: DateTime<Local>, up_secs: u64) -> Option<DateTime<Local>> {
    let up = TimeDelta::try_seconds(i64::try_from(up_secs).ok()?)?;
    now.checked_sub_signed(up)
}

/// Aggregate jiffies from the `cpu` line of /proc/stat
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

impl CpuTimes {
    pub fn parse(stat: &str) -> Option<Self> {
        let line = stat.lines().find(|l| l.starts_with("cpu "))?;
        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .map(|f| f.parse().ok())
            .collect::<Option<_>>()?;
        if fields.len() < 4 {
            return None;
        }
        // guest time is already counted in user/nice
        let total: u64 = fields.iter().take(8).sum();
        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        Some(Self { busy: total - idle, total })
    }

    /// Busy share between two samples, in percent
    pub fn percent_since(&self, prev: &CpuTimes) -> f64 {
        let total = self.total.saturating_sub(prev.total);
        if total == 0 {
            return 0.0;
        }
        let busy = self.busy.saturating_sub(prev.busy);
        (busy as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MemInfo {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub used_percent: f64,
}

impl MemInfo {
    /// Parse /proc/meminfo, values in bytes
    pub fn parse(meminfo: &str) -> Option<Self> {
        let mut total = None;
        let mut available = None;
        let mut free = 0u64;
        let mut buffers = 0u64;
        let mut cached = 0u64;

        for line in meminfo.lines() {
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            let Ok(kib) = value.parse::<u64>() else {
                continue;
            };
            let bytes = kib * 1024;
            match key {
                "MemTotal:" => total = Some(bytes),
                "MemAvailable:" => available = Some(bytes),
                "MemFree:" => free = bytes,
                "Buffers:" => buffers = bytes,
                "Cached:" => cached = bytes,
                _ => {}
            }
        }

        let total = total?;
        // old kernels lack MemAvailable
        let available = available.unwrap_or(free + buffers + cached).min(total);
        let used = total - available;
        let used_percent = if total == 0 { 0.0 } else { used as f64 / total as f64 * 100.0 };
        Some(Self { total, available, used, used_percent })
    }

    pub fn read() -> io::Result<Self> {
        let content = fs::read_to_string("/proc/meminfo")?;
        Self::parse(&content).ok_or_else(|| invalid("unreadable /proc/meminfo"))
    }
}

/// Load page sample
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MachineMetrics {
    pub cpu_load: f64,
    pub cpu_temp: f64,
    pub up_time: u64,
    pub mem: MemInfo,
}

/// Stateful sampler; CPU load is measured between successive calls.
#[derive(Debug, Default)]
pub struct MetricsSampler {
    prev_cpu: Option<CpuTimes>,
}

impl MetricsSampler {
    pub fn new() -> Self {
        Self::default()
    }

    fn cpu_load(&mut self) -> io::Result<f64> {
        let stat = fs::read_to_string("/proc/stat")?;
        let now = CpuTimes::parse(&stat).ok_or_else(|| invalid("unreadable /proc/stat"))?;
        // the first call measures since boot
        let prev = self.prev_cpu.replace(now).unwrap_or_default();
        Ok(now.percent_since(&prev))
    }

    pub fn check(&mut self) -> io::Result<MachineMetrics> {
        Ok(MachineMetrics {
            cpu_load: self.cpu_load()?,
            cpu_temp: cpu_temp()?,
            up_time: up_time_secs()?,
            mem: MemInfo::read()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskUsage {
    pub path: String,
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub used_percent: f64,
}

/// Is `path` one of the mount points listed in /proc/mounts format text
pub fn mount_listed(mounts: &str, path: &str) -> bool {
    mounts
        .lines()
        .filter_map(|l| l.split_whitespace().nth(1))
        .any(|mp| unescape_mount(mp) == path)
}

// /proc/mounts octal-escapes spaces and tabs
fn unescape_mount(mp: &str) -> String {
    mp.replace("\\040", " ").replace("\\011", "\t")
}

/// Filesystem usage of a mount point. Fails with `NotFound` when `path`
/// is not mounted.
pub fn disk_usage(path: &str) -> io::Result<DiskUsage> {
    let mounts = fs::read_to_string("/proc/mounts")?;
    if !mount_listed(&mounts, path) {
        return Err(io::Error::new(io::ErrorKind::NotFound, format!("{path} is not a mount point")));
    }

    let c_path = CString::new(path).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // Safety: statvfs is plain old data and fully written on success.
    let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut st) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    let frsize = st.f_frsize as u64;
    Ok(usage_from_blocks(
        path,
        st.f_blocks as u64 * frsize,
        st.f_bfree as u64 * frsize,
        st.f_bavail as u64 * frsize,
    ))
}

/// Used share excludes root reserved blocks, as `df` reports it
fn usage_from_blocks(path: &str, total: u64, bfree: u64, bavail: u64) -> DiskUsage {
    let used = total.saturating_sub(bfree);
    let denom = used + bavail;
    let used_percent = if denom == 0 { 0.0 } else { used as f64 / denom as f64 * 100.0 };
    DiskUsage { path: path.to_string(), total, free: bavail, used, used_percent }
}

/// SI byte count, "83 MB", "1.2 GB"
pub fn human_bytes(n: u64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
    if n < 10 {
        return format!("{n} B");
    }
    let e = ((n as f64).ln() / 1000f64.ln()).floor() as usize;
    let e = e.min(UNITS.len() - 1);
    let val = ((n as f64 / 1000f64.powi(e as i32)) * 10.0 + 0.5).floor() / 10.0;
    if val < 10.0 {
        format!("{val:.1} {}", UNITS[e])
    } else {
        format!("{val:.0} {}", UNITS[e])
    }
}

/// "up 2 days, 3 hours, 5 minutes" split on the commas
pub fn uptime_lines(secs: u64) -> Vec<String> {
    let plural = |n: u64, unit: &str| {
        if n == 1 { format!("{n} {unit}") } else { format!("{n} {unit}s") }
    };

    let weeks = secs / 604_800;
    let days = secs % 604_800 / 86_400;
    let hours = secs % 86_400 / 3_600;
    let minutes = secs % 3_600 / 60;

    let mut parts = Vec::new();
    if weeks > 0 { parts.push(plural(weeks, "week")); }
    if days > 0 { parts.push(plural(days, "day")); }
    if hours > 0 { parts.push(plural(hours, "hour")); }
    if minutes > 0 || parts.is_empty() { parts.push(plural(minutes, "minute")); }

    if let Some(first) = parts.first_mut() {
        *first = format!("up {first}");
    }
    parts
}
