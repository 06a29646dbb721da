use std::fmt;
use std::fs;
use std::process::{Command, Output};
use std::str::FromStr;

use log::{debug, warn};
use serde::Deserialize;
use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, System, UpdateKind};

use crate::error::Error;
use crate::myprocess::RawProcess;

/// Yields every live process on the host.
pub trait ProcessSource {
    /// Empty when the host listing is unavailable.
    fn list_processes(&self) -> Vec<RawProcess>;
}

/// Resident memory of a single process in megabytes, `0` when it cannot be read.
pub trait MemoryReader {
    fn memory_of(&self, pid: u32) -> f64;
}

pub trait Host: ProcessSource + MemoryReader {}
impl<T: ProcessSource + MemoryReader> Host for T {}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Ps,
    Sysinfo,
}

impl Default for SourceKind {
    fn default() -> Self {
        if cfg!(target_os = "linux") {
            SourceKind::Ps
        } else {
            SourceKind::Sysinfo
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ps" => Ok(SourceKind::Ps),
            "sysinfo" => Ok(SourceKind::Sysinfo),
            other => Err(format!("unknown source '{other}', expected ps or sysinfo")),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Ps => write!(f, "ps"),
            SourceKind::Sysinfo => write!(f, "sysinfo"),
        }
    }
}

pub fn open(kind: SourceKind) -> Box<dyn Host> {
    debug!("using {kind} process source");
    match kind {
        SourceKind::Ps => Box::new(PsSource::default()),
        SourceKind::Sysinfo => Box::new(SysinfoSource::new()),
    }
}

/// Host `ps` listing with memory taken from `/proc/<pid>/status`.
pub struct PsSource {
    program: String,
}

impl Default for PsSource {
    fn default() -> Self {
        Self::with_program("ps")
    }
}

impl PsSource {
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn os_command(&self) -> Result<Output, Error> {
        let output = Command::new(&self.program)
            .args(["-eo", "pid,ppid,cmd", "--no-headers"])
            .output()?;
        if !output.status.success() {
            return Err(Error::Command {
                status: output.status,
            });
        }
        Ok(output)
    }

    fn exec(&self) -> Result<Vec<RawProcess>, Error> {
        let output = self.os_command()?;
        Ok(parse_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl ProcessSource for PsSource {
    fn list_processes(&self) -> Vec<RawProcess> {
        match self.exec() {
            Ok(rows) => rows,
            Err(e) => {
                warn!("process listing unavailable: {e}");
                vec![]
            }
        }
    }
}

impl MemoryReader for PsSource {
    fn memory_of(&self, pid: u32) -> f64 {
        match fs::read_to_string(format!("/proc/{pid}/status")) {
            Ok(status) => parse_vm_rss(&status).unwrap_or_else(|| {
                debug!("no VmRSS for pid {pid}");
                0.
            }),
            Err(e) => {
                debug!("could not read status of pid {pid}: {e}");
                0.
            }
        }
    }
}

pub fn parse_output(output: &str) -> Vec<RawProcess> {
    let mut processes = vec![];
    for row in output.lines().filter(|row| !row.trim().is_empty()) {
        if let Some(process) = parse_row(row) {
            processes.push(process)
        } else {
            debug!("Process could not be parsed: {row}")
        }
    }
    processes
}

/// `pid ppid command...`, columns separated by any run of whitespace.
pub fn parse_row(row: &str) -> Option<RawProcess> {
    let (pid, rest) = row.trim().split_once(char::is_whitespace)?;
    let (parent, command) = rest.trim_start().split_once(char::is_whitespace)?;
    let command = command.trim();
    if command.is_empty() {
        return None;
    }
    Some(RawProcess {
        pid: pid.parse().ok()?,
        parent: parent.parse().ok()?,
        command: command.to_string(),
    })
}

/// Resident memory in megabytes from the contents of a `/proc/<pid>/status` file.
pub fn parse_vm_rss(status: &str) -> Option<f64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024.)
}

/// Cross platform source backed by a single sysinfo refresh.
pub struct SysinfoSource {
    system: System,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_processes(
                ProcessRefreshKind::nothing()
                    .with_memory()
                    .with_cmd(UpdateKind::OnlyIfNotSet)
                    .with_exe(UpdateKind::OnlyIfNotSet),
            ),
        );
        Self { system }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SysinfoSource {
    fn list_processes(&self) -> Vec<RawProcess> {
        let mut procs = self
            .system
            .processes()
            .values()
            .filter(|x| x.thread_kind() != Some(sysinfo::ThreadKind::Userland))
            .map(|x| {
                let cmd = x
                    .cmd()
                    .iter()
                    .map(|s| s.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ");
                let command = if !cmd.trim().is_empty() {
                    cmd
                } else {
                    match x.exe() {
                        Some(s) if !s.as_os_str().is_empty() => s.to_string_lossy().to_string(),
                        _ => x.name().to_string_lossy().to_string(),
                    }
                };
                RawProcess {
                    pid: x.pid().as_u32(),
                    parent: x.parent().map_or(0, |p| p.as_u32()),
                    command,
                }
            })
            .filter(|x| x.pid != 0) //dont want root or errors
            .collect::<Vec<RawProcess>>();
        //hashmap order is arbitrary, keep output stable across runs
        procs.sort_by_key(|p| p.pid);
        procs
    }
}

impl MemoryReader for SysinfoSource {
    fn memory_of(&self, pid: u32) -> f64 {
        self.system
            .process(Pid::from_u32(pid))
            .map_or(0., |p| p.memory() as f64 / 1024. / 1024.)
    }
}
