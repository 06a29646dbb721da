/// One row of the host process listing, before any memory is attached.
#[derive(Clone, Debug, PartialEq)]
pub struct RawProcess {
    pub pid: u32,
    pub parent: u32,
    pub command: String, // full command line
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub parent: u32,
    pub command: String, // executable, first token of the command line
    pub memory_mb: f64,
}

impl ProcessRecord {
    pub fn from_raw(raw: RawProcess, memory_mb: f64) -> Option<ProcessRecord> {
        let command = raw.command.split_whitespace().next()?.to_string();
        Some(ProcessRecord {
            pid: raw.pid,
            parent: raw.parent,
            command,
            memory_mb,
        })
    }
}
