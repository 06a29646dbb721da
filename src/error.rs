use std::io;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Process listing exited with {status}")]
    Command { status: ExitStatus },
    #[error("could not read process information")]
    NoProcesses,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),
}
