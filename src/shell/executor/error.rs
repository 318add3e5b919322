use std::error::Error;
use std::fmt;
use std::io;

use super::status::ExitStatus;

/// 执行过程中的失败。全部在本地转换成 `ExitStatus`，不会让 shell 自身退出
#[derive(Debug)]
pub enum ExecError {
    ProcessCreation(nix::Error),
    Pipe(nix::Error),
    Redirection { path: String, source: nix::Error },
    Exec { program: String, source: nix::Error },
    Wait(nix::Error),
    Builtin { name: &'static str, source: io::Error },
    Unsupported(String),
}

impl ExecError {
    pub fn status(&self) -> ExitStatus {
        match self {
            ExecError::Exec {
                source: nix::Error::ENOENT,
                ..
            } => ExitStatus::from_code(127),
            ExecError::Exec { .. } => ExitStatus::from_code(126),
            _ => ExitStatus::FAILURE,
        }
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::ProcessCreation(e) => write!(f, "fork failed: {}", e),
            ExecError::Pipe(e) => write!(f, "pipe failed: {}", e),
            ExecError::Redirection { path, source } => write!(f, "{}: {}", path, source),
            ExecError::Exec {
                program,
                source: nix::Error::ENOENT,
            } => write!(f, "{}: command not found", program),
            ExecError::Exec { program, source } => write!(f, "{}: {}", program, source),
            ExecError::Wait(e) => write!(f, "waitpid failed: {}", e),
            ExecError::Builtin { name, source } => write!(f, "{}: {}", name, source),
            ExecError::Unsupported(what) => write!(f, "unsupported: {}", what),
        }
    }
}

impl Error for ExecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExecError::ProcessCreation(e) | ExecError::Pipe(e) | ExecError::Wait(e) => Some(e),
            ExecError::Redirection { source, .. } | ExecError::Exec { source, .. } => Some(source),
            ExecError::Builtin { source, .. } => Some(source),
            ExecError::Unsupported(_) => None,
        }
    }
}
