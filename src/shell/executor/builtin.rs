use std::io;

use log::debug;

use crate::shell::expand::expand_word;
use crate::shell::parser::ast::{OperatorNode, SimpleCommand};

use super::error::ExecError;
use super::status::ExitStatus;

/// 在当前进程内执行、不 fork 的内建命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Exit,
}

impl Builtin {
    pub fn lookup(verb: &str) -> Option<Self> {
        match verb {
            "cd" => Some(Builtin::Cd),
            "exit" | "quit" => Some(Builtin::Exit),
            _ => None,
        }
    }
}

/// 处理内建命令，不是内建命令时返回 `None`
pub fn handle_builtin(
    command: &SimpleCommand,
    depth: usize,
    parent: Option<&OperatorNode>,
) -> Option<Result<ExitStatus, ExecError>> {
    let builtin = Builtin::lookup(command.verb.as_str())?;
    debug!(
        "执行内建命令 {:?} (depth={}, 外层操作符={})",
        builtin,
        depth,
        parent.map(|node| node.kind.as_str()).unwrap_or("-")
    );
    Some(match builtin {
        Builtin::Cd => builtin_cd(command),
        Builtin::Exit => Ok(ExitStatus::SHELL_EXIT),
    })
}

/// 只改变当前进程的工作目录，在分支子进程里执行时对父 shell 不可见
fn builtin_cd(command: &SimpleCommand) -> Result<ExitStatus, ExecError> {
    let Some(target) = command.params.first() else {
        return Err(ExecError::Builtin {
            name: "cd",
            source: io::Error::new(io::ErrorKind::InvalidInput, "missing directory argument"),
        });
    };
    let path = expand_word(target);
    std::env::set_current_dir(&path).map_err(|source| ExecError::Builtin { name: "cd", source })?;
    Ok(ExitStatus::SUCCESS)
}
