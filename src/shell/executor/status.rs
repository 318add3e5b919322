use std::fmt;

use nix::sys::signal::Signal;

/// 命令的退出状态。0 表示成功，`SHELL_EXIT` 是保留值，表示结束当前 shell 会话
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ExitStatus(i32);

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus(0);
    pub const FAILURE: ExitStatus = ExitStatus(1);
    /// 不可能来自真实进程（退出码只有 0..=255）
    pub const SHELL_EXIT: ExitStatus = ExitStatus(-100);

    pub fn from_code(code: i32) -> Self {
        ExitStatus(code)
    }

    pub fn code(&self) -> i32 {
        self.0
    }

    pub fn success(&self) -> bool {
        self.0 == 0
    }

    pub fn is_exit_request(&self) -> bool {
        *self == Self::SHELL_EXIT
    }

    /// 分支进程用它作为自己的退出码
    pub fn branch_exit_code(&self) -> i32 {
        if self.is_exit_request() {
            0
        } else {
            self.code() & 0xff
        }
    }
}

impl fmt::Debug for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exit_request() {
            write!(f, "ExitStatus(SHELL_EXIT)")
        } else {
            write!(f, "ExitStatus({})", self.0)
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exit_request() {
            write!(f, "exit")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// 子进程的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    Signaled(Signal),
}

impl Termination {
    /// 被信号杀死的进程按惯例记为 128 + 信号值
    pub fn status(&self) -> ExitStatus {
        match self {
            Termination::Exited(code) => ExitStatus(*code),
            Termination::Signaled(sig) => ExitStatus(128 + *sig as i32),
        }
    }
}
