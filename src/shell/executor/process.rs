//! 对 fork / dup2 / pipe / waitpid / execvp 的薄封装

use std::ffi::CString;
use std::os::fd::{OwnedFd, RawFd};

use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, pipe2, ForkResult, Pid};

use super::error::ExecError;
use super::status::{ExitStatus, Termination};

/// fork 之后的两种身份
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fork {
    Child,
    Parent(Pid),
}

pub fn create_process() -> Result<Fork, ExecError> {
    // shell 在执行期间是单线程的，子进程里只做重定向、exec 或递归执行子树
    match unsafe { fork() } {
        Ok(ForkResult::Child) => Ok(Fork::Child),
        Ok(ForkResult::Parent { child }) => Ok(Fork::Parent(child)),
        Err(e) => Err(ExecError::ProcessCreation(e)),
    }
}

/// 把 `source` 复制到 `target` 上，然后关闭 `source`。绑定后的 `target` 会保留到 exec 之后
pub fn bind_stream(target: RawFd, source: RawFd) -> nix::Result<()> {
    if source == target {
        // 标准流原本是关闭的，open 直接拿到了这个编号，只需去掉 close-on-exec
        return fcntl(source, FcntlArg::F_SETFD(FdFlag::empty())).map(|_| ());
    }
    let result = dup2(source, target).map(|_| ());
    let _ = close(source);
    result
}

/// 返回 (读端, 写端)。两端都带 close-on-exec，绑定到标准流之后才会被子程序继承
pub fn create_pipe() -> Result<(OwnedFd, OwnedFd), ExecError> {
    pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)
}

/// 阻塞等待指定子进程结束
pub fn await_process(pid: Pid) -> Result<Termination, ExecError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(Termination::Exited(code)),
            Ok(WaitStatus::Signaled(_, sig, _core_dumped)) => {
                debug!("子进程 {} 被信号 {} 终止", pid, sig);
                return Ok(Termination::Signaled(sig));
            }
            // 没有 WUNTRACED / WCONTINUED，理论上不会出现其他状态
            Ok(other) => debug!("忽略子进程状态: {:?}", other),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(ExecError::Wait(e)),
        }
    }
}

/// 等待子进程并直接换算成退出状态，等待失败记为失败
pub fn await_status(pid: Pid) -> ExitStatus {
    match await_process(pid) {
        Ok(termination) => termination.status(),
        Err(e) => {
            warn!("{}", e);
            e.status()
        }
    }
}

/// 用 `program` 替换当前进程映像。只有失败时才会返回
pub fn replace_image(program: &str, argv: &[String]) -> ExecError {
    let exec_error = |source| ExecError::Exec {
        program: program.to_string(),
        source,
    };

    let Ok(filename) = CString::new(program) else {
        return exec_error(Errno::EINVAL);
    };
    let args: Result<Vec<CString>, _> = argv.iter().map(|arg| CString::new(arg.as_str())).collect();
    let Ok(args) = args else {
        return exec_error(Errno::EINVAL);
    };

    match execvp(&filename, &args) {
        Ok(never) => match never {},
        Err(e) => exec_error(e),
    }
}

/// 结束 fork 出来的子进程。用 `_exit`，不刷新从父进程继承来的缓冲区
pub fn exit_branch(status: ExitStatus) -> ! {
    unsafe { libc::_exit(status.branch_exit_code()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Read;
    use std::os::fd::{AsRawFd, IntoRawFd};

    #[allow(clippy::unwrap_used)]
    fn is_cloexec(fd: RawFd) -> bool {
        FdFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFD).unwrap()).contains(FdFlag::FD_CLOEXEC)
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_bind_stream_onto_itself_survives_exec() {
        let (read_end, write_end) = create_pipe().unwrap();
        assert!(is_cloexec(read_end.as_raw_fd()));
        assert!(is_cloexec(write_end.as_raw_fd()));

        let fd = read_end.as_raw_fd();
        bind_stream(fd, fd).unwrap();
        assert!(!is_cloexec(fd));
        // 编号相同时不能把它关掉
        assert!(fcntl(fd, FcntlArg::F_GETFD).is_ok());
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_exit_code_roundtrip() {
        match create_process().unwrap() {
            Fork::Child => exit_branch(ExitStatus::from_code(42)),
            Fork::Parent(pid) => {
                assert_eq!(await_process(pid).unwrap(), Termination::Exited(42));
            }
        }
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_pipe_and_bind_stream() {
        let (read_end, write_end) = create_pipe().unwrap();
        match create_process().unwrap() {
            Fork::Child => {
                drop(read_end);
                // 写端绑定到 stdout 后交给 printf
                if bind_stream(libc::STDOUT_FILENO, write_end.into_raw_fd()).is_err() {
                    exit_branch(ExitStatus::FAILURE);
                }
                let err = replace_image("printf", &["printf".to_string(), "hi".to_string()]);
                exit_branch(err.status())
            }
            Fork::Parent(pid) => {
                drop(write_end);
                let mut output = String::new();
                let mut file = File::from(read_end);
                file.read_to_string(&mut output).unwrap();
                assert_eq!(output, "hi");
                assert_eq!(await_status(pid), ExitStatus::SUCCESS);
            }
        }
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_replace_image_missing_program() {
        match create_process().unwrap() {
            Fork::Child => {
                let err = replace_image("forksh-no-such-program", &[]);
                exit_branch(err.status())
            }
            Fork::Parent(pid) => {
                assert_eq!(await_status(pid).code(), 127);
            }
        }
    }
}
