use std::os::fd::RawFd;

use log::{debug, error, warn};
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;

use crate::shell::expand::{expand_argv, expand_word};
use crate::shell::parser::ast::{OpenMode, SimpleCommand, Word};

use super::error::ExecError;
use super::process::{self, Fork};
use super::status::ExitStatus;

/// fork 一个子进程执行外部程序，等待它结束并返回退出状态
pub fn run_simple(command: &SimpleCommand, depth: usize) -> ExitStatus {
    if let Some((name, _)) = &command.assignment {
        let err = ExecError::Unsupported(format!("environment assignment to {}", name));
        warn!("{}", err);
        return err.status();
    }

    let argv = expand_argv(command);
    debug!("执行外部命令 (depth={}): {}", depth, shell_words::join(&argv));

    match process::create_process() {
        Ok(Fork::Child) => {
            let err = exec_child(&argv, command);
            error!("{}", err);
            process::exit_branch(err.status())
        }
        Ok(Fork::Parent(pid)) => {
            let status = process::await_status(pid);
            debug!("外部命令 {} (pid={}) 结束: {}", argv[0], pid, status);
            status
        }
        Err(e) => {
            error!("{}", e);
            e.status()
        }
    }
}

/// 子进程：先按顺序做重定向，再替换进程映像。只有出错时才会返回
fn exec_child(argv: &[String], command: &SimpleCommand) -> ExecError {
    if let Err(e) = apply_redirections(command) {
        return e;
    }
    process::replace_image(&argv[0], argv)
}

fn apply_redirections(command: &SimpleCommand) -> Result<(), ExecError> {
    if let Some(target) = &command.stdin {
        // 只读打开，文件不存在就是失败，不会创建
        redirect(libc::STDIN_FILENO, target, OFlag::O_RDONLY)?;
    }

    if let Some(stdout) = &command.stdout {
        // 同时重定向了 stderr 时，stdout 一律以追加方式打开
        let append = stdout.mode == OpenMode::Append || command.stderr.is_some();
        redirect(libc::STDOUT_FILENO, &stdout.target, write_flags(append))?;
    }

    if let Some(stderr) = &command.stderr {
        let append = stderr.mode == OpenMode::Append;
        redirect(libc::STDERR_FILENO, &stderr.target, write_flags(append))?;
    }

    Ok(())
}

fn write_flags(append: bool) -> OFlag {
    let mode = if append {
        OFlag::O_APPEND
    } else {
        OFlag::O_TRUNC
    };
    OFlag::O_WRONLY | OFlag::O_CREAT | mode
}

fn redirect(target_fd: RawFd, word: &Word, flags: OFlag) -> Result<(), ExecError> {
    let path = expand_word(word);
    let permissions = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
    let fd = match open(path.as_str(), flags | OFlag::O_CLOEXEC, permissions) {
        Ok(fd) => fd,
        Err(source) => return Err(ExecError::Redirection { path, source }),
    };
    process::bind_stream(target_fd, fd).map_err(|source| ExecError::Redirection { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::parser::ast::Redirect;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn word(path: &Path) -> Word {
        Word::literal(path.to_string_lossy().into_owned())
    }

    #[allow(clippy::unwrap_used)]
    fn scratch() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(run_simple(&SimpleCommand::new(Word::new("true")), 0), ExitStatus::SUCCESS);
        assert_eq!(run_simple(&SimpleCommand::new(Word::new("false")), 0).code(), 1);
        let exit3 = SimpleCommand::new(Word::new("sh")).with_params(["-c", "exit 3"]);
        assert_eq!(run_simple(&exit3, 0).code(), 3);
    }

    #[test]
    fn test_program_not_found() {
        let command = SimpleCommand::new(Word::new("forksh-no-such-program"));
        assert_eq!(run_simple(&command, 0).code(), 127);
    }

    #[test]
    fn test_signal_death_is_failure() {
        // 单引号形式，`$$` 原样交给 sh
        let command = SimpleCommand::new(Word::new("sh"))
            .with_params([Word::literal("-c"), Word::literal("kill -9 $$")]);
        assert_eq!(run_simple(&command, 0).code(), 128 + 9);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_stdout_truncates_and_appends() {
        let dir = scratch();
        let out = dir.path().join("out.txt");

        let mut command = SimpleCommand::new(Word::new("echo")).with_params(["one"]);
        command.stdout = Some(Redirect::truncate(word(&out)));
        assert!(run_simple(&command, 0).success());
        assert!(run_simple(&command, 0).success());
        assert_eq!(fs::read_to_string(&out).unwrap(), "one\n");

        command.stdout = Some(Redirect::append(word(&out)));
        assert!(run_simple(&command, 0).success());
        assert_eq!(fs::read_to_string(&out).unwrap(), "one\none\n");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_stderr_redirect_forces_stdout_append() {
        let dir = scratch();
        let out = dir.path().join("out.txt");
        let err = dir.path().join("err.txt");

        let mut command =
            SimpleCommand::new(Word::new("sh")).with_params(["-c", "echo out; echo err >&2"]);
        command.stdout = Some(Redirect::truncate(word(&out)));
        command.stderr = Some(Redirect::truncate(word(&err)));

        assert!(run_simple(&command, 0).success());
        assert!(run_simple(&command, 0).success());

        // stdout 没有被第二次运行截断，stderr 按自己的标志截断
        assert_eq!(fs::read_to_string(&out).unwrap(), "out\nout\n");
        assert_eq!(fs::read_to_string(&err).unwrap(), "err\n");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_stdin_redirect() {
        let dir = scratch();
        let input = dir.path().join("in.txt");
        let out = dir.path().join("out.txt");
        fs::write(&input, "abc").unwrap();

        let mut command = SimpleCommand::new(Word::new("wc")).with_params(["-c"]);
        command.stdin = Some(word(&input));
        command.stdout = Some(Redirect::truncate(word(&out)));
        assert!(run_simple(&command, 0).success());
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "3");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_stdin_redirect_when_stdin_is_closed() {
        let dir = scratch();
        let input = dir.path().join("in.txt");
        let out = dir.path().join("out.txt");
        fs::write(&input, "abc").unwrap();

        let mut command = SimpleCommand::new(Word::new("wc")).with_params(["-c"]);
        command.stdin = Some(word(&input));
        command.stdout = Some(Redirect::truncate(word(&out)));

        match process::create_process().unwrap() {
            Fork::Child => {
                // fd 0 空出来后，打开输入文件会正好拿到 0
                let _ = nix::unistd::close(libc::STDIN_FILENO);
                process::exit_branch(run_simple(&command, 0))
            }
            Fork::Parent(pid) => {
                assert_eq!(process::await_status(pid), ExitStatus::SUCCESS);
                assert_eq!(fs::read_to_string(&out).unwrap().trim(), "3");
            }
        }
    }

    #[test]
    fn test_missing_stdin_fails_without_creating_it() {
        let dir = scratch();
        let input = dir.path().join("missing.txt");
        let marker = dir.path().join("marker");

        let mut command = SimpleCommand::new(Word::new("touch")).with_params([word(&marker)]);
        command.stdin = Some(word(&input));
        assert_eq!(run_simple(&command, 0), ExitStatus::FAILURE);
        assert!(!input.exists());
        assert!(!marker.exists());
    }

    #[test]
    fn test_unopenable_stdout_short_circuits() {
        let dir = scratch();
        let marker = dir.path().join("marker");

        let mut command = SimpleCommand::new(Word::new("touch")).with_params([word(&marker)]);
        command.stdout = Some(Redirect::truncate(word(&dir.path().join("no/such/dir/out"))));
        assert_eq!(run_simple(&command, 0), ExitStatus::FAILURE);
        assert!(!marker.exists());
    }

    #[test]
    fn test_assignment_is_not_executed() {
        let mut command = SimpleCommand::new(Word::new("FOO=bar"));
        command.assignment = Some(("FOO".to_string(), Word::new("bar")));
        assert_eq!(run_simple(&command, 0), ExitStatus::FAILURE);
    }
}
