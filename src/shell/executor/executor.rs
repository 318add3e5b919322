use std::os::fd::IntoRawFd;

use log::{debug, error};

use crate::shell::parser::ast::{Command, Operator, OperatorNode, SimpleCommand};

use super::builtin::handle_builtin;
use super::process::{self, Fork};
use super::simple::run_simple;
use super::status::ExitStatus;

/// 递归执行命令树。`;` `&&` `||` 在当前进程内按顺序执行，
/// `&` 和 `|` 的每个分支都在独立的子进程里执行
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, command: &Command) -> ExitStatus {
        self.execute_at(command, 0, None)
    }

    /// `depth` 只用于日志；`parent` 是外层的操作符节点，给内建命令提供上下文
    pub fn execute_at(
        &self,
        command: &Command,
        depth: usize,
        parent: Option<&OperatorNode>,
    ) -> ExitStatus {
        match command {
            Command::Simple(simple) => self.execute_simple(simple, depth, parent),
            Command::Operator(node) => {
                debug!("执行 {} (depth={})", node.kind.as_str(), depth);
                let status = self.execute_operator(node, depth);
                debug!("{} 结束 (depth={}): {}", node.kind.as_str(), depth, status);
                status
            }
        }
    }

    fn execute_simple(
        &self,
        command: &SimpleCommand,
        depth: usize,
        parent: Option<&OperatorNode>,
    ) -> ExitStatus {
        // 内建命令优先，不会 fork
        if let Some(result) = handle_builtin(command, depth, parent) {
            return result.unwrap_or_else(|e| {
                error!("{}", e);
                e.status()
            });
        }
        run_simple(command, depth)
    }

    fn execute_operator(&self, node: &OperatorNode, depth: usize) -> ExitStatus {
        let (left, right) = (node.left.as_ref(), node.right.as_ref());
        match node.kind {
            Operator::Sequential => {
                let status = self.execute_at(left, depth + 1, Some(node));
                if status.is_exit_request() {
                    return status;
                }
                self.execute_at(right, depth + 1, Some(node))
            }
            Operator::ConditionalNonZero => {
                let status = self.execute_at(left, depth + 1, Some(node));
                if status.success() || status.is_exit_request() {
                    return status;
                }
                self.execute_at(right, depth + 1, Some(node))
            }
            Operator::ConditionalZero => {
                let status = self.execute_at(left, depth + 1, Some(node));
                if !status.success() {
                    return status;
                }
                self.execute_at(right, depth + 1, Some(node))
            }
            Operator::Parallel => self.run_in_parallel(node, depth),
            Operator::Pipe => self.run_on_pipe(node, depth),
        }
    }

    /// 在子进程里执行一个分支，结束后以它的状态退出
    fn run_branch(&self, command: &Command, depth: usize, parent: &OperatorNode) -> ! {
        let status = self.execute_at(command, depth + 1, Some(parent));
        process::exit_branch(status)
    }

    fn spawn_branch(
        &self,
        command: &Command,
        depth: usize,
        parent: &OperatorNode,
    ) -> Option<nix::unistd::Pid> {
        match process::create_process() {
            Ok(Fork::Child) => self.run_branch(command, depth, parent),
            Ok(Fork::Parent(pid)) => Some(pid),
            Err(e) => {
                error!("{}", e);
                None
            }
        }
    }

    /// 两个分支同时执行，全部等待结束。任何一个失败，结果就是失败
    fn run_in_parallel(&self, node: &OperatorNode, depth: usize) -> ExitStatus {
        let Some(left_pid) = self.spawn_branch(&node.left, depth, node) else {
            return ExitStatus::FAILURE;
        };
        let Some(right_pid) = self.spawn_branch(&node.right, depth, node) else {
            process::await_status(left_pid);
            return ExitStatus::FAILURE;
        };

        let left = process::await_status(left_pid);
        let right = process::await_status(right_pid);
        debug!("并行分支结束: left={}, right={}", left, right);

        if !left.success() {
            left
        } else {
            right
        }
    }

    /// 左分支的 stdout 接到管道写端，右分支的 stdin 接到读端。
    /// 结果只取右分支的状态，左分支的状态被丢弃
    fn run_on_pipe(&self, node: &OperatorNode, depth: usize) -> ExitStatus {
        let (read_end, write_end) = match process::create_pipe() {
            Ok(ends) => ends,
            Err(e) => {
                error!("{}", e);
                return e.status();
            }
        };

        let left_pid = match process::create_process() {
            Ok(Fork::Child) => {
                drop(read_end);
                if let Err(e) = process::bind_stream(libc::STDOUT_FILENO, write_end.into_raw_fd()) {
                    error!("管道写端绑定失败: {}", e);
                    process::exit_branch(ExitStatus::FAILURE);
                }
                self.run_branch(&node.left, depth, node)
            }
            Ok(Fork::Parent(pid)) => pid,
            Err(e) => {
                error!("{}", e);
                return e.status();
            }
        };

        let right_pid = match process::create_process() {
            Ok(Fork::Child) => {
                drop(write_end);
                if let Err(e) = process::bind_stream(libc::STDIN_FILENO, read_end.into_raw_fd()) {
                    error!("管道读端绑定失败: {}", e);
                    process::exit_branch(ExitStatus::FAILURE);
                }
                self.run_branch(&node.right, depth, node)
            }
            Ok(Fork::Parent(pid)) => pid,
            Err(e) => {
                error!("{}", e);
                // 关掉管道，让左分支写入时收到 EPIPE 并退出
                drop(read_end);
                drop(write_end);
                process::await_status(left_pid);
                return e.status();
            }
        };

        // 父进程必须关闭两端，否则右分支永远读不到 EOF
        drop(read_end);
        drop(write_end);

        let left = process::await_status(left_pid);
        let right = process::await_status(right_pid);
        debug!("管道结束: left={} (丢弃), right={}", left, right);
        right
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
