use log::{debug, error, warn};
use std::error::Error;
use std::io::Write;

use crate::shell::executor::{Executor, ExitStatus};
use crate::shell::parser::parse;
use crate::shell::readline::{LineReader, ReadlineError};
use crate::utils::config::Config;
use crate::utils::theme::Theme;

pub struct Shell<'a> {
    config: &'a Config,
    theme: Theme,
    executor: Executor,
    last_status: ExitStatus,
}

impl<'a> Shell<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            theme: Theme::load_theme(&config.theme),
            executor: Executor::new(),
            last_status: ExitStatus::SUCCESS,
        }
    }

    /// 交互模式，返回最后一条命令的退出码
    pub fn run(&mut self) -> Result<i32, Box<dyn Error>> {
        debug!("初始化 {}...", self.config.name);
        let mut reader = LineReader::open(self.config)?;

        println!(
            "{}",
            (self.theme.success_style)(self.theme.get_message("welcome"))
        );
        println!(
            "{}",
            (self.theme.warning_style)(self.theme.get_message("help"))
        );
        debug!("{} 准备就绪...", self.config.name);

        self.run_loop(&mut reader)?;

        debug!("退出 {}...", self.config.name);
        Ok(self.last_status.branch_exit_code())
    }

    /// `-c` 模式：只执行一行
    pub fn run_line(&mut self, line: &str) -> i32 {
        self.execute_line(line);
        self.last_status.branch_exit_code()
    }

    fn run_loop(&mut self, reader: &mut LineReader) -> Result<(), Box<dyn Error>> {
        loop {
            std::io::stdout().flush()?;
            let prompt = self.theme.prompt(&self.config.name);

            match reader.read(&prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    reader.remember(&line);
                    if self.execute_line(&line).is_exit_request() {
                        println!(
                            "{}",
                            (self.theme.success_style)(self.theme.get_message("exit"))
                        );
                        break;
                    }
                    self.report_status();
                }
                Err(err) => match err {
                    ReadlineError::Eof => {
                        warn!("接收到 EOF 信号，退出 {}...", self.config.name);
                        println!(
                            "\n{}",
                            (self.theme.warning_style)(self.theme.get_message("eof_signal"))
                        );
                        break;
                    }
                    ReadlineError::Interrupted => {
                        warn!("接收到中断信号...");
                        println!(
                            "\n{}",
                            (self.theme.warning_style)(self.theme.get_message("interrupt_signal"))
                        );
                    }
                    err => {
                        error!("发生错误: {}", err);
                        eprintln!(
                            "{}: {}",
                            (self.theme.error_style)(self.theme.get_message("error")),
                            err
                        );
                    }
                },
            }
        }
        Ok(())
    }

    /// 解析并执行一行。`exit` 的哨兵值会原样返回，由调用方决定是否退出
    fn execute_line(&mut self, line: &str) -> ExitStatus {
        debug!("执行命令: {}", line);
        let status = match parse(line) {
            Ok(Some(command)) => self.executor.execute(&command),
            Ok(None) => return self.last_status,
            Err(e) => {
                warn!("解析失败: {}", e);
                eprintln!(
                    "{} {}: {}",
                    (self.theme.error_style)(self.theme.get_message("error_symbol")),
                    (self.theme.error_style)(self.theme.get_message("parse_error")),
                    e
                );
                // 和常见 shell 一样，语法错误记为 2
                ExitStatus::from_code(2)
            }
        };
        if !status.is_exit_request() {
            self.last_status = status;
        }
        status
    }

    fn report_status(&self) {
        if self.last_status.success() {
            return;
        }
        eprintln!(
            "{} {}",
            (self.theme.error_style)(self.theme.get_message("error_symbol")),
            (self.theme.error_style)(format!("exit {}", self.last_status))
        );
    }
}
