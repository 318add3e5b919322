use colored::Colorize;
use std::collections::HashMap;

use crate::utils::path;

type Style = Box<dyn Fn(String) -> String>;

pub struct Theme {
    messages: HashMap<&'static str, &'static str>,
    pub prompt_style: Style,
    pub success_style: Style,
    pub warning_style: Style,
    pub error_style: Style,
}

const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    ("welcome", "forksh 已启动"),
    ("help", "输入 exit 或 quit 退出，支持 ; & && || | < > >> 2> 2>>"),
    ("exit", "再见"),
    ("eof_signal", "收到 EOF，退出"),
    ("interrupt_signal", "已中断"),
    ("error", "错误"),
    ("parse_error", "语法错误"),
    ("error_symbol", "✗"),
];

impl Theme {
    pub fn new() -> Self {
        Self::load_theme("default")
    }

    pub fn load_theme(theme_name: &str) -> Self {
        let messages = DEFAULT_MESSAGES.iter().copied().collect();
        match theme_name {
            "plain" => Theme {
                messages,
                prompt_style: Box::new(|s| s),
                success_style: Box::new(|s| s),
                warning_style: Box::new(|s| s),
                error_style: Box::new(|s| s),
            },
            "dark" => Theme {
                messages,
                prompt_style: Box::new(|s| s.bright_purple().to_string()),
                success_style: Box::new(|s| s.magenta().to_string()),
                warning_style: Box::new(|s| s.bright_yellow().to_string()),
                error_style: Box::new(|s| s.red().to_string()),
            },
            _ => Theme {
                messages,
                prompt_style: Box::new(|s| s.bright_cyan().to_string()),
                success_style: Box::new(|s| s.bright_green().to_string()),
                warning_style: Box::new(|s| s.yellow().to_string()),
                error_style: Box::new(|s| s.bright_red().to_string()),
            },
        }
    }

    pub fn get_message(&self, key: &str) -> String {
        self.messages.get(key).copied().unwrap_or(key).to_string()
    }

    /// 提示符里显示当前目录名
    pub fn prompt(&self, name: &str) -> String {
        let cwd = path::current_dir();
        (self.prompt_style)(format!("{} {}> ", name, path::basename(&cwd)))
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}
