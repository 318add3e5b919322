use std::path::PathBuf;

use crate::utils::config::Config;
use log::{debug, error, warn};
pub use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use rustyline::{CompletionType, Config as RLConfig};

/// 带历史记录的行编辑器。打开时加载历史，drop 时写回
pub struct LineReader {
    history_file: PathBuf,
    editor: Editor<(), FileHistory>,
}

impl LineReader {
    pub fn open(config: &Config) -> Result<Self, ReadlineError> {
        let rl_config = RLConfig::builder()
            .history_ignore_space(true)
            .history_ignore_dups(true)?
            .completion_type(CompletionType::List)
            .edit_mode(config.get_edit_mode())
            .build();

        let mut editor = Editor::with_config(rl_config)?;
        match editor.load_history(&config.history_file) {
            Ok(()) => debug!("历史记录加载成功: {}", config.history_file.display()),
            // 第一次启动时历史文件还不存在
            Err(err) => warn!(
                "无法加载历史记录: {} {}",
                config.history_file.display(),
                err
            ),
        }

        Ok(Self {
            history_file: config.history_file.clone(),
            editor,
        })
    }

    pub fn read(&mut self, prompt: &str) -> Result<String, ReadlineError> {
        self.editor.readline(prompt)
    }

    pub fn remember(&mut self, line: &str) {
        if let Err(err) = self.editor.add_history_entry(line) {
            warn!("添加历史记录失败: {}", err);
        }
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        match self.editor.save_history(&self.history_file) {
            Ok(()) => debug!("历史记录保存成功"),
            Err(err) => error!("保存历史记录失败: {}", err),
        }
    }
}
