use dotenv::dotenv;
use rustyline::EditMode;
use std::env;
use std::fs;
use std::path::PathBuf;

pub struct Config {
    pub name: String,
    pub config_dir: PathBuf,
    pub theme: String,
    pub history_file: PathBuf,
    pub editor_mode: String,
    pub logger_level: String,
    pub logger_dir: PathBuf,
    pub log_to_stderr: bool,
}

impl Config {
    fn get_config_dir() -> PathBuf {
        if let Ok(home) = env::var("HOME") {
            PathBuf::from(home).join(".config/forksh")
        } else {
            env::temp_dir().join("forksh")
        }
    }

    fn default() -> Self {
        let config_dir = Self::get_config_dir();
        Config {
            name: String::from(env!("CARGO_PKG_NAME")),
            theme: String::from("default"),
            history_file: config_dir.join(".forksh_history"),
            editor_mode: String::from("emacs"),
            logger_level: String::from("info"),
            logger_dir: config_dir.join("logs"),
            log_to_stderr: false,
            config_dir,
        }
    }

    pub fn new() -> Self {
        // 优先加载环境变量
        if cfg!(debug_assertions) {
            dotenv::from_filename(".env.development").ok();
        } else {
            dotenv().ok();
        }

        // 默认配置
        let mut config = Config::default();

        // 从环境变量加载配置
        if let Ok(theme) = env::var("FORKSH_THEME") {
            config.theme = theme;
        }

        if let Ok(editor) = env::var("FORKSH_EDITOR") {
            config.editor_mode = editor;
        }

        if let Ok(history) = env::var("FORKSH_HISTORY") {
            config.history_file = PathBuf::from(history);
        }

        if let Ok(level) = env::var("FORKSH_LOG_LEVEL") {
            config.logger_level = level;
        }

        if let Ok(dir) = env::var("FORKSH_LOG_DIR") {
            config.logger_dir = PathBuf::from(dir);
        }

        if let Ok(flag) = env::var("FORKSH_LOG_STDERR") {
            config.log_to_stderr = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        // 确保历史文件目录存在。此时日志还没初始化，失败只能打到 stderr
        if let Some(parent) = config.history_file.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("{}: 无法创建历史记录目录 {}: {}", config.name, parent.display(), e);
            }
        }

        config
    }

    pub fn get_edit_mode(&self) -> EditMode {
        match self.editor_mode.to_lowercase().as_str() {
            "vi" => EditMode::Vi,
            _ => EditMode::Emacs,
        }
    }
}
