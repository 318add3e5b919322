use std::borrow::Cow;
use std::env;

use log::error;

pub fn basename(path: &str) -> Cow<'_, str> {
    if path == "/" {
        return path.into();
    }
    let mut pieces = path.trim_end_matches('/').rsplit('/');
    match pieces.next() {
        Some(p) => p.into(),
        None => path.into(),
    }
}

pub fn current_dir() -> String {
    let _current_dir = match env::current_dir() {
        Ok(x) => x,
        Err(e) => {
            error!("forksh: PROMPT: env current_dir error: {}", e);
            return String::new();
        }
    };
    let current_dir = match _current_dir.to_str() {
        Some(x) => x,
        None => {
            error!("forksh: PROMPT: to_str error");
            return String::new();
        }
    };

    current_dir.to_string()
}
