use std::env;

use crate::shell::parser::ast::{SimpleCommand, Word};

/// 展开 `$VAR`、`${VAR}` 和开头的 `~`。未定义的变量展开为空串
pub fn expand_word(word: &Word) -> String {
    if !word.expand {
        return word.text.clone();
    }
    let with_vars =
        shellexpand::env_with_context_no_errors(word.as_str(), |name| {
            Some(env::var(name).unwrap_or_default())
        });
    if word.tilde {
        shellexpand::tilde(&with_vars).into_owned()
    } else {
        with_vars.into_owned()
    }
}

/// verb 加上所有参数，即传给 exec 的 argv
pub fn expand_argv(command: &SimpleCommand) -> Vec<String> {
    std::iter::once(&command.verb)
        .chain(command.params.iter())
        .map(expand_word)
        .collect()
}
