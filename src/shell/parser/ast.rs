use std::fmt;

/// 一个单词。`expand` 为 false 时（单引号包裹）不做变量/波浪号展开。
/// 可展开的单词里 `$$` 代表字面的 `$`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub expand: bool,
    /// 开头的 `~` 来自引号时为 false
    pub tilde: bool,
}

impl Word {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            expand: true,
            tilde: true,
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            expand: false,
            tilde: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    Truncate,
    Append,
}

/// 输出类重定向：目标文件 + 打开方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: Word,
    pub mode: OpenMode,
}

impl Redirect {
    pub fn truncate(target: Word) -> Self {
        Self {
            target,
            mode: OpenMode::Truncate,
        }
    }

    pub fn append(target: Word) -> Self {
        Self {
            target,
            mode: OpenMode::Append,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    pub verb: Word,
    pub params: Vec<Word>,
    pub stdin: Option<Word>,
    pub stdout: Option<Redirect>,
    pub stderr: Option<Redirect>,
    /// `NAME=value` 形式的环境变量赋值，目前只解析不执行
    pub assignment: Option<(String, Word)>,
}

impl SimpleCommand {
    pub fn new(verb: Word) -> Self {
        Self {
            verb,
            params: Vec::new(),
            stdin: None,
            stdout: None,
            stderr: None,
            assignment: None,
        }
    }

    #[cfg(test)]
    pub fn with_params<I, W>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Word>,
    {
        self.params.extend(params.into_iter().map(Into::into));
        self
    }
}

impl From<&str> for Word {
    fn from(text: &str) -> Self {
        Word::new(text)
    }
}

impl From<String> for Word {
    fn from(text: String) -> Self {
        Word::new(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `a ; b`
    Sequential,
    /// `a & b`
    Parallel,
    /// `a || b`
    ConditionalNonZero,
    /// `a && b`
    ConditionalZero,
    /// `a | b`
    Pipe,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Sequential => ";",
            Operator::Parallel => "&",
            Operator::ConditionalNonZero => "||",
            Operator::ConditionalZero => "&&",
            Operator::Pipe => "|",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorNode {
    pub kind: Operator,
    pub left: Box<Command>,
    pub right: Box<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Simple(SimpleCommand),
    Operator(OperatorNode),
}

impl Command {
    pub fn binary(kind: Operator, left: Command, right: Command) -> Self {
        Command::Operator(OperatorNode {
            kind,
            left: Box::new(left),
            right: Box::new(right),
        })
    }
}
