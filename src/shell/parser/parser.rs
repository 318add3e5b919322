use super::ast::{Command, Operator, Redirect, SimpleCommand, Word};
use super::lexer::{Lexer, RedirectOp, Token};

/// 优先级从低到高：`;` < `&` < `&&` `||` < `|`，全部左结合
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Result<Self, String> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
        })
    }

    fn next_token(&mut self) -> Result<(), String> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    /// 解析一整行。空行返回 `None`
    pub fn parse_line(&mut self) -> Result<Option<Command>, String> {
        if self.current_token == Token::EOF {
            return Ok(None);
        }
        let command = self.parse_sequence()?;
        match &self.current_token {
            Token::EOF => Ok(Some(command)),
            token => Err(format!("Unexpected token: {:?}", token)),
        }
    }

    fn parse_sequence(&mut self) -> Result<Command, String> {
        let mut left = self.parse_parallel()?;
        while self.current_token == Token::Semi {
            self.next_token()?;
            // 允许行尾的 `;`
            if self.current_token == Token::EOF {
                break;
            }
            let right = self.parse_parallel()?;
            left = Command::binary(Operator::Sequential, left, right);
        }
        Ok(left)
    }

    fn parse_parallel(&mut self) -> Result<Command, String> {
        let mut left = self.parse_conditional()?;
        while self.current_token == Token::Background {
            self.next_token()?;
            let right = self.parse_conditional()?;
            left = Command::binary(Operator::Parallel, left, right);
        }
        Ok(left)
    }

    fn parse_conditional(&mut self) -> Result<Command, String> {
        let mut left = self.parse_pipeline()?;
        loop {
            let kind = match self.current_token {
                Token::And => Operator::ConditionalZero,
                Token::Or => Operator::ConditionalNonZero,
                _ => break,
            };
            self.next_token()?;
            let right = self.parse_pipeline()?;
            left = Command::binary(kind, left, right);
        }
        Ok(left)
    }

    fn parse_pipeline(&mut self) -> Result<Command, String> {
        let mut left = Command::Simple(self.parse_simple_command()?);
        while self.current_token == Token::Pipe {
            self.next_token()?;
            let right = Command::Simple(self.parse_simple_command()?);
            left = Command::binary(Operator::Pipe, left, right);
        }
        Ok(left)
    }

    fn parse_simple_command(&mut self) -> Result<SimpleCommand, String> {
        let mut command = match &self.current_token {
            Token::Word(word) => SimpleCommand::new(word.clone()),
            Token::Redirect(_) => return Err("Redirection must follow a command name".to_string()),
            Token::EOF => return Err("Expected command name".to_string()),
            token => return Err(format!("Expected command name, found {:?}", token)),
        };
        self.next_token()?;

        if let Some((name, value)) = parse_assignment(&command.verb) {
            command.assignment = Some((name, value));
        }

        // 解析参数和重定向
        loop {
            match &self.current_token {
                Token::Word(word) => {
                    command.params.push(word.clone());
                    self.next_token()?;
                }
                Token::Redirect(op) => {
                    let op = *op;
                    let target = self.parse_redirection_target()?;
                    match op {
                        RedirectOp::Input => command.stdin = Some(target),
                        RedirectOp::Output => command.stdout = Some(Redirect::truncate(target)),
                        RedirectOp::Append => command.stdout = Some(Redirect::append(target)),
                        RedirectOp::Error => command.stderr = Some(Redirect::truncate(target)),
                        RedirectOp::ErrorAppend => command.stderr = Some(Redirect::append(target)),
                    }
                }
                _ => break,
            }
        }

        Ok(command)
    }

    fn parse_redirection_target(&mut self) -> Result<Word, String> {
        self.next_token()?; // 跳过重定向操作符

        match &self.current_token {
            Token::Word(filename) => {
                let target = filename.clone();
                self.next_token()?;
                Ok(target)
            }
            _ => Err("Expected filename after redirection operator".to_string()),
        }
    }
}

fn parse_assignment(verb: &Word) -> Option<(String, Word)> {
    if !verb.expand {
        return None;
    }
    let (name, value) = verb.as_str().split_once('=')?;
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| (name.to_string(), Word::new(value)))
}

/// 便捷入口：解析一整行
pub fn parse(input: &str) -> Result<Option<Command>, String> {
    Parser::new(input)?.parse_line()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::parser::ast::{OpenMode, OperatorNode};

    #[allow(clippy::unwrap_used)]
    fn parse_ok(input: &str) -> Command {
        parse(input).unwrap().unwrap()
    }

    fn words(words: &[Word]) -> Vec<&str> {
        words.iter().map(Word::as_str).collect()
    }

    #[test]
    fn test_simple_command() {
        match parse_ok("ls -l /tmp") {
            Command::Simple(cmd) => {
                assert_eq!(cmd.verb.as_str(), "ls");
                assert_eq!(words(&cmd.params), vec!["-l", "/tmp"]);
                assert!(cmd.stdin.is_none());
                assert!(cmd.stdout.is_none());
                assert!(cmd.assignment.is_none());
            }
            _ => panic!("Expected simple command"),
        }
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn test_pipeline_is_left_associative() {
        match parse_ok("a | b | c") {
            Command::Operator(OperatorNode { kind, left, right }) => {
                assert_eq!(kind, Operator::Pipe);
                assert!(matches!(*left, Command::Operator(ref n) if n.kind == Operator::Pipe));
                assert!(matches!(*right, Command::Simple(ref c) if c.verb.as_str() == "c"));
            }
            _ => panic!("Expected pipeline"),
        }
    }

    #[test]
    fn test_precedence() {
        // a ; b & c && d | e  =>  a ; (b & (c && (d | e)))
        let Command::Operator(seq) = parse_ok("a ; b & c && d | e") else {
            panic!("Expected sequence");
        };
        assert_eq!(seq.kind, Operator::Sequential);
        let Command::Operator(par) = *seq.right else {
            panic!("Expected parallel");
        };
        assert_eq!(par.kind, Operator::Parallel);
        let Command::Operator(cond) = *par.right else {
            panic!("Expected conditional");
        };
        assert_eq!(cond.kind, Operator::ConditionalZero);
        assert!(matches!(*cond.right, Command::Operator(ref n) if n.kind == Operator::Pipe));
    }

    #[test]
    fn test_or_operator() {
        let Command::Operator(node) = parse_ok("false || true") else {
            panic!("Expected operator");
        };
        assert_eq!(node.kind, Operator::ConditionalNonZero);
    }

    #[test]
    fn test_redirection() {
        match parse_ok("sort < in.txt > out.txt 2>> err.txt") {
            Command::Simple(cmd) => {
                assert_eq!(cmd.verb.as_str(), "sort");
                assert!(cmd.params.is_empty());
                assert_eq!(cmd.stdin, Some(Word::new("in.txt")));
                let stdout = cmd.stdout.unwrap_or_else(|| panic!("missing stdout"));
                assert_eq!(stdout.target.as_str(), "out.txt");
                assert_eq!(stdout.mode, OpenMode::Truncate);
                let stderr = cmd.stderr.unwrap_or_else(|| panic!("missing stderr"));
                assert_eq!(stderr.target.as_str(), "err.txt");
                assert_eq!(stderr.mode, OpenMode::Append);
            }
            _ => panic!("Expected command with redirection"),
        }
    }

    #[test]
    fn test_assignment() {
        match parse_ok("FOO=bar") {
            Command::Simple(cmd) => {
                assert_eq!(cmd.assignment, Some(("FOO".to_string(), Word::new("bar"))));
            }
            _ => panic!("Expected assignment"),
        }
        match parse_ok("--opt=1") {
            Command::Simple(cmd) => assert!(cmd.assignment.is_none()),
            _ => panic!("Expected simple command"),
        }
    }

    #[test]
    fn test_trailing_semicolon() {
        assert!(matches!(parse_ok("true ;"), Command::Simple(_)));
    }

    #[test]
    fn test_errors() {
        assert!(parse("| b").is_err());
        assert!(parse("a &&").is_err());
        assert!(parse("a &").is_err());
        assert!(parse("echo >").is_err());
        assert!(parse("> out").is_err());
    }
}
