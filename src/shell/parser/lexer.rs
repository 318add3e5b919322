use std::iter::Peekable;
use std::str::Chars;

use super::ast::Word;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Word(Word),
    Pipe,
    Or,
    And,
    Background,
    Semi,
    Redirect(RedirectOp),
    EOF,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum RedirectOp {
    Input,       // <
    Output,      // >
    Append,      // >>
    Error,       // 2>
    ErrorAppend, // 2>>
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
        }
    }

    pub fn next_token(&mut self) -> Result<Token, String> {
        self.skip_whitespace();

        let token = match self.peek_char() {
            None => Token::EOF,
            Some(c) => match c {
                '|' => {
                    self.read_char();
                    if self.peek_char() == Some('|') {
                        self.read_char();
                        Token::Or
                    } else {
                        Token::Pipe
                    }
                }
                '&' => {
                    self.read_char();
                    if self.peek_char() == Some('&') {
                        self.read_char();
                        Token::And
                    } else {
                        Token::Background
                    }
                }
                ';' => {
                    self.read_char();
                    Token::Semi
                }
                '<' => {
                    self.read_char();
                    Token::Redirect(RedirectOp::Input)
                }
                '>' => {
                    self.read_char();
                    Token::Redirect(self.read_output_op(RedirectOp::Output, RedirectOp::Append))
                }
                _ => self.read_word()?,
            },
        };
        Ok(token)
    }

    fn read_char(&mut self) -> Option<char> {
        self.input.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.read_char();
        }
    }

    // 已经读过第一个 '>'，再看是否是 '>>'
    fn read_output_op(&mut self, single: RedirectOp, double: RedirectOp) -> RedirectOp {
        if self.peek_char() == Some('>') {
            self.read_char();
            double
        } else {
            single
        }
    }

    fn read_word(&mut self) -> Result<Token, String> {
        // `text` 是字面内容，`escaped` 是交给展开的形式：单引号里的 `$` 写成 `$$`
        let mut text = String::new();
        let mut escaped = String::new();
        let mut quoted = false;
        let mut all_single = true;
        let mut quoted_tilde = false;

        while let Some(c) = self.peek_char() {
            if c.is_whitespace() || ";<>|&".contains(c) {
                break;
            }
            match c {
                '\'' | '"' => {
                    let segment = self.read_quoted_string()?;
                    if text.is_empty() && segment.starts_with('~') {
                        quoted_tilde = true;
                    }
                    if c == '\'' {
                        escaped.push_str(&segment.replace('$', "$$"));
                    } else {
                        escaped.push_str(&segment);
                        all_single = false;
                    }
                    text.push_str(&segment);
                    quoted = true;
                }
                _ => {
                    self.read_char();
                    if c == '~' && text.is_empty() && quoted {
                        quoted_tilde = true;
                    }
                    text.push(c);
                    escaped.push(c);
                    all_single = false;
                }
            }
        }

        // 只有不带引号的 `2` 紧跟 `>` 才是标准错误重定向，`a2>` 和 `"2">` 都是普通单词
        if !quoted && text == "2" && self.peek_char() == Some('>') {
            self.read_char();
            let op = self.read_output_op(RedirectOp::Error, RedirectOp::ErrorAppend);
            return Ok(Token::Redirect(op));
        }

        if quoted && all_single {
            return Ok(Token::Word(Word::literal(text)));
        }
        Ok(Token::Word(Word {
            text: escaped,
            expand: true,
            tilde: !quoted_tilde,
        }))
    }

    fn read_quoted_string(&mut self) -> Result<String, String> {
        let quote = self.read_char().unwrap_or_default();
        let mut string = String::new();
        let mut escaped = false;

        while let Some(c) = self.read_char() {
            match (escaped, c) {
                (true, _) => {
                    string.push(c);
                    escaped = false;
                }
                (false, '\\') if quote == '"' => escaped = true,
                (false, c) if c == quote => return Ok(string),
                (false, c) => string.push(c),
            }
        }

        Err(format!("Unterminated quote: {}", quote))
    }
}
