use std::fmt;

use thiserror::Error;

use crate::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `{`
    StartObject,
    /// `}`
    EndObject,
    /// `[`
    StartArray,
    /// `]`
    EndArray,
    /// Key of a key/value pair, already unescaped
    PropertyName(String),
    /// A string value, already unescaped
    String(String),
    /// Any number literal
    Number(Number),
    /// `true` or `false`
    Boolean(bool),
    /// `null`
    Null,
    /// `/* ... */` or `// ...`, with the delimiters stripped
    Comment(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    PropertyName,
    String,
    Number,
    Boolean,
    Null,
    Comment,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::StartObject => TokenKind::StartObject,
            Token::EndObject => TokenKind::EndObject,
            Token::StartArray => TokenKind::StartArray,
            Token::EndArray => TokenKind::EndArray,
            Token::PropertyName(_) => TokenKind::PropertyName,
            Token::String(_) => TokenKind::String,
            Token::Number(_) => TokenKind::Number,
            Token::Boolean(_) => TokenKind::Boolean,
            Token::Null => TokenKind::Null,
            Token::Comment(_) => TokenKind::Comment,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::StartObject => "start of object",
            TokenKind::EndObject => "end of object",
            TokenKind::StartArray => "start of array",
            TokenKind::EndArray => "end of array",
            TokenKind::PropertyName => "property name",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Boolean => "boolean",
            TokenKind::Null => "null",
            TokenKind::Comment => "comment",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeErrorKind {
    #[error("incomplete literal, expected `{0}`")]
    UnfinishedLiteralValue(&'static str),
    #[error("unterminated string")]
    UnclosedQuotes,
    #[error("unterminated comment")]
    UnclosedComment,
    #[error("unexpected character {0:?}")]
    CharNotRecognized(char),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(char),
    #[error("escape sequence ended before 4 hexadecimal digits")]
    UnfinishedEscape,
    #[error("invalid hexadecimal digit in escape sequence")]
    InvalidHexValue,
    #[error("escape sequence is not a valid code point")]
    InvalidCodePointValue,
    #[error("unescaped control character in string")]
    ControlCharacterInString,
    #[error("expected `:` after property name, found {0:?}")]
    ExpectedColon(char),
    #[error("expected `,` or closing bracket, found {0:?}")]
    ExpectedComma(char),
    #[error("unexpected {0:?} after the end of the document")]
    TrailingCharacters(char),
}

/// A lexical failure, with the 1-based position of the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct TokenizeError {
    pub kind: TokenizeErrorKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

/// What the next significant character is allowed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Value,
    ValueOrEnd,
    Key,
    KeyOrEnd,
    Colon,
    CommaOrEnd,
    Done,
    Failed,
}

/// Lazy, forward-only token reader over one JSON document.
///
/// Separators are checked here, so the parser only ever sees the structural
/// and scalar tokens. Once the sequence ends (or yields an error) it stays
/// ended; create a new tokenizer per parse.
pub struct Tokenizer {
    chars: Vec<char>,
    index: usize,
    token_start: usize,
    stack: Vec<Container>,
    state: State,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            index: 0,
            token_start: 0,
            stack: Vec::new(),
            state: State::Value,
        }
    }

    /// Line and column (both 1-based) of the current token start.
    pub fn line_column(&self) -> (usize, usize) {
        let consumed = &self.chars[..self.token_start.min(self.chars.len())];
        let line = consumed.iter().filter(|&&ch| ch == '\n').count() + 1;
        let column = match consumed.iter().rposition(|&ch| ch == '\n') {
            Some(newline) => consumed.len() - newline,
            None => consumed.len() + 1,
        };
        (line, column)
    }

    fn error(&mut self, kind: TokenizeErrorKind) -> TokenizeError {
        self.state = State::Failed;
        let (line, column) = self.line_column();
        TokenizeError { kind, line, column }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.index += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.index += 1;
        }
    }

    fn after_value(&mut self) {
        self.state = if self.stack.is_empty() {
            State::Done
        } else {
            State::CommaOrEnd
        };
    }

    fn close(&mut self, container: Container) -> Token {
        self.index += 1;
        self.stack.pop();
        self.after_value();
        match container {
            Container::Object => Token::EndObject,
            Container::Array => Token::EndArray,
        }
    }

    fn make_token(&mut self) -> Result<Option<Token>, TokenizeErrorKind> {
        if self.state == State::Failed {
            return Ok(None);
        }
        loop {
            self.skip_whitespace();
            self.token_start = self.index;
            let Some(ch) = self.peek() else {
                return Ok(None);
            };
            if ch == '/' {
                return self.tokenize_comment().map(Some);
            }

            let token = match self.state {
                State::Failed => return Ok(None),
                State::Done => return Err(TokenizeErrorKind::TrailingCharacters(ch)),
                State::Colon => {
                    if ch != ':' {
                        return Err(TokenizeErrorKind::ExpectedColon(ch));
                    }
                    self.index += 1;
                    self.state = State::Value;
                    continue;
                }
                State::CommaOrEnd => match (ch, self.stack.last().copied()) {
                    (',', Some(Container::Object)) => {
                        self.index += 1;
                        self.state = State::Key;
                        continue;
                    }
                    (',', _) => {
                        self.index += 1;
                        self.state = State::Value;
                        continue;
                    }
                    ('}', Some(Container::Object)) => self.close(Container::Object),
                    (']', Some(Container::Array)) => self.close(Container::Array),
                    _ => return Err(TokenizeErrorKind::ExpectedComma(ch)),
                },
                State::KeyOrEnd if ch == '}' => self.close(Container::Object),
                State::ValueOrEnd if ch == ']' => self.close(Container::Array),
                State::Key | State::KeyOrEnd if ch == '"' => {
                    let name = self.tokenize_string()?;
                    self.state = State::Colon;
                    Token::PropertyName(name)
                }
                // a non-string in key position is handed to the parser as is
                _ => self.tokenize_value(ch)?,
            };
            return Ok(Some(token));
        }
    }

    fn tokenize_value(&mut self, ch: char) -> Result<Token, TokenizeErrorKind> {
        let token = match ch {
            '{' => {
                self.index += 1;
                self.stack.push(Container::Object);
                self.state = State::KeyOrEnd;
                return Ok(Token::StartObject);
            }
            '[' => {
                self.index += 1;
                self.stack.push(Container::Array);
                self.state = State::ValueOrEnd;
                return Ok(Token::StartArray);
            }
            'n' => self.tokenize_literal("null", Token::Null)?,
            'f' => self.tokenize_literal("false", Token::Boolean(false))?,
            't' => self.tokenize_literal("true", Token::Boolean(true))?,
            '"' => Token::String(self.tokenize_string()?),
            c if c.is_ascii_digit() || c == '-' => self.tokenize_number()?,
            _ => return Err(TokenizeErrorKind::CharNotRecognized(ch)),
        };
        self.after_value();
        Ok(token)
    }

    fn tokenize_literal(
        &mut self,
        literal: &'static str,
        token: Token,
    ) -> Result<Token, TokenizeErrorKind> {
        for expected_char in literal.chars() {
            if self.bump() != Some(expected_char) {
                return Err(TokenizeErrorKind::UnfinishedLiteralValue(literal));
            }
        }
        Ok(token)
    }

    fn tokenize_number(&mut self) -> Result<Token, TokenizeErrorKind> {
        let mut unparsed = String::new();
        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' | '-' | '+' | '.' | 'e' | 'E' => unparsed.push(ch),
                _ => break,
            }
            self.index += 1;
        }

        if !is_json_number(&unparsed) {
            return Err(TokenizeErrorKind::InvalidNumber(unparsed));
        }

        if !unparsed.contains(['.', 'e', 'E']) {
            return Ok(Token::Number(match unparsed.parse::<i64>() {
                Ok(integer) => Number::Integer(integer),
                Err(_) => Number::BigInteger(unparsed),
            }));
        }
        match unparsed.parse::<f64>() {
            Ok(float) if float.is_finite() => Ok(Token::Number(Number::Float(float))),
            _ => Err(TokenizeErrorKind::InvalidNumber(unparsed)),
        }
    }

    /// Reads a quoted string starting at the opening quote and unescapes it.
    fn tokenize_string(&mut self) -> Result<String, TokenizeErrorKind> {
        self.index += 1;
        let mut output = String::new();

        loop {
            let ch = self.bump().ok_or(TokenizeErrorKind::UnclosedQuotes)?;
            match ch {
                '"' => break,
                '\\' => {
                    let escaped = self.bump().ok_or(TokenizeErrorKind::UnclosedQuotes)?;
                    match escaped {
                        '"' => output.push('"'),
                        '\\' => output.push('\\'),
                        '/' => output.push('/'),
                        'b' => output.push('\u{8}'),
                        'f' => output.push('\u{c}'),
                        'n' => output.push('\n'),
                        'r' => output.push('\r'),
                        't' => output.push('\t'),
                        'u' => output.push(self.tokenize_unicode_escape()?),
                        other => return Err(TokenizeErrorKind::InvalidEscape(other)),
                    }
                }
                c if c < '\u{20}' => return Err(TokenizeErrorKind::ControlCharacterInString),
                c => output.push(c),
            }
        }

        Ok(output)
    }

    fn tokenize_unicode_escape(&mut self) -> Result<char, TokenizeErrorKind> {
        let high = self.read_hex4()?;
        if !(0xD800..=0xDFFF).contains(&high) {
            return char::from_u32(high).ok_or(TokenizeErrorKind::InvalidCodePointValue);
        }
        if high >= 0xDC00 {
            return Err(TokenizeErrorKind::InvalidCodePointValue);
        }

        // a high surrogate must be followed by an escaped low surrogate
        if self.bump() != Some('\\') || self.bump() != Some('u') {
            return Err(TokenizeErrorKind::InvalidCodePointValue);
        }
        let low = self.read_hex4()?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return Err(TokenizeErrorKind::InvalidCodePointValue);
        }
        let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(combined).ok_or(TokenizeErrorKind::InvalidCodePointValue)
    }

    fn read_hex4(&mut self) -> Result<u32, TokenizeErrorKind> {
        let mut sum = 0;
        for _ in 0..4 {
            let next_char = self.bump().ok_or(TokenizeErrorKind::UnfinishedEscape)?;
            let digit = next_char
                .to_digit(16)
                .ok_or(TokenizeErrorKind::InvalidHexValue)?;
            sum = sum * 16 + digit;
        }
        Ok(sum)
    }

    fn tokenize_comment(&mut self) -> Result<Token, TokenizeErrorKind> {
        self.index += 1;
        let mut text = String::new();
        match self.bump() {
            Some('/') => {
                while let Some(ch) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    text.push(ch);
                    self.index += 1;
                }
            }
            Some('*') => loop {
                match self.bump() {
                    None => return Err(TokenizeErrorKind::UnclosedComment),
                    Some('*') if self.peek() == Some('/') => {
                        self.index += 1;
                        break;
                    }
                    Some(ch) => text.push(ch),
                }
            },
            _ => return Err(TokenizeErrorKind::CharNotRecognized('/')),
        }
        Ok(Token::Comment(text))
    }
}

impl Iterator for Tokenizer {
    type Item = Result<Token, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.make_token() {
            Ok(token) => token.map(Ok),
            Err(kind) => Some(Err(self.error(kind))),
        }
    }
}

/// `-? (0 | [1-9][0-9]*) (. [0-9]+)? ([eE] [+-]? [0-9]+)?`
fn is_json_number(text: &str) -> bool {
    fn digits(bytes: &[u8], mut i: usize) -> usize {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    }

    let bytes = text.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'-') {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => i = digits(bytes, i + 1),
        _ => return false,
    }
    if bytes.get(i) == Some(&b'.') {
        let end = digits(bytes, i + 1);
        if end == i + 1 {
            return false;
        }
        i = end;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let end = digits(bytes, i);
        if end == i {
            return false;
        }
        i = end;
    }
    i == bytes.len()
}
