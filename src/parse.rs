use thiserror::Error;

use crate::tokenize::{Token, TokenKind, TokenizeError, Tokenizer};
use crate::{JsonArray, JsonObject, Value};

/// Parses one JSON document with no nesting limit.
pub fn parse(input: &str) -> Result<Value, ParseError> {
    parse_with_options(input, ParseOptions::default())
}

pub fn parse_with_options(input: &str, options: ParseOptions) -> Result<Value, ParseError> {
    parse_tokens(Tokenizer::new(input), options)
}

/// Builds a document from any token source, e.g. a hand-written token list.
///
/// The source must hold exactly one value: trailing tokens are rejected.
pub fn parse_tokens<I>(tokens: I, options: ParseOptions) -> Result<Value, ParseError>
where
    I: IntoIterator<Item = Result<Token, TokenizeError>>,
{
    let mut parser = Parser {
        tokens: tokens.into_iter(),
        options,
        depth: 0,
    };
    let token = parser.read_token()?;
    let value = parser.parse_value(token)?;
    parser.finish()?;
    Ok(value)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Format(#[from] TokenizeError),
    /// The tokens ran out before the value was complete (includes empty input)
    #[error("input ended before the document was complete")]
    TruncatedInput,
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: TokenKind,
    },
    /// Valid JSON-ish syntax that this parser refuses, i.e. comments
    #[error("{0} tokens are not supported")]
    UnsupportedToken(TokenKind),
    #[error("duplicate property name {0:?}")]
    DuplicateKey(String),
    #[error("document nests deeper than {0} levels")]
    DepthLimitExceeded(usize),
}

/// Knobs for [`parse_with_options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum number of nested objects/arrays. Recursion depth follows the
    /// nesting depth, so set this for untrusted input.
    pub max_depth: Option<usize>,
}

impl ParseOptions {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
        }
    }
}

type ParseResult = Result<Value, ParseError>;

struct Parser<I> {
    tokens: I,
    options: ParseOptions,
    depth: usize,
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<Token, TokenizeError>>,
{
    fn read_token(&mut self) -> Result<Token, ParseError> {
        match self.tokens.next() {
            Some(token) => Ok(token?),
            None => Err(ParseError::TruncatedInput),
        }
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        match self.tokens.next() {
            None => Ok(()),
            Some(Err(error)) => Err(error.into()),
            Some(Ok(Token::Comment(_))) => Err(ParseError::UnsupportedToken(TokenKind::Comment)),
            Some(Ok(token)) => Err(ParseError::UnexpectedToken {
                expected: "end of input",
                found: token.kind(),
            }),
        }
    }

    /// Turns an already-read token into a value, reading more for containers.
    fn parse_value(&mut self, token: Token) -> ParseResult {
        log::trace!("value starts with {}", token.kind());
        match token {
            Token::Null => Ok(Value::Null),
            Token::Boolean(boolean) => Ok(Value::Boolean(boolean)),
            Token::Number(number) => Ok(Value::Number(number)),
            Token::String(string) => Ok(Value::String(string)),
            Token::StartObject => self.parse_object(),
            Token::StartArray => self.parse_array(),
            other => Err(ParseError::UnsupportedToken(other.kind())),
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        match self.options.max_depth {
            Some(max_depth) if self.depth > max_depth => {
                Err(ParseError::DepthLimitExceeded(max_depth))
            }
            _ => Ok(()),
        }
    }

    fn parse_object(&mut self) -> ParseResult {
        self.enter()?;
        let mut object = JsonObject::new();

        loop {
            let key = match self.read_token()? {
                Token::EndObject => break,
                Token::PropertyName(key) => key,
                Token::Comment(_) => return Err(ParseError::UnsupportedToken(TokenKind::Comment)),
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "property name",
                        found: other.kind(),
                    })
                }
            };
            if object.contains_key(&key) {
                return Err(ParseError::DuplicateKey(key));
            }

            let token = self.read_token()?;
            let value = self.parse_value(token)?;
            object.insert(key, value);
        }

        self.depth -= 1;
        Ok(Value::Object(object))
    }

    fn parse_array(&mut self) -> ParseResult {
        self.enter()?;
        let mut array = JsonArray::new();

        loop {
            let token = self.read_token()?;
            if token == Token::EndArray {
                break;
            }
            array.push(self.parse_value(token)?);
        }

        self.depth -= 1;
        Ok(Value::Array(array))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::TokenizeErrorKind;
    use crate::Number;

    fn check(input: Vec<Token>, expected: Value) {
        let tokens = input.into_iter().map(Ok);
        let value = parse_tokens(tokens, ParseOptions::default()).unwrap();
        assert_eq!(value, expected);
    }

    fn check_err(input: Vec<Token>, expected: ParseError) {
        let tokens = input.into_iter().map(Ok);
        assert_eq!(
            parse_tokens(tokens, ParseOptions::default()),
            Err(expected)
        );
    }

    #[test]
    fn test_parse_null() {
        check(vec![Token::Null], Value::Null);
    }

    #[test]
    fn parses_string() {
        let input = vec![Token::String("olá_こんにちは_नमस्ते_привіт".into())];
        let expected = Value::String(String::from("olá_こんにちは_नमस्ते_привіт"));

        check(input, expected);
    }

    #[test]
    fn parses_array_one_element() {
        // [true]
        let input = vec![Token::StartArray, Token::Boolean(true), Token::EndArray];
        let expected = Value::Array(vec![Value::Boolean(true)].into_iter().collect());

        check(input, expected);
    }

    #[test]
    fn parses_empty_array() {
        // []
        let input = vec![Token::StartArray, Token::EndArray];
        let expected = Value::Array(JsonArray::new());

        check(input, expected);
    }

    #[test]
    fn parses_nested_array() {
        // [null, [null]]
        let input = vec![
            Token::StartArray,
            Token::Null,
            Token::StartArray,
            Token::Null,
            Token::EndArray,
            Token::EndArray,
        ];
        let inner: JsonArray = vec![Value::Null].into_iter().collect();
        let expected = Value::Array(vec![Value::Null, Value::Array(inner)].into_iter().collect());

        check(input, expected);
    }

    #[test]
    fn parses_object_in_order() {
        // {"b": 1, "a": 2}
        let input = vec![
            Token::StartObject,
            Token::PropertyName("b".into()),
            Token::Number(Number::Integer(1)),
            Token::PropertyName("a".into()),
            Token::Number(Number::Integer(2)),
            Token::EndObject,
        ];
        let value = parse_tokens(input.into_iter().map(Ok), ParseOptions::default()).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn rejects_value_in_key_position() {
        check_err(
            vec![Token::StartObject, Token::String("a".into()), Token::Null],
            ParseError::UnexpectedToken {
                expected: "property name",
                found: TokenKind::String,
            },
        );
    }

    #[test]
    fn rejects_comment_anywhere() {
        check_err(
            vec![Token::Comment(" c ".into()), Token::Null],
            ParseError::UnsupportedToken(TokenKind::Comment),
        );
        check_err(
            vec![Token::StartObject, Token::Comment(" c ".into())],
            ParseError::UnsupportedToken(TokenKind::Comment),
        );
        check_err(
            vec![Token::Null, Token::Comment(" c ".into())],
            ParseError::UnsupportedToken(TokenKind::Comment),
        );
    }

    #[test]
    fn rejects_stray_end_token() {
        check_err(
            vec![Token::EndArray],
            ParseError::UnsupportedToken(TokenKind::EndArray),
        );
    }

    #[test]
    fn truncated_token_streams() {
        check_err(vec![], ParseError::TruncatedInput);
        check_err(vec![Token::StartArray, Token::Null], ParseError::TruncatedInput);
        check_err(
            vec![Token::StartObject, Token::PropertyName("a".into())],
            ParseError::TruncatedInput,
        );
    }

    #[test]
    fn rejects_second_root_value() {
        check_err(
            vec![Token::Null, Token::Null],
            ParseError::UnexpectedToken {
                expected: "end of input",
                found: TokenKind::Null,
            },
        );
    }

    #[test]
    fn test_parse() {
        let expected = Value::Object(
            vec![("key".to_string(), Value::String("value".to_string()))]
                .into_iter()
                .collect(),
        );

        assert_eq!(parse(r#"{"key": "value"}"#).unwrap(), expected);
    }

    #[test]
    fn test_truncated_text() {
        assert_eq!(parse(r#"{"a":"#), Err(ParseError::TruncatedInput));
        assert_eq!(parse(""), Err(ParseError::TruncatedInput));
        assert_eq!(parse("[1, [2"), Err(ParseError::TruncatedInput));
    }

    #[test]
    fn test_comment_text() {
        assert_eq!(
            parse(r#"{"a": /* x */ 1}"#),
            Err(ParseError::UnsupportedToken(TokenKind::Comment))
        );
    }

    #[test]
    fn test_non_string_key_text() {
        assert_eq!(
            parse("{1: 2}"),
            Err(ParseError::UnexpectedToken {
                expected: "property name",
                found: TokenKind::Number,
            })
        );
    }

    #[test]
    fn test_format_error_passes_through() {
        match parse("[1, @]") {
            Err(ParseError::Format(error)) => {
                assert_eq!(error.kind, TokenizeErrorKind::CharNotRecognized('@'))
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_depth_limit() {
        let options = ParseOptions::with_max_depth(2);
        assert!(parse_with_options("[[1]]", options).is_ok());
        assert!(parse_with_options(r#"{"a": {"b": 1}}"#, options).is_ok());
        assert_eq!(
            parse_with_options("[[[1]]]", options),
            Err(ParseError::DepthLimitExceeded(2))
        );
    }

    #[test]
    fn test_sibling_containers_do_not_accumulate_depth() {
        let options = ParseOptions::with_max_depth(2);
        assert!(parse_with_options("[[1], [2], [3], {}]", options).is_ok());
    }

    #[test]
    fn rejects_duplicate_key() {
        check_err(
            vec![
                Token::StartObject,
                Token::PropertyName("a".into()),
                Token::Null,
                Token::PropertyName("a".into()),
                Token::Null,
                Token::EndObject,
            ],
            ParseError::DuplicateKey("a".into()),
        );
        assert_eq!(
            parse(r#"{"a": 1, "b": {"a": 2}, "a": 3}"#),
            Err(ParseError::DuplicateKey("a".into()))
        );
    }

    #[test]
    fn same_key_in_sibling_objects_is_fine() {
        assert!(parse(r#"[{"a": 1}, {"a": 2}]"#).is_ok());
    }
}
