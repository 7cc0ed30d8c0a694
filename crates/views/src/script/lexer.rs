//! Tokenizer for map-function sources.

use super::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    Eof,
}

/// A token and where it starts in the source (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
    pub column: u32,
}

// Longest first, so that `===` wins over `==` and `=`.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "=>", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "{", "}",
    "(", ")", "[", "]", ";", ",", ".", ":", "?", "+", "-", "*", "/", "%", "<", ">", "=", "!",
];

struct Cursor<'a> {
    rest: &'a str,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            rest: src,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest.chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.rest = &self.rest[c.len_utf8()..];
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }
}

/// Splits a source into tokens, ending with [`Token::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, ScriptError> {
    let mut cursor = Cursor::new(src);
    let mut tokens = Vec::new();

    loop {
        skip_trivia(&mut cursor)?;
        let (line, column) = (cursor.line, cursor.column);
        let Some(c) = cursor.peek() else {
            tokens.push(Spanned {
                token: Token::Eof,
                line,
                column,
            });
            return Ok(tokens);
        };

        let token = if c.is_ascii_digit()
            || (c == '.' && cursor.peek_second().is_some_and(|n| n.is_ascii_digit()))
        {
            read_number(&mut cursor)?
        } else if c == '"' || c == '\'' {
            read_string(&mut cursor)?
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let mut ident = String::new();
            while let Some(c) = cursor.peek() {
                if c.is_alphanumeric() || c == '_' || c == '$' {
                    ident.push(c);
                    cursor.bump();
                } else {
                    break;
                }
            }
            Token::Ident(ident)
        } else {
            let punct = PUNCTUATORS
                .iter()
                .find(|p| cursor.rest.starts_with(**p))
                .ok_or_else(|| cursor.error(format!("unexpected character '{c}'")))?;
            for _ in 0..punct.len() {
                cursor.bump();
            }
            Token::Punct(*punct)
        };

        tokens.push(Spanned {
            token,
            line,
            column,
        });
    }
}

fn skip_trivia(cursor: &mut Cursor<'_>) -> Result<(), ScriptError> {
    loop {
        match cursor.peek() {
            Some(c) if c.is_whitespace() => {
                cursor.bump();
            }
            Some('/') if cursor.peek_second() == Some('/') => {
                while let Some(c) = cursor.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            Some('/') if cursor.peek_second() == Some('*') => {
                cursor.bump();
                cursor.bump();
                loop {
                    match cursor.bump() {
                        Some('*') if cursor.peek() == Some('/') => {
                            cursor.bump();
                            break;
                        }
                        Some(_) => {}
                        None => return Err(cursor.error("unterminated comment")),
                    }
                }
            }
            _ => return Ok(()),
        }
    }
}

fn read_number(cursor: &mut Cursor<'_>) -> Result<Token, ScriptError> {
    if cursor.rest.starts_with("0x") || cursor.rest.starts_with("0X") {
        cursor.bump();
        cursor.bump();
        let mut digits = String::new();
        while let Some(c) = cursor.peek().filter(char::is_ascii_hexdigit) {
            digits.push(c);
            cursor.bump();
        }
        return u64::from_str_radix(&digits, 16)
            .map(|n| Token::Number(n as f64))
            .map_err(|_| cursor.error("invalid hex literal"));
    }

    let mut text = String::new();
    while let Some(c) = cursor.peek() {
        let exponent_sign =
            (c == '+' || c == '-') && text.ends_with(|p: char| p == 'e' || p == 'E');
        if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
            text.push(c);
            cursor.bump();
        } else {
            break;
        }
    }
    text.parse()
        .map(Token::Number)
        .map_err(|_| cursor.error(format!("invalid number '{text}'")))
}

fn read_string(cursor: &mut Cursor<'_>) -> Result<Token, ScriptError> {
    let quote = cursor.bump();
    let mut out = String::new();
    loop {
        match cursor.bump() {
            None | Some('\n') => return Err(cursor.error("unterminated string")),
            Some(c) if Some(c) == quote => return Ok(Token::Str(out)),
            Some('\\') => {
                let escaped = cursor
                    .bump()
                    .ok_or_else(|| cursor.error("unterminated string"))?;
                match escaped {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    '0' => out.push('\0'),
                    'u' => {
                        let mut hex = String::new();
                        for _ in 0..4 {
                            hex.push(
                                cursor
                                    .bump()
                                    .ok_or_else(|| cursor.error("bad unicode escape"))?,
                            );
                        }
                        let code = u32::from_str_radix(&hex, 16)
                            .map_err(|_| cursor.error("bad unicode escape"))?;
                        out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    }
                    other => out.push(other),
                }
            }
            Some(c) => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn tokenizes_map_function() {
        let toks = tokens("function(doc){emit(doc.type, doc._id)}");
        assert_eq!(toks[0], Token::Ident("function".into()));
        assert_eq!(toks[1], Token::Punct("("));
        assert!(toks.contains(&Token::Ident("_id".into())));
        assert_eq!(toks.last(), Some(&Token::Eof));
    }

    #[test]
    fn longest_punctuator_wins() {
        assert_eq!(
            tokens("a === b"),
            vec![
                Token::Ident("a".into()),
                Token::Punct("==="),
                Token::Ident("b".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn numbers_and_strings() {
        assert_eq!(
            tokens(r#"1.5e2 0x1F 'it\'s' "a\nb""#),
            vec![
                Token::Number(150.0),
                Token::Number(31.0),
                Token::Str("it's".into()),
                Token::Str("a\nb".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            tokens("// line\n/* block */ x"),
            vec![Token::Ident("x".into()), Token::Eof]
        );
    }

    #[test]
    fn reports_position_of_bad_input() {
        let err = tokenize("a\n  #").unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Syntax {
                line: 2,
                column: 3,
                ..
            }
        ));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(tokenize("'abc").is_err());
    }
}
