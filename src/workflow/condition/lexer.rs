// SPDX-License-Identifier: MIT

//! Tokenizer for translated condition expressions

use crate::error::ConditionError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Number(f64),
    StrictEq,
    StrictNotEq,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
    Dot,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(s) => s.clone(),
            Token::Str(s) => format!("\"{}\"", s),
            Token::Number(n) => n.to_string(),
            Token::StrictEq => "===".into(),
            Token::StrictNotEq => "!==".into(),
            Token::Eq => "==".into(),
            Token::NotEq => "!=".into(),
            Token::Lt => "<".into(),
            Token::Lte => "<=".into(),
            Token::Gt => ">".into(),
            Token::Gte => ">=".into(),
            Token::AndAnd => "&&".into(),
            Token::OrOr => "||".into(),
            Token::Bang => "!".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::Dot => ".".into(),
        }
    }
}

/// A token with its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>, ConditionError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |idx: usize| chars.get(idx).map(|(_, c)| *c);

    while i < chars.len() {
        let (offset, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, len) = match c {
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '.' if !peek(i + 1).is_some_and(|n| n.is_ascii_digit()) => (Token::Dot, 1),
            '=' => match (peek(i + 1), peek(i + 2)) {
                (Some('='), Some('=')) => (Token::StrictEq, 3),
                (Some('='), _) => (Token::Eq, 2),
                _ => return Err(ConditionError::UnexpectedChar { ch: c, offset }),
            },
            '!' => match (peek(i + 1), peek(i + 2)) {
                (Some('='), Some('=')) => (Token::StrictNotEq, 3),
                (Some('='), _) => (Token::NotEq, 2),
                _ => (Token::Bang, 1),
            },
            '<' if peek(i + 1) == Some('=') => (Token::Lte, 2),
            '<' => (Token::Lt, 1),
            '>' if peek(i + 1) == Some('=') => (Token::Gte, 2),
            '>' => (Token::Gt, 1),
            '&' if peek(i + 1) == Some('&') => (Token::AndAnd, 2),
            '|' if peek(i + 1) == Some('|') => (Token::OrOr, 2),
            '"' | '\'' => {
                let (value, consumed) = read_string(&chars[i..], offset)?;
                (Token::Str(value), consumed)
            }
            c if c.is_ascii_digit() || c == '.' || (c == '-' && starts_number(peek(i + 1))) => {
                let mut end = i + 1;
                while end < chars.len() && (chars[end].1.is_ascii_digit() || chars[end].1 == '.') {
                    end += 1;
                }
                let text: String = chars[i..end].iter().map(|(_, c)| *c).collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| ConditionError::UnexpectedChar { ch: c, offset })?;
                (Token::Number(n), end - i)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = i + 1;
                while end < chars.len() && (chars[end].1.is_alphanumeric() || chars[end].1 == '_') {
                    end += 1;
                }
                let text: String = chars[i..end].iter().map(|(_, c)| *c).collect();
                (Token::Ident(text), end - i)
            }
            _ => return Err(ConditionError::UnexpectedChar { ch: c, offset }),
        };

        tokens.push(Spanned { token, offset });
        i += len;
    }

    Ok(tokens)
}

fn starts_number(next: Option<char>) -> bool {
    next.is_some_and(|n| n.is_ascii_digit() || n == '.')
}

/// Read a quoted string starting at `chars[0]`; returns the value and chars consumed
fn read_string(chars: &[(usize, char)], offset: usize) -> Result<(String, usize), ConditionError> {
    let quote = chars[0].1;
    let mut value = String::new();
    let mut i = 1;

    while i < chars.len() {
        match chars[i].1 {
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .map(|(_, c)| *c)
                    .ok_or(ConditionError::UnterminatedString(offset))?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                i += 2;
            }
            c if c == quote => return Ok((value, i + 1)),
            c => {
                value.push(c);
                i += 1;
            }
        }
    }

    Err(ConditionError::UnterminatedString(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("=== !== == != < <= > >= && || !"),
            vec![
                Token::StrictEq,
                Token::StrictNotEq,
                Token::Eq,
                Token::NotEq,
                Token::Lt,
                Token::Lte,
                Token::Gt,
                Token::Gte,
                Token::AndAnd,
                Token::OrOr,
                Token::Bang,
            ]
        );
    }

    #[test]
    fn test_field_path_and_literals() {
        assert_eq!(
            kinds(r#"doc.status === "Open" && doc.qty >= -2.5"#),
            vec![
                Token::Ident("doc".into()),
                Token::Dot,
                Token::Ident("status".into()),
                Token::StrictEq,
                Token::Str("Open".into()),
                Token::AndAnd,
                Token::Ident("doc".into()),
                Token::Dot,
                Token::Ident("qty".into()),
                Token::Gte,
                Token::Number(-2.5),
            ]
        );
    }

    #[test]
    fn test_single_quotes_and_escapes() {
        assert_eq!(kinds(r"'it\'s'"), vec![Token::Str("it's".into())]);
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("a  ===  1").unwrap();
        assert_eq!(tokens[1].offset, 3);
        assert_eq!(tokens[2].offset, 8);
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            tokenize(r#"a === "open"#),
            Err(ConditionError::UnterminatedString(6))
        );
    }

    #[test]
    fn test_rejects_assignment_and_other_symbols() {
        assert!(matches!(
            tokenize("a = 1"),
            Err(ConditionError::UnexpectedChar { ch: '=', .. })
        ));
        assert!(matches!(
            tokenize("a; b"),
            Err(ConditionError::UnexpectedChar { ch: ';', .. })
        ));
        assert!(matches!(
            tokenize("a & b"),
            Err(ConditionError::UnexpectedChar { ch: '&', .. })
        ));
    }
}
