//! Tokens inside a `{{ ... }}` action, lexed with logos.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Keywords
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("end")]
    End,
    #[token("range")]
    Range,
    #[token("with")]
    With,

    // Literals
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("|")]
    Pipe,

    // Data access
    #[token(".")]
    Dot,
    #[regex(r"\.[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice()[1..].to_string())]
    Field(String),
    #[regex(r"\.[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)+", |lex| lex.slice().to_string())]
    FieldChain(String),
    #[token("$")]
    Root,
    #[regex(r"\$\.[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice()[2..].to_string())]
    RootField(String),

    // Function names
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Lex the body of one action. Returns the offending text on failure.
pub fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let mut lexer = Token::lexer(src);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push(token),
            Err(()) => return Err(lexer.slice().to_string()),
        }
    }
    Ok(tokens)
}

fn unescape(quoted: &str) -> Option<String> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_and_keywords() {
        let tokens = tokenize("if eq .Name \"web\"").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::If,
                Token::Ident("eq".to_string()),
                Token::Field("Name".to_string()),
                Token::Str("web".to_string()),
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_ident() {
        let tokens = tokenize("ifx endless").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("ifx".to_string()),
                Token::Ident("endless".to_string())
            ]
        );
    }

    #[test]
    fn test_root_and_dot() {
        let tokens = tokenize(". $ $.OS").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Dot, Token::Root, Token::RootField("OS".to_string())]
        );
    }

    #[test]
    fn test_numbers_and_pipes() {
        let tokens = tokenize("-3 | printf \"%d\"").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Int(-3),
                Token::Pipe,
                Token::Ident("printf".to_string()),
                Token::Str("%d".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#""a\"b\n""#).unwrap();
        assert_eq!(tokens, vec![Token::Str("a\"b\n".to_string())]);
    }

    #[test]
    fn test_field_chain() {
        let tokens = tokenize(".Spec.Name").unwrap();
        assert_eq!(tokens, vec![Token::FieldChain(".Spec.Name".to_string())]);
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(tokenize(".Name @").unwrap_err(), "@");
    }
}
