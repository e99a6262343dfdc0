//! Splits template text into text and actions, then builds the node tree.

use super::RenderError;
use super::lexer::{Token, tokenize};

/// Functions callable from a template.
pub const FUNCTIONS: &[&str] = &[
    "and", "or", "not", "eq", "ne", "lt", "le", "gt", "ge", "len", "print", "printf",
];

/// Deepest allowed nesting of `if`/`range`/`with` blocks, and of parentheses
/// within one action.
pub const MAX_NESTING_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Action {
        line: usize,
        pipe: Pipeline,
    },
    If {
        line: usize,
        branches: Vec<(Pipeline, Vec<Node>)>,
        otherwise: Option<Vec<Node>>,
    },
    Range {
        line: usize,
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Option<Vec<Node>>,
    },
    With {
        line: usize,
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Option<Vec<Node>>,
    },
}

/// `cmd | cmd | ...`; each command's result is passed as the last argument
/// of the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub cmds: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Dot,
    Root,
    Field(String),
    RootField(String),
    Func(String),
    Str(String),
    Int(i64),
    Bool(bool),
    Sub(Pipeline),
}

#[derive(Debug)]
enum Segment {
    Text(String),
    Action { line: usize, tokens: Vec<Token> },
}

/// Parse template source into nodes.
pub fn parse(src: &str) -> Result<Vec<Node>, RenderError> {
    let segments = scan(src)?;
    let mut parser = Parser {
        segments: segments.into_iter(),
        depth: 0,
    };
    let (nodes, stop) = parser.parse_list()?;
    match stop {
        None => Ok(nodes),
        Some(Stop::End { line }) => Err(parse_error(line, "unexpected {{end}}")),
        Some(Stop::Else { line, .. }) => Err(parse_error(line, "unexpected {{else}}")),
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> RenderError {
    RenderError::Parse {
        line,
        message: message.into(),
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn scan(src: &str) -> Result<Vec<Segment>, RenderError> {
    let mut segments = Vec::new();
    let mut rest = src;
    let mut line = 1;
    let mut trim_next = false;

    while let Some(open) = rest.find("{{") {
        let mut text = &rest[..open];
        if trim_next {
            text = text.trim_start_matches(is_space);
        }
        line += rest[..open].matches('\n').count();
        let action_line = line;

        let after_open = &rest[open + 2..];
        let trim_left = after_open.starts_with('-') && after_open[1..].starts_with(is_space);
        let body_start = if trim_left { 1 } else { 0 };

        let close = find_close(&after_open[body_start..])
            .ok_or_else(|| parse_error(action_line, "unclosed action"))?;
        let raw = &after_open[body_start..body_start + close];
        let (body, trim_right) = match raw.strip_suffix('-') {
            Some(stripped) if stripped.ends_with(is_space) => (stripped, true),
            _ => (raw, false),
        };

        if trim_left {
            text = text.trim_end_matches(is_space);
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text.to_string()));
        }

        let body = body.trim_matches(is_space);
        if body.starts_with("/*") {
            if !body.ends_with("*/") {
                return Err(parse_error(action_line, "unclosed comment"));
            }
        } else {
            let tokens = tokenize(body).map_err(|bad| {
                parse_error(action_line, format!("unexpected '{}' in action", bad))
            })?;
            if tokens.is_empty() {
                return Err(parse_error(action_line, "missing value for command"));
            }
            segments.push(Segment::Action {
                line: action_line,
                tokens,
            });
        }

        let consumed = open + 2 + body_start + close + 2;
        line += rest[open..consumed].matches('\n').count();
        rest = &rest[consumed..];
        trim_next = trim_right;
    }

    let tail = if trim_next {
        rest.trim_start_matches(is_space)
    } else {
        rest
    };
    if !tail.is_empty() {
        segments.push(Segment::Text(tail.to_string()));
    }
    Ok(segments)
}

/// Offset of the closing `}}`, skipping over quoted strings and comments.
fn find_close(s: &str) -> Option<usize> {
    let trimmed = s.trim_start_matches(is_space);
    if trimmed.starts_with("/*") {
        let comment_start = s.len() - trimmed.len();
        let end = trimmed.find("*/")? + 2;
        let after = comment_start + end;
        return s[after..].find("}}").map(|pos| after + pos);
    }

    let bytes = s.as_bytes();
    let mut i = 0;
    let mut in_string = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'}' if !in_string && bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

enum Stop {
    Else { line: usize, tokens: Vec<Token> },
    End { line: usize },
}

struct Parser {
    segments: std::vec::IntoIter<Segment>,
    depth: usize,
}

impl Parser {
    fn enter(&mut self, line: usize) -> Result<(), RenderError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(parse_error(
                line,
                format!("blocks nested deeper than {}", MAX_NESTING_DEPTH),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Parse nodes until `{{else}}`, `{{end}}` or end of input.
    fn parse_list(&mut self) -> Result<(Vec<Node>, Option<Stop>), RenderError> {
        let mut nodes = Vec::new();
        while let Some(segment) = self.segments.next() {
            let (line, tokens) = match segment {
                Segment::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Segment::Action { line, tokens } => (line, tokens),
            };

            match tokens.first() {
                Some(Token::End) => {
                    if tokens.len() > 1 {
                        return Err(parse_error(line, "unexpected tokens after end"));
                    }
                    return Ok((nodes, Some(Stop::End { line })));
                }
                Some(Token::Else) => {
                    return Ok((
                        nodes,
                        Some(Stop::Else {
                            line,
                            tokens: tokens[1..].to_vec(),
                        }),
                    ));
                }
                Some(Token::If) => {
                    self.enter(line)?;
                    nodes.push(self.parse_if(line, &tokens[1..])?);
                    self.leave();
                }
                Some(Token::Range) => {
                    let pipe = parse_pipeline(line, &tokens[1..])?;
                    self.enter(line)?;
                    let (body, otherwise) = self.parse_block(line, "range")?;
                    self.leave();
                    nodes.push(Node::Range {
                        line,
                        pipe,
                        body,
                        otherwise,
                    });
                }
                Some(Token::With) => {
                    let pipe = parse_pipeline(line, &tokens[1..])?;
                    self.enter(line)?;
                    let (body, otherwise) = self.parse_block(line, "with")?;
                    self.leave();
                    nodes.push(Node::With {
                        line,
                        pipe,
                        body,
                        otherwise,
                    });
                }
                _ => nodes.push(Node::Action {
                    line,
                    pipe: parse_pipeline(line, &tokens)?,
                }),
            }
        }
        Ok((nodes, None))
    }

    fn parse_if(&mut self, line: usize, cond: &[Token]) -> Result<Node, RenderError> {
        let mut branches = vec![(parse_pipeline(line, cond)?, Vec::new())];
        loop {
            let (body, stop) = self.parse_list()?;
            if let Some(last) = branches.last_mut() {
                last.1 = body;
            }
            match stop {
                None => return Err(parse_error(line, "unexpected EOF in if; missing {{end}}")),
                Some(Stop::End { .. }) => {
                    return Ok(Node::If {
                        line,
                        branches,
                        otherwise: None,
                    });
                }
                Some(Stop::Else { line: else_line, tokens }) => match tokens.first() {
                    None => {
                        let otherwise = self.parse_final_else(line, "if")?;
                        return Ok(Node::If {
                            line,
                            branches,
                            otherwise: Some(otherwise),
                        });
                    }
                    Some(Token::If) => {
                        branches.push((parse_pipeline(else_line, &tokens[1..])?, Vec::new()));
                    }
                    Some(_) => {
                        return Err(parse_error(else_line, "expected {{else}} or {{else if}}"));
                    }
                },
            }
        }
    }

    /// Body plus optional `{{else}}` of a range or with block.
    fn parse_block(
        &mut self,
        line: usize,
        keyword: &str,
    ) -> Result<(Vec<Node>, Option<Vec<Node>>), RenderError> {
        let (body, stop) = self.parse_list()?;
        match stop {
            None => Err(parse_error(
                line,
                format!("unexpected EOF in {}; missing {{{{end}}}}", keyword),
            )),
            Some(Stop::End { .. }) => Ok((body, None)),
            Some(Stop::Else { line: else_line, tokens }) => {
                if !tokens.is_empty() {
                    return Err(parse_error(
                        else_line,
                        format!("unexpected tokens after else in {}", keyword),
                    ));
                }
                let otherwise = self.parse_final_else(line, keyword)?;
                Ok((body, Some(otherwise)))
            }
        }
    }

    fn parse_final_else(&mut self, line: usize, keyword: &str) -> Result<Vec<Node>, RenderError> {
        let (otherwise, stop) = self.parse_list()?;
        match stop {
            Some(Stop::End { .. }) => Ok(otherwise),
            Some(Stop::Else { line: else_line, .. }) => Err(parse_error(
                else_line,
                format!("expected end; found else in {}", keyword),
            )),
            None => Err(parse_error(
                line,
                format!("unexpected EOF in {}; missing {{{{end}}}}", keyword),
            )),
        }
    }
}

fn parse_pipeline(line: usize, tokens: &[Token]) -> Result<Pipeline, RenderError> {
    if tokens.is_empty() {
        return Err(parse_error(line, "missing value for command"));
    }

    let mut cmds = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => {
                depth += 1;
                if depth > MAX_NESTING_DEPTH {
                    return Err(parse_error(
                        line,
                        format!("parentheses nested deeper than {}", MAX_NESTING_DEPTH),
                    ));
                }
            }
            Token::RParen => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| parse_error(line, "unexpected right paren"))?;
            }
            Token::Pipe if depth == 0 => {
                cmds.push(parse_command(line, &tokens[start..i])?);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(parse_error(line, "unclosed left paren"));
    }
    cmds.push(parse_command(line, &tokens[start..])?);

    for cmd in &cmds[1..] {
        if !matches!(cmd.args.first(), Some(Operand::Func(_))) {
            return Err(parse_error(line, "non-function command in pipeline"));
        }
    }
    Ok(Pipeline { cmds })
}

fn parse_command(line: usize, tokens: &[Token]) -> Result<Command, RenderError> {
    if tokens.is_empty() {
        return Err(parse_error(line, "missing value for command"));
    }

    let mut args = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let operand = match &tokens[i] {
            Token::Dot => Operand::Dot,
            Token::Root => Operand::Root,
            Token::Field(name) => Operand::Field(name.clone()),
            Token::RootField(name) => Operand::RootField(name.clone()),
            Token::FieldChain(chain) => {
                return Err(parse_error(
                    line,
                    format!("nested field access {} is not supported", chain),
                ));
            }
            Token::Str(s) => Operand::Str(s.clone()),
            Token::Int(n) => Operand::Int(*n),
            Token::True => Operand::Bool(true),
            Token::False => Operand::Bool(false),
            Token::Ident(name) => {
                if !FUNCTIONS.contains(&name.as_str()) {
                    return Err(parse_error(line, format!("function \"{}\" not defined", name)));
                }
                Operand::Func(name.clone())
            }
            Token::LParen => {
                let close = matching_paren(&tokens[i..])
                    .ok_or_else(|| parse_error(line, "unclosed left paren"))?;
                let sub = parse_pipeline(line, &tokens[i + 1..i + close])?;
                i += close;
                Operand::Sub(sub)
            }
            Token::RParen => return Err(parse_error(line, "unexpected right paren")),
            Token::Pipe => return Err(parse_error(line, "missing command in pipeline")),
            Token::If | Token::Else | Token::End | Token::Range | Token::With => {
                return Err(parse_error(line, "unexpected keyword in operand"));
            }
        };
        args.push(operand);
        i += 1;
    }

    if args.len() > 1 && !matches!(args[0], Operand::Func(_)) {
        return Err(parse_error(line, "can't give argument to non-function"));
    }
    Ok(Command { args })
}

/// Index of the paren closing `tokens[0]`.
fn matching_paren(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Pipeline {
        Pipeline {
            cmds: vec![Command {
                args: vec![Operand::Field(name.to_string())],
            }],
        }
    }

    #[test]
    fn test_text_and_actions() {
        let nodes = parse("{{.Name}} has {{ .CPUCores }} cores").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Action {
                    line: 1,
                    pipe: field("Name")
                },
                Node::Text(" has ".to_string()),
                Node::Action {
                    line: 1,
                    pipe: field("CPUCores")
                },
                Node::Text(" cores".to_string()),
            ]
        );
    }

    #[test]
    fn test_trim_markers() {
        let nodes = parse("a  \n{{- .OS -}}\n  b").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("a".to_string()),
                Node::Action {
                    line: 2,
                    pipe: field("OS")
                },
                Node::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_negative_number_is_not_trim() {
        let nodes = parse("x {{-3}}").unwrap();
        assert_eq!(nodes[0], Node::Text("x ".to_string()));
    }

    #[test]
    fn test_comment_dropped() {
        let nodes = parse("a{{/* note }} here */}}b").unwrap();
        assert_eq!(
            nodes,
            vec![Node::Text("a".to_string()), Node::Text("b".to_string())]
        );
    }

    #[test]
    fn test_close_inside_string() {
        let nodes = parse(r#"{{printf "}}"}}"#).unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_if_else_if_else() {
        let nodes = parse("{{if .A}}a{{else if .B}}b{{else}}c{{end}}").unwrap();
        match &nodes[0] {
            Node::If {
                branches,
                otherwise,
                ..
            } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[1].1, vec![Node::Text("b".to_string())]);
                assert_eq!(otherwise, &Some(vec![Node::Text("c".to_string())]));
            }
            other => panic!("expected if node, got {:?}", other),
        }
    }

    #[test]
    fn test_range_with_else() {
        let nodes = parse("{{range .N}}x{{else}}none{{end}}").unwrap();
        assert!(matches!(
            &nodes[0],
            Node::Range {
                otherwise: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn test_pipeline_and_subexpression() {
        let nodes = parse(r#"{{.Name | printf "%q"}}{{if (eq .A 1)}}y{{end}}"#).unwrap();
        match &nodes[0] {
            Node::Action { pipe, .. } => assert_eq!(pipe.cmds.len(), 2),
            other => panic!("expected action, got {:?}", other),
        }
    }

    #[test]
    fn test_errors_report_line() {
        let err = parse("line one\nline two {{if .A}}").unwrap_err();
        assert_eq!(
            err,
            RenderError::Parse {
                line: 2,
                message: "unexpected EOF in if; missing {{end}}".to_string()
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("{{end}}").is_err());
        assert!(parse("{{else}}").is_err());
        assert!(parse("{{.Name").is_err());
        assert!(parse("{{}}").is_err());
        assert!(parse("{{upper .Name}}").is_err());
        assert!(parse("{{.Name .OS}}").is_err());
        assert!(parse("{{.Spec.Name}}").is_err());
        assert!(parse("{{.Name | .OS}}").is_err());
        assert!(parse("{{(eq .A 1}}").is_err());
        assert!(parse("{{if .A}}x{{else}}y{{else}}z{{end}}").is_err());
        assert!(parse("{{/* open }}").is_err());
    }

    fn nested(open: &str, depth: usize) -> String {
        format!("{}x{}", open.repeat(depth), "{{end}}".repeat(depth))
    }

    #[test]
    fn test_nesting_up_to_limit() {
        assert!(parse(&nested("{{if true}}", MAX_NESTING_DEPTH)).is_ok());
        assert!(parse(&nested("{{with 1}}", MAX_NESTING_DEPTH)).is_ok());
    }

    #[test]
    fn test_nesting_past_limit() {
        for open in ["{{if true}}", "{{range 1}}", "{{with 1}}"] {
            let err = parse(&nested(open, MAX_NESTING_DEPTH + 1)).unwrap_err();
            assert!(
                matches!(&err, RenderError::Parse { message, .. } if message.contains("nested deeper")),
                "{}: {:?}",
                open,
                err
            );
        }
    }

    #[test]
    fn test_deep_nesting_is_rejected_not_overflowed() {
        let err = parse(&nested("{{if 1}}", 100_000)).unwrap_err();
        assert!(matches!(err, RenderError::Parse { line: 1, .. }));

        let mixed = "{{if 1}}{{range 2}}{{with 3}}".repeat(50_000);
        assert!(parse(&mixed).is_err());
    }

    #[test]
    fn test_paren_nesting_limit() {
        let ok = format!(
            "{{{{{}1{}}}}}",
            "(".repeat(MAX_NESTING_DEPTH),
            ")".repeat(MAX_NESTING_DEPTH)
        );
        assert!(parse(&ok).is_ok());

        let deep = format!("{{{{{}1{}}}}}", "(".repeat(100_000), ")".repeat(100_000));
        let err = parse(&deep).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Parse { message, .. } if message.contains("parentheses nested deeper")
        ));
    }
}
