use thiserror::Error;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const TRIPLE_CLOSE: &str = "}}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    /// `{{name}}`, `{{{name}}}` or `{{&name}}`. Never escaped.
    Variable(String),
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
    },
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed tag starting at byte {position}")]
    UnclosedTag { position: usize },

    #[error("empty tag at byte {position}")]
    EmptyTag { position: usize },

    #[error("section '{name}' is never closed")]
    UnclosedSection { name: String },

    #[error("closing '{found}' at byte {position} does not match open section '{expected}'")]
    MismatchedSection {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("closing '{name}' at byte {position} has no open section")]
    UnexpectedClose { name: String, position: usize },

    #[error("unsupported tag '{tag}' at byte {position}")]
    Unsupported { tag: String, position: usize },
}

struct OpenSection {
    name: String,
    inverted: bool,
    siblings: Vec<Node>,
}

/// Parse template source into a node tree.
pub fn parse(source: &str) -> Result<Vec<Node>, TemplateError> {
    let mut current: Vec<Node> = Vec::new();
    let mut open: Vec<OpenSection> = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = source[cursor..].find(OPEN) {
        let start = cursor + offset;
        if start > cursor {
            current.push(Node::Text(source[cursor..start].to_string()));
        }

        let body_start = start + OPEN.len();
        let triple = source[body_start..].starts_with('{');
        let (body, next) = if triple {
            let inner = body_start + 1;
            let end = source[inner..]
                .find(TRIPLE_CLOSE)
                .ok_or(TemplateError::UnclosedTag { position: start })?;
            (&source[inner..inner + end], inner + end + TRIPLE_CLOSE.len())
        } else {
            let end = source[body_start..]
                .find(CLOSE)
                .ok_or(TemplateError::UnclosedTag { position: start })?;
            (&source[body_start..body_start + end], body_start + end + CLOSE.len())
        };
        cursor = next;

        if triple {
            current.push(Node::Variable(tag_name(body, start)?));
            continue;
        }

        let body = body.trim();
        let mut chars = body.chars();
        match chars.next() {
            None => return Err(TemplateError::EmptyTag { position: start }),
            Some('!') => current.push(Node::Comment(chars.as_str().trim().to_string())),
            Some('&') => current.push(Node::Variable(tag_name(chars.as_str(), start)?)),
            Some(sigil @ ('#' | '^')) => {
                let name = tag_name(chars.as_str(), start)?;
                open.push(OpenSection {
                    name,
                    inverted: sigil == '^',
                    siblings: std::mem::take(&mut current),
                });
            }
            Some('/') => {
                let name = tag_name(chars.as_str(), start)?;
                let Some(section) = open.pop() else {
                    return Err(TemplateError::UnexpectedClose {
                        name,
                        position: start,
                    });
                };
                if section.name != name {
                    return Err(TemplateError::MismatchedSection {
                        expected: section.name,
                        found: name,
                        position: start,
                    });
                }
                let children = std::mem::replace(&mut current, section.siblings);
                current.push(Node::Section {
                    name: section.name,
                    inverted: section.inverted,
                    children,
                });
            }
            Some('>' | '=') => {
                return Err(TemplateError::Unsupported {
                    tag: body.to_string(),
                    position: start,
                });
            }
            Some(_) => current.push(Node::Variable(tag_name(body, start)?)),
        }
    }

    if cursor < source.len() {
        current.push(Node::Text(source[cursor..].to_string()));
    }
    if let Some(section) = open.pop() {
        return Err(TemplateError::UnclosedSection { name: section.name });
    }
    Ok(current)
}

fn tag_name(raw: &str, position: usize) -> Result<String, TemplateError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TemplateError::EmptyTag { position });
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    fn var(s: &str) -> Node {
        Node::Variable(s.to_string())
    }

    #[test]
    fn parses_variables_and_text() {
        let nodes = parse(r#"{"id": "{{ kafka.id }}", "cpus": {{{kafka.cpus}}}}"#).unwrap();
        assert_eq!(
            nodes,
            vec![
                text(r#"{"id": ""#),
                var("kafka.id"),
                text(r#"", "cpus": "#),
                var("kafka.cpus"),
                text("}"),
            ]
        );
    }

    #[test]
    fn nests_sections() {
        let nodes = parse("{{#a}}x{{^b}}y{{/b}}{{/a}}{{! note }}").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Section {
                    name: "a".to_string(),
                    inverted: false,
                    children: vec![
                        text("x"),
                        Node::Section {
                            name: "b".to_string(),
                            inverted: true,
                            children: vec![text("y")],
                        },
                    ],
                },
                Node::Comment("note".to_string()),
            ]
        );
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(
            parse("{{#a}}x").unwrap_err(),
            TemplateError::UnclosedSection {
                name: "a".to_string()
            }
        );
        assert!(matches!(
            parse("{{#a}}{{/b}}").unwrap_err(),
            TemplateError::MismatchedSection { .. }
        ));
        assert!(matches!(
            parse("x{{/a}}").unwrap_err(),
            TemplateError::UnexpectedClose { .. }
        ));
        assert!(matches!(
            parse("{{name").unwrap_err(),
            TemplateError::UnclosedTag { position: 0 }
        ));
        assert!(matches!(
            parse("{{ }}").unwrap_err(),
            TemplateError::EmptyTag { .. }
        ));
        assert!(matches!(
            parse("{{> partial}}").unwrap_err(),
            TemplateError::Unsupported { .. }
        ));
    }

    #[test]
    fn lone_braces_are_text() {
        let nodes = parse(r#"{"a": {"b": 1}}"#).unwrap();
        assert_eq!(nodes, vec![text(r#"{"a": {"b": 1}}"#)]);
    }
}
