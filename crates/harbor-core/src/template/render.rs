use serde_json::Value;

use super::parser::Node;

/// Render nodes against `root`, writing into `out`.
pub fn render_nodes(nodes: &[Node], root: &Value, out: &mut String) {
    let mut stack = vec![root];
    render_into(nodes, &mut stack, out);
}

fn render_into<'a>(nodes: &'a [Node], stack: &mut Vec<&'a Value>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Comment(_) => {}
            Node::Variable(name) => {
                if let Some(value) = resolve(stack, name) {
                    write_scalar(value, out);
                }
            }
            Node::Section {
                name,
                inverted: true,
                children,
            } => {
                if !resolve(stack, name).is_some_and(is_truthy) {
                    render_into(children, stack, out);
                }
            }
            Node::Section {
                name,
                inverted: false,
                children,
            } => {
                let Some(value) = resolve(stack, name).filter(|v| is_truthy(v)) else {
                    continue;
                };
                match value {
                    Value::Array(items) => {
                        for item in items {
                            stack.push(item);
                            render_into(children, stack, out);
                            stack.pop();
                        }
                    }
                    other => {
                        stack.push(other);
                        render_into(children, stack, out);
                        stack.pop();
                    }
                }
            }
        }
    }
}

// The first segment is searched from the innermost context outwards; the
// remaining segments must resolve beneath it.
fn resolve<'a>(stack: &[&'a Value], name: &str) -> Option<&'a Value> {
    if name == "." {
        return stack.last().copied();
    }
    let mut segments = name.split('.');
    let head = segments.next()?;
    let found = stack.iter().rev().find_map(|ctx| ctx.get(head))?;
    segments.try_fold(found, |node, segment| node.get(segment))
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Number(_) | Value::Object(_) => true,
    }
}

fn write_scalar(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        // Whole floats print without a fraction: 2.0 renders as `2`.
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 => {
                out.push_str(&f.to_string())
            }
            _ => out.push_str(&n.to_string()),
        },
        composite => out.push_str(&composite.to_string()),
    }
}
