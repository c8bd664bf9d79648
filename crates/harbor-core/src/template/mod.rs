//! Logic-less templates for manifests and option documents.
//!
//! Supported tags:
//!
//! - `{{a.b.c}}`, `{{{a.b}}}`, `{{&a.b}}`: substitution, never escaped
//! - `{{#path}}...{{/path}}`: once per array element, or once if truthy
//! - `{{^path}}...{{/path}}`: only when missing or falsy
//! - `{{! comment }}`
//!
//! Falsy values are `null`, `false`, blank strings and empty arrays.

mod parser;
mod render;

use serde_json::Value;

use crate::error::{HarborError, Result};

pub use parser::{Node, TemplateError};
pub use render::is_truthy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> std::result::Result<Self, TemplateError> {
        Ok(Self {
            nodes: parser::parse(source)?,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn render(&self, context: &Value) -> String {
        let mut out = String::new();
        render::render_nodes(&self.nodes, context, &mut out);
        out
    }
}

/// Parse and render in one step, reporting failures against `artifact`.
pub fn render_template(source: &str, context: &Value, artifact: &str) -> Result<String> {
    let template = Template::parse(source)
        .map_err(|e| HarborError::upstream("parse template", artifact, e))?;
    Ok(template.render(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(source: &str, context: Value) -> String {
        Template::parse(source).unwrap().render(&context)
    }

    #[test]
    fn substitutes_dotted_paths() {
        let out = render(
            r#"{"master": "{{mesos.master}}", "missing": "{{mesos.nope}}"}"#,
            json!({"mesos": {"master": "zk://master.mesos:2181/mesos"}}),
        );
        assert_eq!(
            out,
            r#"{"master": "zk://master.mesos:2181/mesos", "missing": ""}"#
        );
    }

    #[test]
    fn whole_floats_render_without_fraction() {
        let out = render(
            "{{cpus}} {{mem}} {{instances}}",
            json!({"cpus": 2.0, "mem": 0.25, "instances": 3}),
        );
        assert_eq!(out, "2 0.25 3");
    }

    #[test]
    fn no_html_escaping() {
        assert_eq!(render("{{v}}", json!({"v": "<a & \"b\">"})), "<a & \"b\">");
    }

    #[test]
    fn sections_iterate_arrays_of_objects() {
        let out = render(
            "{{#ports}}[{{port}}/{{proto}}]{{/ports}}",
            json!({"proto": "tcp", "ports": [{"port": 80}, {"port": 443, "proto": "udp"}]}),
        );
        assert_eq!(out, "[80/tcp][443/udp]");
    }

    #[test]
    fn sections_follow_truthiness() {
        let template = "{{#on}}yes{{/on}}{{^on}}no{{/on}}";
        assert_eq!(render(template, json!({"on": true})), "yes");
        assert_eq!(render(template, json!({"on": "x"})), "yes");
        assert_eq!(render(template, json!({"on": 0})), "yes");
        assert_eq!(render(template, json!({"on": false})), "no");
        assert_eq!(render(template, json!({"on": "  "})), "no");
        assert_eq!(render(template, json!({"on": []})), "no");
        assert_eq!(render(template, json!({})), "no");
    }

    #[test]
    fn object_section_pushes_context() {
        let out = render(
            "{{#mantl.mesos}}{{principal}}:{{secret}}{{/mantl.mesos}}",
            json!({"mantl": {"mesos": {"principal": "p", "secret": "s"}}}),
        );
        assert_eq!(out, "p:s");
    }

    #[test]
    fn comments_render_nothing() {
        assert_eq!(render("a{{! ignore me }}b", json!({})), "ab");
    }

    #[test]
    fn parse_failures_become_upstream_errors() {
        let err = render_template("{{#a}}", &json!({}), "marathon.json").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Upstream);
        assert!(err.to_string().contains("marathon.json"));
    }
}
