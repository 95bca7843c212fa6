use anyhow::Context as _;
use tera::{Context, Tera};

use crate::infrastructure::config::{GraphiqlConfig, DEFAULT_GRAPHIQL_VIEW};

const GRAPHIQL_TEMPLATE: &str = include_str!("../../templates/graphiql.html");

/// Templates for the interactive explorer.
pub struct Views {
    tera: Tera,
    graphiql_view: String,
}

impl Views {
    pub fn new(config: &GraphiqlConfig) -> anyhow::Result<Self> {
        let mut tera = match &config.template_dir {
            Some(dir) => {
                let pattern = format!("{}/**/*", dir.trim_end_matches('/'));
                Tera::new(&pattern).with_context(|| format!("failed to load templates from {dir}"))?
            }
            None => Tera::default(),
        };
        tera.add_raw_template(DEFAULT_GRAPHIQL_VIEW, GRAPHIQL_TEMPLATE)?;

        if !tera.get_template_names().any(|name| name == config.view) {
            anyhow::bail!("graphiql view {:?} is not a known template", config.view);
        }

        Ok(Self {
            tera,
            graphiql_view: config.view.clone(),
        })
    }

    /// Renders the configured explorer view. Templates receive `schema`
    /// (possibly null), `endpoint` and `endpoint_json`, the endpoint as a
    /// script-safe string literal.
    pub fn render_graphiql(&self, schema: Option<&str>, endpoint: &str) -> tera::Result<String> {
        let mut context = Context::new();
        context.insert("schema", &schema);
        context.insert("endpoint", endpoint);
        context.insert("endpoint_json", &script_literal(endpoint));
        self.tera.render(&self.graphiql_view, &context)
    }
}

fn script_literal(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
