use super::node::{ForeachNode, SqlNode, TrimNode};
use super::parser::{SCRIPT_TAG, ScriptElement, ScriptItem, parse_script};
use super::source::{RenderSettings, SqlSource};
use crate::config::ScriptConfig;
use crate::error::{BuildError, BuildResult};
use crate::expr::TestExpr;
use crate::placeholder::{PlaceholderResolver, Resolution};
use crate::token::PLACEHOLDER;
use std::collections::HashMap;

/// Builds [`SqlSource`]s from script text or a parsed [`ScriptElement`].
///
/// Test expressions are parsed here, so a malformed `test` fails at assembly
/// rather than on first render.
#[derive(Debug, Clone, Copy)]
pub struct ScriptAssembler<'c> {
    config: &'c ScriptConfig,
}

impl<'c> ScriptAssembler<'c> {
    pub fn new(config: &'c ScriptConfig) -> Self {
        Self { config }
    }

    /// Parse and assemble script text (with or without a `<script>` envelope).
    pub fn assemble_text(&self, text: &str) -> BuildResult<SqlSource> {
        let root = parse_script(text)?;
        self.assemble(&root)
    }

    /// Assemble a parsed description.
    pub fn assemble(&self, root: &ScriptElement) -> BuildResult<SqlSource> {
        let mut active = Vec::new();
        let items = if root.tag == SCRIPT_TAG {
            self.expand(&root.children, None, &mut active)?
        } else {
            self.expand(&[ScriptItem::Element(root.clone())], None, &mut active)?
        };
        let node = self.mixed(&items)?;
        let settings = RenderSettings::from(self.config);

        if node.is_dynamic() {
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "sqlscript", "assembled dynamic script");
            Ok(SqlSource::dynamic(node, settings))
        } else {
            SqlSource::raw(&node, settings)
        }
    }

    /// Replace every `<include>` with the items of its fragment.
    ///
    /// Inside a fragment, `scope` holds the variables plus the include's
    /// `<property>` values; they are substituted into text and attributes.
    fn expand(
        &self,
        items: &[ScriptItem],
        scope: Option<&HashMap<String, String>>,
        active: &mut Vec<String>,
    ) -> BuildResult<Vec<ScriptItem>> {
        let substitute = |text: &str| match scope {
            Some(vars) => self.substitute_known(text, vars),
            None => text.to_string(),
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ScriptItem::Text(text) => out.push(ScriptItem::Text(substitute(text))),
                ScriptItem::Element(el) if el.tag == "include" => {
                    out.extend(self.include(el, scope, active)?);
                }
                ScriptItem::Element(el) if el.tag == "property" => {
                    return Err(BuildError::configuration(
                        "<property> is only allowed inside <include>",
                    ));
                }
                ScriptItem::Element(el) => {
                    let mut copy = ScriptElement::new(el.tag.clone());
                    copy.attributes = el
                        .attributes
                        .iter()
                        .map(|(name, value)| (name.clone(), substitute(value)))
                        .collect();
                    copy.children = self.expand(&el.children, scope, active)?;
                    out.push(ScriptItem::Element(copy));
                }
            }
        }
        Ok(out)
    }

    fn include(
        &self,
        el: &ScriptElement,
        scope: Option<&HashMap<String, String>>,
        active: &mut Vec<String>,
    ) -> BuildResult<Vec<ScriptItem>> {
        let inherited = scope.unwrap_or(&self.config.variables);
        let refid = self.substitute_known(required(el, "refid")?, inherited);
        let text = self.config.fragments.get(&refid).ok_or_else(|| {
            BuildError::configuration(format!(
                "Could not find SQL fragment to include with refid '{refid}'"
            ))
        })?;
        if active.contains(&refid) {
            return Err(BuildError::configuration(format!(
                "SQL fragment '{refid}' includes itself"
            )));
        }

        let mut context = inherited.clone();
        let mut declared = Vec::new();
        for child in &el.children {
            match child {
                ScriptItem::Text(text) if text.trim().is_empty() => {}
                ScriptItem::Element(property) if property.tag == "property" => {
                    let name = required(property, "name")?;
                    if declared.contains(&name) {
                        return Err(BuildError::configuration(format!(
                            "Variable {name} defined twice in the same include definition"
                        )));
                    }
                    declared.push(name);
                    let value = self.substitute_known(required(property, "value")?, inherited);
                    context.insert(name.to_string(), value);
                }
                _ => {
                    return Err(BuildError::configuration(
                        "<include> may only contain <property> elements",
                    ));
                }
            }
        }

        let fragment = parse_script(text)?;
        active.push(refid);
        let items = self.expand(&fragment.children, Some(&context), active);
        active.pop();
        items
    }

    fn mixed(&self, children: &[ScriptItem]) -> BuildResult<SqlNode> {
        let nodes = children
            .iter()
            .map(|child| match child {
                ScriptItem::Text(text) => Ok(self.text(text)),
                ScriptItem::Element(el) => self.element(el),
            })
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(SqlNode::Mixed(nodes))
    }

    /// Text node: assembly-time variables are substituted first, and only
    /// placeholders still unresolved keep the text dynamic.
    fn text(&self, text: &str) -> SqlNode {
        let text = self.substitute_variables(text);
        if PLACEHOLDER.has_tokens(&text) {
            SqlNode::Text(text)
        } else {
            SqlNode::Static(text)
        }
    }

    fn substitute_variables(&self, text: &str) -> String {
        self.substitute_known(text, &self.config.variables)
    }

    /// Substitute placeholders `variables` defines; the rest wait for render time.
    fn substitute_known(&self, text: &str, variables: &HashMap<String, String>) -> String {
        if variables.is_empty() {
            return text.to_string();
        }
        let mut resolver = PlaceholderResolver::new(Some(variables));
        if self.config.enable_default_value {
            resolver = resolver
                .enable_default_value(true)
                .separator(self.config.default_value_separator.clone());
        }
        // Defaults are left for render time; the key may still be a parameter.
        PLACEHOLDER.scan(text, |expr| match resolver.lookup(expr) {
            Resolution::Value(v) => v,
            Resolution::Default(_) | Resolution::Unresolved => format!("${{{expr}}}"),
        })
    }

    fn element(&self, el: &ScriptElement) -> BuildResult<SqlNode> {
        match el.tag.as_str() {
            "if" | "when" => Ok(SqlNode::If {
                test: parse_test(el, "test")?,
                body: Box::new(self.mixed(&el.children)?),
            }),
            "otherwise" => self.mixed(&el.children),
            "where" => Ok(SqlNode::Trim(TrimNode::where_clause(
                self.mixed(&el.children)?,
            ))),
            "set" => Ok(SqlNode::Trim(TrimNode::set_clause(self.mixed(&el.children)?))),
            "trim" => Ok(SqlNode::Trim(TrimNode::new(
                self.mixed(&el.children)?,
                el.attribute("prefix"),
                el.attribute("suffix"),
                el.attribute("prefixOverrides"),
                el.attribute("suffixOverrides"),
            ))),
            "foreach" => self.foreach(el),
            "choose" => self.choose(el),
            "bind" => {
                let name = required(el, "name")?;
                Ok(SqlNode::Bind {
                    name: name.to_string(),
                    value: parse_test(el, "value")?,
                })
            }
            SCRIPT_TAG => self.mixed(&el.children),
            other => Err(BuildError::configuration(format!(
                "Unknown element <{other}> in SQL statement."
            ))),
        }
    }

    fn foreach(&self, el: &ScriptElement) -> BuildResult<SqlNode> {
        let collection = parse_test(el, "collection")?;
        let attr = |name: &str| el.attribute(name).unwrap_or_default();
        let node = ForeachNode::new(self.mixed(&el.children)?, collection)
            .item(attr("item"))
            .index(attr("index"))
            .open(attr("open"))
            .close(attr("close"))
            .separator(attr("separator"));
        Ok(SqlNode::Foreach(node))
    }

    fn choose(&self, el: &ScriptElement) -> BuildResult<SqlNode> {
        let mut whens = Vec::new();
        let mut otherwise = None;
        for child in &el.children {
            let ScriptItem::Element(child) = child else {
                continue;
            };
            match child.tag.as_str() {
                "when" => whens.push((parse_test(child, "test")?, self.mixed(&child.children)?)),
                "otherwise" => {
                    if otherwise.is_some() {
                        return Err(BuildError::configuration(
                            "Too many default (otherwise) elements in choose statement.",
                        ));
                    }
                    otherwise = Some(Box::new(self.mixed(&child.children)?));
                }
                other => {
                    return Err(BuildError::configuration(format!(
                        "Unexpected element <{other}> in <choose>"
                    )));
                }
            }
        }
        Ok(SqlNode::Choose { whens, otherwise })
    }
}

fn required<'e>(el: &'e ScriptElement, name: &str) -> BuildResult<&'e str> {
    el.attribute(name).ok_or_else(|| {
        BuildError::configuration(format!("<{}> requires a `{name}` attribute", el.tag))
    })
}

fn parse_test(el: &ScriptElement, name: &str) -> BuildResult<TestExpr> {
    TestExpr::parse(required(el, name)?)
}

/// Assemble script text with default settings.
pub fn assemble(text: &str) -> BuildResult<SqlSource> {
    ScriptAssembler::new(&ScriptConfig::default()).assemble_text(text)
}

/// Assemble script text substituting `variables` at assembly time.
pub fn assemble_with(text: &str, variables: &HashMap<String, String>) -> BuildResult<SqlSource> {
    let config = ScriptConfig::default().variables(variables.clone());
    ScriptAssembler::new(&config).assemble_text(text)
}
