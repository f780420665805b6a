//! Storage-format markup builders.
//!
//! Stateless builders for the structured-macro and link elements of the
//! storage representation, for callers composing page bodies.

/// Anything that renders to storage-format markup.
pub trait StorageFormat {
    fn storage_format(&self) -> String;
}

impl StorageFormat for &str {
    fn storage_format(&self) -> String {
        (*self).to_string()
    }
}

impl StorageFormat for String {
    fn storage_format(&self) -> String {
        self.clone()
    }
}

/// A structured macro: `<ac:structured-macro>` with parameters and an
/// optional rich-text body.
#[derive(Debug, Clone)]
pub struct Macro {
    name: String,
    parameters: Vec<(String, String)>,
    body: Option<String>,
}

impl Macro {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            body: None,
        }
    }

    /// Adds a macro parameter.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Sets the rich-text body; accepts plain markup or another builder.
    pub fn body(mut self, value: impl StorageFormat) -> Self {
        self.body = Some(value.storage_format());
        self
    }
}

impl StorageFormat for Macro {
    fn storage_format(&self) -> String {
        let params: String = self
            .parameters
            .iter()
            .map(|(name, value)| format!("<ac:parameter ac:name=\"{name}\">{value}</ac:parameter>"))
            .collect();

        let body = match &self.body {
            Some(body) => format!("<ac:rich-text-body>{body}</ac:rich-text-body>"),
            None => String::new(),
        };

        format!(
            "<ac:structured-macro ac:name=\"{}\" ac:schema-version=\"1\">{params}{body}</ac:structured-macro>",
            self.name
        )
    }
}

/// A link to a resource (page, attachment, ...) with plain-text link body.
#[derive(Debug, Clone)]
pub struct Link {
    kind: String,
    target: String,
    text: String,
}

impl Link {
    /// `kind` is the resource identifier element (e.g. `page`,
    /// `attachment`), `target` its content title.
    pub fn new(
        kind: impl Into<String>,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
            text: text.into(),
        }
    }
}

impl StorageFormat for Link {
    fn storage_format(&self) -> String {
        format!(
            "<ac:link><ri:{} ri:content-title=\"{}\" /><ac:plain-text-link-body><![CDATA[{}]]></ac:plain-text-link-body></ac:link>",
            self.kind, self.target, self.text
        )
    }
}
