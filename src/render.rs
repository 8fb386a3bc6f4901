//! Placeholder substitution for template files.
//!
//! Only `{{ key }}` placeholders are interpreted. Every other byte of a
//! source file is copied through, so `{%`, `{#` and stray braces in Java,
//! Markdown or Gradle files never reach tera's parser: each file is compiled
//! into a tera template made only of expressions over the literal runs and
//! the scope.

use crate::error::{InitializerError, Result};
use crate::escape::Escaper;
use crate::scope::Scope;
use lazy_regex::regex;
use std::io::Write;
use std::path::Path;
use tera::{Context, Tera};

/// Context variable holding the scope map.
const SCOPE_VAR: &str = "scope";

/// Context variable holding the literal runs of the file being rendered.
const TEXT_VAR: &str = "text";

/// Build a tera context holding every scope entry.
pub fn context_for(scope: &Scope) -> Context {
    let mut context = Context::new();
    context.insert(SCOPE_VAR, scope);
    context
}

/// Translate `source` into an expression-only tera template.
///
/// Literal runs are emitted as `safe` lookups into the returned text list and
/// placeholders as escaped lookups into the scope. Anything between `{{` and
/// `}}` that is not a key name stays literal.
fn compile<'a>(source: &'a str) -> (String, Vec<&'a str>) {
    let mut template = String::new();
    let mut text: Vec<&'a str> = Vec::new();
    let mut push_text = |template: &mut String, literal: &'a str| {
        template.push_str(&format!("{{{{ {}[{}] | safe }}}}", TEXT_VAR, text.len()));
        text.push(literal);
    };

    let mut last = 0;
    for caps in regex!(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").captures_iter(source) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            push_text(&mut template, &source[last..whole.start()]);
        }
        template.push_str(&format!("{{{{ {}[\"{}\"] }}}}", SCOPE_VAR, key.as_str()));
        last = whole.end();
    }
    if last < source.len() {
        push_text(&mut template, &source[last..]);
    }

    (template, text)
}

/// Render `source` as a template named `entry_name` into `out`.
///
/// Every `{{ key }}` is replaced by the scope value passed through `escaper`.
/// A key missing from the scope is an error; nothing falls back to "".
pub fn render_str(
    entry_name: &str,
    source: &str,
    context: &Context,
    escaper: Escaper,
    out: impl Write,
) -> Result<()> {
    let template_error = |source| InitializerError::Template {
        entry: entry_name.to_string(),
        source,
    };

    let (template, text) = compile(source);
    let mut context = context.clone();
    context.insert(TEXT_VAR, &text);

    let mut tera = Tera::default();
    // Every name ends with "", so every substitution is escaped.
    tera.autoescape_on(vec![""]);
    tera.set_escape_fn(escaper);
    tera.add_raw_template(entry_name, &template)
        .map_err(template_error)?;
    tera.render_to(entry_name, &context, out)
        .map_err(template_error)
}

/// Render the file `entry_name` found under `template_root` into `out`.
pub fn render_file(
    template_root: &Path,
    entry_name: &str,
    context: &Context,
    escaper: Escaper,
    out: impl Write,
) -> Result<()> {
    let path = template_root.join(entry_name);
    let source = std::fs::read_to_string(&path)?;
    render_str(entry_name, &source, context, escaper, out)
}
