//! `{{ .Variable }}` substitution

use super::PlaceHolder;
use crate::error::{Error, Result};

/// Replace every `{{ .Name }}` in `template` with its placeholder value
///
/// Unknown variables and unterminated placeholders are `BadInput`.
pub fn substitute(template: &str, placeholder: &PlaceHolder) -> Result<String> {
    substitute_with(template, |variable| placeholder.lookup(variable))
}

/// [`substitute`] with an arbitrary variable lookup
pub fn substitute_with<F>(template: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| {
            Error::bad_input(format!(
                "unterminated placeholder at line {}",
                line_of(template, rest, start)
            ))
        })?;

        let expr = after[..end].trim();
        let variable = expr.strip_prefix('.').ok_or_else(|| {
            Error::bad_input(format!("unsupported template expression '{}'", expr))
        })?;
        let value = lookup(variable)
            .ok_or_else(|| Error::bad_input(format!("unknown template variable '{}'", variable)))?;
        out.push_str(&value);

        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

fn line_of(template: &str, rest: &str, offset: usize) -> usize {
    let consumed = template.len() - rest.len() + offset;
    template[..consumed].matches('\n').count() + 1
}
