//! Reading the `#[serde(...)]` attributes that change parameter names.
//!
//! Statement text refers to values by the key they serialize under, so the
//! derive has to agree with serde about that key.

use syn::parse::ParseStream;
use syn::{Attribute, LitStr, Result, Token};

/// What serde does with one field.
#[derive(Default)]
pub(super) struct SerdeField {
    pub rename: Option<String>,
    pub skipped: bool,
}

/// Reject container attributes that rename every field.
pub(super) fn check_container(attrs: &[Attribute]) -> Result<()> {
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                return Err(meta.error(
                    "Record does not support #[serde(rename_all)]; rename fields individually",
                ));
            }
            skip_value(meta.input)
        })?;
    }
    Ok(())
}

/// Serialized name and skip state of a field.
pub(super) fn parse_field(attrs: &[Attribute]) -> Result<SerdeField> {
    let mut field = SerdeField::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(Token![=]) {
                    let name: LitStr = meta.value()?.parse()?;
                    field.rename = Some(checked_name(&name)?);
                } else {
                    meta.parse_nested_meta(|inner| {
                        if inner.path.is_ident("serialize") {
                            let name: LitStr = inner.value()?.parse()?;
                            field.rename = Some(checked_name(&name)?);
                            Ok(())
                        } else {
                            skip_value(inner.input)
                        }
                    })?;
                }
                Ok(())
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                field.skipped = true;
                Ok(())
            } else if meta.path.is_ident("flatten") {
                Err(meta.error("Record does not support #[serde(flatten)] fields"))
            } else {
                skip_value(meta.input)
            }
        })?;
    }
    Ok(field)
}

/// Names are used as `:name` parameter references.
fn checked_name(name: &LitStr) -> Result<String> {
    let value = name.value();
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
    if valid {
        Ok(value)
    } else {
        Err(syn::Error::new(
            name.span(),
            format!("serialized name `{value}` cannot be used as a SQL parameter name"),
        ))
    }
}

/// Consume `= value` or `(...)` after a serde key we do not interpret.
fn skip_value(input: ParseStream) -> Result<()> {
    if input.peek(Token![=]) {
        let _: Token![=] = input.parse()?;
        let _: syn::Expr = input.parse()?;
    } else if input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in input);
        let _: proc_macro2::TokenStream = content.parse()?;
    }
    Ok(())
}
