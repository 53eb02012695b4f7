//! Attribute parsing for the Record derive macro.
//!
//! Handles struct-level and field-level `#[record(...)]` attributes.

use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::{Attribute, Result, Token};

/// Parsed contents of one `#[record(...)]` attribute.
#[derive(Default)]
pub(super) struct RecordAttr {
    pub table: Option<String>,
    pub column: Option<String>,
    pub key: bool,
    pub in_list: bool,
    pub skip: bool,
}

impl Parse for RecordAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = RecordAttr::default();

        while !input.is_empty() {
            // `in` is a keyword, so parse any identifier.
            let ident = input.call(syn::Ident::parse_any)?;
            match ident.to_string().as_str() {
                "key" => attr.key = true,
                "in" => attr.in_list = true,
                "skip" => attr.skip = true,
                "table" | "column" => {
                    let _: Token![=] = input.parse()?;
                    let value: syn::LitStr = input.parse()?;
                    if ident == "table" {
                        attr.table = Some(value.value());
                    } else {
                        attr.column = Some(value.value());
                    }
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown record attribute `{other}`"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                let _: Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        if !input.is_empty() {
            return Err(input.error("expected `,`"));
        }
        Ok(attr)
    }
}

/// Merge every `#[record(...)]` attribute in `attrs`.
pub(super) fn parse_attrs(attrs: &[Attribute]) -> Result<RecordAttr> {
    let mut merged = RecordAttr::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("record")) {
        let parsed: RecordAttr = attr.parse_args()?;
        merged.table = parsed.table.or(merged.table);
        merged.column = parsed.column.or(merged.column);
        merged.key |= parsed.key;
        merged.in_list |= parsed.in_list;
        merged.skip |= parsed.skip;
    }
    Ok(merged)
}
