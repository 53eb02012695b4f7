//! Record derive macro implementation

mod attrs;
mod serde_attrs;

use attrs::parse_attrs;
use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let struct_attr = parse_attrs(&input.attrs)?;
    if struct_attr.column.is_some() || struct_attr.key || struct_attr.in_list || struct_attr.skip {
        return Err(syn::Error::new_spanned(
            name,
            "only `table` is allowed in a struct-level #[record(...)]",
        ));
    }
    serde_attrs::check_container(&input.attrs)?;
    let table = struct_attr
        .table
        .unwrap_or_else(|| name.unraw().to_string().to_snake_case());

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut descriptors = Vec::new();
    let mut values = Vec::new();

    for field in fields {
        let attr = parse_attrs(&field.attrs)?;
        if attr.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let serde = serde_attrs::parse_field(&field.attrs)?;
        if serde.skipped {
            return Err(syn::Error::new_spanned(
                ident,
                "a field skipped by serde must also be #[record(skip)]",
            ));
        }
        // Parameters are looked up by the serialized key.
        let rust_name = ident.unraw().to_string();
        let field_name = serde.rename.unwrap_or_else(|| rust_name.clone());
        let column = attr.column.unwrap_or(rust_name);

        let mut descriptor = quote! {
            ::sqlscript::record::ColumnDescriptor::new(#field_name, #column)
        };
        if let Some(table) = attr.table {
            descriptor = quote! { #descriptor.table(#table) };
        }
        if attr.in_list {
            descriptor = quote! { #descriptor.in_list() };
        }
        if attr.key {
            descriptor = quote! { #descriptor.key() };
        }
        descriptors.push(descriptor);
        values.push(quote! { ::sqlscript::param::to_value(&self.#ident)? });
    }

    Ok(quote! {
        impl #impl_generics ::sqlscript::record::Record for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;

            fn columns() -> &'static [::sqlscript::record::ColumnDescriptor] {
                const COLUMNS: &[::sqlscript::record::ColumnDescriptor] = &[#(#descriptors),*];
                COLUMNS
            }

            fn field_values(
                &self,
            ) -> ::sqlscript::error::BuildResult<::std::vec::Vec<::sqlscript::param::Value>> {
                ::std::result::Result::Ok(::std::vec![#(#values),*])
            }
        }
    })
}
