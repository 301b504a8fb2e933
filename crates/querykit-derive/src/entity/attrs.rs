//! Attribute parsing for the Entity derive macro.
//!
//! Struct level: `#[orm(table = "...")]`.
//! Field level: `#[orm(column = "...")]`, `#[orm(name = "...")]`, `#[orm(skip)]`.

use syn::{DeriveInput, Result};

/// Parsed field-level `#[orm(...)]` options.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub column: Option<String>,
    pub name: Option<String>,
    pub skip: bool,
}

impl FieldAttr {
    fn merge(&mut self, other: FieldAttr) {
        if other.column.is_some() {
            self.column = other.column;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        self.skip |= other.skip;
    }
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "skip" {
                attr.skip = true;
            } else {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                let text = value.value();
                if text.trim().is_empty() {
                    return Err(syn::Error::new_spanned(value, "value must not be empty"));
                }
                if ident == "column" {
                    attr.column = Some(text);
                } else if ident == "name" {
                    attr.name = Some(text);
                } else {
                    return Err(syn::Error::new_spanned(
                        ident,
                        "unknown orm attribute; expected `column`, `name` or `skip`",
                    ));
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Collect every `#[orm(...)]` on a field.
pub(super) fn get_field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut attr = FieldAttr::default();
    for raw in &field.attrs {
        if raw.path().is_ident("orm") {
            attr.merge(raw.parse_args::<FieldAttr>()?);
        }
    }
    Ok(attr)
}

/// Table from struct-level `#[orm(table = "...")]`, if present.
pub(super) fn get_table_name(input: &DeriveInput) -> Result<Option<String>> {
    for attr in &input.attrs {
        if attr.path().is_ident("orm") {
            let nested = attr.parse_args::<syn::MetaNameValue>()?;
            if !nested.path.is_ident("table") {
                return Err(syn::Error::new_spanned(
                    nested.path,
                    "unknown orm attribute; expected `table`",
                ));
            }
            if let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit),
                ..
            }) = &nested.value
            {
                return Ok(Some(lit.value()));
            }
            return Err(syn::Error::new_spanned(
                nested.value,
                "expected a string literal: #[orm(table = \"table_name\")]",
            ));
        }
    }
    Ok(None)
}
