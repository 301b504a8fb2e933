//! Entity derive macro implementation

mod attrs;

use attrs::{get_field_attr, get_table_name};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let table = match get_table_name(&input)? {
        Some(table) => quote! { ::std::option::Option::Some(#table) },
        None => quote! { ::std::option::Option::None },
    };

    let mut descriptors = Vec::new();
    for field in fields {
        let attr = get_field_attr(field)?;
        if attr.skip {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let property = attr.name.unwrap_or_else(|| {
            let raw = ident.to_string();
            raw.strip_prefix("r#").map(str::to_string).unwrap_or(raw)
        });
        let column = match attr.column {
            Some(column) => quote! { ::std::option::Option::Some(#column) },
            None => quote! { ::std::option::Option::None },
        };

        descriptors.push(quote! {
            querykit::FieldDescriptor::of::<#ty>(#property, #column, |target, value| {
                target.#ident = <#ty as querykit::FromValue>::from_value(value)?;
                ::std::result::Result::Ok(())
            })
        });
    }

    let type_name = name.to_string();

    Ok(quote! {
        impl querykit::Entity for #name {
            fn descriptor() -> &'static querykit::EntityDescriptor<Self> {
                static DESCRIPTOR: ::std::sync::OnceLock<querykit::EntityDescriptor<#name>> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    querykit::EntityDescriptor::new(
                        #type_name,
                        #table,
                        ::std::vec![#(#descriptors),*],
                    )
                })
            }
        }
    })
}
