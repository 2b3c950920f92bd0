// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitInt, LitStr};

/// Struct-level `#[topic(...)]` options.
struct TopicAttrs {
    /// Fully-qualified IDL name; defaults to the struct name.
    name: Option<String>,
    /// Key member names in key order.
    keylist: Option<Vec<String>>,
}

/// Per-field options.
struct FieldInfo {
    ident: syn::Ident,
    ty: syn::Type,
    /// Member name as it appears in metadata and key lists.
    name: String,
    key: bool,
    bound: Option<u32>,
}

/// `#[derive(Topic)]` macro: generates field access + a lazily built descriptor
///
/// Fields become members in declaration order; field `n` is instruction field `n`.
///
/// Attributes:
/// - `#[topic(name = "Mod::Type")]` on the struct: IDL type name
/// - `#[topic(keylist = "b, a")]` on the struct: key members in key order
///   (comma or space separated)
/// - `#[key]` on a field: member is part of the key (declaration order)
/// - `#[topic(bound = N)]` on a field: strings in this member hold at most N chars
///
/// Supported field types: primitives, `bool`, `String`, fixed arrays, `Vec<T>` and
/// other `#[derive(Topic)]` structs. Self-referential types are not supported.
///
/// # Panics
///
/// The generated `descriptor()` panics on first use if the declaration does not
/// form a valid descriptor (for example `Vec<Vec<T>>` members).
///
/// Example:
/// ```ignore
/// use opcdr::Topic;
///
/// #[derive(Default, Topic)]
/// #[topic(name = "Fleet::Position", keylist = "vehicle")]
/// struct Position {
///     vehicle: u32,
///     #[topic(bound = 8)]
///     zone: String,
///     xyz: [f64; 3],
/// }
/// ```
#[proc_macro_derive(Topic, attributes(topic, key))]
pub fn derive_topic(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "generic structs are not supported",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(f) => &f.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Only named fields are supported",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(input, "Only structs are supported")),
    };

    let attrs = parse_topic_attrs(input)?;
    let type_name = attrs.name.unwrap_or_else(|| name.to_string());

    let mut infos = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "Field must have a name"));
        };
        let mut info = FieldInfo {
            ident: ident.clone(),
            ty: field.ty.clone(),
            name: ident.unraw().to_string(),
            key: false,
            bound: None,
        };
        parse_field_attrs(field, &mut info)?;
        infos.push(info);
    }

    if let Some(keylist) = &attrs.keylist {
        if let Some(marked) = infos.iter().find(|f| f.key) {
            return Err(syn::Error::new_spanned(
                &marked.ident,
                "#[key] cannot be combined with #[topic(keylist = ...)]",
            ));
        }
        for key in keylist {
            if !infos.iter().any(|f| &f.name == key) {
                return Err(syn::Error::new_spanned(
                    input,
                    format!("keylist names unknown field `{key}`"),
                ));
            }
        }
    }

    let indices: Vec<u32> = (0..infos.len())
        .map(|idx| {
            u32::try_from(idx).map_err(|_| {
                syn::Error::new_spanned(input, "Struct has too many fields")
            })
        })
        .collect::<syn::Result<_>>()?;
    let idents: Vec<_> = infos.iter().map(|f| &f.ident).collect();

    let members: Vec<_> = infos
        .iter()
        .map(|f| {
            let member_name = &f.name;
            let ty = &f.ty;
            let method = if f.key {
                quote! { key }
            } else {
                quote! { member }
            };
            let bound = f.bound.map(|n| quote! { .with_string_bound(#n) });
            quote! {
                .#method(#member_name, <#ty as ::opcdr::reflect::WireType>::member_type()#bound)
            }
        })
        .collect();

    let keylist = attrs.keylist.map(|keys| quote! { .keylist([#(#keys),*]) });

    Ok(quote! {
        impl ::opcdr::reflect::Reflect for #name {
            fn field(&self, index: u32) -> ::core::option::Option<::opcdr::reflect::FieldRef<'_>> {
                match index {
                    #(#indices => ::core::option::Option::Some(
                        ::opcdr::reflect::Element::as_field(&self.#idents)
                    ),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_mut(&mut self, index: u32) -> ::core::option::Option<::opcdr::reflect::FieldMut<'_>> {
                match index {
                    #(#indices => ::core::option::Option::Some(
                        ::opcdr::reflect::Element::as_field_mut(&mut self.#idents)
                    ),)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::opcdr::reflect::Element for #name {
            fn as_field(&self) -> ::opcdr::reflect::FieldRef<'_> {
                ::opcdr::reflect::FieldRef::Struct(self)
            }

            fn as_field_mut(&mut self) -> ::opcdr::reflect::FieldMut<'_> {
                ::opcdr::reflect::FieldMut::Struct(self)
            }
        }

        impl #name {
            #[doc(hidden)]
            fn __opcdr_shared_descriptor() -> &'static ::std::sync::Arc<::opcdr::descriptor::TopicDescriptor> {
                static DESCRIPTOR: ::std::sync::OnceLock<::std::sync::Arc<::opcdr::descriptor::TopicDescriptor>> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    let builder = ::opcdr::descriptor::TypeBuilder::new(#type_name)
                        .layout(::core::mem::size_of::<Self>(), ::core::mem::align_of::<Self>())
                        #(#members)*
                        #keylist;
                    match builder.build() {
                        ::core::result::Result::Ok(desc) => ::std::sync::Arc::new(desc),
                        ::core::result::Result::Err(err) => {
                            panic!("#[derive(Topic)] on `{}`: {}", #type_name, err)
                        }
                    }
                })
            }
        }

        impl ::opcdr::reflect::WireType for #name {
            fn member_type() -> ::opcdr::reflect::MemberType {
                ::opcdr::reflect::MemberType::Struct(::std::sync::Arc::clone(
                    Self::__opcdr_shared_descriptor(),
                ))
            }
        }

        impl ::opcdr::reflect::Topic for #name {
            fn descriptor() -> &'static ::opcdr::descriptor::TopicDescriptor {
                Self::__opcdr_shared_descriptor()
            }
        }
    })
}

fn parse_topic_attrs(input: &DeriveInput) -> syn::Result<TopicAttrs> {
    let mut attrs = TopicAttrs {
        name: None,
        keylist: None,
    };
    for attr in &input.attrs {
        if !attr.path().is_ident("topic") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.name = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("keylist") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.keylist = Some(
                    lit.value()
                        .split(|c: char| c == ',' || c.is_whitespace())
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned)
                        .collect(),
                );
                Ok(())
            } else {
                Err(meta.error("expected `name` or `keylist`"))
            }
        })?;
    }
    Ok(attrs)
}

fn parse_field_attrs(field: &syn::Field, info: &mut FieldInfo) -> syn::Result<()> {
    for attr in &field.attrs {
        if attr.path().is_ident("key") {
            attr.meta.require_path_only()?;
            info.key = true;
        } else if attr.path().is_ident("topic") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("bound") {
                    let lit: LitInt = meta.value()?.parse()?;
                    info.bound = Some(lit.base10_parse()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `bound`"))
                }
            })?;
        }
    }
    Ok(())
}
