//! # jsongroup Derive Macros
//!
//! This crate provides the procedural macro for `jsongroup`. It implements
//! `Reflect`, `Struct` and the static descriptor table (`rt::Described`) the
//! resolver reads field tags from.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields, LitStr, Visibility,
};

/// Derives `Reflect`, `Struct` and `Described` for a struct with named fields.
///
/// Field attribute: `#[jsongroup(key = "value", ..., embed)]`. Every
/// `key = "value"` pair is recorded as a tag; `json` and the configured group
/// key (default `groups`) are the ones the resolver reads. `embed` flattens the
/// member's own fields into the parent.
#[proc_macro_derive(GroupObject, attributes(jsongroup))]
pub fn derive_group_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

// --- Internal Data Structures ---
struct FieldDecl {
    ident: syn::Ident,
    ty: syn::Type,
    exported: bool,
    tags: Vec<(String, String)>,
    embed: bool,
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let named = match &input.data {
        Data::Struct(ds) => match &ds.fields {
            Fields::Named(named) => &named.named,
            Fields::Unit => {
                return Err(syn::Error::new(
                    name.span(),
                    "GroupObject needs named fields; unit structs carry nothing to emit",
                ))
            }
            Fields::Unnamed(_) => {
                return Err(syn::Error::new(
                    name.span(),
                    "GroupObject does not support tuple structs",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                name.span(),
                "GroupObject only supports structs",
            ))
        }
    };

    let mut decls = Vec::with_capacity(named.len());
    for field in named {
        let (tags, embed) = parse_attributes(&field.attrs)?;
        let exported = matches!(field.vis, Visibility::Public(_));
        let Some(ident) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        if embed && !exported {
            return Err(syn::Error::new(
                ident.span(),
                "`embed` needs a `pub` field; private members are never emitted",
            ));
        }
        decls.push(FieldDecl {
            ident,
            ty: field.ty.clone(),
            exported,
            tags,
            embed,
        });
    }

    // Type parameters must be reflectable; embedded members must carry a shape.
    let mut generics = input.generics.clone();
    {
        let where_clause = generics.make_where_clause();
        for param in input.generics.type_params() {
            let ident = &param.ident;
            where_clause
                .predicates
                .push(parse_quote!(#ident: ::jsongroup::Reflect));
        }
        for decl in decls.iter().filter(|d| d.embed) {
            let ty = &decl.ty;
            where_clause
                .predicates
                .push(parse_quote!(#ty: ::jsongroup::rt::Described));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let raw_fields = decls.iter().enumerate().map(|(index, d)| {
        let field_name = d.ident.to_string();
        let exported = d.exported;
        let anonymous = d.embed;
        let keys = d.tags.iter().map(|(k, _)| k);
        let values = d.tags.iter().map(|(_, v)| v);
        let embedded = if d.embed {
            let ty = &d.ty;
            quote! {
                ::core::option::Option::Some(
                    <#ty as ::jsongroup::rt::Described>::describe
                        as fn() -> ::jsongroup::rt::StructShape
                )
            }
        } else {
            quote! { ::core::option::Option::None }
        };
        quote! {
            ::jsongroup::rt::RawField {
                name: #field_name,
                index: #index,
                exported: #exported,
                tags: &[#((#keys, #values)),*],
                anonymous: #anonymous,
                embedded: #embedded,
            }
        }
    });

    // Only exported fields are reachable, so private ones need not implement Reflect.
    let field_arms = decls
        .iter()
        .enumerate()
        .filter(|(_, d)| d.exported)
        .map(|(index, d)| {
            let ident = &d.ident;
            quote! { #index => ::core::option::Option::Some(&self.#ident as &dyn ::jsongroup::Reflect), }
        });

    Ok(quote! {
        impl #impl_generics ::jsongroup::rt::Described for #name #ty_generics #where_clause {
            fn describe() -> ::jsongroup::rt::StructShape {
                ::jsongroup::rt::StructShape {
                    type_name: ::core::any::type_name::<Self>(),
                    fields: ::std::vec![#(#raw_fields),*],
                }
            }
        }

        impl #impl_generics ::jsongroup::Struct for #name #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                ::core::any::type_name::<Self>()
            }

            fn shape(&self) -> ::jsongroup::rt::StructShape {
                <Self as ::jsongroup::rt::Described>::describe()
            }

            fn field(&self, index: usize) -> ::core::option::Option<&dyn ::jsongroup::Reflect> {
                match index {
                    #(#field_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl #impl_generics ::jsongroup::Reflect for #name #ty_generics #where_clause {
            fn reflect(
                &self,
            ) -> ::core::result::Result<::jsongroup::Kind<'_>, ::jsongroup::ReflectError> {
                ::core::result::Result::Ok(::jsongroup::Kind::Struct(self))
            }
        }
    })
}

/// Parses `#[jsongroup(...)]`. Returns (tags, embed).
fn parse_attributes(attrs: &[Attribute]) -> syn::Result<(Vec<(String, String)>, bool)> {
    let mut tags: Vec<(String, String)> = Vec::new();
    let mut embed = false;

    for attr in attrs {
        if attr.path().is_ident("jsongroup") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("embed") {
                    embed = true;
                    return Ok(());
                }

                let Some(key) = meta.path.get_ident().map(|i| i.to_string()) else {
                    return Err(meta.error("expected `key = \"value\"` or `embed`"));
                };
                if tags.iter().any(|(k, _)| *k == key) {
                    return Err(meta.error(format!("duplicate jsongroup tag `{key}`")));
                }
                let value: LitStr = meta.value()?.parse()?;
                tags.push((key, value.value()));
                Ok(())
            })?;
        }
    }
    Ok((tags, embed))
}
