// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields, Generics, Ident, LitStr,
};

/// Per-field options from `#[kiara(...)]`
struct FieldInfo {
    ident: Ident,
    ty: syn::Type,
    /// Name on the wire and in the type description
    wire_name: String,
    /// Secret key name when the field is serialized as ciphertext
    encrypted: Option<String>,
}

/// `#[derive(Kiara)]` macro: generates `kiara::types::Declare` + `kiara::marshal::Marshal`
///
/// Attributes:
/// - `#[kiara(name = "...")]` on the struct: type name (default: the ident)
/// - `#[kiara(rename = "...")]` on a field: member name
/// - `#[kiara(encrypted = "key")]` on a field: sealed with the secret key
///   `key` (use `Encrypted<T>` for the default key)
///
/// Example:
/// ```ignore
/// use kiara::Kiara;
///
/// #[derive(Kiara)]
/// #[kiara(name = "calc.Point")]
/// struct Point {
///     x: i32,
///     #[kiara(rename = "Y")]
///     y: i32,
///     #[kiara(encrypted = "session")]
///     label: String,
/// }
/// ```
#[proc_macro_derive(Kiara, attributes(kiara))]
pub fn derive_kiara(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name = struct_name(&input.attrs)?.unwrap_or_else(|| name.to_string());

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

    let mut infos = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "Field must have a name"));
        };
        let (rename, encrypted) = field_options(&field.attrs)?;
        infos.push(FieldInfo {
            wire_name: rename.unwrap_or_else(|| ident.to_string()),
            ident,
            ty: field.ty.clone(),
            encrypted,
        });
    }

    let declare = expand_declare(input, &type_name, &infos);
    let marshal = expand_marshal(input, &type_name, &infos);
    Ok(quote! {
        #declare
        #marshal
    })
}

// ===================================================================
// Declare
// ===================================================================

fn expand_declare(input: &DeriveInput, type_name: &str, infos: &[FieldInfo]) -> TokenStream2 {
    let name = &input.ident;
    let generics = bounded(&input.generics, &parse_quote!(::kiara::types::Declare));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let members = infos.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let wire_name = &f.wire_name;
        let member_ty = match &f.encrypted {
            Some(key) => quote! {{
                let element = w.type_of::<#ty>();
                w.encrypted(element, #key)
            }},
            None => quote! { w.type_of::<#ty>() },
        };
        quote! {
            ::kiara::types::Member {
                name: ::std::string::String::from(#wire_name),
                ty: #member_ty,
                offset: ::core::mem::offset_of!(Self, #ident),
                main_name: ::core::option::Option::None,
            }
        }
    });

    quote! {
        impl #impl_generics ::kiara::types::Declare for #name #ty_generics #where_clause {
            fn declare(world: &mut ::kiara::types::World) -> ::kiara::types::TypeRef {
                world.declare_struct::<Self>(#type_name, |w| {
                    ::std::vec![#(#members),*]
                })
            }
        }
    }
}

// ===================================================================
// Marshal
// ===================================================================

fn expand_marshal(input: &DeriveInput, type_name: &str, infos: &[FieldInfo]) -> TokenStream2 {
    let name = &input.ident;
    let generics = bounded(&input.generics, &parse_quote!(::kiara::marshal::Marshal));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // sealed fields always carry a binary stream
    let empties = infos.iter().map(|f| {
        let ty = &f.ty;
        match &f.encrypted {
            Some(_) => quote! { false },
            None => quote! { <#ty as ::kiara::marshal::Marshal>::WIRE_EMPTY },
        }
    });

    let writes = infos.iter().map(|f| {
        let ident = &f.ident;
        let wire_name = &f.wire_name;
        match &f.encrypted {
            Some(key) => quote! {
                m.message().write_field_begin(#wire_name)?;
                m.write_encrypted(#key, &self.#ident)?;
                m.message().write_field_end()?;
            },
            None => quote! {
                m.write_field(#wire_name, &self.#ident)?;
            },
        }
    });

    let reads = infos.iter().map(|f| {
        let ident = &f.ident;
        let wire_name = &f.wire_name;
        match &f.encrypted {
            Some(key) => quote! {
                #ident: {
                    m.message().read_field_begin(#wire_name)?;
                    let value = m.read_encrypted(#key)?;
                    m.message().read_field_end()?;
                    value
                }
            },
            None => quote! {
                #ident: m.read_field(#wire_name)?
            },
        }
    });

    quote! {
        impl #impl_generics ::kiara::marshal::Marshal for #name #ty_generics #where_clause {
            const WIRE_EMPTY: bool = true #(&& #empties)*;

            fn write_to(
                &self,
                m: &mut ::kiara::marshal::Marshaler<'_>,
            ) -> ::kiara::Result<()> {
                m.message().write_struct_begin(#type_name)?;
                #(#writes)*
                m.message().write_struct_end()
            }

            fn read_from(
                m: &mut ::kiara::marshal::Marshaler<'_>,
            ) -> ::kiara::Result<Self> {
                m.message().read_struct_begin(#type_name)?;
                let value = Self { #(#reads),* };
                m.message().read_struct_end()?;
                ::core::result::Result::Ok(value)
            }
        }
    }
}

// ===================================================================
// Attributes
// ===================================================================

fn struct_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut name = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("kiara")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(name)
}

fn field_options(attrs: &[Attribute]) -> syn::Result<(Option<String>, Option<String>)> {
    let mut rename = None;
    let mut encrypted = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("kiara")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("encrypted") {
                let value: LitStr = meta.value()?.parse()?;
                encrypted = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `rename = \"...\"` or `encrypted = \"...\"`"))
            }
        })?;
    }
    Ok((rename, encrypted))
}

/// Add `bound` to every type parameter
fn bounded(generics: &Generics, bound: &syn::TypeParamBound) -> Generics {
    let mut generics = generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(bound.clone());
    }
    generics
}
