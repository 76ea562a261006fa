//! Derive macro for objectify descriptors and typed extraction.
//!
//! `#[derive(Objectify)]` implements `Describe` and `FromInstance` so a struct
//! can be the target of a conversion and be pulled back out of the result.
//!
//! ```ignore
//! use objectify_core::{from_node, Objectify, ValueNode};
//!
//! #[derive(Objectify)]
//! struct Point {
//!     x: i64,
//!     y: i64,
//! }
//!
//! let node = ValueNode::map([("x", ValueNode::Int(10)), ("y", ValueNode::Int(20))]);
//! let point: Point = from_node(&node)?;
//! ```

use std::collections::HashSet;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields, GenericParam, Generics, LitStr};

/// Derive `Describe` and `FromInstance` for a struct.
///
/// # Structs
///
/// - named fields become a record whose type id is the Rust type name
/// - tuple structs become a fixed-arity tuple
/// - unit structs become the empty tuple
///
/// Enums and unions are rejected: sum types have no conversion.
///
/// # Attributes
///
/// - `#[objectify(rename = "name")]` on a field reads a different input key
/// - `#[objectify(rename = "name")]` on the struct sets the record type id
#[proc_macro_derive(Objectify, attributes(objectify))]
pub fn derive_objectify(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input).unwrap_or_else(syn::Error::into_compile_error).into()
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    match &input.data {
        Data::Struct(data) => derive_struct(input, data),
        Data::Enum(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Objectify cannot be derived for enums: sum types are not convertible",
        )),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Objectify cannot be derived for unions",
        )),
    }
}

fn derive_struct(input: &DeriveInput, data: &syn::DataStruct) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let describe_generics = with_bound(&input.generics, parse_quote!(::objectify_core::Describe));
    let extract_generics = with_bound(&input.generics, parse_quote!(::objectify_core::FromInstance));
    let (describe_impl, ty_generics, describe_where) = describe_generics.split_for_impl();
    let (extract_impl, _, extract_where) = extract_generics.split_for_impl();

    let (descriptor, register, extract) = match &data.fields {
        Fields::Named(fields) => {
            let type_id = match rename(&input.attrs)? {
                Some(id) => quote! { #id },
                None => quote! { ::objectify_core::__private::type_name::<Self>() },
            };

            let mut seen = HashSet::new();
            let mut declared = Vec::new();
            let mut assigned = Vec::new();
            for field in &fields.named {
                let Some(ident) = &field.ident else {
                    return Err(syn::Error::new_spanned(field, "expected a named field"));
                };
                let key = rename(&field.attrs)?.unwrap_or_else(|| ident.to_string());
                if !seen.insert(key.clone()) {
                    return Err(syn::Error::new_spanned(
                        field,
                        format!("duplicate input key `{key}`"),
                    ));
                }
                let ty = &field.ty;
                declared.push(quote! {
                    ::objectify_core::Field::new(#key, <#ty as ::objectify_core::Describe>::descriptor())
                });
                assigned.push(quote! {
                    #ident: ::objectify_core::__private::take_field::<#ty>(&mut record, #key)?
                });
            }
            let field_types: Vec<_> = fields.named.iter().map(|f| &f.ty).collect();

            (
                quote! { ::objectify_core::TypeDescriptor::record(#type_id) },
                quote! {
                    let type_id = #type_id;
                    let fields = ::objectify_core::__private::vec![#(#declared),*];
                    if registry.contains_record(type_id) {
                        return registry.register_record(type_id, fields);
                    }
                    registry.register_record(type_id, fields)?;
                    #(<#field_types as ::objectify_core::Describe>::register(registry)?;)*
                    ::objectify_core::__private::Ok(())
                },
                quote! {
                    let mut record = ::objectify_core::__private::expect_record(instance)?;
                    ::objectify_core::__private::Ok(Self { #(#assigned),* })
                },
            )
        }
        Fields::Unnamed(fields) => {
            reject_attributes(&input.attrs, "tuple structs")?;
            for field in &fields.unnamed {
                reject_attributes(&field.attrs, "tuple struct fields")?;
            }
            let field_types: Vec<_> = fields.unnamed.iter().map(|f| &f.ty).collect();
            let indices: Vec<_> = (0..field_types.len()).collect();
            let arity = field_types.len();

            (
                quote! {
                    ::objectify_core::TypeDescriptor::fixed_tuple(::objectify_core::__private::vec![
                        #(<#field_types as ::objectify_core::Describe>::descriptor()),*
                    ])
                },
                quote! {
                    #(<#field_types as ::objectify_core::Describe>::register(registry)?;)*
                    ::objectify_core::__private::Ok(())
                },
                quote! {
                    let mut items = ::objectify_core::__private::expect_tuple(instance, #arity)?;
                    ::objectify_core::__private::Ok(Self(
                        #(::objectify_core::__private::take_item::<#field_types>(&mut items, #indices)?),*
                    ))
                },
            )
        }
        Fields::Unit => {
            reject_attributes(&input.attrs, "unit structs")?;
            (
                quote! {
                    ::objectify_core::TypeDescriptor::fixed_tuple(::objectify_core::__private::Vec::new())
                },
                quote! {
                    let _ = registry;
                    ::objectify_core::__private::Ok(())
                },
                quote! {
                    ::objectify_core::__private::expect_tuple(instance, 0)?;
                    ::objectify_core::__private::Ok(Self)
                },
            )
        }
    };

    Ok(quote! {
        impl #describe_impl ::objectify_core::Describe for #name #ty_generics #describe_where {
            fn descriptor() -> ::objectify_core::TypeDescriptor {
                #descriptor
            }

            fn register(
                registry: &mut ::objectify_core::Registry,
            ) -> ::objectify_core::__private::Result<(), ::objectify_core::RegistryError> {
                #register
            }
        }

        impl #extract_impl ::objectify_core::FromInstance for #name #ty_generics #extract_where {
            fn from_instance(
                instance: ::objectify_core::Instance,
            ) -> ::objectify_core::__private::Result<Self, ::objectify_core::ConversionError> {
                #extract
            }
        }
    })
}

fn with_bound(generics: &Generics, bound: syn::TypeParamBound) -> Generics {
    let mut generics = generics.clone();
    for param in &mut generics.params {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(bound.clone());
        }
    }
    generics
}

/// Shapes without names have nothing to rename.
fn reject_attributes(attrs: &[Attribute], what: &str) -> syn::Result<()> {
    match attrs.iter().find(|attr| attr.path().is_ident("objectify")) {
        Some(attr) => Err(syn::Error::new_spanned(
            attr,
            format!("#[objectify(..)] is not supported on {what}"),
        )),
        None => Ok(()),
    }
}

/// Read `#[objectify(rename = "...")]`.
fn rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut renamed = None;
    for attr in attrs {
        if !attr.path().is_ident("objectify") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                renamed = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported objectify attribute"))
            }
        })?;
    }
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_error(input: DeriveInput) -> String {
        expand(&input).expect_err("derive should fail").to_string()
    }

    #[test]
    fn named_struct_expands() {
        let input: DeriveInput = parse_quote! {
            #[objectify(rename = "point")]
            struct Point {
                x: i64,
                #[objectify(rename = "Y")]
                y: i64,
            }
        };
        let tokens = expand(&input).expect("expand").to_string();
        assert!(tokens.contains("\"point\""));
        assert!(tokens.contains("\"Y\""));
    }

    #[test]
    fn rename_on_tuple_structs_is_rejected() {
        let err = expand_error(parse_quote! {
            #[objectify(rename = "pair")]
            struct Pair(i64, String);
        });
        assert!(err.contains("not supported on tuple structs"), "{err}");

        let err = expand_error(parse_quote! {
            struct Pair(#[objectify(rename = "first")] i64, String);
        });
        assert!(err.contains("not supported on tuple struct fields"), "{err}");
    }

    #[test]
    fn rename_on_unit_structs_is_rejected() {
        let err = expand_error(parse_quote! {
            #[objectify(rename = "unit")]
            struct Unit;
        });
        assert!(err.contains("not supported on unit structs"), "{err}");
    }

    #[test]
    fn duplicate_keys_and_sum_types_are_rejected() {
        let err = expand_error(parse_quote! {
            struct Clash {
                a: i64,
                #[objectify(rename = "a")]
                b: i64,
            }
        });
        assert!(err.contains("duplicate input key `a`"), "{err}");

        let err = expand_error(parse_quote! {
            enum Choice { A, B }
        });
        assert!(err.contains("enums"), "{err}");
    }

    #[test]
    fn unknown_attributes_are_rejected() {
        let err = expand_error(parse_quote! {
            struct Point {
                #[objectify(skip)]
                x: i64,
            }
        });
        assert!(err.contains("unsupported objectify attribute"), "{err}");
    }
}
