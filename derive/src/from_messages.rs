use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Field, Fields, GenericArgument, Ident, PathArguments, Result, Type};

pub(crate) fn expand_from_messages(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new_spanned(
            input,
            "`FromMessages` may only be derived on structs.",
        ))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new_spanned(
            input,
            "`FromMessages` may only be derived on structs with named fields.",
        ))?
    };

    let fields = fields
        .named
        .iter()
        .map(FieldMetadata::parse)
        .map(Result::transpose)
        .flatten() // Skip fields without an attribute.
        .collect::<Result<Vec<_>>>()?;

    let handlers = fields.iter().map(|FieldMetadata { profile, .. }| {
        quote! { <#profile as ::cassette::avec::Profile>::HANDLER }
    });

    let cases = fields.iter().map(|field| {
        let FieldMetadata {
            name,
            profile,
            is_vec,
        } = field;

        let assignment = if *is_vec {
            quote! { self.#name.push(value) }
        } else {
            quote! { self.#name = Some(value) }
        };

        quote! {
            number if number == <#profile as ::cassette::avec::Profile>::NUMBER => {
                let value = <#profile as ::cassette::avec::Profile>::from_message(&message);
                #assignment;
            }
        }
    });

    let name = &input.ident;

    let expanded = quote! {
        impl ::cassette::avec::FromMessages for #name {
            const HANDLERS: &'static [::cassette::registry::Handler] = &[#(#handlers),*];

            fn add_message(&mut self, message: ::cassette::message::Message) {
                match message.number() {
                    #(#cases)*
                    _ => {}
                }
            }
        }
    };

    Ok(expanded.into())
}

#[derive(Debug)]
struct FieldMetadata {
    name: Ident,
    profile: Type,
    is_vec: bool,
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Option<Self>> {
        let Some(name) = field.ident.clone() else {
            Err(Error::new_spanned(field, "Field must be named."))?
        };

        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("message")) else {
            return Ok(None);
        };
        attr.meta.require_path_only()?;

        let Type::Path(path) = &field.ty else {
            Err(Error::new_spanned(
                &field.ty,
                "Field must have a type annotation.",
            ))?
        };

        let Some(segment) = path.path.segments.last() else {
            Err(Error::new_spanned(
                &path.path.segments,
                "Field must have an `Option<T>` or `Vec<T>` type.",
            ))?
        };

        let is_vec = if segment.ident == "Option" {
            false
        } else if segment.ident == "Vec" {
            true
        } else {
            Err(Error::new_spanned(
                &segment.ident,
                "Field must have an `Option<T>` or `Vec<T>` type.",
            ))?
        };

        let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
            Err(Error::new_spanned(
                &segment.arguments,
                "Field must have a generic parameter.",
            ))?
        };

        let Some(GenericArgument::Type(profile)) = arguments.args.first() else {
            Err(Error::new_spanned(
                &arguments.args,
                "Generic argument of the field must be a type implementing `Profile`.",
            ))?
        };

        Ok(Some(Self {
            name,
            profile: profile.clone(),
            is_vec,
        }))
    }
}
