use std::collections::HashSet;

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Error, Expr, Field, Fields, Ident, LitInt, LitStr, Result, Token,
    parse::{Parse, ParseStream},
    parse_quote,
    spanned::Spanned,
};

pub(crate) fn expand_profile(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new(input.span(), "`Profile` may only be derived on structs."))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new(
            input.span(),
            "`Profile` may only be derived on structs with named fields.",
        ))?
    };

    let Some(attr) = input.attrs.iter().find(|a| a.path().is_ident("profile")) else {
        Err(Error::new(
            input.span(),
            "`Profile` requires a `#[profile(number, \"name\")]` attribute.",
        ))?
    };
    let ProfileAttribute { number, name } = attr.meta.require_list()?.parse_args()?;

    let fields = fields
        .named
        .iter()
        .map(FieldMetadata::parse)
        .map(Result::transpose)
        .flatten() // Skip fields without an attribute.
        .collect::<Result<Vec<_>>>()?;

    let mut numbers = HashSet::new();
    let mut has_time = false;
    let mut has_developer = false;

    for field in &fields {
        match &field.kind {
            FieldKind::Number { number, .. } => {
                if !numbers.insert(number.base10_parse::<u8>()?) {
                    Err(Error::new(number.span(), "Field numbers must be unique."))?
                }
            }
            FieldKind::Time => {
                if std::mem::replace(&mut has_time, true) {
                    Err(Error::new_spanned(&field.name, "Only one field may hold the time offset."))?
                }
            }
            FieldKind::Developer => {
                if std::mem::replace(&mut has_developer, true) {
                    Err(Error::new_spanned(&field.name, "Only one field may hold developer values."))?
                }
            }
        }
    }

    let table = fields.iter().filter_map(|field| {
        let FieldKind::Number {
            number,
            base_type,
            resolution,
        } = &field.kind
        else {
            return None;
        };

        let name = field.name.to_string();
        let resolution = match resolution {
            Some(resolution) => quote! { Some(#resolution) },
            None => quote! { None },
        };

        Some(quote! {
            ::cassette::avec::FieldProfile {
                number: #number,
                name: #name,
                base_type: ::cassette::sans::data::BaseType::#base_type,
                resolution: #resolution,
            }
        })
    });

    let reads = fields.iter().map(|field| {
        let name = &field.name;

        match &field.kind {
            FieldKind::Number {
                number,
                resolution: Some(resolution),
                ..
            } => quote! { profile.#name = message.get_scaled(#number, #resolution); },
            FieldKind::Number { number, .. } => quote! { profile.#name = message.get(#number); },
            FieldKind::Time => quote! { profile.#name = message.time_offset(); },
            FieldKind::Developer => quote! { profile.#name = message.developer().to_vec(); },
        }
    });

    let writes = fields.iter().map(|field| {
        let name = &field.name;

        match &field.kind {
            FieldKind::Number {
                number,
                base_type,
                resolution: Some(resolution),
            } => quote! {
                message.set_scaled(
                    #number,
                    ::cassette::sans::data::BaseType::#base_type,
                    #resolution,
                    self.#name,
                );
            },
            FieldKind::Number {
                number, base_type, ..
            } => quote! {
                message.set(
                    #number,
                    ::cassette::sans::data::BaseType::#base_type,
                    ::core::clone::Clone::clone(&self.#name),
                );
            },
            FieldKind::Time => quote! { message.set_time_offset(self.#name); },
            FieldKind::Developer => quote! {
                message.set_developer(::core::clone::Clone::clone(&self.#name));
            },
        }
    });

    let ident = &input.ident;

    let expanded = quote! {
        impl ::cassette::avec::Profile for #ident {
            const NUMBER: u16 = #number;
            const NAME: &'static str = #name;
            const FIELDS: &'static [::cassette::avec::FieldProfile] = &[#(#table),*];

            fn from_message(message: &::cassette::message::Message) -> Self {
                let mut profile = <Self as ::core::default::Default>::default();
                #(#reads)*
                profile
            }

            fn to_message(&self) -> ::cassette::message::Message {
                let mut message = ::cassette::message::Message::new(#number);
                #(#writes)*
                message
            }
        }
    };

    Ok(expanded.into())
}

#[derive(Debug)]
struct ProfileAttribute {
    number: LitInt,
    name: LitStr,
}

impl Parse for ProfileAttribute {
    fn parse(input: ParseStream) -> Result<Self> {
        let number = input.parse::<LitInt>()?;
        input.parse::<Token![,]>()?;
        let name = input.parse::<LitStr>()?;
        Ok(Self { number, name })
    }
}

#[derive(Debug)]
struct FieldMetadata {
    name: Ident,
    kind: FieldKind,
}

#[derive(Debug)]
enum FieldKind {
    Number {
        number: LitInt,
        base_type: Ident,
        resolution: Option<Expr>,
    },
    Time,
    Developer,
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Option<Self>> {
        let Some(name) = field.ident.clone() else {
            Err(Error::new_spanned(field, "Field must be named."))?
        };

        let find = |ident: &str| -> Option<&Attribute> {
            field.attrs.iter().find(|a| a.path().is_ident(ident))
        };

        let kind = if let Some(attr) = find("field") {
            attr.meta.require_list()?.parse_args::<FieldAttribute>()?.0
        } else if let Some(attr) = find("developer") {
            attr.meta.require_path_only()?;
            FieldKind::Developer
        } else {
            return Ok(None);
        };

        Ok(Some(Self { name, kind }))
    }
}

#[derive(Debug)]
struct FieldAttribute(FieldKind);

impl Parse for FieldAttribute {
    fn parse(input: ParseStream) -> Result<Self> {
        if let Ok(ident) = input.fork().parse::<Ident>() {
            if ident != "time" {
                Err(Error::new_spanned(
                    ident,
                    "Field identifier must be an integer literal or `time`.",
                ))?
            }
            input.parse::<Ident>()?;
            return Ok(Self(FieldKind::Time));
        }

        let number = input.parse::<LitInt>()?;
        input.parse::<Token![,]>()?;
        let base_type = input.parse::<Ident>()?;

        let mut scale: Option<Expr> = None;
        let mut offset: Option<Expr> = None;

        while !input.is_empty() {
            input.parse::<Token![,]>()?;
            let key = input.parse::<Ident>()?;
            input.parse::<Token![=]>()?;
            let value = input.parse::<Expr>()?;

            let slot = match key.to_string().as_str() {
                "scale" => &mut scale,
                "offset" => &mut offset,
                _ => Err(Error::new_spanned(&key, "Expected `scale` or `offset`."))?,
            };

            if slot.replace(value).is_some() {
                Err(Error::new_spanned(&key, "Argument given more than once."))?
            }
        }

        let resolution = (scale.is_some() || offset.is_some()).then(|| {
            let scale = scale.map_or_else(|| quote! { 1.0 }, |s| quote! { #s as f64 });
            let offset = offset.map_or_else(|| quote! { 0.0 }, |o| quote! { #o as f64 });
            parse_quote! { ::cassette::sans::data::Resolution::new(#scale, #offset) }
        });

        Ok(Self(FieldKind::Number {
            number,
            base_type,
            resolution,
        }))
    }
}
