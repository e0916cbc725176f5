use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod from_messages;
mod profile;

#[proc_macro_derive(Profile, attributes(profile, field, developer))]
pub fn derive_profile(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match profile::expand_profile(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}

#[proc_macro_derive(FromMessages, attributes(message))]
pub fn derive_from_messages(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match from_messages::expand_from_messages(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}
