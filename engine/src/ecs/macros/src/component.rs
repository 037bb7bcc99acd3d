use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

pub fn derive_component(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);

    // Get the struct name we are annotating
    let struct_name = &ast.ident;

    // Use ::rusty_engine::ecs::component::Component which works both inside and
    // outside the crate (see `extern crate self as rusty_engine;` in lib.rs).
    TokenStream::from(quote! {
        impl ::rusty_engine::ecs::component::Component for #struct_name {
        }
    })
}
