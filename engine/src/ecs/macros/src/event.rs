use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

pub fn derive_event(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);

    // Get the struct name we are annotating
    let struct_name = &ast.ident;

    // `Event` requires `Clone`; the annotating type must derive or implement that
    // itself (see the `unique`/`component` derives for the same convention).
    TokenStream::from(quote! {
        impl ::rusty_engine::ecs::event::Event for #struct_name {
        }
    })
}
