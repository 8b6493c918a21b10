//! Derive macros for the canonical wire format used by `conclave-chain`.
//!
//! `#[derive(ConclaveSerialize)]` / `#[derive(ConclaveDeserialize)]` generate
//! field-by-field calls to `ConclaveSerialize::conclave_serialize` /
//! `ConclaveDeserialize::conclave_deserialize` in declaration order, which is
//! what makes struct field order double as wire order (see spec.md §4.6).

extern crate proc_macro;
use proc_macro::TokenStream;

mod deserialize;
mod serialize;

#[proc_macro_derive(ConclaveDeserialize)]
pub fn deserializable(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    deserialize::impl_deser_macro(&ast)
}

#[proc_macro_derive(ConclaveSerialize)]
pub fn serializable(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    serialize::impl_ser_macro(&ast)
}
