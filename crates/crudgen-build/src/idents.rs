//! Identifier and host-type helpers shared by the backend generators.

use convert_case::{Case, Casing};
use crudgen_schema::types::ScalarType;
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

/// snake_case table/column identifier for a schema name.
pub fn snake(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// UpperCamel host-language type identifier for a message name.
pub fn type_ident(name: &str) -> Ident {
    Ident::new(&name.to_case(Case::UpperCamel), Span::call_site())
}

/// Repository type identifier, e.g. `UserMemoryRepository`.
pub fn repo_ident(message: &str, backend: &str) -> Ident {
    let name = format!("{}{backend}Repository", message.to_case(Case::UpperCamel));
    Ident::new(&name, Span::call_site())
}

pub fn ident(name: &str) -> Ident {
    Ident::new(&name.to_case(Case::Snake), Span::call_site())
}

/// Host-language type a scalar maps to in generated record structs.
pub fn rust_type(ty: ScalarType) -> TokenStream {
    match ty {
        ScalarType::Bool => quote!(bool),
        ScalarType::Bytes => quote!(::std::vec::Vec<u8>),
        ScalarType::Double => quote!(f64),
        ScalarType::Float => quote!(f32),
        ScalarType::Int32 => quote!(i32),
        ScalarType::Int64 => quote!(i64),
        ScalarType::String => quote!(::std::string::String),
        ScalarType::Uint32 => quote!(u32),
        ScalarType::Uint64 => quote!(u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_cased_for_their_role() {
        assert_eq!(snake("UserProfile"), "user_profile");
        assert_eq!(type_ident("user_profile").to_string(), "UserProfile");
        assert_eq!(
            repo_ident("User", "Memory").to_string(),
            "UserMemoryRepository"
        );
    }
}
