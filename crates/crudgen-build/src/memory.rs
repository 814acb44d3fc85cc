//! Memory-backend repository generator.
//!
//! Emitted repositories wrap the run-time in-memory table store, which
//! carries the full operation semantics (batched transactional create,
//! masked update, predicate-filtered read and delete). Generated code is
//! thin glue: the record struct, its field-level `Record` view, and a
//! repository type whose methods mirror the message's declared operations.

use crate::{
    idents::{ident, repo_ident, type_ident},
    plan::TablePlan,
    record,
};
use crudgen_schema::types::{Operation, ScalarType};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

#[must_use]
pub fn generate(plan: &TablePlan) -> TokenStream {
    let mut tokens = quote!();
    tokens.extend(record::record_struct(plan));
    tokens.extend(record::record_impl(plan));
    tokens.extend(repository(plan));

    tokens
}

fn repository(plan: &TablePlan) -> TokenStream {
    let repo = repo_ident(&plan.message_name, "Memory");
    let ty = type_ident(&plan.message_name);

    let table = plan.table.as_str();
    let fields = plan.columns.iter().map(|c| c.path.as_str());
    let key = plan.update.key.iter().map(|i| plan.columns[*i].path.as_str());

    let mut methods = quote!();

    if plan.operations.contains(&Operation::Create) {
        methods.extend(quote! {
            /// Insert a batch of records; all-or-nothing.
            pub fn create(
                &mut self,
                records: &[#ty],
            ) -> ::std::result::Result<::std::vec::Vec<#ty>, ::crudgen::core::store::StoreError> {
                self.table.create(records)
            }
        });
    }

    if plan.operations.contains(&Operation::Read) {
        methods.extend(quote! {
            /// Return every record matching the predicate; `None` returns all.
            pub fn read(
                &self,
                filter: ::std::option::Option<&::crudgen::core::expr::Expr>,
            ) -> ::std::result::Result<::std::vec::Vec<#ty>, ::crudgen::core::store::StoreError> {
                self.table.read(filter)
            }
        });
        methods.extend(lookups(plan));
    }

    if plan.operations.contains(&Operation::Update) {
        methods.extend(quote! {
            /// Update stored records keyed by their unique identifier.
            /// Unknown records are skipped, never inserted.
            pub fn update(
                &mut self,
                records: &[#ty],
            ) -> ::std::result::Result<::std::vec::Vec<#ty>, ::crudgen::core::store::StoreError> {
                self.table.update(records)
            }
        });
    }

    if plan.operations.contains(&Operation::Delete) {
        methods.extend(quote! {
            /// Delete every record matching the predicate; `None` clears all.
            pub fn delete(
                &mut self,
                filter: ::std::option::Option<&::crudgen::core::expr::Expr>,
            ) -> ::std::result::Result<usize, ::crudgen::core::store::StoreError> {
                self.table.delete(filter)
            }
        });
    }

    quote! {
        #[derive(Clone, Debug)]
        pub struct #repo {
            table: ::crudgen::core::store::MemTable<#ty>,
        }

        impl ::std::default::Default for #repo {
            fn default() -> Self {
                Self::new()
            }
        }

        impl #repo {
            #[must_use]
            pub fn new() -> Self {
                Self {
                    table: ::crudgen::core::store::MemTable::new(
                        ::crudgen::core::store::TableSpec::new(
                            #table,
                            [#(#fields),*],
                            [#(#key),*]
                        ),
                    ),
                }
            }

            #[must_use]
            pub fn len(&self) -> usize {
                self.table.len()
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.table.is_empty()
            }

            #methods
        }
    }
}

// One keyed lookup per single-field unique-identifier group.
fn lookups(plan: &TablePlan) -> TokenStream {
    let ty = type_ident(&plan.message_name);
    let mut tokens = quote!();

    for lookup in &plan.uid_lookups {
        let Some(scalar) = lookup.key_scalar else {
            continue;
        };

        let method = format_ident!("read_by_{}", ident(&lookup.group));
        let path = lookup.paths[0].as_str();
        let (param, to_value) = lookup_param(scalar);

        tokens.extend(quote! {
            /// Look up at most one record by this unique-identifier group.
            pub fn #method(
                &self,
                value: #param
            ) -> ::std::result::Result<::std::option::Option<#ty>, ::crudgen::core::store::StoreError> {
                let filter = ::crudgen::core::expr::Expr::field_eq(#path, #to_value);
                ::std::result::Result::Ok(self.table.read(::std::option::Option::Some(&filter))?.into_iter().next())
            }
        });
    }

    tokens
}

fn lookup_param(scalar: ScalarType) -> (TokenStream, TokenStream) {
    match scalar {
        ScalarType::Bool => (
            quote!(bool),
            quote!(::crudgen::core::value::Value::Bool(value)),
        ),
        ScalarType::Bytes => (
            quote!(::std::vec::Vec<u8>),
            quote!(::crudgen::core::value::Value::Bytes(value)),
        ),
        ScalarType::Double => (
            quote!(f64),
            quote!(::crudgen::core::value::Value::Float(value)),
        ),
        ScalarType::Float => (
            quote!(f32),
            quote!(::crudgen::core::value::Value::Float(f64::from(value))),
        ),
        ScalarType::Int32 => (
            quote!(i32),
            quote!(::crudgen::core::value::Value::Int(i64::from(value))),
        ),
        ScalarType::Int64 => (
            quote!(i64),
            quote!(::crudgen::core::value::Value::Int(value)),
        ),
        ScalarType::String => (
            quote!(&str),
            quote!(::crudgen::core::value::Value::Text(value.to_string())),
        ),
        ScalarType::Uint32 => (
            quote!(u32),
            quote!(::crudgen::core::value::Value::Uint(u64::from(value))),
        ),
        ScalarType::Uint64 => (
            quote!(u64),
            quote!(::crudgen::core::value::Value::Uint(value)),
        ),
    }
}
