//! Record-struct emission shared by the repository generators.
//!
//! Every backend artifact is self-contained: it carries the flattened
//! record struct for its message plus the field-level `Record` view the
//! run-time store drives. Struct fields mirror plan columns one to one,
//! so the match arms below key on column paths, the same identifiers the
//! table spec and field masks use.

use crate::{
    idents::{ident, rust_type, type_ident},
    plan::{Column, ColumnType, TablePlan},
};
use proc_macro2::TokenStream;
use quote::quote;

pub(crate) fn field_ident(column: &Column) -> proc_macro2::Ident {
    ident(&column.name)
}

pub(crate) fn field_type(column: &Column) -> TokenStream {
    let base = match &column.ty {
        ColumnType::Scalar(scalar) => rust_type(*scalar),
        ColumnType::Enum { .. } => quote!(i32),
        ColumnType::Timestamp => quote!(i64),
    };

    if column.nullable {
        quote!(::std::option::Option<#base>)
    } else {
        base
    }
}

pub(crate) fn record_struct(plan: &TablePlan) -> TokenStream {
    let ty = type_ident(&plan.message_name);

    let mut fields = quote!();
    for column in &plan.columns {
        let name = field_ident(column);
        let field_ty = field_type(column);
        fields.extend(quote! {
            pub #name: #field_ty,
        });
    }

    if let Some(mask) = &plan.mask_field {
        let name = ident(mask);
        fields.extend(quote! {
            pub #name: ::std::option::Option<::crudgen::core::mask::FieldMask>,
        });
    }

    quote! {
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct #ty {
            #fields
        }
    }
}

pub(crate) fn record_impl(plan: &TablePlan) -> TokenStream {
    let ty = type_ident(&plan.message_name);

    let mut value_arms = quote!();
    let mut copy_arms = quote!();
    for column in &plan.columns {
        let path = column.path.as_str();
        let name = field_ident(column);
        let expr = value_expr(column);

        value_arms.extend(quote! {
            #path => #expr,
        });
        copy_arms.extend(quote! {
            #path => {
                self.#name = from.#name.clone();
                true
            }
        });
    }

    let mask_body = plan.mask_field.as_ref().map_or_else(
        || quote!(::std::option::Option::None),
        |mask| {
            let name = ident(mask);
            quote!(self.#name.as_ref())
        },
    );

    quote! {
        impl ::crudgen::core::store::Record for #ty {
            fn value_of(&self, field: &str) -> ::std::option::Option<::crudgen::core::value::Value> {
                match field {
                    #value_arms
                    _ => ::std::option::Option::None,
                }
            }

            fn copy_field(&mut self, from: &Self, field: &str) -> bool {
                match field {
                    #copy_arms
                    _ => false,
                }
            }

            fn mask(&self) -> ::std::option::Option<&::crudgen::core::mask::FieldMask> {
                #mask_body
            }
        }
    }
}

// `Option`-typed fields map through a reference; owned fields convert in
// place. Unsigned and narrow types widen losslessly.
fn value_expr(column: &Column) -> TokenStream {
    use crudgen_schema::types::ScalarType;

    let name = field_ident(column);
    let (plain, byref) = match &column.ty {
        ColumnType::Timestamp => (
            quote!(::crudgen::core::value::Value::Timestamp(self.#name)),
            quote!(::crudgen::core::value::Value::Timestamp(*v)),
        ),
        ColumnType::Enum { .. } => (
            quote!(::crudgen::core::value::Value::Int(i64::from(self.#name))),
            quote!(::crudgen::core::value::Value::Int(i64::from(*v))),
        ),
        ColumnType::Scalar(scalar) => match scalar {
            ScalarType::Bool => (
                quote!(::crudgen::core::value::Value::Bool(self.#name)),
                quote!(::crudgen::core::value::Value::Bool(*v)),
            ),
            ScalarType::Bytes => (
                quote!(::crudgen::core::value::Value::Bytes(self.#name.clone())),
                quote!(::crudgen::core::value::Value::Bytes(v.clone())),
            ),
            ScalarType::Double => (
                quote!(::crudgen::core::value::Value::Float(self.#name)),
                quote!(::crudgen::core::value::Value::Float(*v)),
            ),
            ScalarType::Float => (
                quote!(::crudgen::core::value::Value::Float(f64::from(self.#name))),
                quote!(::crudgen::core::value::Value::Float(f64::from(*v))),
            ),
            ScalarType::Int32 => (
                quote!(::crudgen::core::value::Value::Int(i64::from(self.#name))),
                quote!(::crudgen::core::value::Value::Int(i64::from(*v))),
            ),
            ScalarType::Int64 => (
                quote!(::crudgen::core::value::Value::Int(self.#name)),
                quote!(::crudgen::core::value::Value::Int(*v)),
            ),
            ScalarType::String => (
                quote!(::crudgen::core::value::Value::Text(self.#name.clone())),
                quote!(::crudgen::core::value::Value::Text(v.clone())),
            ),
            ScalarType::Uint32 => (
                quote!(::crudgen::core::value::Value::Uint(u64::from(self.#name))),
                quote!(::crudgen::core::value::Value::Uint(u64::from(*v))),
            ),
            ScalarType::Uint64 => (
                quote!(::crudgen::core::value::Value::Uint(self.#name)),
                quote!(::crudgen::core::value::Value::Uint(*v)),
            ),
        },
    };

    if column.nullable {
        quote!(self.#name.as_ref().map(|v| #byref))
    } else {
        quote!(::std::option::Option::Some(#plain))
    }
}
