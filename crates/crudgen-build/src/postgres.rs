//! Postgres-backend repository generator.
//!
//! Same repository contract as the sqlite generator over a
//! `postgres::Client`. Postgres has no unsigned integer types, so
//! unsigned columns bind and decode through their signed storage width
//! (`Uint32` as INTEGER, `Uint64` as BIGINT).

use crate::{
    idents::{ident, repo_ident, type_ident},
    plan::{Column, ColumnType, TablePlan},
    record, sql,
};
use crudgen_core::lower::Dialect;
use crudgen_schema::types::{Operation, ScalarType};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// DDL artifact content for one message.
#[must_use]
pub fn ddl(plan: &TablePlan) -> String {
    sql::ddl(plan, Dialect::Postgres)
}

/// Repository source for one message.
#[must_use]
pub fn generate(plan: &TablePlan) -> TokenStream {
    let mut tokens = quote!();
    tokens.extend(record::record_struct(plan));
    tokens.extend(record::record_impl(plan));
    tokens.extend(error_enum(plan));
    tokens.extend(repository(plan));

    tokens
}

fn error_ident(plan: &TablePlan) -> proc_macro2::Ident {
    format_ident!("{}PostgresError", type_ident(&plan.message_name))
}

fn error_enum(plan: &TablePlan) -> TokenStream {
    let err = error_ident(plan);

    quote! {
        #[derive(Debug)]
        pub enum #err {
            Sql(::postgres::Error),
            Predicate(::crudgen::core::lower::LowerError),
        }

        impl ::std::fmt::Display for #err {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    Self::Sql(e) => ::std::write!(f, "{e}"),
                    Self::Predicate(e) => ::std::write!(f, "{e}"),
                }
            }
        }

        impl ::std::error::Error for #err {}

        impl ::std::convert::From<::postgres::Error> for #err {
            fn from(e: ::postgres::Error) -> Self {
                Self::Sql(e)
            }
        }

        impl ::std::convert::From<::crudgen::core::lower::LowerError> for #err {
            fn from(e: ::crudgen::core::lower::LowerError) -> Self {
                Self::Predicate(e)
            }
        }
    }
}

fn repository(plan: &TablePlan) -> TokenStream {
    let repo = repo_ident(&plan.message_name, "Postgres");
    let err = error_ident(plan);

    // statement consts exist only for declared operations, so a plan
    // whose shape cannot express an operation never bakes its text
    let mut consts = quote!();
    if plan.operations.contains(&Operation::Create) {
        let insert_sql = sql::insert_statement(plan, Dialect::Postgres);
        consts.extend(quote!(const INSERT: &'static str = #insert_sql;));
    }
    if plan.operations.contains(&Operation::Read) {
        let select_sql = sql::select_statement(plan, Dialect::Postgres);
        consts.extend(quote!(const SELECT: &'static str = #select_sql;));
    }
    if plan.operations.contains(&Operation::Update) {
        let update_sql = sql::update_statement(plan, Dialect::Postgres);
        consts.extend(quote!(const UPDATE: &'static str = #update_sql;));
    }
    if plan.operations.contains(&Operation::Delete) {
        let delete_sql = sql::delete_statement(plan, Dialect::Postgres);
        consts.extend(quote!(const DELETE: &'static str = #delete_sql;));
    }

    let column_map_inserts = plan.columns.iter().map(|c| {
        let path = c.path.as_str();
        let name = c.name.as_str();
        quote!(map.insert(#path, #name);)
    });
    let table = plan.table.as_str();

    let mut methods = quote!();
    if plan.operations.contains(&Operation::Create) {
        methods.extend(create_method(plan, &err));
    }
    if plan.operations.contains(&Operation::Read) {
        methods.extend(read_method(plan, &err));
        methods.extend(lookups(plan, &err));
    }
    if plan.operations.contains(&Operation::Update) {
        methods.extend(update_method(plan, &err));
    }
    if plan.operations.contains(&Operation::Delete) {
        methods.extend(delete_method(&err));
    }

    quote! {
        pub struct #repo {
            client: ::postgres::Client,
        }

        impl #repo {
            #consts

            #[must_use]
            pub const fn new(client: ::postgres::Client) -> Self {
                Self { client }
            }

            fn column_map() -> ::crudgen::core::lower::ColumnMap {
                let mut map = ::crudgen::core::lower::ColumnMap::new(#table);
                #(#column_map_inserts)*
                map
            }

            fn bind_value(
                value: ::crudgen::core::value::Value,
            ) -> ::std::boxed::Box<dyn ::postgres::types::ToSql + ::std::marker::Sync> {
                use ::crudgen::core::value::Value;
                match value {
                    Value::Bool(v) => ::std::boxed::Box::new(v),
                    Value::Bytes(v) => ::std::boxed::Box::new(v),
                    Value::Float(v) => ::std::boxed::Box::new(v),
                    Value::Int(v) => ::std::boxed::Box::new(v),
                    Value::Text(v) => ::std::boxed::Box::new(v),
                    Value::Timestamp(v) => ::std::boxed::Box::new(v),
                    Value::Uint(v) => ::std::boxed::Box::new(v as i64),
                }
            }

            #methods
        }
    }
}

fn create_method(plan: &TablePlan, err: &proc_macro2::Ident) -> TokenStream {
    let ty = type_ident(&plan.message_name);

    let insert_params = plan
        .insert
        .columns
        .iter()
        .map(|i| bind_expr(&plan.columns[*i]));
    let masked_pushes = plan.insert.columns.iter().map(|i| {
        let column = &plan.columns[*i];
        let path = column.path.as_str();
        let bind = owned_bind_expr(column);
        let quoted = format!("\"{}\"", column.name);
        quote! {
            if mask.covers(#path) {
                columns.push(#quoted);
                params.push(#bind);
            }
        }
    });
    let insert_prefix = format!("INSERT INTO \"{}\" (", plan.table);

    quote! {
        /// Insert a batch of records in one transaction; all-or-nothing.
        /// Masked records insert only their mask-selected columns.
        pub fn create(&mut self, records: &[#ty]) -> ::std::result::Result<(), #err> {
            let mut tx = self.client.transaction()?;
            for record in records {
                match ::crudgen::core::store::Record::mask(record) {
                    ::std::option::Option::None => {
                        tx.execute(Self::INSERT, &[#(#insert_params),*])?;
                    }
                    ::std::option::Option::Some(mask) => {
                        let mut columns: ::std::vec::Vec<&str> = ::std::vec::Vec::new();
                        let mut params: ::std::vec::Vec<
                            ::std::boxed::Box<dyn ::postgres::types::ToSql + ::std::marker::Sync>,
                        > = ::std::vec::Vec::new();
                        #(#masked_pushes)*
                        if columns.is_empty() {
                            continue;
                        }
                        let placeholders = (1..=params.len())
                            .map(|n| ::std::format!("${n}"))
                            .collect::<::std::vec::Vec<_>>()
                            .join(", ");
                        let sql = ::std::format!(
                            "{}{}) VALUES ({})",
                            #insert_prefix,
                            columns.join(", "),
                            placeholders
                        );
                        let refs: ::std::vec::Vec<
                            &(dyn ::postgres::types::ToSql + ::std::marker::Sync),
                        > = params.iter().map(|p| p.as_ref()).collect();
                        tx.execute(&sql, refs.as_slice())?;
                    }
                }
            }
            tx.commit()?;

            ::std::result::Result::Ok(())
        }
    }
}

fn read_method(plan: &TablePlan, err: &proc_macro2::Ident) -> TokenStream {
    let ty = type_ident(&plan.message_name);
    let row = row_expr(plan);

    quote! {
        /// Return every record matching the predicate; `None` returns all.
        pub fn read(
            &mut self,
            filter: ::std::option::Option<&::crudgen::core::expr::Expr>,
        ) -> ::std::result::Result<::std::vec::Vec<#ty>, #err> {
            let mut sql = Self::SELECT.to_string();
            let mut binds = ::std::vec::Vec::new();
            if let ::std::option::Option::Some(expr) = filter {
                let predicate = ::crudgen::core::lower::lower(
                    expr,
                    &Self::column_map(),
                    ::crudgen::core::lower::Dialect::Postgres,
                )?;
                sql.push_str(" WHERE ");
                sql.push_str(&predicate.clause);
                binds = predicate.binds;
            }

            let params: ::std::vec::Vec<
                ::std::boxed::Box<dyn ::postgres::types::ToSql + ::std::marker::Sync>,
            > = binds.into_iter().map(Self::bind_value).collect();
            let refs: ::std::vec::Vec<&(dyn ::postgres::types::ToSql + ::std::marker::Sync)> =
                params.iter().map(|p| p.as_ref()).collect();

            let rows = self.client.query(&sql, refs.as_slice())?;
            let mut out = ::std::vec::Vec::new();
            for row in &rows {
                out.push(#row);
            }

            ::std::result::Result::Ok(out)
        }
    }
}

fn update_method(plan: &TablePlan, err: &proc_macro2::Ident) -> TokenStream {
    let ty = type_ident(&plan.message_name);

    let update_params = plan
        .update
        .set
        .iter()
        .chain(plan.update.key.iter())
        .map(|i| bind_expr(&plan.columns[*i]));
    let masked_sets = plan.update.set.iter().map(|i| {
        let column = &plan.columns[*i];
        let path = column.path.as_str();
        let bind = owned_bind_expr(column);
        let quoted = format!("\"{}\"", column.name);
        quote! {
            if mask.covers(#path) {
                params.push(#bind);
                sets.push(::std::format!("{} = ${}", #quoted, params.len()));
            }
        }
    });
    let key_conditions = plan.update.key.iter().map(|i| {
        let column = &plan.columns[*i];
        let bind = owned_bind_expr(column);
        let quoted = format!("\"{}\"", column.name);
        quote! {
            params.push(#bind);
            conditions.push(::std::format!("{} = ${}", #quoted, params.len()));
        }
    });
    let update_prefix = format!("UPDATE \"{}\" SET ", plan.table);

    quote! {
        /// Update stored records keyed by the primary key, in one
        /// transaction. A record whose mask selects no updatable column is
        /// a per-record no-op.
        pub fn update(&mut self, records: &[#ty]) -> ::std::result::Result<u64, #err> {
            let mut tx = self.client.transaction()?;
            let mut changed = 0;
            for record in records {
                match ::crudgen::core::store::Record::mask(record) {
                    ::std::option::Option::None => {
                        changed += tx.execute(Self::UPDATE, &[#(#update_params),*])?;
                    }
                    ::std::option::Option::Some(mask) => {
                        let mut sets: ::std::vec::Vec<::std::string::String> =
                            ::std::vec::Vec::new();
                        let mut params: ::std::vec::Vec<
                            ::std::boxed::Box<dyn ::postgres::types::ToSql + ::std::marker::Sync>,
                        > = ::std::vec::Vec::new();
                        #(#masked_sets)*
                        if sets.is_empty() {
                            continue;
                        }
                        let mut conditions: ::std::vec::Vec<::std::string::String> =
                            ::std::vec::Vec::new();
                        #(#key_conditions)*
                        let sql = ::std::format!(
                            "{}{} WHERE {}",
                            #update_prefix,
                            sets.join(", "),
                            conditions.join(" AND ")
                        );
                        let refs: ::std::vec::Vec<
                            &(dyn ::postgres::types::ToSql + ::std::marker::Sync),
                        > = params.iter().map(|p| p.as_ref()).collect();
                        changed += tx.execute(&sql, refs.as_slice())?;
                    }
                }
            }
            tx.commit()?;

            ::std::result::Result::Ok(changed)
        }
    }
}

fn delete_method(err: &proc_macro2::Ident) -> TokenStream {
    quote! {
        /// Delete every record matching the predicate; `None` deletes all.
        /// Returns the number of deleted rows.
        pub fn delete(
            &mut self,
            filter: ::std::option::Option<&::crudgen::core::expr::Expr>,
        ) -> ::std::result::Result<u64, #err> {
            let mut sql = Self::DELETE.to_string();
            let mut binds = ::std::vec::Vec::new();
            if let ::std::option::Option::Some(expr) = filter {
                let predicate = ::crudgen::core::lower::lower(
                    expr,
                    &Self::column_map(),
                    ::crudgen::core::lower::Dialect::Postgres,
                )?;
                sql.push_str(" WHERE ");
                sql.push_str(&predicate.clause);
                binds = predicate.binds;
            }

            let params: ::std::vec::Vec<
                ::std::boxed::Box<dyn ::postgres::types::ToSql + ::std::marker::Sync>,
            > = binds.into_iter().map(Self::bind_value).collect();
            let refs: ::std::vec::Vec<&(dyn ::postgres::types::ToSql + ::std::marker::Sync)> =
                params.iter().map(|p| p.as_ref()).collect();

            let count = self.client.execute(&sql, refs.as_slice())?;

            ::std::result::Result::Ok(count)
        }
    }
}

fn lookups(plan: &TablePlan, err: &proc_macro2::Ident) -> TokenStream {
    let ty = type_ident(&plan.message_name);
    let row = row_expr(plan);
    let mut tokens = quote!();

    for lookup in &plan.uid_lookups {
        let Some(scalar) = lookup.key_scalar else {
            continue;
        };

        let method = format_ident!("read_by_{}", ident(&lookup.group));
        let statement = sql::select_by_statement(plan, lookup, Dialect::Postgres);
        let (param, bind) = lookup_param(scalar);

        tokens.extend(quote! {
            /// Look up at most one record by this unique-identifier group.
            pub fn #method(
                &mut self,
                value: #param
            ) -> ::std::result::Result<::std::option::Option<#ty>, #err> {
                let rows = self.client.query(#statement, &[#bind])?;

                match rows.first() {
                    ::std::option::Option::None => ::std::result::Result::Ok(::std::option::Option::None),
                    ::std::option::Option::Some(row) => ::std::result::Result::Ok(::std::option::Option::Some(#row)),
                }
            }
        });
    }

    tokens
}

// Parameter type and bind expression for a keyed lookup; unsigned keys
// bind through their signed storage width.
fn lookup_param(scalar: ScalarType) -> (TokenStream, TokenStream) {
    match scalar {
        ScalarType::Bool => (quote!(bool), quote!(&value)),
        ScalarType::Bytes => (quote!(&[u8]), quote!(&value)),
        ScalarType::Double => (quote!(f64), quote!(&value)),
        ScalarType::Float => (quote!(f32), quote!(&value)),
        ScalarType::Int32 => (quote!(i32), quote!(&value)),
        ScalarType::Int64 => (quote!(i64), quote!(&value)),
        ScalarType::String => (quote!(&str), quote!(&value)),
        ScalarType::Uint32 => (quote!(u32), quote!(&(value as i32))),
        ScalarType::Uint64 => (quote!(u64), quote!(&(value as i64))),
    }
}

// Bind expression for one record field in a statement parameter list.
fn bind_expr(column: &Column) -> TokenStream {
    let name = record::field_ident(column);

    match signed_width(column) {
        None => quote!(&record.#name),
        Some(signed) => {
            if column.nullable {
                quote!(&record.#name.map(|v| v as #signed))
            } else {
                quote!(&(record.#name as #signed))
            }
        }
    }
}

// Owned bind value for the dynamic masked arms. Those parameter vectors
// outlive the statement that fills them, so a cast cannot be pushed by
// reference; every value is boxed instead.
fn owned_bind_expr(column: &Column) -> TokenStream {
    let name = record::field_ident(column);

    match signed_width(column) {
        Some(signed) if column.nullable => {
            quote!(::std::boxed::Box::new(record.#name.map(|v| v as #signed)))
        }
        Some(signed) => quote!(::std::boxed::Box::new(record.#name as #signed)),
        None => quote!(::std::boxed::Box::new(record.#name.clone())),
    }
}

// Decode expression for one row column, mirroring `bind_expr`.
fn get_expr(column: &Column, index: usize) -> TokenStream {
    match signed_width(column) {
        None => quote!(row.try_get(#index)?),
        Some(signed) => {
            let unsigned = match &column.ty {
                ColumnType::Scalar(ScalarType::Uint32) => quote!(u32),
                _ => quote!(u64),
            };
            if column.nullable {
                let nullable = quote!(::std::option::Option<#signed>);
                quote!(row.try_get::<_, #nullable>(#index)?.map(|v| v as #unsigned))
            } else {
                quote!(row.try_get::<_, #signed>(#index)? as #unsigned)
            }
        }
    }
}

// The signed type an unsigned column stores as, if any.
fn signed_width(column: &Column) -> Option<TokenStream> {
    match &column.ty {
        ColumnType::Scalar(ScalarType::Uint32) => Some(quote!(i32)),
        ColumnType::Scalar(ScalarType::Uint64) => Some(quote!(i64)),
        _ => None,
    }
}

// Row-to-record mapping in column order; a mask field decodes as absent.
fn row_expr(plan: &TablePlan) -> TokenStream {
    let ty = type_ident(&plan.message_name);

    let mut fields = quote!();
    for (i, column) in plan.columns.iter().enumerate() {
        let name = record::field_ident(column);
        let get = get_expr(column, i);
        fields.extend(quote! {
            #name: #get,
        });
    }

    if let Some(mask) = &plan.mask_field {
        let name = ident(mask);
        fields.extend(quote! {
            #name: ::std::option::Option::None,
        });
    }

    quote! {
        #ty {
            #fields
        }
    }
}

#[cfg(test)]
mod tests;
