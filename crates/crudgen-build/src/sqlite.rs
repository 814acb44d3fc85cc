//! Sqlite-backend repository generator.
//!
//! Emits a repository over a `rusqlite::Connection` plus the DDL artifact
//! content. Statements whose shape is fixed at generation time become
//! consts; masked create/update build their statements at run time from
//! the record's mask, inside the same transaction as the rest of the
//! batch.

use crate::{
    idents::{ident, repo_ident, type_ident},
    plan::TablePlan,
    record, sql,
};
use crudgen_core::lower::Dialect;
use crudgen_schema::types::{Operation, ScalarType};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// DDL artifact content for one message.
#[must_use]
pub fn ddl(plan: &TablePlan) -> String {
    sql::ddl(plan, Dialect::Sqlite)
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
    format_ident!("{}SqliteError", type_ident(&plan.message_name))
}

// Typed error the caller can split into constraint violations (Sql) and
// predicate-lowering mistakes.
fn error_enum(plan: &TablePlan) -> TokenStream {
    let err = error_ident(plan);

    quote! {
        #[derive(Debug)]
        pub enum #err {
            Sql(::rusqlite::Error),
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

        impl ::std::convert::From<::rusqlite::Error> for #err {
            fn from(e: ::rusqlite::Error) -> Self {
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
    let repo = repo_ident(&plan.message_name, "Sqlite");
    let err = error_ident(plan);

    // statement consts exist only for declared operations, so a plan
    // whose shape cannot express an operation never bakes its text
    let mut consts = quote!();
    if plan.operations.contains(&Operation::Create) {
        let insert_sql = sql::insert_statement(plan, Dialect::Sqlite);
        consts.extend(quote!(const INSERT: &'static str = #insert_sql;));
    }
    if plan.operations.contains(&Operation::Read) {
        let select_sql = sql::select_statement(plan, Dialect::Sqlite);
        consts.extend(quote!(const SELECT: &'static str = #select_sql;));
    }
    if plan.operations.contains(&Operation::Update) {
        let update_sql = sql::update_statement(plan, Dialect::Sqlite);
        consts.extend(quote!(const UPDATE: &'static str = #update_sql;));
    }
    if plan.operations.contains(&Operation::Delete) {
        let delete_sql = sql::delete_statement(plan, Dialect::Sqlite);
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
            conn: ::rusqlite::Connection,
        }

        impl #repo {
            #consts

            #[must_use]
            pub const fn new(conn: ::rusqlite::Connection) -> Self {
                Self { conn }
            }

            fn column_map() -> ::crudgen::core::lower::ColumnMap {
                let mut map = ::crudgen::core::lower::ColumnMap::new(#table);
                #(#column_map_inserts)*
                map
            }

            fn bind_value(
                value: ::crudgen::core::value::Value,
            ) -> ::std::boxed::Box<dyn ::rusqlite::types::ToSql> {
                use ::crudgen::core::value::Value;
                match value {
                    Value::Bool(v) => ::std::boxed::Box::new(v),
                    Value::Bytes(v) => ::std::boxed::Box::new(v),
                    Value::Float(v) => ::std::boxed::Box::new(v),
                    Value::Int(v) => ::std::boxed::Box::new(v),
                    Value::Text(v) => ::std::boxed::Box::new(v),
                    Value::Timestamp(v) => ::std::boxed::Box::new(v),
                    Value::Uint(v) => ::std::boxed::Box::new(v),
                }
            }

            #methods
        }
    }
}

fn create_method(plan: &TablePlan, err: &proc_macro2::Ident) -> TokenStream {
    let ty = type_ident(&plan.message_name);
    let insert_params = plan.insert.columns.iter().map(|i| {
        let name = record::field_ident(&plan.columns[*i]);
        quote!(record.#name)
    });
    let masked_pushes = plan.insert.columns.iter().map(|i| {
        let column = &plan.columns[*i];
        let path = column.path.as_str();
        let name = record::field_ident(column);
        let quoted = format!("\"{}\"", column.name);
        quote! {
            if mask.covers(#path) {
                columns.push(#quoted);
                params.push(&record.#name);
            }
        }
    });
    let body = masked_body(quote!(#(#masked_pushes)*), &plan.table);

    quote! {
        /// Insert a batch of records in one transaction; all-or-nothing.
        /// Masked records insert only their mask-selected columns.
        pub fn create(&mut self, records: &[#ty]) -> ::std::result::Result<(), #err> {
            let tx = self.conn.transaction()?;
            {
                let mut stmt = tx.prepare(Self::INSERT)?;
                for record in records {
                    match ::crudgen::core::store::Record::mask(record) {
                        ::std::option::Option::None => {
                            stmt.execute(::rusqlite::params![#(#insert_params),*])?;
                        }
                        ::std::option::Option::Some(mask) => {
                            #body
                        }
                    }
                }
            }
            tx.commit()?;

            ::std::result::Result::Ok(())
        }
    }
}

// Shared shape of the dynamic masked-insert arm.
fn masked_body(pushes: TokenStream, table: &str) -> TokenStream {
    let insert_prefix = format!("INSERT INTO \"{table}\" (");

    quote! {
        let mut columns: ::std::vec::Vec<&str> = ::std::vec::Vec::new();
        let mut params: ::std::vec::Vec<&dyn ::rusqlite::types::ToSql> = ::std::vec::Vec::new();
        #pushes
        if columns.is_empty() {
            continue;
        }
        let placeholders = (1..=params.len())
            .map(|n| ::std::format!("?{n}"))
            .collect::<::std::vec::Vec<_>>()
            .join(", ");
        let sql = ::std::format!(
            "{}{}) VALUES ({})",
            #insert_prefix,
            columns.join(", "),
            placeholders
        );
        tx.execute(&sql, params.as_slice())?;
    }
}

fn read_method(plan: &TablePlan, err: &proc_macro2::Ident) -> TokenStream {
    let ty = type_ident(&plan.message_name);
    let row = row_expr(plan);

    quote! {
        /// Return every record matching the predicate; `None` returns all.
        pub fn read(
            &self,
            filter: ::std::option::Option<&::crudgen::core::expr::Expr>,
        ) -> ::std::result::Result<::std::vec::Vec<#ty>, #err> {
            let mut sql = Self::SELECT.to_string();
            let mut binds = ::std::vec::Vec::new();
            if let ::std::option::Option::Some(expr) = filter {
                let predicate = ::crudgen::core::lower::lower(
                    expr,
                    &Self::column_map(),
                    ::crudgen::core::lower::Dialect::Sqlite,
                )?;
                sql.push_str(" WHERE ");
                sql.push_str(&predicate.clause);
                binds = predicate.binds;
            }

            let params: ::std::vec::Vec<::std::boxed::Box<dyn ::rusqlite::types::ToSql>> =
                binds.into_iter().map(Self::bind_value).collect();
            let refs: ::std::vec::Vec<&dyn ::rusqlite::types::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();

            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(refs.as_slice(), |row| ::std::result::Result::Ok(#row))?;

            let mut out = ::std::vec::Vec::new();
            for row in rows {
                out.push(row?);
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
        .map(|i| {
            let name = record::field_ident(&plan.columns[*i]);
            quote!(record.#name)
        });

    let masked_sets = plan.update.set.iter().map(|i| {
        let column = &plan.columns[*i];
        let path = column.path.as_str();
        let name = record::field_ident(column);
        let quoted = format!("\"{}\"", column.name);
        quote! {
            if mask.covers(#path) {
                params.push(&record.#name);
                sets.push(::std::format!("{} = ?{}", #quoted, params.len()));
            }
        }
    });
    let key_conditions = plan.update.key.iter().map(|i| {
        let column = &plan.columns[*i];
        let name = record::field_ident(column);
        let quoted = format!("\"{}\"", column.name);
        quote! {
            params.push(&record.#name);
            conditions.push(::std::format!("{} = ?{}", #quoted, params.len()));
        }
    });
    let update_prefix = format!("UPDATE \"{}\" SET ", plan.table);

    quote! {
        /// Update stored records keyed by the primary key, in one
        /// transaction. A record whose mask selects no updatable column is
        /// a per-record no-op.
        pub fn update(&mut self, records: &[#ty]) -> ::std::result::Result<usize, #err> {
            let tx = self.conn.transaction()?;
            let mut changed = 0;
            {
                let mut stmt = tx.prepare(Self::UPDATE)?;
                for record in records {
                    match ::crudgen::core::store::Record::mask(record) {
                        ::std::option::Option::None => {
                            changed += stmt.execute(::rusqlite::params![#(#update_params),*])?;
                        }
                        ::std::option::Option::Some(mask) => {
                            let mut sets: ::std::vec::Vec<::std::string::String> =
                                ::std::vec::Vec::new();
                            let mut params: ::std::vec::Vec<&dyn ::rusqlite::types::ToSql> =
                                ::std::vec::Vec::new();
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
                            changed += tx.execute(&sql, params.as_slice())?;
                        }
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
        ) -> ::std::result::Result<usize, #err> {
            let mut sql = Self::DELETE.to_string();
            let mut binds = ::std::vec::Vec::new();
            if let ::std::option::Option::Some(expr) = filter {
                let predicate = ::crudgen::core::lower::lower(
                    expr,
                    &Self::column_map(),
                    ::crudgen::core::lower::Dialect::Sqlite,
                )?;
                sql.push_str(" WHERE ");
                sql.push_str(&predicate.clause);
                binds = predicate.binds;
            }

            let params: ::std::vec::Vec<::std::boxed::Box<dyn ::rusqlite::types::ToSql>> =
                binds.into_iter().map(Self::bind_value).collect();
            let refs: ::std::vec::Vec<&dyn ::rusqlite::types::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();

            let count = self.conn.execute(&sql, refs.as_slice())?;

            ::std::result::Result::Ok(count)
        }
    }
}

// `read_by_<group>` per single-field unique-identifier group; the DDL's
// UNIQUE constraint guarantees at most one row.
fn lookups(plan: &TablePlan, err: &proc_macro2::Ident) -> TokenStream {
    let ty = type_ident(&plan.message_name);
    let row = row_expr(plan);
    let mut tokens = quote!();

    for lookup in &plan.uid_lookups {
        let Some(scalar) = lookup.key_scalar else {
            continue;
        };

        let method = format_ident!("read_by_{}", ident(&lookup.group));
        let statement = sql::select_by_statement(plan, lookup, Dialect::Sqlite);
        let param = lookup_param(scalar);

        tokens.extend(quote! {
            /// Look up at most one record by this unique-identifier group.
            pub fn #method(
                &self,
                value: #param
            ) -> ::std::result::Result<::std::option::Option<#ty>, #err> {
                let mut stmt = self.conn.prepare(#statement)?;
                let mut rows =
                    stmt.query_map(::rusqlite::params![value], |row| ::std::result::Result::Ok(#row))?;

                match rows.next() {
                    ::std::option::Option::None => ::std::result::Result::Ok(::std::option::Option::None),
                    ::std::option::Option::Some(row) => ::std::result::Result::Ok(::std::option::Option::Some(row?)),
                }
            }
        });
    }

    tokens
}

fn lookup_param(scalar: ScalarType) -> TokenStream {
    match scalar {
        ScalarType::Bool => quote!(bool),
        ScalarType::Bytes => quote!(&[u8]),
        ScalarType::Double => quote!(f64),
        ScalarType::Float => quote!(f32),
        ScalarType::Int32 => quote!(i32),
        ScalarType::Int64 => quote!(i64),
        ScalarType::String => quote!(&str),
        ScalarType::Uint32 => quote!(u32),
        ScalarType::Uint64 => quote!(u64),
    }
}

// Row-to-record mapping in column order; a mask field decodes as absent.
fn row_expr(plan: &TablePlan) -> TokenStream {
    let ty = type_ident(&plan.message_name);

    let mut fields = quote!();
    for (i, column) in plan.columns.iter().enumerate() {
        let name = record::field_ident(column);
        fields.extend(quote! {
            #name: row.get(#i)?,
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
