//! Procedural macros for AORM Rust.
//!
//! `aorm-macros` is the **compile-time codegen layer**. `#[derive(Entity)]`
//! turns a struct into an entity description: static column metadata plus
//! row conversion, consumed by the registry, the generators and the session.
//!
//! The macro is used by application crates via the `aorm` facade.

use proc_macro::TokenStream;
use quote::{ToTokens, quote};

mod parse;

use parse::{EntityDef, FieldDef, parse_entity};

/// Derive macro for the `Entity` trait.
///
/// # Attributes
///
/// - `#[aorm(table = "name")]` - Map the struct to a table. Without it the
///   struct can still serve as a base for other entities, but resolving it
///   as a table fails.
/// - `#[aorm(id)]` - Mark field as primary key
/// - `#[aorm(auto_increment)]` - Mark field as auto-incrementing
/// - `#[aorm(column = "name")]` - Override column name
/// - `#[aorm(not_null)]` - Add NOT NULL constraint
/// - `#[aorm(unique)]` - Add UNIQUE constraint
/// - `#[aorm(default = "value")]` - Default value, rendered as a literal
/// - `#[aorm(sql_type = "TEXT")]` - Override the mapped SQL type
/// - `#[aorm(extends)]` - The field holds a base entity whose columns come
///   first; its columns default when missing from a row
/// - `#[aorm(skip)]` - Not stored; set to `Default::default()` when loaded
///
/// # Example
///
/// ```ignore
/// use aorm::Entity;
///
/// #[derive(Entity, Default)]
/// struct Record {
///     #[aorm(id, auto_increment, column = "_id")]
///     id: i64,
///     created: i64,
/// }
///
/// #[derive(Entity)]
/// #[aorm(table = "note")]
/// struct Note {
///     #[aorm(extends)]
///     record: Record,
///     #[aorm(not_null)]
///     title: String,
///     body: Option<String>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(aorm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let entity = match parse_entity(&input) {
        Ok(e) => e,
        Err(e) => return e.to_compile_error().into(),
    };

    generate_entity_impl(&entity).into()
}

/// Generate the Entity trait implementation from the parsed definition.
fn generate_entity_impl(entity: &EntityDef) -> proc_macro2::TokenStream {
    let name = &entity.name;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = entity.generics.split_for_impl();

    let table_ts = match &entity.table_name {
        Some(table) => quote! { Some(#table) },
        None => quote! { None },
    };
    let column_specs: Vec<_> = entity.column_fields().map(generate_column_spec).collect();
    let extends_ts = entity.base_field().map(|base| {
        let base_ty = &base.ty;
        quote! { .extends(<#base_ty as aorm_core::Entity>::describe) }
    });

    let to_row_body = generate_to_row(entity);
    let from_row_body = generate_from_row(entity, &quote! { get_named });
    let from_base_row_body = generate_from_row(entity, &quote! { get_named_or_default });
    let set_pk = generate_set_primary_key(entity);

    quote! {
        impl #impl_generics aorm_core::Entity for #name #ty_generics #where_clause {
            fn describe() -> aorm_core::EntityInfo {
                static COLUMNS: &[aorm_core::ColumnSpec] = &[
                    #(#column_specs),*
                ];
                aorm_core::EntityInfo {
                    type_name: concat!(module_path!(), "::", #name_str),
                    table: #table_ts,
                    columns: COLUMNS,
                    base: None,
                }
                #extends_ts
            }

            fn to_row(&self) -> Vec<(&'static str, aorm_core::Value)> {
                #to_row_body
            }

            fn from_row(row: &aorm_core::Row) -> aorm_core::Result<Self> {
                #from_row_body
            }

            fn from_base_row(row: &aorm_core::Row) -> aorm_core::Result<Self> {
                #from_base_row_body
            }

            #set_pk
        }
    }
}

/// Generate one `ColumnSpec` constructor chain.
fn generate_column_spec(field: &FieldDef) -> proc_macro2::TokenStream {
    let field_name = field.name.to_string();
    let field_name = field_name.trim_start_matches("r#");
    let host_type = field.ty.to_token_stream().to_string();
    let column = &field.column_name;

    let mut chain = quote! { aorm_core::ColumnSpec::new(#field_name, #host_type) };
    if column != field_name {
        chain.extend(quote! { .column(#column) });
    }
    if let Some(sql_type) = &field.sql_type {
        chain.extend(quote! { .sql_type(#sql_type) });
    }
    if field.primary_key {
        chain.extend(quote! { .primary_key(true) });
    }
    if field.auto_increment {
        chain.extend(quote! { .auto_increment(true) });
    }
    if field.not_null {
        chain.extend(quote! { .not_null(true) });
    }
    if field.unique {
        chain.extend(quote! { .unique(true) });
    }
    if let Some(default) = &field.default {
        chain.extend(quote! { .default(#default) });
    }
    chain
}

/// Base columns first, then this entity's own.
fn generate_to_row(entity: &EntityDef) -> proc_macro2::TokenStream {
    let init = match entity.base_field() {
        Some(base) => {
            let base_name = &base.name;
            let base_ty = &base.ty;
            quote! { let mut row = <#base_ty as aorm_core::Entity>::to_row(&self.#base_name); }
        }
        None => {
            let capacity = entity.column_fields().count();
            quote! { let mut row = Vec::with_capacity(#capacity); }
        }
    };

    let pushes = entity.column_fields().map(|field| {
        let field_name = &field.name;
        let column = &field.column_name;
        quote! {
            row.push((#column, aorm_core::Value::from(::core::clone::Clone::clone(&self.#field_name))));
        }
    });

    quote! {
        #init
        #(#pushes)*
        row
    }
}

/// Decode own columns with `read` and the base through `from_base_row`.
///
/// `from_row` reads with `get_named`, so a missing column is an error;
/// `from_base_row` reads with `get_named_or_default`, because inherited
/// columns are absent when extend support is off.
fn generate_from_row(
    entity: &EntityDef,
    read: &proc_macro2::TokenStream,
) -> proc_macro2::TokenStream {
    let inits = entity.fields.iter().map(|field| {
        let field_name = &field.name;
        if field.extends {
            let ty = &field.ty;
            quote! { #field_name: <#ty as aorm_core::Entity>::from_base_row(row)? }
        } else if field.skip {
            quote! { #field_name: ::core::default::Default::default() }
        } else {
            let column = &field.column_name;
            quote! { #field_name: row.#read(#column)? }
        }
    });

    quote! {
        Ok(Self {
            #(#inits),*
        })
    }
}

/// Store generated keys on the key field, or forward to the base entity.
fn generate_set_primary_key(entity: &EntityDef) -> proc_macro2::TokenStream {
    if let Some(pk) = entity.primary_key_field() {
        let field_name = &pk.name;
        return quote! {
            fn set_primary_key(&mut self, value: aorm_core::Value) -> aorm_core::Result<()> {
                self.#field_name = ::core::convert::TryFrom::try_from(value)?;
                Ok(())
            }
        };
    }
    if let Some(base) = entity.base_field() {
        let base_name = &base.name;
        let base_ty = &base.ty;
        return quote! {
            fn set_primary_key(&mut self, value: aorm_core::Value) -> aorm_core::Result<()> {
                <#base_ty as aorm_core::Entity>::set_primary_key(&mut self.#base_name, value)
            }
        };
    }
    quote! {}
}
