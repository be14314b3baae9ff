//! Parsing logic for the Entity derive macro.
//!
//! This module extracts struct-level and field-level `#[aorm(...)]`
//! attributes from the derive input to build `EntityDef` and `FieldDef`
//! structures used for code generation.

use proc_macro2::Span;
use syn::{Attribute, Data, DeriveInput, Error, Field, Fields, Generics, Ident, Lit, Result, Type};

/// Parsed entity definition from a struct with `#[derive(Entity)]`.
#[derive(Debug)]
pub struct EntityDef {
    /// The struct name (e.g., `Note`).
    pub name: Ident,
    /// The SQL table name; `None` when the struct is not marked as a table.
    pub table_name: Option<String>,
    /// Parsed field definitions, in declaration order.
    pub fields: Vec<FieldDef>,
    /// Generic parameters from the struct.
    pub generics: Generics,
}

impl EntityDef {
    /// The field holding the base entity, if any.
    pub fn base_field(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.extends)
    }

    /// Fields that map to columns of this entity.
    pub fn column_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.skip && !f.extends)
    }

    /// The field marked as primary key, if any.
    pub fn primary_key_field(&self) -> Option<&FieldDef> {
        self.column_fields().find(|f| f.primary_key)
    }
}

/// Parsed field definition from a struct field.
#[derive(Debug)]
pub struct FieldDef {
    /// The Rust field name.
    pub name: Ident,
    /// The SQL column name (field name unless overridden).
    pub column_name: String,
    /// The Rust type of the field.
    pub ty: Type,
    pub sql_type: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub not_null: bool,
    pub unique: bool,
    pub default: Option<String>,
    /// The field holds the base entity whose columns are inherited.
    pub extends: bool,
    /// Not stored; filled with `Default::default()` when reading rows.
    pub skip: bool,
}

/// Parse a `DeriveInput` into an `EntityDef`.
pub fn parse_entity(input: &DeriveInput) -> Result<EntityDef> {
    let name = input.ident.clone();
    let generics = input.generics.clone();
    let table_name = parse_struct_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Entity can only be derived for structs, not unions",
            ));
        }
    };

    let def = EntityDef {
        name,
        table_name,
        fields,
        generics,
    };
    validate_entity(&def)?;
    Ok(def)
}

fn parse_struct_attrs(attrs: &[Attribute]) -> Result<Option<String>> {
    let mut table_name: Option<String> = None;

    for attr in attrs {
        if !attr.path().is_ident("aorm") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                if table_name.is_some() {
                    return Err(Error::new_spanned(meta.path, "duplicate aorm attribute: table"));
                }
                table_name = Some(string_value(&meta, "table name")?);
                Ok(())
            } else {
                Err(meta.error("unknown aorm struct attribute"))
            }
        })?;
    }

    Ok(table_name)
}

fn parse_fields(fields: &Fields) -> Result<Vec<FieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new(
            Span::call_site(),
            "Entity requires a struct with named fields, not a tuple struct",
        )),
        Fields::Unit => Err(Error::new(
            Span::call_site(),
            "Entity requires a struct with fields, not a unit struct",
        )),
    }
}

/// Parse a single field and its attributes.
fn parse_field(field: &Field) -> Result<FieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut def = FieldDef {
        column_name: name.to_string().trim_start_matches("r#").to_string(),
        name,
        ty: field.ty.clone(),
        sql_type: None,
        primary_key: false,
        auto_increment: false,
        not_null: false,
        unique: false,
        default: None,
        extends: false,
        skip: false,
    };

    for attr in &field.attrs {
        if !attr.path().is_ident("aorm") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("id") {
                def.primary_key = true;
            } else if path.is_ident("auto_increment") {
                def.auto_increment = true;
            } else if path.is_ident("not_null") {
                def.not_null = true;
            } else if path.is_ident("unique") {
                def.unique = true;
            } else if path.is_ident("extends") {
                def.extends = true;
            } else if path.is_ident("skip") {
                def.skip = true;
            } else if path.is_ident("column") {
                def.column_name = string_value(&meta, "column name")?;
            } else if path.is_ident("sql_type") {
                def.sql_type = Some(string_value(&meta, "sql_type")?);
            } else if path.is_ident("default") {
                def.default = Some(string_value(&meta, "default")?);
            } else {
                return Err(meta.error("unknown aorm field attribute"));
            }
            Ok(())
        })?;
    }

    Ok(def)
}

fn string_value(meta: &syn::meta::ParseNestedMeta<'_>, what: &str) -> Result<String> {
    let value: Lit = meta.value()?.parse()?;
    if let Lit::Str(lit_str) = value {
        Ok(lit_str.value())
    } else {
        Err(Error::new_spanned(
            value,
            format!("expected string literal for {}", what),
        ))
    }
}

/// Checks that need no type information. Column-level rules (identifiers,
/// type mapping, defaults) are checked when the entity is resolved.
fn validate_entity(def: &EntityDef) -> Result<()> {
    let mut bases = def.fields.iter().filter(|f| f.extends);
    if let (Some(_), Some(second)) = (bases.next(), bases.next()) {
        return Err(Error::new_spanned(
            &second.name,
            "an entity can extend only one base",
        ));
    }

    for field in &def.fields {
        let column_flags = field.primary_key
            || field.auto_increment
            || field.not_null
            || field.unique
            || field.default.is_some()
            || field.sql_type.is_some();
        if field.extends && (field.skip || column_flags) {
            return Err(Error::new_spanned(
                &field.name,
                "`extends` cannot be combined with column attributes",
            ));
        }
        if field.skip && column_flags {
            return Err(Error::new_spanned(
                &field.name,
                "`skip` cannot be combined with column attributes",
            ));
        }
        if field.not_null && is_option_type(&field.ty) {
            return Err(Error::new_spanned(
                &field.ty,
                "`not_null` cannot be used on an Option field",
            ));
        }
    }

    let mut keys = def.column_fields().filter(|f| f.primary_key);
    if let (Some(_), Some(second)) = (keys.next(), keys.next()) {
        return Err(Error::new_spanned(
            &second.name,
            "only one field can be marked `id`",
        ));
    }
    Ok(())
}

/// Check if a type is `Option<T>`.
pub fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}
