//! Derive macro for typed micro-database tables.
//!
//! This crate provides `#[derive(Table)]`, which turns a row struct into a
//! table description, a set of column types, and a change-tracked writer.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, LitStr, Meta, Path, Type};

/// Derives the `Table` trait for a row struct.
///
/// # Attributes
///
/// - `#[table(name = "File")]` - SQL table name (defaults to the struct
///   name)
/// - `#[table(derive_fields = "path::to::fn")]` - hook called with
///   `&mut <Row>Inserter` before every INSERT and UPDATE
///
/// # Field Attributes
///
/// - `#[column(name = "FileId")]` - SQL column name (defaults to the
///   PascalCase field name)
/// - `#[column(primary_key)]` - marks the primary key
/// - `#[column(nullable)]` - marks a nullable column; the field should be
///   an `Option`
///
/// # Generated Items
///
/// For a struct `File`, this macro generates:
///
/// - `FileTable` - implements `Table`, with one accessor per column
/// - `FileColumns` - a module with one zero-sized type per column
/// - `FileInserter` - the writer, one `Option` slot and setter per column
#[proc_macro_derive(Table, attributes(table, column))]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_table_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_table_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let vis = &input.vis;
    let table_attrs = parse_table_attrs(&input.attrs)?;
    let table_name = table_attrs
        .name
        .unwrap_or_else(|| struct_name.to_string());

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Table derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Table derive only supports structs",
            ));
        }
    };

    let mut columns: Vec<ColumnInfo> = Vec::new();
    for field in fields {
        let Some(field_name) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "unnamed field"));
        };
        let attrs = parse_column_attrs(&field.attrs)?;
        let type_name = format_ident!("{}", to_pascal_case(&field_name.to_string()));
        columns.push(ColumnInfo {
            column_name: attrs.name.unwrap_or_else(|| type_name.to_string()),
            field_name,
            type_name,
            field_type: field.ty.clone(),
            is_primary_key: attrs.primary_key,
            is_nullable: attrs.nullable,
        });
    }

    if columns.iter().filter(|c| c.is_primary_key).count() > 1 {
        return Err(syn::Error::new_spanned(
            &input,
            "at most one column may be marked primary_key",
        ));
    }

    let table_struct_name = format_ident!("{}Table", struct_name);
    let columns_mod_name = format_ident!("{}Columns", struct_name);
    let inserter_name = format_ident!("{}Inserter", struct_name);

    let column_structs = columns.iter().map(|info| {
        let ColumnInfo {
            column_name,
            type_name,
            field_type,
            is_primary_key,
            is_nullable,
            ..
        } = info;
        let doc = format!("The `{column_name}` column.");
        (
            quote! {
                #[doc = #doc]
                #[derive(Debug, Clone, Copy)]
                pub struct #type_name;
            },
            quote! {
                impl ::microdb_core::schema::Column for #columns_mod_name::#type_name {
                    type Table = #table_struct_name;
                    type Type = #field_type;

                    const NAME: &'static str = #column_name;
                    const NULLABLE: bool = #is_nullable;
                    const PRIMARY_KEY: bool = #is_primary_key;
                }
            },
        )
    });
    let (column_structs, column_impls): (Vec<_>, Vec<_>) = column_structs.unzip();

    let column_accessors = columns.iter().map(|info| {
        let method_name = &info.field_name;
        let type_name = &info.type_name;
        quote! {
            /// Returns the column type for typed conditions.
            #[inline]
            #[must_use]
            pub const fn #method_name() -> #columns_mod_name::#type_name {
                #columns_mod_name::#type_name
            }
        }
    });

    let all_column_names: Vec<&str> = columns.iter().map(|c| c.column_name.as_str()).collect();

    let primary_key = match columns.iter().find(|c| c.is_primary_key) {
        Some(pk) => {
            let name = &pk.column_name;
            quote! { ::core::option::Option::Some(#name) }
        }
        None => quote! { ::core::option::Option::None },
    };

    let decode_fields = columns.iter().map(|info| {
        let field_name = &info.field_name;
        let column_name = &info.column_name;
        quote! {
            #field_name: ::microdb_core::schema::decode_column(&mut values, #column_name)?
        }
    });

    let derive_fields = table_attrs.derive_fields.map(|path| {
        quote! {
            fn derive_fields(inserter: &mut #inserter_name) {
                #path(inserter);
            }
        }
    });

    let inserter_fields = columns.iter().map(|info| {
        let field_name = &info.field_name;
        let field_type = &info.field_type;
        let doc = format!("Value assigned to `{}`, if any.", info.column_name);
        quote! {
            #[doc = #doc]
            pub #field_name: ::core::option::Option<#field_type>
        }
    });

    let inserter_setters = columns.iter().map(|info| {
        let field_name = &info.field_name;
        let field_type = &info.field_type;
        let doc = format!("Assigns `{}`.", info.column_name);
        quote! {
            #[doc = #doc]
            pub fn #field_name(&mut self, value: impl ::core::convert::Into<#field_type>) -> &mut Self {
                self.#field_name = ::core::option::Option::Some(value.into());
                self
            }
        }
    });

    let changed_pushes = columns.iter().map(|info| {
        let field_name = &info.field_name;
        let column_name = &info.column_name;
        quote! {
            if self.#field_name.is_some() {
                changed.push(#column_name);
            }
        }
    });

    let assignment_pushes = columns.iter().map(|info| {
        let field_name = &info.field_name;
        let column_name = &info.column_name;
        quote! {
            if let ::core::option::Option::Some(value) = self.#field_name {
                assignments.push((
                    #column_name,
                    ::microdb_core::value::ToSqlValue::to_sql_value(value),
                ));
            }
        }
    });

    let table_doc = format!("Table metadata for `{table_name}`.");
    let columns_doc = format!("Column types for `{table_name}`.");
    let inserter_doc = format!("Change-tracked writer for `{table_name}`.");

    let expanded = quote! {
        #[doc = #columns_doc]
        #[allow(non_snake_case)]
        #vis mod #columns_mod_name {
            #(#column_structs)*
        }

        #(#column_impls)*

        #[doc = #table_doc]
        #[derive(Debug, Clone, Copy)]
        #vis struct #table_struct_name;

        impl ::microdb_core::schema::Table for #table_struct_name {
            type Row = #struct_name;
            type Inserter = #inserter_name;

            const NAME: &'static str = #table_name;
            const COLUMNS: &'static [&'static str] = &[#(#all_column_names),*];
            const PRIMARY_KEY: ::core::option::Option<&'static str> = #primary_key;

            fn decode_row(
                values: ::std::vec::Vec<::microdb_core::value::SqlValue>,
            ) -> ::microdb_core::error::Result<#struct_name> {
                ::microdb_core::schema::check_column_count::<Self>(&values)?;
                let mut values = values.into_iter();
                ::core::result::Result::Ok(#struct_name {
                    #(#decode_fields),*
                })
            }

            #derive_fields
        }

        impl #table_struct_name {
            /// Returns the table name.
            #[inline]
            #[must_use]
            pub const fn table_name() -> &'static str {
                #table_name
            }

            #(#column_accessors)*
        }

        impl #struct_name {
            /// Returns the table metadata type.
            #[must_use]
            pub const fn table() -> #table_struct_name {
                #table_struct_name
            }
        }

        #[doc = #inserter_doc]
        #[derive(Debug, Clone, Default, PartialEq)]
        #vis struct #inserter_name {
            #(#inserter_fields),*
        }

        impl #inserter_name {
            #(#inserter_setters)*
        }

        impl ::microdb_core::schema::Inserter for #inserter_name {
            fn changed_columns(&self) -> ::std::vec::Vec<&'static str> {
                let mut changed = ::std::vec::Vec::new();
                #(#changed_pushes)*
                changed
            }

            fn into_assignments(
                self,
            ) -> ::std::vec::Vec<(&'static str, ::microdb_core::value::SqlValue)> {
                let mut assignments = ::std::vec::Vec::new();
                #(#assignment_pushes)*
                assignments
            }
        }
    };

    Ok(expanded)
}

struct ColumnInfo {
    field_name: Ident,
    type_name: Ident,
    field_type: Type,
    column_name: String,
    is_primary_key: bool,
    is_nullable: bool,
}

#[derive(Default)]
struct TableAttrs {
    name: Option<String>,
    derive_fields: Option<Path>,
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    primary_key: bool,
    nullable: bool,
}

fn parse_table_attrs(attrs: &[Attribute]) -> syn::Result<TableAttrs> {
    let mut result = TableAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("table")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                result.name = Some(value.value());
                Ok(())
            } else if meta.path.is_ident("derive_fields") {
                let value: LitStr = meta.value()?.parse()?;
                result.derive_fields = Some(value.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported table attribute"))
            }
        })?;
    }
    Ok(result)
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("column")) {
        // Bare #[column]
        if matches!(attr.meta, Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                result.primary_key = true;
            } else if meta.path.is_ident("nullable") {
                result.nullable = true;
            } else if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                result.name = Some(value.value());
            } else {
                return Err(meta.error("unsupported column attribute"));
            }
            Ok(())
        })?;
    }
    Ok(result)
}

fn to_pascal_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = true;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("file_id"), "FileId");
        assert_eq!(to_pascal_case("name"), "Name");
        assert_eq!(to_pascal_case("user_or_group_id"), "UserOrGroupId");
    }

    #[test]
    fn test_rejects_two_primary_keys() {
        let input: DeriveInput = syn::parse_quote! {
            struct Bad {
                #[column(primary_key)]
                a: i64,
                #[column(primary_key)]
                b: i64,
            }
        };
        assert!(derive_table_impl(input).is_err());
    }

    #[test]
    fn test_rejects_unknown_column_attribute() {
        let input: DeriveInput = syn::parse_quote! {
            struct Bad {
                #[column(indexed)]
                a: i64,
            }
        };
        assert!(derive_table_impl(input).is_err());
    }

    #[test]
    fn test_rejects_tuple_struct() {
        let input: DeriveInput = syn::parse_quote! {
            struct Bad(i64);
        };
        assert!(derive_table_impl(input).is_err());
    }
}
