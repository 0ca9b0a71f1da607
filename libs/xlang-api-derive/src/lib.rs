use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Derive macro for component configuration bindings.
///
/// Every field annotated with `#[config(...)]` becomes a binding from a
/// dotted path in the configuration document to that field. Generates an
/// `xlang_api::Configurable` impl:
///
/// - `config_properties()`: one `ConfigProperty` per annotated field.
/// - `has_config_field(name)`: whether `name` is an annotated field.
/// - `set_config_field(name, value)`: deserializes `value` into the field.
///
/// Unannotated fields are component state and are never injected.
///
/// # Example
///
/// ```ignore
/// #[derive(Default, Configurable)]
/// pub struct Tokenizer {
///     #[config(path = "input.column", description = "Column holding the text")]
///     column: String,
///
///     #[config(description = "Lower-case tokens")]
///     lowercase: bool,
/// }
/// ```
///
/// `path` defaults to the field name, `description` to the empty string.
/// Field types must implement `serde::Deserialize` and
/// `xlang_api::ConfigTypeOf`.
#[proc_macro_derive(Configurable, attributes(config))]
pub fn derive_configurable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => {
                return Ok(expand(input, Vec::new(), Vec::new(), Vec::new()));
            }
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Configurable only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Configurable only supports structs",
            ));
        }
    };

    let mut property_tokens = Vec::new();
    let mut field_names = Vec::new();
    let mut setter_tokens = Vec::new();

    for field in fields {
        let field_ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_name = field_ident.to_string();
        let field_ty = &field.ty;

        let mut bound = false;
        let mut path: Option<String> = None;
        let mut description: Option<String> = None;

        for attr in &field.attrs {
            if !attr.path().is_ident("config") {
                continue;
            }
            bound = true;
            // A bare `#[config]` binds the field under its own name.
            if matches!(attr.meta, syn::Meta::Path(_)) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("path") {
                    let value: LitStr = meta.value()?.parse()?;
                    path = Some(value.value());
                } else if meta.path.is_ident("description") {
                    let value: LitStr = meta.value()?.parse()?;
                    description = Some(value.value());
                } else {
                    return Err(meta.error("expected `path` or `description`"));
                }
                Ok(())
            })?;
        }

        if !bound {
            continue;
        }

        let path = path.unwrap_or_else(|| field_name.clone());
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(syn::Error::new_spanned(
                field_ident,
                format!("invalid config path '{path}'"),
            ));
        }
        let description = description.unwrap_or_default();

        property_tokens.push(quote! {
            ::xlang_api::config::ConfigProperty {
                field: #field_name.to_string(),
                path: #path.to_string(),
                description: #description.to_string(),
                config_type: <#field_ty as ::xlang_api::config::ConfigTypeOf>::config_type(),
            }
        });
        setter_tokens.push(quote! {
            #field_name => {
                self.#field_ident = ::xlang_api::config::from_config_value::<#field_ty>(__field, __value)?;
                Ok(())
            }
        });
        field_names.push(field_name);
    }

    Ok(expand(input, property_tokens, field_names, setter_tokens))
}

fn expand(
    input: &DeriveInput,
    property_tokens: Vec<proc_macro2::TokenStream>,
    field_names: Vec<String>,
    setter_tokens: Vec<proc_macro2::TokenStream>,
) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::xlang_api::config::Configurable for #name #ty_generics #where_clause {
            fn config_properties(&self) -> ::std::vec::Vec<::xlang_api::config::ConfigProperty> {
                ::std::vec![
                    #(#property_tokens),*
                ]
            }

            fn has_config_field(&self, __field: &str) -> bool {
                const FIELDS: &[&str] = &[#(#field_names),*];
                FIELDS.contains(&__field)
            }

            fn set_config_field(
                &mut self,
                __field: &str,
                __value: &::xlang_api::config::ConfigDocument,
            ) -> ::xlang_api::error::Result<()> {
                let _ = __value;
                match __field {
                    #(#setter_tokens)*
                    _ => Err(::xlang_api::error::XlangError::UnknownField(__field.to_string())),
                }
            }
        }
    };

    TokenStream::from(expanded)
}
