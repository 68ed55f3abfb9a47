//! Procedural macros for uni-dispatch

use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Prefix prepended to every generated name, e.g. `"Wiki."`
    #[darling(default)]
    prefix: Option<String>,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<()>,

    /// Explicit name override
    #[darling(default)]
    rename: Option<String>,
}

impl ActionVariant {
    fn display_name(&self, prefix: Option<&str>) -> String {
        let base = self
            .rename
            .clone()
            .unwrap_or_else(|| self.ident.to_string());
        match prefix {
            Some(prefix) => format!("{prefix}{base}"),
            None => base,
        }
    }
}

/// Derive macro for the Action trait
///
/// Generates a `name()` method that returns the variant name as a static string.
/// Unit, tuple and struct variants are all supported.
///
/// Attributes:
/// - `#[action(prefix = "Wiki.")]` on the enum prefixes every name
/// - `#[action(rename = "Fetch")]` on a variant overrides its name
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// enum PageAction {
///     UpdatePageNum(i32),
///     #[action(rename = "Send")]
///     TestSend,
///     Loaded { title: String },
/// }
///
/// assert_eq!(PageAction::UpdatePageNum(1).name(), "UpdatePageNum");
/// assert_eq!(PageAction::TestSend.name(), "Send");
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    if variants.is_empty() {
        return syn::Error::new_spanned(&input, "Action enums need at least one variant")
            .to_compile_error()
            .into();
    }

    let name_arms = variants.iter().map(|v| {
        let variant_name = &v.ident;
        let variant_str = v.display_name(opts.prefix.as_deref());

        match &v.fields.style {
            darling::ast::Style::Unit => quote! {
                #name::#variant_name => #variant_str
            },
            darling::ast::Style::Tuple => quote! {
                #name::#variant_name(..) => #variant_str
            },
            darling::ast::Style::Struct => quote! {
                #name::#variant_name { .. } => #variant_str
            },
        }
    });

    let expanded = quote! {
        impl #impl_generics uni_dispatch::Action for #name #ty_generics #where_clause {
            fn name(&self) -> &'static str {
                match self {
                    #(#name_arms),*
                }
            }
        }
    };

    TokenStream::from(expanded)
}
