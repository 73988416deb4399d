//! Derives for configuration structs that are documented with `(Default: ...)` annotations.
use quote::quote;
use syn::{parse_quote, Attribute, Data, Expr, Fields, Lit, LitStr, Meta, MetaNameValue};
use synstructure::decl_derive;

/// Doc comment lines attached to a field, in source order.
fn doc_lines(attrs: &[Attribute]) -> Vec<LitStr> {
    attrs
        .iter()
        .filter_map(|attr| match attr.parse_meta() {
            Ok(Meta::NameValue(MetaNameValue {
                ident,
                lit: Lit::Str(doc_str),
                ..
            })) => {
                if ident == "doc" {
                    Some(doc_str)
                } else {
                    None
                }
            }
            _ => None,
        })
        .collect()
}

fn default_regex() -> regex::Regex {
    regex::Regex::new(r"\(Default: (.*)\)").unwrap()
}

/// The expression given as `(Default: ...)` in the docs, with the span of its doc line.
fn documented_default(docs: &[LitStr]) -> Option<LitStr> {
    let default_re = default_regex();
    docs.iter().find_map(|doc_str| {
        default_re
            .captures(&doc_str.value())
            .map(|captures| LitStr::new(captures.get(1).unwrap().as_str(), doc_str.span()))
    })
}

/// Derives a default instance from the documentation.
fn derive_doc_default(s: synstructure::Structure) -> proc_macro2::TokenStream {
    let variant = match s.variants() {
        [variant] => variant,
        _ => panic!("DocDefault requires a struct"),
    };

    let body = variant.construct(|field, _| -> Expr {
        match documented_default(&doc_lines(&field.attrs)) {
            Some(default_str) => default_str
                .parse()
                .expect("error parsing default expression"),
            None => parse_quote!(Default::default()),
        }
    });

    s.gen_impl(quote! {
        gen impl Default for @Self {
            fn default() -> Self {
                #body
            }
        }
    })
}

/// Derives a `help()` listing of all fields, their defaults and their documentation.
fn derive_doc_help(s: synstructure::Structure) -> proc_macro2::TokenStream {
    let ast = s.ast();

    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("DocHelp requires named fields"),
        },
        _ => panic!("DocHelp requires a struct"),
    };

    let default_re = default_regex();
    let mut help = String::new();

    for field in fields.iter() {
        let name = match &field.ident {
            Some(ident) => ident.to_string(),
            None => continue,
        };
        let docs = doc_lines(&field.attrs);
        let default = documented_default(&docs)
            .map(|default_str| default_str.value())
            .unwrap_or_else(|| "Default::default()".to_owned());

        help.push_str(&format!("{} = {}\n", name, default));
        for doc_str in docs.iter() {
            let value = doc_str.value();
            let text = default_re.replace(&value, "");
            let text = text.trim();
            if !text.is_empty() {
                help.push_str("    ");
                help.push_str(text);
                help.push('\n');
            }
        }
    }

    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            /// Listing of all options with their defaults.
            pub fn help() -> &'static str {
                #help
            }
        }
    }
}

decl_derive!([DocDefault] => derive_doc_default);
decl_derive!([DocHelp] => derive_doc_help);
