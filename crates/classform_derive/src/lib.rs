use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Derives the form plumbing for a record struct: a `…Fields` accessor with
/// one lens per field, the string field-edit reducer (`FieldAccess`), and the
/// section tag each field declares with `#[form(section = "…")]`.
///
/// Every field must name its section exactly once; the sections partition the
/// record.
#[proc_macro_derive(FormModel, attributes(form))]
pub fn derive_form_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            input.ident,
            "FormModel derive currently supports only non-generic structs",
        )
        .to_compile_error()
        .into();
    }

    let model_ident = input.ident;
    let fields_struct_ident = format_ident!("{model_ident}Fields");

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return syn::Error::new(
                    Span::call_site(),
                    "FormModel derive requires a struct with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new(
                Span::call_site(),
                "FormModel derive is only supported on structs",
            )
            .to_compile_error()
            .into();
        }
    };

    let classform = classform_path();
    let mut lens_defs = Vec::new();
    let mut fields_methods = Vec::new();
    let mut apply_arms = Vec::new();
    let mut text_arms = Vec::new();
    let mut eq_arms = Vec::new();

    for field in named_fields {
        let Some(field_ident) = field.ident.clone() else {
            continue;
        };
        let section = match field_section(&field) {
            Ok(section) => section,
            Err(error) => return error.to_compile_error().into(),
        };
        let field_ty = field.ty;
        let field_name = field_ident.to_string();
        let lens_ident = format_ident!("{model_ident}{}Lens", to_pascal_case(&field_name));

        lens_defs.push(quote! {
            #[derive(Clone, Copy, Debug, Default)]
            pub struct #lens_ident;

            impl #classform::form::FieldLens<#model_ident> for #lens_ident {
                type Value = #field_ty;

                fn key(self) -> #classform::form::FieldKey {
                    #classform::form::FieldKey::new(#field_name)
                }

                fn section(self) -> #classform::form::SectionId {
                    #classform::form::SectionId::new(#section)
                }

                fn get<'a>(self, model: &'a #model_ident) -> &'a Self::Value {
                    &model.#field_ident
                }

                fn set(self, model: &mut #model_ident, value: Self::Value) {
                    model.#field_ident = value;
                }
            }
        });

        fields_methods.push(quote! {
            pub const fn #field_ident(&self) -> #lens_ident {
                #lens_ident
            }
        });

        apply_arms.push(quote! {
            #field_name => {
                #classform::form::FieldEdit::apply_text(&mut self.#field_ident, value);
                true
            }
        });
        text_arms.push(quote! {
            #field_name => Some(#classform::form::FieldEdit::text(&self.#field_ident)),
        });
        eq_arms.push(quote! {
            #field_name => self.#field_ident == other.#field_ident,
        });
    }

    quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_struct_ident;

        impl #fields_struct_ident {
            #(#fields_methods)*
        }

        impl #classform::form::FormModel for #model_ident {
            type Fields = #fields_struct_ident;

            fn fields() -> Self::Fields {
                #fields_struct_ident
            }
        }

        impl #classform::form::FieldAccess for #model_ident {
            fn apply_text(&mut self, key: &str, value: ::core::option::Option<&str>) -> bool {
                match key {
                    #(#apply_arms)*
                    _ => false,
                }
            }

            fn text(&self, key: &str) -> ::core::option::Option<::core::option::Option<&str>> {
                match key {
                    #(#text_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_eq(&self, other: &Self, key: &str) -> bool {
                match key {
                    #(#eq_arms)*
                    _ => true,
                }
            }
        }

        #(#lens_defs)*
    }
    .into()
}

fn field_section(field: &syn::Field) -> syn::Result<String> {
    let mut section = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("form") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("section") {
                let value: LitStr = meta.value()?.parse()?;
                if section.replace(value.value()).is_some() {
                    return Err(meta.error("field declares more than one section"));
                }
                return Ok(());
            }
            Err(meta.error("unsupported form attribute; expected `section = \"…\"`"))
        })?;
    }
    match section {
        Some(section) if !section.is_empty() => Ok(section),
        Some(_) => Err(syn::Error::new_spanned(
            field,
            "form section name must not be empty",
        )),
        None => Err(syn::Error::new_spanned(
            field,
            "field is missing `#[form(section = \"…\")]`",
        )),
    }
}

fn classform_path() -> TokenStream2 {
    match crate_name("classform") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::classform),
    }
}

fn to_pascal_case(input: &str) -> String {
    let mut out = String::new();
    for segment in input.split('_') {
        if segment.is_empty() {
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
