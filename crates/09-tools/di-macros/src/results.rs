//! `#[derive(Results)]` 实现

use crate::utils::{named_fields, parse_field_args};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: &DeriveInput) -> Result<TokenStream> {
    let ident = &input.ident;
    let mut collect = Vec::new();
    let mut into_values = Vec::new();

    for field in named_fields(input)? {
        let name = &field.ident;
        let ty = &field.ty;
        let args = parse_field_args(field)?;
        if args.optional || args.skip {
            return Err(syn::Error::new_spanned(
                field,
                "结果字段只支持 name 与 group 属性",
            ));
        }

        let result_name = match &args.name {
            Some(value) => quote! { ::core::option::Option::Some(#value) },
            None => quote! { ::core::option::Option::None },
        };
        let result_group = match &args.group {
            Some(value) => quote! { ::core::option::Option::Some(#value) },
            None => quote! { ::core::option::Option::None },
        };

        collect.push(quote! {
            <#ty as ::di_abstractions::Results>::collect(
                &::di_abstractions::ResultOptions::field(#result_name, #result_group),
                specs,
            )?;
        });
        into_values.push(quote! {
            <#ty as ::di_abstractions::Results>::into_values(self.#name, values);
        });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::di_abstractions::Results for #ident #ty_generics #where_clause {
            const OBJECT: bool = true;

            #[allow(unused_variables)]
            fn collect(
                options: &::di_abstractions::ResultOptions,
                specs: &mut ::std::vec::Vec<::di_abstractions::ResultSpec>,
            ) -> ::di_abstractions::DigResult<()> {
                #(#collect)*
                ::core::result::Result::Ok(())
            }

            #[allow(unused_variables)]
            fn into_values(self, values: &mut ::std::vec::Vec<::di_abstractions::Value>) {
                #(#into_values)*
            }
        }
    })
}
