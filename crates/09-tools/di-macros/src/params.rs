//! `#[derive(Params)]` 实现

use crate::utils::{is_option_type, named_fields, parse_field_args};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: &DeriveInput) -> Result<TokenStream> {
    let ident = &input.ident;
    let mut collect = Vec::new();
    let mut extract = Vec::new();

    for field in named_fields(input)? {
        let name = &field.ident;
        let ty = &field.ty;
        let args = parse_field_args(field)?;

        if args.skip {
            if args.name.is_some() || args.group.is_some() || args.optional {
                return Err(syn::Error::new_spanned(field, "skip 不能与其他 dig 属性同时使用"));
            }
            extract.push(quote! { #name: ::core::default::Default::default() });
            continue;
        }
        if args.optional && !is_option_type(ty) {
            return Err(syn::Error::new_spanned(ty, "optional 字段必须是 Option 类型"));
        }

        if let Some(group) = &args.group {
            if args.optional {
                return Err(syn::Error::new_spanned(field, "值组字段不能标记为 optional"));
            }
            collect.push(quote! {
                list.push(<#ty as ::di_abstractions::GroupDependency>::spec(#group)?);
            });
            extract.push(quote! {
                #name: {
                    let (key, argument) = args.next_argument()?;
                    <#ty as ::di_abstractions::GroupDependency>::from_argument(key, argument)?
                }
            });
        } else if let Some(dependency_name) = &args.name {
            collect.push(quote! {
                list.push(<#ty as ::di_abstractions::Dependency>::spec(
                    ::core::option::Option::Some(#dependency_name),
                ));
            });
            extract.push(quote! {
                #name: {
                    let (key, argument) = args.next_argument()?;
                    <#ty as ::di_abstractions::Dependency>::from_argument(key, argument)?
                }
            });
        } else {
            collect.push(quote! {
                <#ty as ::di_abstractions::Params>::collect(list)?;
            });
            extract.push(quote! {
                #name: <#ty as ::di_abstractions::Params>::extract(args)?
            });
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::di_abstractions::Params for #ident #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn collect(
                list: &mut ::di_abstractions::ParamList,
            ) -> ::di_abstractions::DigResult<()> {
                #(#collect)*
                ::core::result::Result::Ok(())
            }

            #[allow(unused_variables)]
            fn extract(
                args: &mut ::di_abstractions::Arguments,
            ) -> ::di_abstractions::DigResult<Self> {
                ::core::result::Result::Ok(Self {
                    #(#extract,)*
                })
            }
        }
    })
}
