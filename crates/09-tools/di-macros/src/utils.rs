//! 宏工具函数

use syn::{
    punctuated::Punctuated, Data, DeriveInput, Expr, Field, Fields, Lit, LitStr, Meta, Result,
    Token, Type,
};

/// 字段上的 `#[dig(...)]` 选项
#[derive(Default)]
pub struct FieldArgs {
    /// 命名值
    pub name: Option<LitStr>,
    /// 值组描述
    pub group: Option<LitStr>,
    /// 可选依赖
    pub optional: bool,
    /// 不参与注入，使用 `Default`
    pub skip: bool,
}

/// 解析字段上的全部 `#[dig(...)]` 属性
pub fn parse_field_args(field: &Field) -> Result<FieldArgs> {
    let mut args = FieldArgs::default();

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("dig")) {
        let parsed = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        for meta in parsed {
            match meta {
                Meta::Path(path) if path.is_ident("optional") => args.optional = true,
                Meta::Path(path) if path.is_ident("skip") => args.skip = true,
                Meta::NameValue(nv) if nv.path.is_ident("name") => {
                    args.name = Some(string_value(&nv.value)?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("group") => {
                    args.group = Some(string_value(&nv.value)?);
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "未知的 dig 属性，可用: name, group, optional, skip",
                    ))
                }
            }
        }
    }

    if args.name.is_some() && args.group.is_some() {
        return Err(syn::Error::new_spanned(field, "name 与 group 不能同时使用"));
    }
    Ok(args)
}

fn string_value(expr: &Expr) -> Result<LitStr> {
    match expr {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(lit_str) => Ok(lit_str.clone()),
            _ => Err(syn::Error::new_spanned(expr, "期望字符串字面量")),
        },
        _ => Err(syn::Error::new_spanned(expr, "期望字符串字面量")),
    }
}

/// 取出结构体的具名字段
pub fn named_fields(input: &DeriveInput) -> Result<Vec<&Field>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields.named.iter().collect()),
            Fields::Unit => Ok(Vec::new()),
            Fields::Unnamed(_) => Err(syn::Error::new_spanned(
                &input.ident,
                "只支持具名字段的结构体",
            )),
        },
        _ => Err(syn::Error::new_spanned(&input.ident, "只支持结构体")),
    }
}

/// 检查类型是否为 Option<T>
pub fn is_option_type(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}
