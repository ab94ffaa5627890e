//! 元数据定义
//!
//! 提供类型信息和源码位置信息，用于依赖键与诊断输出

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 类型信息
///
/// 相等性与哈希只看 [`TypeId`]，名称仅用于诊断
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    /// 完整类型名称
    pub name: &'static str,
    /// 类型ID
    pub id: TypeId,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 去掉泛型外层之前的模块路径
fn short_type_name(name: &str) -> &str {
    let head = name.split('<').next().unwrap_or(name);
    match head.rfind("::") {
        Some(index) => &name[index + 2..],
        None => name,
    }
}

/// 函数的源码位置
///
/// `Display` 输出单行形式 `"package".function (file:line)`，
/// 备用格式 `{:#}` 输出两行形式，第二行缩进显示文件与行号。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// 函数所在的包（模块路径）
    pub package: String,
    /// 函数名称
    pub function: String,
    /// 注册调用所在文件
    pub file: &'static str,
    /// 注册调用所在行
    pub line: u32,
}

impl Location {
    /// 手动创建位置信息
    pub fn new(
        package: impl Into<String>,
        function: impl Into<String>,
        file: &'static str,
        line: u32,
    ) -> Self {
        Self {
            package: package.into(),
            function: function.into(),
            file,
            line,
        }
    }

    /// 以调用者位置和函数类型名构造位置信息
    ///
    /// 闭包的类型名形如 `crate::module::{{closure}}`，同样按最后一个 `::` 拆分。
    #[track_caller]
    pub fn caller<F: ?Sized>() -> Self {
        let caller = std::panic::Location::caller();
        let (package, function) = split_function_name(std::any::type_name::<F>());
        Self {
            package: package.to_string(),
            function: function.to_string(),
            file: caller.file(),
            line: caller.line(),
        }
    }

    /// 带包路径的函数全名
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.function.clone()
        } else {
            format!("{}::{}", self.package, self.function)
        }
    }
}

fn split_function_name(name: &str) -> (&str, &str) {
    // 泛型参数里也可能含有 `::`，只在泛型之前的部分查找
    let head_len = name.find('<').unwrap_or(name.len());
    match name[..head_len].rfind("::") {
        Some(index) => (&name[..index], &name[index + 2..]),
        None => ("", name),
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            write!(f, "{}", self.function)?;
        } else {
            write!(f, "\"{}\".{}", self.package, self.function)?;
        }
        if f.alternate() {
            write!(f, "\n\t{}:{}", self.file, self.line)
        } else {
            write!(f, " ({}:{})", self.file, self.line)
        }
    }
}
