//! 参数描述
//!
//! 生产者的每个参数在注册时展开成 [`ParamSpec`]，解析时容器按同样的顺序
//! 准备 [`Arguments`]，再由 [`Params::extract`] 还原成具体类型。

use crate::value::{self, Value};
use di_common::{DigError, DigResult, GroupSpec, Key};
use std::sync::Arc;

/// 单个参数的描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSpec {
    /// 单个值，可选参数在缺失时得到 `None`
    Single {
        /// 依赖键
        key: Key,
        /// 是否可选
        optional: bool,
    },
    /// 值组，软值组只收集已运行的生产者的贡献
    Group {
        /// 值组键
        key: Key,
        /// 是否为软值组
        soft: bool,
    },
}

impl ParamSpec {
    /// 参数的依赖键
    pub fn key(&self) -> &Key {
        match self {
            Self::Single { key, .. } | Self::Group { key, .. } => key,
        }
    }
}

/// 规范化的参数列表
pub type ParamList = Vec<ParamSpec>;

/// 解析得到的单个实参
#[derive(Clone)]
pub enum Argument {
    /// 已解析的值
    Value(Value),
    /// 可选参数缺失
    Missing,
    /// 值组的全部成员
    Group(Vec<Value>),
}

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value(..)"),
            Self::Missing => f.write_str("Missing"),
            Self::Group(values) => write!(f, "Group(len = {})", values.len()),
        }
    }
}

/// 按参数列表顺序排列的实参游标
#[derive(Debug)]
pub struct Arguments {
    items: std::vec::IntoIter<(Key, Argument)>,
}

impl Arguments {
    /// 由已解析的实参创建游标
    pub fn new(items: Vec<(Key, Argument)>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }

    /// 取出下一个实参
    pub fn next_argument(&mut self) -> DigResult<(Key, Argument)> {
        self.items
            .next()
            .ok_or_else(|| DigError::invalid_input("实参数量少于参数声明"))
    }

    /// 剩余实参数量
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

/// 可作为生产者参数的类型
///
/// `collect` 追加的描述数量必须与 `extract` 消费的实参数量一致。
pub trait Params: Sized {
    /// 追加参数描述
    fn collect(list: &mut ParamList) -> DigResult<()>;

    /// 从实参游标还原参数
    fn extract(args: &mut Arguments) -> DigResult<Self>;
}

/// 单值依赖，供派生宏处理带名称的字段
pub trait Dependency: Sized {
    /// 生成参数描述
    fn spec(name: Option<&str>) -> ParamSpec;

    /// 从实参还原
    fn from_argument(key: Key, argument: Argument) -> DigResult<Self>;
}

/// 值组依赖
pub trait GroupDependency: Sized {
    /// 由值组描述字符串生成参数描述
    fn spec(group: &str) -> DigResult<ParamSpec>;

    /// 从实参还原
    fn from_argument(key: Key, argument: Argument) -> DigResult<Self>;
}

fn mismatch<T: ?Sized>(key: Key) -> DigError {
    DigError::TypeMismatch {
        key,
        expected: std::any::type_name::<T>(),
    }
}

impl<T> Dependency for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn spec(name: Option<&str>) -> ParamSpec {
        ParamSpec::Single {
            key: Key::of::<T>().with_name(name.map(str::to_string)),
            optional: false,
        }
    }

    fn from_argument(key: Key, argument: Argument) -> DigResult<Self> {
        match argument {
            Argument::Value(value) => value::downcast::<T>(&value).ok_or_else(|| mismatch::<Self>(key)),
            Argument::Missing => Err(DigError::NotFound {
                key,
                requested_by: None,
                scope: String::new(),
            }),
            Argument::Group(_) => Err(mismatch::<Self>(key)),
        }
    }
}

impl<T> Dependency for Option<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn spec(name: Option<&str>) -> ParamSpec {
        ParamSpec::Single {
            key: Key::of::<T>().with_name(name.map(str::to_string)),
            optional: true,
        }
    }

    fn from_argument(key: Key, argument: Argument) -> DigResult<Self> {
        match argument {
            Argument::Missing => Ok(None),
            other => <Arc<T> as Dependency>::from_argument(key, other).map(Some),
        }
    }
}

impl<T> GroupDependency for Vec<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn spec(group: &str) -> DigResult<ParamSpec> {
        let group = GroupSpec::parse(group)?;
        if group.flatten {
            return Err(DigError::invalid_input(format!(
                "参数值组 {:?} 不能使用 flatten 选项",
                group.name
            )));
        }
        Ok(ParamSpec::Group {
            key: Key::grouped::<T>(group.name),
            soft: group.soft,
        })
    }

    fn from_argument(key: Key, argument: Argument) -> DigResult<Self> {
        match argument {
            Argument::Group(values) => values
                .iter()
                .map(|value| value::downcast::<T>(value).ok_or_else(|| mismatch::<Arc<T>>(key.clone())))
                .collect(),
            _ => Err(mismatch::<Self>(key)),
        }
    }
}

impl<T> Params for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn collect(list: &mut ParamList) -> DigResult<()> {
        list.push(<Self as Dependency>::spec(None));
        Ok(())
    }

    fn extract(args: &mut Arguments) -> DigResult<Self> {
        let (key, argument) = args.next_argument()?;
        <Self as Dependency>::from_argument(key, argument)
    }
}

impl<T> Params for Option<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn collect(list: &mut ParamList) -> DigResult<()> {
        list.push(<Self as Dependency>::spec(None));
        Ok(())
    }

    fn extract(args: &mut Arguments) -> DigResult<Self> {
        let (key, argument) = args.next_argument()?;
        <Self as Dependency>::from_argument(key, argument)
    }
}
