//! 结果描述
//!
//! 生产者返回的每个值对应一个 [`ResultSpec`]。一个值可以登记到多个键上
//! （通过 [`As`] 转换），序列值可以展开后逐个加入值组。

use crate::value::{self, Value};
use di_common::{DigError, DigResult, GroupSpec, Key, TypeInfo};
use std::sync::Arc;

/// 值转换函数，输入类型不符时返回 `None`
pub type Converter = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// 序列展开函数
pub type Splitter = Arc<dyn Fn(&Value) -> Option<Vec<Value>> + Send + Sync>;

/// 值登记的目标键
#[derive(Clone)]
pub struct ResultTarget {
    /// 目标键
    pub key: Key,
    /// 登记前对值的转换
    pub convert: Option<Converter>,
}

impl std::fmt::Debug for ResultTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultTarget")
            .field("key", &self.key)
            .field("convert", &self.convert.as_ref().map(|_| "<function>"))
            .finish()
    }
}

/// 单个返回值的描述
#[derive(Clone)]
pub struct ResultSpec {
    /// 登记目标，至少一个
    pub targets: Vec<ResultTarget>,
    /// 展开函数，仅用于 flatten 值组
    pub split: Option<Splitter>,
}

impl ResultSpec {
    /// 所有目标键
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.targets.iter().map(|target| &target.key)
    }
}

impl std::fmt::Debug for ResultSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSpec")
            .field("targets", &self.targets)
            .field("flatten", &self.split.is_some())
            .finish()
    }
}

/// 以另一个类型提供值
///
/// ```
/// use di_abstractions::As;
/// use std::sync::Arc;
///
/// trait Store: Send + Sync {}
/// struct Memory;
/// impl Store for Memory {}
///
/// let as_store = As::new(|memory: Arc<Memory>| memory as Arc<dyn Store>);
/// assert!(as_store.target().name.contains("Store"));
/// ```
#[derive(Clone)]
pub struct As {
    source: TypeInfo,
    target: TypeInfo,
    convert: Converter,
}

impl As {
    /// 由转换函数创建
    pub fn new<T, U, F>(convert: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        U: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static,
    {
        Self {
            source: TypeInfo::of::<T>(),
            target: TypeInfo::of::<U>(),
            convert: Arc::new(move |input: &Value| {
                value::downcast::<T>(input).map(|typed| value::wrap(convert(typed)))
            }),
        }
    }

    /// 源类型
    pub fn source(&self) -> TypeInfo {
        self.source
    }

    /// 目标类型
    pub fn target(&self) -> TypeInfo {
        self.target
    }
}

impl std::fmt::Debug for As {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "As({} -> {})", self.source, self.target)
    }
}

/// 结果登记选项
#[derive(Debug, Clone, Default)]
pub struct ResultOptions {
    /// 命名
    pub name: Option<String>,
    /// 值组描述字符串
    pub group: Option<String>,
    /// 类型转换
    pub as_types: Vec<As>,
}

impl ResultOptions {
    /// 结构体字段上的选项
    pub fn field(name: Option<&str>, group: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            group: group.map(str::to_string),
            as_types: Vec::new(),
        }
    }

    fn group_spec(&self) -> DigResult<Option<GroupSpec>> {
        if self.name.is_some() && self.group.is_some() {
            return Err(DigError::invalid_input("不能同时为结果指定名称和值组"));
        }
        let group = self.group.as_deref().map(GroupSpec::parse).transpose()?;
        if let Some(group) = &group {
            if group.soft {
                return Err(DigError::invalid_input(format!(
                    "结果值组 {:?} 不能使用 soft 选项",
                    group.name
                )));
            }
        }
        Ok(group)
    }

    fn targets_for(&self, element: TypeInfo, group: Option<&GroupSpec>) -> DigResult<Vec<ResultTarget>> {
        let base = Key::new(element)
            .with_name(self.name.clone())
            .with_group(group.map(|g| g.name.clone()));
        if self.as_types.is_empty() {
            return Ok(vec![ResultTarget {
                key: base,
                convert: None,
            }]);
        }

        self.as_types
            .iter()
            .map(|as_type| {
                if as_type.source != element {
                    return Err(DigError::invalid_input(format!(
                        "{} 不能作为 {} 提供：转换函数的输入类型是 {}",
                        element, as_type.target, as_type.source
                    )));
                }
                Ok(ResultTarget {
                    key: Key {
                        type_info: as_type.target,
                        ..base.clone()
                    },
                    convert: Some(Arc::clone(&as_type.convert)),
                })
            })
            .collect()
    }
}

/// 可作为生产者返回值的类型
pub trait Results: Sized {
    /// 是否为结果对象（字段各自登记）
    const OBJECT: bool = false;

    /// 追加结果描述
    fn collect(options: &ResultOptions, specs: &mut Vec<ResultSpec>) -> DigResult<()>;

    /// 按 `collect` 的顺序产出值，每个描述恰好一个
    fn into_values(self, values: &mut Vec<Value>);
}

impl<T> Results for Arc<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn collect(options: &ResultOptions, specs: &mut Vec<ResultSpec>) -> DigResult<()> {
        let group = options.group_spec()?;
        if let Some(group) = &group {
            if group.flatten {
                return Err(DigError::invalid_input(format!(
                    "flatten 值组 {:?} 需要序列结果，实际为 {}",
                    group.name,
                    std::any::type_name::<T>()
                )));
            }
        }
        specs.push(ResultSpec {
            targets: options.targets_for(TypeInfo::of::<T>(), group.as_ref())?,
            split: None,
        });
        Ok(())
    }

    fn into_values(self, values: &mut Vec<Value>) {
        values.push(value::wrap(self));
    }
}

impl<T> Results for Vec<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    fn collect(options: &ResultOptions, specs: &mut Vec<ResultSpec>) -> DigResult<()> {
        let group = match options.group_spec()? {
            Some(group) if group.flatten => group,
            _ => {
                return Err(DigError::invalid_input(format!(
                    "序列结果 {} 只能提供给带 flatten 选项的值组",
                    std::any::type_name::<Self>()
                )))
            }
        };
        let split: Splitter = Arc::new(|input: &Value| {
            input
                .downcast_ref::<Vec<Arc<T>>>()
                .map(|items| items.iter().map(|item| value::wrap(Arc::clone(item))).collect())
        });
        specs.push(ResultSpec {
            targets: options.targets_for(TypeInfo::of::<T>(), Some(&group))?,
            split: Some(split),
        });
        Ok(())
    }

    fn into_values(self, values: &mut Vec<Value>) {
        values.push(Arc::new(self));
    }
}

impl Results for () {
    fn collect(_options: &ResultOptions, _specs: &mut Vec<ResultSpec>) -> DigResult<()> {
        Ok(())
    }

    fn into_values(self, _values: &mut Vec<Value>) {}
}
