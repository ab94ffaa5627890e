//! 值组描述字符串解析
//!
//! 格式为 `name[,flatten][,soft]`，名称之后的每个选项都必须可识别。

use crate::errors::{DigError, DigResult};

/// 解析后的值组描述
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupSpec {
    /// 值组名称
    pub name: String,
    /// 是否将序列结果逐个展开加入值组
    pub flatten: bool,
    /// 软值组：只收集已经运行过的生产者贡献的值
    pub soft: bool,
}

impl GroupSpec {
    /// 解析值组描述字符串
    pub fn parse(spec: &str) -> DigResult<Self> {
        let mut parts = spec.split(',');
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(DigError::invalid_input(format!(
                "值组描述 {spec:?} 缺少名称"
            )));
        }

        let mut group = Self {
            name: name.to_string(),
            ..Self::default()
        };
        for option in parts {
            match option {
                "flatten" => group.flatten = true,
                "soft" => group.soft = true,
                other => {
                    return Err(DigError::InvalidGroupOption {
                        option: other.to_string(),
                    })
                }
            }
        }
        Ok(group)
    }
}
