//! 容器构建器

use crate::error::CompositionError;
use crate::logging::{init_logging, LoggingConfig};
use crate::settings::ContainerSettings;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use di_abstractions::TimeSource;
use di_impl::{Container, ContainerOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 容器构建器
///
/// 使用建造者模式按顺序叠加配置源，后添加的配置源覆盖先添加的。
pub struct ContainerBuilder {
    /// 配置源
    sources: ConfigBuilder<DefaultState>,
    /// 显式指定的容器选项，优先于配置源
    options: Option<ContainerOptions>,
    /// 替换的时钟
    clock: Option<Arc<dyn TimeSource>>,
    /// 显式指定的日志配置，优先于配置源中的 `logging` 节
    logging: Option<LoggingConfig>,
}

impl ContainerBuilder {
    /// 创建新的容器构建器
    pub fn new() -> Self {
        Self {
            sources: ConfigBuilder::default(),
            options: None,
            clock: None,
            logging: None,
        }
    }

    /// 添加 TOML 配置文件
    pub fn add_config_toml<P: AsRef<Path>>(self, path: P) -> Result<Self, CompositionError> {
        self.add_config_file(path.as_ref(), FileFormat::Toml)
    }

    /// 添加 JSON 配置文件
    pub fn add_config_json<P: AsRef<Path>>(self, path: P) -> Result<Self, CompositionError> {
        self.add_config_file(path.as_ref(), FileFormat::Json)
    }

    /// 添加 YAML 配置文件
    pub fn add_config_yaml<P: AsRef<Path>>(self, path: P) -> Result<Self, CompositionError> {
        self.add_config_file(path.as_ref(), FileFormat::Yaml)
    }

    fn add_config_file(mut self, path: &Path, format: FileFormat) -> Result<Self, CompositionError> {
        if !path.exists() {
            return Err(CompositionError::ConfigFileNotFound {
                path: path.to_path_buf(),
            });
        }

        info!("添加 {:?} 配置文件: {}", format, path.display());
        self.sources = self.sources.add_source(File::from(path).format(format));
        Ok(self)
    }

    /// 添加环境变量配置源
    ///
    /// 前缀与键之间用 `_` 分隔，嵌套键用 `__` 分隔，例如 `DI_LOGGING__LEVEL`。
    pub fn add_config_env_vars<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        info!("添加环境变量配置源，前缀: {}", prefix);

        self.sources = self.sources.add_source(
            Environment::with_prefix(&prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        self
    }

    /// 指定容器选项，忽略配置源中的容器设置
    pub fn with_options(mut self, options: ContainerOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// 替换计时用的时钟
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// 读取并合并全部配置源
    pub fn settings(&self) -> Result<ContainerSettings, CompositionError> {
        let settings: ContainerSettings = self.sources.clone().build()?.try_deserialize()?;
        debug!("容器配置: {:?}", settings);
        Ok(settings)
    }

    /// 构建容器
    pub fn build(self) -> Result<Container, CompositionError> {
        info!("开始构建依赖注入容器");
        let settings = self.settings()?;

        let logging = match self.logging {
            Some(config) => Some(config),
            None => settings
                .logging
                .as_ref()
                .map(LoggingConfig::from_settings)
                .transpose()?,
        };
        if let Some(config) = &logging {
            init_logging(config)?;
        }

        let mut options = self.options.unwrap_or_else(|| settings.to_options());
        if let Some(clock) = self.clock {
            options = options.clock(clock);
        }

        let container = Container::with_options(options);
        info!("依赖注入容器构建完成");
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
