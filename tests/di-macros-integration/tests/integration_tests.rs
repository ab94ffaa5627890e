//! 派生宏 `Params` 与 `Results` 的集成测试

use di_abstractions::{
    value, Argument, Arguments, Key, ParamList, ParamSpec, Params, ResultOptions, Results,
};
use di_impl::{Container, InvokeOptions, ProvideOptions};
use std::convert::Infallible;
use std::sync::Arc;

#[derive(Debug)]
pub struct Database {
    pub url: String,
}

#[derive(Debug)]
pub struct Cache;

#[derive(Debug)]
pub struct Plugin {
    pub name: String,
}

#[derive(Params)]
pub struct ServiceParams {
    pub database: Arc<Database>,
    #[dig(name = "read")]
    pub replica: Arc<Database>,
    #[dig(optional)]
    pub cache: Option<Arc<Cache>>,
    #[dig(group = "plugins,soft")]
    pub plugins: Vec<Arc<Plugin>>,
    #[dig(skip)]
    pub retries: u32,
}

#[derive(Params)]
pub struct Nested {
    pub inner: ServiceParams,
    pub cache: Arc<Cache>,
}

#[derive(Results)]
pub struct Storage {
    pub database: Arc<Database>,
    #[dig(name = "read")]
    pub replica: Arc<Database>,
    #[dig(group = "plugins")]
    pub plugin: Arc<Plugin>,
}

#[derive(Params)]
pub struct Empty;

fn collect<P: Params>() -> ParamList {
    let mut list = ParamList::new();
    P::collect(&mut list).unwrap();
    list
}

#[test]
fn test_params_collect_in_field_order() {
    let list = collect::<ServiceParams>();
    assert_eq!(
        list,
        vec![
            ParamSpec::Single {
                key: Key::of::<Database>(),
                optional: false
            },
            ParamSpec::Single {
                key: Key::named::<Database>("read"),
                optional: false
            },
            ParamSpec::Single {
                key: Key::of::<Cache>(),
                optional: true
            },
            ParamSpec::Group {
                key: Key::grouped::<Plugin>("plugins"),
                soft: true
            },
        ]
    );
}

#[test]
fn test_nested_params_are_flattened() {
    let list = collect::<Nested>();
    assert_eq!(list.len(), 5);
    assert_eq!(list[4].key(), &Key::of::<Cache>());
}

#[test]
fn test_unit_params_are_empty() {
    assert!(collect::<Empty>().is_empty());
}

#[test]
fn test_params_extract() {
    let primary = value::wrap(Arc::new(Database {
        url: "primary".to_string(),
    }));
    let replica = value::wrap(Arc::new(Database {
        url: "replica".to_string(),
    }));
    let plugin = value::wrap(Arc::new(Plugin {
        name: "audit".to_string(),
    }));

    let mut args = Arguments::new(vec![
        (Key::of::<Database>(), Argument::Value(primary)),
        (Key::named::<Database>("read"), Argument::Value(replica)),
        (Key::of::<Cache>(), Argument::Missing),
        (Key::grouped::<Plugin>("plugins"), Argument::Group(vec![plugin])),
    ]);
    let params = ServiceParams::extract(&mut args).unwrap();

    assert_eq!(params.database.url, "primary");
    assert_eq!(params.replica.url, "replica");
    assert!(params.cache.is_none());
    assert_eq!(params.plugins.len(), 1);
    assert_eq!(params.plugins[0].name, "audit");
    assert_eq!(params.retries, 0);
    assert_eq!(args.remaining(), 0);
}

#[test]
fn test_results_collect() {
    assert!(<Storage as Results>::OBJECT);

    let mut specs = Vec::new();
    Storage::collect(&ResultOptions::default(), &mut specs).unwrap();
    let keys: Vec<Key> = specs.iter().flat_map(|spec| spec.keys().cloned()).collect();
    assert_eq!(
        keys,
        vec![
            Key::of::<Database>(),
            Key::named::<Database>("read"),
            Key::grouped::<Plugin>("plugins"),
        ]
    );
}

#[test]
fn test_results_into_values() {
    let storage = Storage {
        database: Arc::new(Database {
            url: "a".to_string(),
        }),
        replica: Arc::new(Database {
            url: "b".to_string(),
        }),
        plugin: Arc::new(Plugin {
            name: "c".to_string(),
        }),
    };
    let mut values = Vec::new();
    storage.into_values(&mut values);
    assert_eq!(values.len(), 3);
}

#[test]
fn test_derived_types_in_container() {
    let mut container = Container::new();
    container
        .provide(
            || {
                Ok::<_, Infallible>(Storage {
                    database: Arc::new(Database {
                        url: "postgres://primary".to_string(),
                    }),
                    replica: Arc::new(Database {
                        url: "postgres://replica".to_string(),
                    }),
                    plugin: Arc::new(Plugin {
                        name: "metrics".to_string(),
                    }),
                })
            },
            ProvideOptions::new(),
        )
        .unwrap();

    let summary = container
        .invoke(
            |params: ServiceParams| {
                Ok::<_, Infallible>(format!(
                    "{} {} {} {}",
                    params.database.url,
                    params.replica.url,
                    params.cache.is_some(),
                    params.plugins.len()
                ))
            },
            InvokeOptions::new(),
        )
        .unwrap();
    // 软值组的贡献者已在解析数据库时运行
    assert_eq!(summary, "postgres://primary postgres://replica false 1");
}
