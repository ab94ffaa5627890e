//! 跨 crate 的端到端测试：从配置构建容器，装配一个小型应用

use di_composition::ContainerBuilder;
use di_impl::{
    CallbackInfo, DecorateOptions, DigError, InvokeOptions, Params, ProvideOptions, Results,
    TimeSource,
};
use std::convert::Infallible;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

#[derive(Debug)]
struct AppConfig {
    name: String,
    database_url: String,
}

#[derive(Debug)]
struct Database {
    url: String,
}

#[derive(Debug)]
struct Handler {
    path: &'static str,
}

#[derive(Debug)]
struct Server {
    name: String,
    primary: String,
    replica: String,
    routes: Vec<&'static str>,
}

#[derive(Debug)]
struct RequestContext {
    id: u64,
}

#[derive(Results)]
struct Storage {
    primary: Arc<Database>,
    #[dig(name = "replica")]
    replica: Arc<Database>,
}

#[derive(Params)]
struct ServerParams {
    config: Arc<AppConfig>,
    primary: Arc<Database>,
    #[dig(name = "replica")]
    replica: Arc<Database>,
    #[dig(group = "routes")]
    handlers: Vec<Arc<Handler>>,
}

#[derive(Params)]
struct Routes {
    #[dig(group = "routes")]
    handlers: Vec<Arc<Handler>>,
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn new_config() -> anyhow::Result<Arc<AppConfig>> {
    Ok(Arc::new(AppConfig {
        name: "gateway".to_string(),
        database_url: "postgres://db".to_string(),
    }))
}

fn new_storage(config: Arc<AppConfig>) -> anyhow::Result<Storage> {
    Ok(Storage {
        primary: Arc::new(Database {
            url: format!("{}/primary", config.database_url),
        }),
        replica: Arc::new(Database {
            url: format!("{}/replica", config.database_url),
        }),
    })
}

fn new_server(params: ServerParams) -> anyhow::Result<Arc<Server>> {
    Ok(Arc::new(Server {
        name: params.config.name.clone(),
        primary: params.primary.url.clone(),
        replica: params.replica.url.clone(),
        routes: params.handlers.iter().map(|handler| handler.path).collect(),
    }))
}

fn route(path: &'static str) -> impl Fn() -> anyhow::Result<Arc<Handler>> + Send + Sync + 'static {
    move || Ok(Arc::new(Handler { path }))
}

fn wire_application(container: &mut di_impl::Container) {
    container
        .provide_all(|batch| {
            batch.provide(new_config, ProvideOptions::new())?;
            batch.provide(new_storage, ProvideOptions::new())?;
            batch.provide(route("/users"), ProvideOptions::new().group("routes"))?;
            batch.provide(route("/orders"), ProvideOptions::new().group("routes"))?;
            batch.provide(route("/health"), ProvideOptions::new().group("routes"))?;
            batch.provide(new_server, ProvideOptions::new())
        })
        .unwrap();
}

#[test]
fn test_application_wiring() {
    let mut container = ContainerBuilder::new().build().unwrap();
    wire_application(&mut container);

    let server = container
        .invoke(|server: Arc<Server>| Ok::<_, Infallible>(server), InvokeOptions::new())
        .unwrap();
    assert_eq!(server.name, "gateway");
    assert_eq!(server.primary, "postgres://db/primary");
    assert_eq!(server.replica, "postgres://db/replica");
    assert_eq!(server.routes, vec!["/users", "/orders", "/health"]);

    // 单例：再次调用得到同一个实例
    let again = container
        .invoke(|server: Arc<Server>| Ok::<_, Infallible>(server), InvokeOptions::new())
        .unwrap();
    assert!(Arc::ptr_eq(&server, &again));
}

#[test]
fn test_request_scopes() {
    let mut container = ContainerBuilder::new().build().unwrap();
    wire_application(&mut container);
    let root = container.root();

    for id in 1..=2 {
        let request = container.child(root, format!("request-{id}")).unwrap();
        let mut scope = container.scope(request).unwrap();
        scope
            .provide(
                move || Ok::<_, Infallible>(Arc::new(RequestContext { id })),
                ProvideOptions::new(),
            )
            .unwrap();
        scope
            .decorate(
                |config: Arc<AppConfig>, context: Arc<RequestContext>| {
                    Ok::<_, Infallible>(Arc::new(AppConfig {
                        name: format!("{}#{}", config.name, context.id),
                        database_url: config.database_url.clone(),
                    }))
                },
                DecorateOptions::new(),
            )
            .unwrap();

        let name = scope
            .invoke(
                |config: Arc<AppConfig>| Ok::<_, Infallible>(config.name.clone()),
                InvokeOptions::new(),
            )
            .unwrap();
        assert_eq!(name, format!("gateway#{id}"));
    }

    // 根作用域不受请求作用域装饰器影响
    let name = container
        .invoke(
            |config: Arc<AppConfig>| Ok::<_, Infallible>(config.name.clone()),
            InvokeOptions::new(),
        )
        .unwrap();
    assert_eq!(name, "gateway");
    assert_eq!(container.scope_count(), 3);
}

struct A;
struct B;

fn new_a(_b: Arc<B>) -> anyhow::Result<Arc<A>> {
    Ok(Arc::new(A))
}

fn new_b(_a: Arc<A>) -> anyhow::Result<Arc<B>> {
    Ok(Arc::new(B))
}

#[test]
fn test_deferred_verification_from_config() {
    let file = config_file("defer_acyclic_verification = true\n");
    let mut container = ContainerBuilder::new()
        .add_config_toml(file.path())
        .unwrap()
        .build()
        .unwrap();

    container.provide(new_a, ProvideOptions::new()).unwrap();
    container.provide(new_b, ProvideOptions::new()).unwrap();

    let err = container
        .invoke(|_a: Arc<A>| Ok::<_, Infallible>(()), InvokeOptions::new())
        .unwrap_err();
    assert!(err.is_cycle_detected());

    let wrapped = anyhow::Error::new(err).context("启动失败");
    assert!(di_common::is_cycle_detected(&*wrapped));
}

fn unstable_database(_config: Arc<AppConfig>) -> anyhow::Result<Arc<Database>> {
    panic!("数据库驱动崩溃");
}

#[test]
fn test_recovered_panic_from_config() {
    let file = config_file(r#"{ "recover_from_panics": true }"#);
    let mut container = ContainerBuilder::new()
        .add_config_json(file.path())
        .unwrap()
        .build()
        .unwrap();
    container.provide(new_config, ProvideOptions::new()).unwrap();
    container.provide(unstable_database, ProvideOptions::new()).unwrap();

    let err = container
        .invoke(|_database: Arc<Database>| Ok::<_, Infallible>(()), InvokeOptions::new())
        .unwrap_err();
    match err {
        DigError::RecoveredFault { location, payload } => {
            assert_eq!(location.unwrap().function, "unstable_database");
            assert_eq!(payload, "数据库驱动崩溃");
        }
        other => panic!("意外的错误: {other}"),
    }
}

fn paths(routes: &Routes) -> Vec<&'static str> {
    routes.handlers.iter().map(|handler| handler.path).collect()
}

fn seeded_container(file: &NamedTempFile) -> di_impl::Container {
    let mut container = ContainerBuilder::new()
        .add_config_yaml(file.path())
        .unwrap()
        .build()
        .unwrap();
    wire_application(&mut container);
    container
}

#[test]
fn test_seeded_group_order_from_config() {
    let file = config_file("group_order_seed: 7\n");
    let mut first = seeded_container(&file);
    let mut second = seeded_container(&file);

    // 同一次调用中两次读取值组，顺序一致
    let read_twice = |a: Routes, b: Routes| Ok::<_, Infallible>((paths(&a), paths(&b)));
    let (left, right) = first.invoke(read_twice, InvokeOptions::new()).unwrap();
    assert_eq!(left, right);

    // 相同种子的容器给出相同顺序
    let (other, _) = second.invoke(read_twice, InvokeOptions::new()).unwrap();
    assert_eq!(left, other);

    let mut sorted = left;
    sorted.sort_unstable();
    assert_eq!(sorted, vec!["/health", "/orders", "/users"]);
}

struct StepClock {
    base: Instant,
    ticks: AtomicU64,
}

impl TimeSource for StepClock {
    fn now(&self) -> Instant {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.base + Duration::from_millis(5 * tick)
    }
}

#[test]
fn test_callbacks_use_builder_clock() {
    let clock = Arc::new(StepClock {
        base: Instant::now(),
        ticks: AtomicU64::new(0),
    });
    let records: Arc<Mutex<Vec<(String, Duration)>>> = Arc::default();

    let mut container = ContainerBuilder::new().with_clock(clock).build().unwrap();
    let sink = Arc::clone(&records);
    container
        .provide(
            new_config,
            ProvideOptions::new().on_complete(move |info: &CallbackInfo<'_>| {
                sink.lock()
                    .unwrap()
                    .push((info.name.to_string(), info.runtime));
            }),
        )
        .unwrap();

    container
        .invoke(|_config: Arc<AppConfig>| Ok::<_, Infallible>(()), InvokeOptions::new())
        .unwrap();

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].0.ends_with("new_config"));
    assert_eq!(records[0].1, Duration::from_millis(5));
}
