//! 循环检测、注册回滚、panic 恢复与完成回调的集成测试

use di_impl::{
    CallbackInfo, Container, ContainerOptions, DigError, InvokeOptions, Key, Params,
    ProvideOptions, TimeSource,
};
use std::convert::Infallible;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct A;
struct B;
struct C;

#[derive(Debug)]
struct Config {
    port: u16,
}

struct Database;

struct Plugin;

struct Registry;

#[derive(Params)]
struct Plugins {
    #[dig(group = "plugins")]
    plugins: Vec<Arc<Plugin>>,
}

fn new_a(_b: Arc<B>) -> anyhow::Result<Arc<A>> {
    Ok(Arc::new(A))
}

fn new_b(_c: Arc<C>) -> anyhow::Result<Arc<B>> {
    Ok(Arc::new(B))
}

fn new_c(_a: Arc<A>) -> anyhow::Result<Arc<C>> {
    Ok(Arc::new(C))
}

fn new_config() -> anyhow::Result<Arc<Config>> {
    Ok(Arc::new(Config { port: 8080 }))
}

fn new_database(_config: Arc<Config>) -> anyhow::Result<Arc<Database>> {
    Ok(Arc::new(Database))
}

fn exploding_database(_config: Arc<Config>) -> anyhow::Result<Arc<Database>> {
    panic!("连接池初始化失败")
}

fn port(config: Arc<Config>) -> Result<u16, Infallible> {
    Ok(config.port)
}

#[test]
fn test_cycle_rejected_at_provide() {
    let mut container = Container::new();
    container.provide(new_a, ProvideOptions::new()).unwrap();
    container.provide(new_b, ProvideOptions::new()).unwrap();

    let err = container.provide(new_c, ProvideOptions::new()).unwrap_err();
    assert!(err.is_cycle_detected());

    let DigError::InvalidInput {
        source: Some(cause), ..
    } = err
    else {
        panic!("注册引入循环时应返回无效输入错误");
    };
    let DigError::CycleDetected(path) = *cause else {
        panic!("原因应为循环错误");
    };
    let keys: Vec<Key> = path.entries.iter().map(|entry| entry.key.clone()).collect();
    assert_eq!(
        keys,
        vec![Key::of::<A>(), Key::of::<B>(), Key::of::<C>(), Key::of::<A>()]
    );
    assert_eq!(path.entries[2].location.function, "new_c");

    // 引入循环的注册被撤销
    let scope = container.root_scope();
    assert!(!scope.has_provider(&Key::of::<C>()));
    assert_eq!(scope.graph_order(), 2);
    assert!(scope.is_verified_acyclic());
}

#[test]
fn test_cycle_error_is_found_through_wrappers() {
    let mut container = Container::new();
    container.provide(new_a, ProvideOptions::new()).unwrap();
    container.provide(new_b, ProvideOptions::new()).unwrap();

    let err = container.provide(new_c, ProvideOptions::new()).unwrap_err();
    let wrapped = anyhow::Error::new(err).context("启动失败");
    assert!(di_common::is_cycle_detected(&*wrapped));
}

#[test]
fn test_deferred_cycle_detected_at_invoke() {
    let mut container =
        Container::with_options(ContainerOptions::new().defer_acyclic_verification(true));
    container.provide(new_a, ProvideOptions::new()).unwrap();
    container.provide(new_b, ProvideOptions::new()).unwrap();
    container.provide(new_c, ProvideOptions::new()).unwrap();
    assert!(!container.root_scope().is_verified_acyclic());

    let err = container
        .invoke(|_a: Arc<A>| Ok::<_, Infallible>(()), InvokeOptions::new())
        .unwrap_err();
    match err {
        DigError::CycleDetected(path) => {
            assert_eq!(path.entries.len(), 4);
            assert_eq!(path.entries.first(), path.entries.last());
        }
        other => panic!("意外的错误: {other}"),
    }
}

#[test]
fn test_deferred_acyclic_graph_is_verified_once() {
    let mut container =
        Container::with_options(ContainerOptions::new().defer_acyclic_verification(true));
    container.provide(new_config, ProvideOptions::new()).unwrap();
    container.provide(new_database, ProvideOptions::new()).unwrap();
    assert!(!container.root_scope().is_verified_acyclic());

    container
        .invoke(|_database: Arc<Database>| Ok::<_, Infallible>(()), InvokeOptions::new())
        .unwrap();
    assert!(container.root_scope().is_verified_acyclic());
}

#[test]
fn test_cycle_in_child_scope() {
    let mut container = Container::new();
    let root = container.root();
    let child = container.child(root, "worker").unwrap();

    let mut scope = container.scope(child).unwrap();
    scope.provide(new_a, ProvideOptions::new()).unwrap();
    scope.provide(new_b, ProvideOptions::new()).unwrap();
    let err = scope.provide(new_c, ProvideOptions::new()).unwrap_err();
    assert!(err.is_cycle_detected());
    assert!(err.to_string().contains("该函数引入了依赖循环"));

    let DigError::InvalidInput {
        source: Some(cause), ..
    } = err
    else {
        panic!("注册引入循环时应返回无效输入错误");
    };
    assert!(matches!(*cause, DigError::CycleDetected(ref path) if path.scope == "worker"));
    assert_eq!(container.root_scope().graph_order(), 0);
}

#[test]
fn test_batch_rolls_back_on_failure() {
    let mut container = Container::new();
    container.provide(new_config, ProvideOptions::new()).unwrap();

    let err = container
        .provide_all(|batch| {
            batch.provide(new_database, ProvideOptions::new())?;
            batch.provide(new_config, ProvideOptions::new())
        })
        .unwrap_err();
    assert!(matches!(err, DigError::AmbiguousProvider { .. }));

    let scope = container.root_scope();
    assert_eq!(scope.graph_order(), 1);
    assert!(!scope.has_provider(&Key::of::<Database>()));
    assert!(scope.has_provider(&Key::of::<Config>()));
}

fn new_registry(_plugins: Plugins) -> anyhow::Result<Arc<Registry>> {
    Ok(Arc::new(Registry))
}

fn new_plugin(_registry: Arc<Registry>) -> anyhow::Result<Arc<Plugin>> {
    Ok(Arc::new(Plugin))
}

#[test]
fn test_batch_with_invalid_group_rolls_back() {
    let mut container = Container::new();

    let err = container
        .provide_all(|batch| {
            batch.provide(new_config, ProvideOptions::new())?;
            batch.provide(new_database, ProvideOptions::new().group("databases,bogus"))
        })
        .unwrap_err();
    let DigError::InvalidInput {
        source: Some(cause), ..
    } = err
    else {
        panic!("无效的值组描述应返回无效输入错误");
    };
    assert!(matches!(*cause, DigError::InvalidGroupOption { ref option } if option == "bogus"));

    let scope = container.root_scope();
    assert_eq!(scope.graph_order(), 0);
    assert!(!scope.has_provider(&Key::of::<Config>()));

    // 撤销后单独注册同一个生产者成功
    container.provide(new_config, ProvideOptions::new()).unwrap();
    assert_eq!(container.root_scope().graph_order(), 1);
    assert!(container.root_scope().has_provider(&Key::of::<Config>()));
}

#[test]
fn test_rolled_back_group_consumer_keeps_graph_consistent() {
    let mut container = Container::new();

    let err = container
        .provide_all(|batch| {
            batch.provide(new_registry, ProvideOptions::new())?;
            batch.provide(new_plugin, ProvideOptions::new().group("plugins,bogus"))
        })
        .unwrap_err();
    assert!(matches!(err, DigError::InvalidInput { .. }));
    assert_eq!(container.root_scope().graph_order(), 0);

    // 值组参数节点和构造函数节点各占一个下标
    container.provide(new_registry, ProvideOptions::new()).unwrap();
    assert_eq!(container.root_scope().graph_order(), 2);

    let err = container
        .provide(new_plugin, ProvideOptions::new().group("plugins"))
        .unwrap_err();
    assert!(err.is_cycle_detected());

    let scope = container.root_scope();
    assert_eq!(scope.graph_order(), 2);
    assert!(scope.is_verified_acyclic());
    assert!(!scope.has_provider(&Key::grouped::<Plugin>("plugins")));
}

#[test]
fn test_batch_with_ignored_failure_still_rolls_back() {
    let mut container = Container::new();
    container.provide(new_config, ProvideOptions::new()).unwrap();

    let err = container
        .provide_all(|batch| {
            batch.provide(new_database, ProvideOptions::new())?;
            let _ignored = batch.provide(new_config, ProvideOptions::new());
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, DigError::InvalidInput { .. }));
    assert!(!container.root_scope().has_provider(&Key::of::<Database>()));
}

#[test]
fn test_batch_commits_together() {
    let mut container = Container::new();
    container
        .provide_all(|batch| {
            batch.provide(new_database, ProvideOptions::new())?;
            batch.provide(new_config, ProvideOptions::new())
        })
        .unwrap();
    assert_eq!(container.root_scope().graph_order(), 2);
    container
        .invoke(|_database: Arc<Database>| Ok::<_, Infallible>(()), InvokeOptions::new())
        .unwrap();
}

#[test]
fn test_recovered_panic_reports_location() {
    let mut container =
        Container::with_options(ContainerOptions::new().recover_from_panics(true));
    container.provide(new_config, ProvideOptions::new()).unwrap();
    container.provide(exploding_database, ProvideOptions::new()).unwrap();

    let err = container
        .invoke(|_database: Arc<Database>| Ok::<_, Infallible>(()), InvokeOptions::new())
        .unwrap_err();
    match err {
        DigError::RecoveredFault { location, payload } => {
            assert_eq!(location.unwrap().function, "exploding_database");
            assert_eq!(payload, "连接池初始化失败");
        }
        other => panic!("意外的错误: {other}"),
    }

    // 恢复后容器仍可使用
    assert_eq!(container.invoke(port, InvokeOptions::new()).unwrap(), 8080);
}

#[test]
fn test_panic_in_invoked_function_is_recovered() {
    let mut container =
        Container::with_options(ContainerOptions::new().recover_from_panics(true));
    let err = container
        .invoke(
            || -> Result<(), Infallible> { panic!("调用函数崩溃") },
            InvokeOptions::new(),
        )
        .unwrap_err();
    assert!(matches!(err, DigError::RecoveredFault { location: Some(_), .. }));
}

#[test]
fn test_panic_propagates_without_recovery() {
    let mut container = Container::new();
    container.provide(new_config, ProvideOptions::new()).unwrap();
    container.provide(exploding_database, ProvideOptions::new()).unwrap();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        container.invoke(|_database: Arc<Database>| Ok::<_, Infallible>(()), InvokeOptions::new())
    }));
    assert!(outcome.is_err());
}

/// 每次读取前进 10 毫秒的时钟
struct StepClock {
    base: Instant,
    ticks: AtomicU64,
}

impl TimeSource for StepClock {
    fn now(&self) -> Instant {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.base + Duration::from_millis(10 * tick)
    }
}

type Records = Arc<Mutex<Vec<(String, bool, Duration)>>>;

fn recorder(records: &Records) -> impl Fn(&CallbackInfo<'_>) + Send + Sync + 'static {
    let records = Arc::clone(records);
    move |info: &CallbackInfo<'_>| {
        records
            .lock()
            .unwrap()
            .push((info.name.to_string(), info.error.is_some(), info.runtime));
    }
}

#[test]
fn test_callbacks_report_runtime() {
    let clock = Arc::new(StepClock {
        base: Instant::now(),
        ticks: AtomicU64::new(0),
    });
    let records: Records = Arc::default();

    let mut container = Container::with_options(ContainerOptions::new().clock(clock));
    container
        .provide(new_config, ProvideOptions::new().on_complete(recorder(&records)))
        .unwrap();
    container
        .invoke(port, InvokeOptions::new().on_complete(recorder(&records)))
        .unwrap();

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].0.ends_with("new_config"));
    assert!(records[1].0.ends_with("port"));
    for (_, failed, runtime) in records.iter() {
        assert!(!failed);
        assert_eq!(*runtime, Duration::from_millis(10));
    }
}

#[test]
fn test_callback_receives_producer_error() {
    let records: Records = Arc::default();
    let mut container = Container::new();
    container
        .provide(
            || -> anyhow::Result<Arc<Config>> { anyhow::bail!("缺少配置文件") },
            ProvideOptions::new().on_complete(recorder(&records)),
        )
        .unwrap();

    assert!(container.invoke(port, InvokeOptions::new()).is_err());
    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].1);
}
