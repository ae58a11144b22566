//! End-to-end tests for scope resolution.
//!
//! These tests drive a real `ApplicationContext` through the public API:
//! 1. Declared components and interface bindings
//! 2. Binding hierarchies and decorators
//! 3. Resolvable and fatal cycles
//! 4. Strict and lenient resolution
//! 5. Singleton sharing across threads
//! 6. Re-entrant factories

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use trellis_common::config::TrellisConfig;
use trellis_common::error::{BoxError, TrellisError};
use trellis_common::types::{ComponentKey, Requirement, Scope};
use trellis_core::component::{Component, Late, ShapeBuilder};
use trellis_core::hierarchy::BindingHierarchy;
use trellis_core::placeholder::{Placeholder, PlaceholderFactory};
use trellis_core::provider::{Arguments, Provider};
use trellis_runtime::context::ApplicationContext;

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct Plain;

impl Greeter for Plain {
    fn greet(&self) -> String {
        "hello".into()
    }
}

impl Component for Plain {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.singleton();
    }

    fn construct(_: &Arguments) -> Result<Self, BoxError> {
        Ok(Self)
    }
}

struct Polite {
    inner: Arc<dyn Greeter>,
}

impl Greeter for Polite {
    fn greet(&self) -> String {
        format!("{}, please", self.inner.greet())
    }
}

impl Component for Polite {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.requires_below::<dyn Greeter>();
    }

    fn construct(args: &Arguments) -> Result<Self, BoxError> {
        Ok(Self {
            inner: args.below()?,
        })
    }
}

struct Loud {
    inner: Arc<dyn Greeter>,
}

impl Greeter for Loud {
    fn greet(&self) -> String {
        self.inner.greet().to_uppercase()
    }
}

impl Component for Loud {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.requires_below::<dyn Greeter>();
    }

    fn construct(args: &Arguments) -> Result<Self, BoxError> {
        Ok(Self {
            inner: args.below()?,
        })
    }
}

struct Pinned {
    greeter: Arc<dyn Greeter>,
}

impl Component for Pinned {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.requires_at_most::<dyn Greeter>(-1);
    }

    fn construct(args: &Arguments) -> Result<Self, BoxError> {
        Ok(Self {
            greeter: args.resolve(&Requirement::at_most(ComponentKey::of::<dyn Greeter>(), -1))?,
        })
    }
}

fn decorated() -> ApplicationContext {
    let context = ApplicationContext::new();
    context.bind::<dyn Greeter>().to::<Plain>(|g| g as Arc<dyn Greeter>);
    context
        .bind::<dyn Greeter>()
        .priority(0)
        .to::<Polite>(|g| g as Arc<dyn Greeter>);
    context
        .bind::<dyn Greeter>()
        .priority(1)
        .to::<Loud>(|g| g as Arc<dyn Greeter>);
    context
}

// ── Bindings ─────────────────────────────────────────────────────────

#[test]
fn interface_binding_resolves_to_implementation() {
    let context = ApplicationContext::new();
    context.bind::<dyn Greeter>().to::<Plain>(|g| g as Arc<dyn Greeter>);

    let greeter = context.get::<dyn Greeter>().expect("greeter");
    assert_eq!(greeter.greet(), "hello");
}

#[test]
fn singleton_identity_is_shared_across_views() {
    let context = ApplicationContext::new();
    context.bind::<dyn Greeter>().to::<Plain>(|g| g as Arc<dyn Greeter>);

    let first = context.get::<dyn Greeter>().expect("first");
    let second = context.get::<dyn Greeter>().expect("second");
    assert!(Arc::ptr_eq(&first, &second));
    let _ = context.get::<Plain>().expect("concrete");
}

#[test]
fn supplier_bindings_are_fresh_per_request() {
    let context = ApplicationContext::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&counter);
    context
        .bind::<usize>()
        .to_supplier(move || Arc::new(seen.fetch_add(1, Ordering::SeqCst)));

    let first = context.get::<usize>().expect("first");
    let second = context.get::<usize>().expect("second");
    assert_eq!((*first, *second), (0, 1));
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn named_binding_is_separate_from_unqualified() {
    let context = ApplicationContext::new();
    context
        .bind::<String>()
        .named("greeting")
        .singleton(Arc::new("hi".to_owned()));
    context.bind::<String>().singleton(Arc::new("default".to_owned()));

    assert_eq!(*context.get_named::<String>("greeting").expect("named"), "hi");
    assert_eq!(*context.get::<String>().expect("plain"), "default");
}

#[test]
fn higher_priority_replaces_default() {
    let context = ApplicationContext::new();
    context.bind::<u16>().singleton(Arc::new(80));
    context.bind::<u16>().priority(10).singleton(Arc::new(8080));
    assert_eq!(*context.get::<u16>().expect("port"), 8080);
}

// ── Hierarchies ──────────────────────────────────────────────────────

#[test]
fn decorators_wrap_the_rung_below() {
    let context = decorated();
    let greeter = context.get::<dyn Greeter>().expect("greeter");
    assert_eq!(greeter.greet(), "HELLO, PLEASE");
}

#[test]
fn at_most_pins_a_rung() {
    let context = decorated();
    let _ = context.register::<Pinned>();
    let pinned = context.get::<Pinned>().expect("pinned");
    assert_eq!(pinned.greeter.greet(), "hello");
}

#[test]
fn hierarchy_lists_rungs_in_ascending_order() {
    let context = decorated();
    let hierarchy = context
        .hierarchy(&ComponentKey::of::<dyn Greeter>())
        .expect("hierarchy");
    assert_eq!(
        hierarchy.to_string(),
        "Hierarchy[Greeter]: -1: Plain -> 0: Polite -> 1: Loud"
    );
}

#[test]
fn merged_hierarchy_keeps_local_rungs() {
    let context = ApplicationContext::new();
    context.bind::<u8>().singleton(Arc::new(1));

    let mut parent = BindingHierarchy::new(ComponentKey::of::<u8>());
    let _ = parent.add(-1, Provider::fixed(Arc::new(2_u8)));
    let _ = parent.add(5, Provider::fixed(Arc::new(3_u8)));
    context.merge_hierarchy(&parent);

    let merged = context.hierarchy(&ComponentKey::of::<u8>()).expect("merged");
    assert_eq!(merged.size(), 2);
    assert_eq!(*context.get::<u8>().expect("value"), 3);
}

struct Disk {
    label: &'static str,
}

impl Component for Disk {
    fn construct(_: &Arguments) -> Result<Self, BoxError> {
        Ok(Self { label: "declared" })
    }
}

struct Backup {
    disk: Arc<Disk>,
}

impl Component for Backup {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.requires::<Disk>();
    }

    fn construct(args: &Arguments) -> Result<Self, BoxError> {
        Ok(Self { disk: args.get()? })
    }
}

#[test]
fn declared_component_is_preferred_over_binding() {
    let context = ApplicationContext::new();
    let _ = context.register::<Disk>();
    let _ = context.register::<Backup>();
    context
        .bind::<Disk>()
        .priority(0)
        .singleton(Arc::new(Disk { label: "bound" }));

    let backup = context.get::<Backup>().expect("backup");
    assert_eq!(backup.disk.label, "declared");
    context.validate().expect("scope");
}

// ── Cycles ───────────────────────────────────────────────────────────

struct Left {
    right: Late<Right>,
}

impl Component for Left {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape
            .singleton()
            .inject::<Right>(|this, right| this.right.set(right));
    }

    fn construct(_: &Arguments) -> Result<Self, BoxError> {
        Ok(Self { right: Late::new() })
    }
}

struct Right {
    left: Late<Left>,
}

impl Component for Right {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape
            .singleton()
            .inject::<Left>(|this, left| this.left.set(left));
    }

    fn construct(_: &Arguments) -> Result<Self, BoxError> {
        Ok(Self { left: Late::new() })
    }
}

#[test]
fn delayed_cycle_is_cross_wired() {
    let context = ApplicationContext::new();
    let _ = context.register::<Left>();
    let _ = context.register::<Right>();

    let left = context.get::<Left>().expect("left");
    let right = left.right.get().expect("right injected");
    let back = right.left.get().expect("left injected");
    assert!(Arc::ptr_eq(&left, &back));
    assert!(Arc::ptr_eq(&right, &context.get::<Right>().expect("right")));
}

#[derive(Default)]
struct RecordingPlaceholders {
    created: Mutex<Vec<Placeholder>>,
}

impl PlaceholderFactory for RecordingPlaceholders {
    fn placeholder(&self, key: &ComponentKey) -> Placeholder {
        let placeholder = Placeholder::new(key.clone());
        self.created.lock().push(placeholder.clone());
        placeholder
    }
}

#[test]
fn placeholders_are_retargeted_after_wiring() {
    let placeholders = Arc::new(RecordingPlaceholders::default());
    let context = ApplicationContext::new().with_placeholders(placeholders.clone());
    let _ = context.register::<Left>();
    let _ = context.register::<Right>();

    let left = context.get::<Left>().expect("left");
    let created = placeholders.created.lock();
    assert_eq!(created.len(), 2);
    assert!(created.iter().all(Placeholder::is_bound));
    let stand_in = created
        .iter()
        .find(|p| p.key() == &ComponentKey::of::<Left>())
        .expect("left placeholder");
    assert!(Arc::ptr_eq(&stand_in.resolve::<Left>().expect("target"), &left));
}

static EARLY: Mutex<Vec<Placeholder>> = Mutex::new(Vec::new());

struct EarlyPlaceholders;

impl PlaceholderFactory for EarlyPlaceholders {
    fn placeholder(&self, key: &ComponentKey) -> Placeholder {
        let placeholder = Placeholder::new(key.clone());
        EARLY.lock().push(placeholder.clone());
        placeholder
    }
}

fn early_reference(key: &ComponentKey) -> Option<Placeholder> {
    EARLY.lock().iter().find(|p| p.key() == key).cloned()
}

struct Ping {
    pong: Late<Pong>,
    early_pong: Option<Placeholder>,
    bound_when_built: bool,
}

impl Component for Ping {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape
            .singleton()
            .inject::<Pong>(|this, pong| this.pong.set(pong));
    }

    fn construct(_: &Arguments) -> Result<Self, BoxError> {
        let early_pong = early_reference(&ComponentKey::of::<Pong>());
        let bound_when_built = early_pong.as_ref().is_some_and(Placeholder::is_bound);
        Ok(Self {
            pong: Late::new(),
            early_pong,
            bound_when_built,
        })
    }
}

struct Pong {
    ping: Late<Ping>,
}

impl Component for Pong {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape
            .singleton()
            .inject::<Ping>(|this, ping| this.ping.set(ping));
    }

    fn construct(_: &Arguments) -> Result<Self, BoxError> {
        Ok(Self { ping: Late::new() })
    }
}

#[test]
fn early_references_forward_to_real_instances() {
    let context = ApplicationContext::new().with_placeholders(Arc::new(EarlyPlaceholders));
    let _ = context.register::<Ping>();
    let _ = context.register::<Pong>();

    let ping = context.get::<Ping>().expect("ping");
    let early = ping.early_pong.as_ref().expect("placeholder handed out before construction");
    assert!(!ping.bound_when_built);

    let pong = context.get::<Pong>().expect("pong");
    assert!(Arc::ptr_eq(&early.resolve::<Pong>().expect("forwarded"), &pong));
    assert!(Arc::ptr_eq(&ping.pong.get().expect("injected"), &pong));
    assert!(Arc::ptr_eq(&pong.ping.get().expect("injected"), &ping));
}

static EGG_BUILDS: AtomicUsize = AtomicUsize::new(0);
static HEN_BUILDS: AtomicUsize = AtomicUsize::new(0);

struct Egg;

impl Component for Egg {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.requires::<Hen>();
    }

    fn construct(_: &Arguments) -> Result<Self, BoxError> {
        let _ = EGG_BUILDS.fetch_add(1, Ordering::SeqCst);
        Ok(Self)
    }
}

struct Hen;

impl Component for Hen {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.requires::<Egg>();
    }

    fn construct(_: &Arguments) -> Result<Self, BoxError> {
        let _ = HEN_BUILDS.fetch_add(1, Ordering::SeqCst);
        Ok(Self)
    }
}

#[test]
fn immediate_cycle_fails_before_construction() {
    let context = ApplicationContext::new();
    let _ = context.register::<Egg>();
    let _ = context.register::<Hen>();

    let err = context.get::<Egg>().err().expect("cycle");
    match &err {
        TrellisError::CyclicComponent { chain, .. } => {
            assert_eq!(chain.len(), 2);
            assert_eq!(chain[0], ComponentKey::of::<Egg>());
        }
        other => unreachable!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("Egg -> Hen -> Egg"), "got: {err}");
    assert_eq!(EGG_BUILDS.load(Ordering::SeqCst), 0);
    assert_eq!(HEN_BUILDS.load(Ordering::SeqCst), 0);
    assert!(context.validate().is_err());
}

struct Alpha {
    _beta: Arc<Beta>,
}

impl Component for Alpha {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.singleton().requires::<Beta>();
    }

    fn construct(args: &Arguments) -> Result<Self, BoxError> {
        Ok(Self { _beta: args.get()? })
    }
}

struct Beta;

#[test]
fn reentrant_factory_reports_declared_culprit() {
    let context = Arc::new_cyclic(|weak: &std::sync::Weak<ApplicationContext>| {
        let context = ApplicationContext::new();
        let _ = context.register::<Alpha>();
        let weak = weak.clone();
        context
            .bind::<Beta>()
            .to_factory(Vec::new(), Scope::Singleton, move |_| {
                let context = weak.upgrade().ok_or("context dropped")?;
                let _ = context.get::<Alpha>()?;
                Ok(Arc::new(Beta))
            });
        context
    });

    let err = context.get::<Alpha>().err().expect("cycle");
    assert_eq!(
        err.to_string(),
        "cyclic dependency: Alpha requires Beta at construction time (cycle: Alpha -> Beta -> Alpha)"
    );
}

#[test]
fn hidden_reentry_is_unresolvable() {
    let context = Arc::new_cyclic(|weak: &std::sync::Weak<ApplicationContext>| {
        let context = ApplicationContext::new();
        let weak = weak.clone();
        context
            .bind::<Beta>()
            .lazy_singleton(|| Arc::new(Beta));
        context
            .bind::<u64>()
            .to_factory(Vec::new(), Scope::Singleton, move |_| {
                let context = weak.upgrade().ok_or("context dropped")?;
                let _ = context.get::<Beta>()?;
                let again = context.get::<u64>()?;
                Ok(again)
            });
        context
    });

    let err = context.get::<u64>().err().expect("cycle");
    assert!(err.is_cycle());
    assert_eq!(
        err.to_string(),
        "unresolvable cycle while constructing u64, cause unknown"
    );
}

// ── Strictness ───────────────────────────────────────────────────────

struct Ghost;

struct Api {
    ghost: Option<Arc<Ghost>>,
}

impl Component for Api {
    fn describe(shape: &mut ShapeBuilder<Self>) {
        shape.requires::<Ghost>();
    }

    fn construct(args: &Arguments) -> Result<Self, BoxError> {
        Ok(Self {
            ghost: args.optional(),
        })
    }
}

#[test]
fn strict_scope_rejects_missing_requirement() {
    let context = ApplicationContext::new();
    let _ = context.register::<Api>();

    let err = context.get::<Api>().err().expect("unresolved");
    assert_eq!(
        err.to_string(),
        "no declaration or binding found for Ghost (required by Api)"
    );
    assert!(context.validate().is_err());
}

#[test]
fn lenient_scope_skips_missing_requirement() {
    let config = TrellisConfig::default().with_strict(false);
    let context = ApplicationContext::with_config(config).expect("config");
    let _ = context.register::<Api>();

    let api = context.get::<Api>().expect("api");
    assert!(api.ghost.is_none());
    assert!(context.validate().is_ok());
}

// ── Initialization ───────────────────────────────────────────────────

struct Clock;

impl Component for Clock {
    fn construct(_: &Arguments) -> Result<Self, BoxError> {
        Err("clock unavailable".into())
    }
}

#[test]
fn provider_failure_is_wrapped() {
    let context = ApplicationContext::new();
    let _ = context.register::<Clock>();

    let err = context.get::<Clock>().err().expect("failure");
    assert!(matches!(err, TrellisError::ComponentInitialization { .. }));
    assert_eq!(err.to_string(), "failed to initialize Clock: clock unavailable");
}

// ── Concurrency ──────────────────────────────────────────────────────

#[test]
fn concurrent_first_requests_build_singleton_once() {
    const THREADS: usize = 8;

    let context = ApplicationContext::new();
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    context.bind::<String>().lazy_singleton(move || {
        let _ = counter.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Arc::new("shared".to_owned())
    });

    let barrier = Barrier::new(THREADS);
    let results: Vec<Arc<String>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    let _ = barrier.wait();
                    context.get::<String>().expect("shared")
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}
