use scope_probe::{
    LifecyclePolicy, LifetimeScope, PolicySource, ProbeError, ProbeService, ResourceLedger,
    ResourceSource,
};
use std::sync::Arc;

#[test]
fn test_per_scope_lifetime() {
    let ledger = ResourceLedger::new_shared();
    let source = PolicySource::new(LifecyclePolicy::PerScope, ledger.clone());
    let root = LifetimeScope::root(ledger.clone());

    let scope1 = root.begin_nested();
    let scope2 = root.begin_nested();

    let r1a = scope1.resolve(&source);
    let r1b = scope1.resolve(&source);
    let r2a = scope2.resolve(&source);

    // Same instance within same scope
    assert!(Arc::ptr_eq(&r1a, &r1b));
    // Different instances across scopes
    assert!(!Arc::ptr_eq(&r1a, &r2a));
    assert_eq!(ledger.snapshot().live, 2);

    drop(scope1);
    assert!(r1a.is_released());
    assert!(!r2a.is_released());
}

#[test]
fn test_nested_scope_gets_own_per_scope_instance() {
    let ledger = ResourceLedger::new_shared();
    let source = PolicySource::new(LifecyclePolicy::PerScope, ledger.clone());
    let outer = LifetimeScope::root(ledger.clone());
    let from_outer = outer.resolve(&source);

    {
        let inner = outer.begin_nested();
        let from_inner = inner.resolve(&source);
        assert!(!Arc::ptr_eq(&from_outer, &from_inner));
    }

    assert!(!from_outer.is_released());
}

#[test]
fn test_per_call_instances_all_released_at_scope_end() {
    let ledger = ResourceLedger::new_shared();
    let source = PolicySource::new(LifecyclePolicy::PerCall, ledger.clone());
    let scope = LifetimeScope::root(ledger.clone());

    let handles: Vec<_> = (0..5).map(|_| scope.resolve(&source)).collect();
    assert_eq!(ledger.snapshot().undisposed, 5);
    assert!(!Arc::ptr_eq(&handles[0], &handles[1]));

    assert_eq!(scope.end(), 5);
    assert!(handles.iter().all(|r| r.is_released()));

    drop(handles);
    assert!(ledger.snapshot().is_quiescent());
}

#[test]
fn test_singleton_shared_across_scopes() {
    let ledger = ResourceLedger::new_shared();
    let source = PolicySource::new(LifecyclePolicy::Singleton, ledger.clone());
    assert_eq!(source.policy(), LifecyclePolicy::Singleton);
    let root = LifetimeScope::root(ledger.clone());

    let first = {
        let scope = root.begin_nested();
        scope.resolve(&source)
    };
    let second = {
        let scope = root.begin_nested();
        scope.resolve(&source)
    };

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!first.is_released());
    assert!(Arc::ptr_eq(&source.singleton_instance().unwrap(), &first));

    drop((first, second));
    drop(source);
    assert!(ledger.snapshot().is_quiescent());
}

#[test]
fn test_service_in_nested_scope_loop() {
    let ledger = ResourceLedger::new_shared();
    let source = PolicySource::new(LifecyclePolicy::PerScope, ledger.clone());
    let outer = LifetimeScope::root(ledger.clone());

    for _ in 0..50 {
        let inner = outer.begin_nested();
        let service = ProbeService::resolve(&inner, &source);
        service.do_something().unwrap();
        assert_eq!(ledger.snapshot().undisposed, 0);
    }

    let snap = ledger.snapshot();
    assert!(snap.is_quiescent());
    assert_eq!(snap.created_total, 50);
}

#[test]
fn test_service_with_custom_factory() {
    let ledger = ResourceLedger::new_shared();
    let spent = Arc::new(scope_probe::TrackedResource::new(ledger.clone()));
    spent.release();

    let handle = spent.clone();
    let service = ProbeService::new(Box::new(move || handle.clone()));
    assert!(matches!(
        service.do_something(),
        Err(ProbeError::AlreadyReleased { id }) if id == spent.id()
    ));
}
