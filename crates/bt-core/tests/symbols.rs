use std::sync::Arc;

use bt_core::{CoreError, Symbol, SymbolTable, MISSING_NAME};

#[test]
fn interning_is_stable_and_sequential() {
    let symbols = SymbolTable::new();

    let a = symbols.intern("agent");
    let b = symbols.intern("box");

    assert_eq!(a.id(), 1);
    assert_eq!(b.id(), 2);
    assert_eq!(symbols.intern("agent"), a);
    assert_eq!(&*symbols.resolve(b), "box");
    assert_eq!(symbols.len(), 3);
}

#[test]
fn none_is_reserved() {
    let symbols = SymbolTable::new();

    assert!(Symbol::NONE.is_none());
    assert_eq!(&*symbols.resolve(Symbol::NONE), "None");
    assert_eq!(symbols.lookup("None"), Some(Symbol::NONE));
    assert!(symbols.is_empty());
}

#[test]
fn unknown_ids_resolve_to_sentinel_or_error() {
    let symbols = SymbolTable::new();
    let foreign = SymbolTable::new();
    for name in ["a", "b", "c"] {
        foreign.intern(name);
    }
    let stray = foreign.intern("d");

    assert_eq!(&*symbols.resolve(stray), MISSING_NAME);
    assert_eq!(symbols.try_resolve(stray), Err(CoreError::UnknownSymbol(stray.id())));
    assert_eq!(symbols.lookup("d"), None);
}

#[test]
fn concurrent_interning_yields_one_id_per_name() {
    let symbols = SymbolTable::shared();

    let handles = (0..4)
        .map(|_| {
            let symbols = Arc::clone(&symbols);
            std::thread::spawn(move || {
                (0..50)
                    .map(|i| symbols.intern(&format!("name-{i}")))
                    .collect::<Vec<_>>()
            })
        })
        .collect::<Vec<_>>();

    let results = handles
        .into_iter()
        .map(|h| h.join().expect("interning thread"))
        .collect::<Vec<_>>();

    for other in &results[1..] {
        assert_eq!(other, &results[0]);
    }
    assert_eq!(symbols.len(), 51);
}
