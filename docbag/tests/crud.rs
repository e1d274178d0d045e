//! End-to-end persistence tests: controller against the in-memory store.

use docbag::memory::MemoryStore;
use docbag::prelude::*;

fn catalog() -> Catalog {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut catalog = Catalog::new();
    DocumentType::builder("Account")
        .field("name", Field::string())
        .field("surname", Field::string())
        .field("nickname", Field::string().optional())
        .register(&mut catalog)
        .unwrap();
    catalog
}

fn controller<'a>(
    catalog: &'a Catalog,
    store: &MemoryStore,
) -> Controller<'a, docbag::memory::MemoryCollection> {
    let account = catalog.get("Account").unwrap();
    let collection = account.collection().unwrap().to_string();
    Controller::new(TypedCollection::new(
        catalog,
        account,
        store.collection(&collection),
    ))
}

#[test]
fn create_assigns_and_binds_an_identity() {
    let catalog = catalog();
    let store = MemoryStore::new();
    let accounts = controller(&catalog, &store);

    let doc = accounts
        .create(Values::new().with("name", "Alice").with("surname", "Doe"))
        .unwrap();
    let id = doc.id().expect("created document carries an identity");

    let account = catalog.get("Account").unwrap();
    let found = accounts.read(&account.query("_id").unwrap().eq(id)).unwrap();
    assert_eq!(found, doc);
}

#[test]
fn read_is_strict_about_result_counts() {
    let catalog = catalog();
    let store = MemoryStore::new();
    let accounts = controller(&catalog, &store);
    let account = catalog.get("Account").unwrap();

    let err = accounts
        .read(&account.query("name").unwrap().eq("Nobody"))
        .unwrap_err();
    assert!(matches!(err, Error::NoResultFound(_)));

    for surname in ["One", "Two"] {
        accounts
            .create(Values::new().with("name", "Alice").with("surname", surname))
            .unwrap();
    }
    let err = accounts
        .read(&account.query("name").unwrap().eq("Alice"))
        .unwrap_err();
    assert!(matches!(err, Error::MultipleResultsFound(_)));

    let found = accounts
        .read(&account.query("surname").unwrap().eq("Two"))
        .unwrap();
    match found.get("surname").unwrap() {
        Some(Value::Scalar(bson::Bson::String(s))) => assert_eq!(s, "Two"),
        other => panic!("unexpected surname value: {other:?}"),
    }
}

#[test]
fn search_honors_filters_sorting_and_limits() {
    let catalog = catalog();
    let store = MemoryStore::new();
    let accounts = controller(&catalog, &store);
    let account = catalog.get("Account").unwrap();

    for (name, surname) in [("Alice", "Doe"), ("Bob", "Doe"), ("Carol", "Roe")] {
        accounts
            .create(Values::new().with("name", name).with("surname", surname))
            .unwrap();
    }

    let query = Query::builder()
        .filter(account.query("surname").unwrap().eq("Doe"))
        .sort("name", SortDirection::Desc)
        .build();
    let found = accounts.search(query).unwrap();
    assert_eq!(found.len(), 2);
    match found[0].get("name").unwrap() {
        Some(Value::Scalar(bson::Bson::String(s))) => assert_eq!(s, "Bob"),
        other => panic!("unexpected name value: {other:?}"),
    }

    let everyone = accounts.search(Query::builder().limit(2).build()).unwrap();
    assert_eq!(everyone.len(), 2);
}

#[test]
fn update_replaces_the_identified_document() {
    let catalog = catalog();
    let store = MemoryStore::new();
    let accounts = controller(&catalog, &store);
    let account = catalog.get("Account").unwrap();

    let doc = accounts
        .create(Values::new().with("name", "Alice").with("surname", "Doe"))
        .unwrap();
    let id = doc.id().unwrap();

    accounts
        .update(
            Values::new()
                .with("_id", id)
                .with("name", "Alice")
                .with("surname", "Smith"),
        )
        .unwrap();

    let found = accounts.read(&account.query("_id").unwrap().eq(id)).unwrap();
    match found.get("surname").unwrap() {
        Some(Value::Scalar(bson::Bson::String(s))) => assert_eq!(s, "Smith"),
        other => panic!("unexpected surname value: {other:?}"),
    }

    // Update without an identity never reaches the store.
    let err = accounts
        .update(Values::new().with("name", "Alice").with("surname", "Doe"))
        .unwrap_err();
    assert!(matches!(err, Error::Type(_)));
}

#[test]
fn update_inserts_when_the_identity_is_gone() {
    let catalog = catalog();
    let store = MemoryStore::new();
    let accounts = controller(&catalog, &store);
    let account = catalog.get("Account").unwrap();

    let doc = accounts
        .create(Values::new().with("name", "Alice").with("surname", "Doe"))
        .unwrap();
    let id = doc.id().unwrap();

    accounts
        .delete(
            Values::new()
                .with("_id", id)
                .with("name", "Alice")
                .with("surname", "Doe"),
        )
        .unwrap();

    // Save semantics: an update on a vanished identity stores the document
    // again instead of silently dropping the write.
    accounts
        .update(
            Values::new()
                .with("_id", id)
                .with("name", "Alice")
                .with("surname", "Smith"),
        )
        .unwrap();

    let found = accounts.read(&account.query("_id").unwrap().eq(id)).unwrap();
    assert_eq!(found.id().unwrap(), id);
    match found.get("surname").unwrap() {
        Some(Value::Scalar(bson::Bson::String(s))) => assert_eq!(s, "Smith"),
        other => panic!("unexpected surname value: {other:?}"),
    }
}

#[test]
fn delete_removes_the_identified_document() {
    let catalog = catalog();
    let store = MemoryStore::new();
    let accounts = controller(&catalog, &store);
    let account = catalog.get("Account").unwrap();

    let doc = accounts
        .create(Values::new().with("name", "Alice").with("surname", "Doe"))
        .unwrap();
    let id = doc.id().unwrap();

    accounts
        .delete(
            Values::new()
                .with("_id", id)
                .with("name", "Alice")
                .with("surname", "Doe"),
        )
        .unwrap();
    let err = accounts
        .read(&account.query("_id").unwrap().eq(id))
        .unwrap_err();
    assert!(matches!(err, Error::NoResultFound(_)));

    let err = accounts
        .delete(Values::new().with("name", "Alice").with("surname", "Doe"))
        .unwrap_err();
    assert!(matches!(err, Error::Type(_)));
}
