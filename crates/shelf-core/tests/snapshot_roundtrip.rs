use rust_decimal::Decimal;
use serde_json::json;
use shelf_core::error::CatalogError;
use shelf_core::model::{NewCategory, NewProduct};
use shelf_core::snapshot::{self, SNAPSHOT_VERSION};
use shelf_core::store::CatalogStore;

use backends::{each_backend, sqlite_store};

fn populate(store: &mut dyn CatalogStore) {
    let drinks = store
        .create_category(NewCategory::named("Drinks").with_description("Cold"))
        .unwrap();
    let snacks = store.create_category(NewCategory::named("Snacks")).unwrap();
    for (name, gtin, category_id, cents, stock) in [
        ("Water", "4006381333931", &drinks.id, 99, 40),
        ("Cola", "96385074", &drinks.id, 149, 0),
        ("Chips", "036000291452", &snacks.id, 275, 6),
    ] {
        store
            .create_product(NewProduct {
                name: name.into(),
                description: format!("{name} description"),
                gtin: gtin.into(),
                category_id: category_id.clone(),
                price: Decimal::new(cents, 2),
                stock,
                image_url: None,
            })
            .unwrap();
    }
}

#[test]
fn export_clear_import_reproduces_the_catalog() {
    for mut t in each_backend() {
        let store = t.store.as_mut();
        populate(store);
        let before_products = store.list_products().unwrap();
        let before_categories = store.list_categories().unwrap();

        let exported = snapshot::export(&*store).unwrap();
        assert_eq!(exported.version, SNAPSHOT_VERSION);

        let cleared = snapshot::clear_all(store).unwrap();
        assert_eq!((cleared.products, cleared.categories), (3, 2));
        assert!(store.list_products().unwrap().is_empty());
        assert!(store.list_categories().unwrap().is_empty());

        let summary = snapshot::import(store, &exported).unwrap();
        assert_eq!((summary.products, summary.categories), (3, 2));
        assert_eq!(store.list_products().unwrap(), before_products, "{}", t.name);
        assert_eq!(store.list_categories().unwrap(), before_categories, "{}", t.name);
    }
}

#[test]
fn import_replaces_rather_than_merges() {
    for mut t in each_backend() {
        let store = t.store.as_mut();
        populate(store);
        let exported = snapshot::export(&*store).unwrap();

        store.create_category(NewCategory::named("Extra")).unwrap();
        snapshot::import(store, &exported).unwrap();

        let names: Vec<String> = store
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Drinks", "Snacks"], "{}", t.name);
    }
}

#[test]
fn snapshot_moves_between_backends() {
    let mut local = backends::local_store();
    populate(local.store.as_mut());
    let exported = snapshot::export(local.store.as_ref()).unwrap();

    let mut sqlite = sqlite_store();
    snapshot::import(sqlite.store.as_mut(), &exported).unwrap();

    assert_eq!(
        sqlite.store.list_products().unwrap(),
        local.store.list_products().unwrap()
    );
    assert_eq!(
        sqlite.store.list_categories().unwrap(),
        local.store.list_categories().unwrap()
    );
}

#[test]
fn sub_microsecond_timestamps_import_identically_on_both_backends() {
    let value = json!({
        "version": "1.0.0",
        "products": [{
            "id": "p-1",
            "name": "Water",
            "description": "",
            "gtin": "96385074",
            "categoryId": "c-1",
            "category": "Drinks",
            "price": "0.99",
            "stock": 3,
            "createdAt": "2024-02-03T04:05:06.123456789Z",
            "updatedAt": "2024-02-03T04:05:06.123456789Z"
        }],
        "categories": [{
            "id": "c-1",
            "name": "Drinks",
            "createdAt": "2024-02-03T04:05:06.000000999Z",
            "updatedAt": "2024-02-03T04:05:06.000000999Z"
        }]
    });

    let mut imported = Vec::new();
    for mut t in each_backend() {
        snapshot::import_value(t.store.as_mut(), value.clone()).unwrap();
        imported.push((t.store.list_products().unwrap(), t.store.list_categories().unwrap()));
    }

    assert_eq!(imported[0], imported[1]);
    let (products, categories) = &imported[0];
    assert_eq!(
        products[0].created_at.to_rfc3339(),
        "2024-02-03T04:05:06.123456+00:00"
    );
    assert_eq!(categories[0].updated_at.to_rfc3339(), "2024-02-03T04:05:06+00:00");
}

#[test]
fn snapshot_missing_categories_leaves_catalog_unmodified() {
    for mut t in each_backend() {
        let store = t.store.as_mut();
        populate(store);
        let before = snapshot::export(&*store).unwrap();

        let err = snapshot::import_value(
            store,
            json!({ "version": "1.0.0", "timestamp": "2024-01-01T00:00:00Z", "products": [] }),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::MalformedSnapshot(_)), "{}", t.name);

        assert_eq!(store.list_products().unwrap(), before.products);
        assert_eq!(store.list_categories().unwrap(), before.categories);
    }
}

#[test]
fn snapshot_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backups/catalog.json");

    let mut source = sqlite_store();
    populate(source.store.as_mut());
    let written = snapshot::write_snapshot(source.store.as_ref(), &path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["version"], SNAPSHOT_VERSION);
    assert_eq!(raw["products"][0]["categoryId"], written.categories[0].id.as_str());

    let read = snapshot::read_snapshot(&path).unwrap();
    assert_eq!(read, written);
}

#[test]
fn unreadable_snapshot_file_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    assert!(matches!(
        snapshot::read_snapshot(&path),
        Err(CatalogError::MalformedSnapshot(_))
    ));
}
