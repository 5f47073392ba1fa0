use bytes::Bytes;
use showcase_core::prelude::*;
use showcase_fs::{CorruptCatalogPolicy, FileSystemAssets, JsonCatalogStore};
use tempfile::TempDir;

fn service(tmp: &TempDir) -> CatalogService<JsonCatalogStore, FileSystemAssets> {
    CatalogService::new(
        JsonCatalogStore::new(tmp.path().join("data/products.json")),
        FileSystemAssets::new(tmp.path().join("public")),
    )
}

#[tokio::test]
async fn missing_file_is_an_empty_catalog() {
    let tmp = TempDir::new().unwrap();
    let store = JsonCatalogStore::new(tmp.path().join("nested/data/products.json"));

    assert!(store.load_all().await.unwrap().is_empty());
    assert!(tmp.path().join("nested/data").is_dir());
}

#[tokio::test]
async fn create_list_delete_scenario() {
    let tmp = TempDir::new().unwrap();
    let service = service(&tmp);

    let asset = service
        .upload(Bytes::from_static(b"\xFF\xD8jpeg"), "x.jpg")
        .await
        .unwrap();
    let asset_path = service.assets().path_for(&asset.url).unwrap();
    assert!(asset_path.is_file());

    let created = service
        .create(ProductDraft {
            categories: vec!["c1".into(), "c2".into()],
            ..ProductDraft::new("A", "d", asset.url.clone())
        })
        .await
        .unwrap();
    assert!(!created.id.is_empty());
    assert!(created.show_on_homepage);
    assert_eq!(service.list().await.unwrap(), vec![created.clone()]);

    assert!(service.delete(&created.id).await.unwrap());
    assert!(service.list().await.unwrap().is_empty());
    assert!(!asset_path.exists());
}

#[tokio::test]
async fn delete_tolerates_missing_asset_file() {
    let tmp = TempDir::new().unwrap();
    let service = service(&tmp);

    let created = service
        .create(ProductDraft::new("A", "d", "/products/never-uploaded.jpg"))
        .await
        .unwrap();
    assert!(service.delete(&created.id).await.unwrap());
    assert!(service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_leaves_external_images_alone() {
    let tmp = TempDir::new().unwrap();
    let service = service(&tmp);

    let outside = tmp.path().join("public/images/keep.jpg");
    std::fs::create_dir_all(outside.parent().unwrap()).unwrap();
    std::fs::write(&outside, b"keep").unwrap();

    let created = service
        .create(ProductDraft::new("A", "d", "/images/keep.jpg"))
        .await
        .unwrap();
    assert!(service.delete(&created.id).await.unwrap());
    assert!(outside.is_file());
}

#[tokio::test]
async fn asset_removal_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let assets = FileSystemAssets::new(tmp.path());

    let stored = assets.store(Bytes::from_static(b"png"), "a.png").await.unwrap();
    assert!(stored.url.starts_with("/products/product-"));
    assert!(stored.url.ends_with(".png"));
    assert_eq!(stored.url, format!("/products/{}", stored.file_name));

    assert!(assets.remove(&stored.url).await);
    assert!(!assets.remove(&stored.url).await);
}

#[tokio::test]
async fn store_fails_when_directory_is_unwritable() {
    let tmp = TempDir::new().unwrap();
    // A regular file where the asset directory should be.
    std::fs::write(tmp.path().join("products"), b"").unwrap();
    let assets = FileSystemAssets::new(tmp.path());

    let err = assets.store(Bytes::from_static(b"png"), "a.png").await;
    assert!(matches!(err, Err(AssetError::Write(_))));
}

fn stamp_of(file_name: &str) -> i64 {
    file_name
        .trim_start_matches("product-")
        .trim_end_matches(".png")
        .parse()
        .unwrap()
}

#[tokio::test]
async fn store_never_overwrites_existing_files() {
    let tmp = TempDir::new().unwrap();
    let assets = FileSystemAssets::new(tmp.path());
    let first = assets.store(Bytes::from_static(b"first"), "a.png").await.unwrap();

    // Files a previous run may have left at the next timestamps.
    let next = stamp_of(&first.file_name) + 1;
    for stamp in next..next + 50 {
        std::fs::write(assets.dir().join(format!("product-{stamp}.png")), b"old").unwrap();
    }

    let second = assets.store(Bytes::from_static(b"second"), "b.png").await.unwrap();
    assert_ne!(second.file_name, first.file_name);
    assert_eq!(
        std::fs::read(assets.path_for(&second.url).unwrap()).unwrap(),
        b"second"
    );
    assert_eq!(std::fs::read(assets.path_for(&first.url).unwrap()).unwrap(), b"first");
    assert!(stamp_of(&second.file_name) >= next + 50);
    for stamp in next..next + 50 {
        let path = assets.dir().join(format!("product-{stamp}.png"));
        assert_eq!(std::fs::read(path).unwrap(), b"old");
    }
}

#[tokio::test]
async fn update_persists_merge() {
    let tmp = TempDir::new().unwrap();
    let service = service(&tmp);

    let created = service
        .create(ProductDraft {
            brand: Some("Acme".into()),
            categories: vec!["a".into(), "a".into()],
            ..ProductDraft::new("A", "d", "/x.jpg")
        })
        .await
        .unwrap();

    let patch: ProductPatch =
        serde_json::from_str(r#"{"title":"T","showOnHomepage":false}"#).unwrap();
    let updated = service.update(&created.id, patch).await.unwrap().unwrap();

    let reloaded = service.get(&created.id).await.unwrap().unwrap();
    assert_eq!(reloaded, updated);
    assert_eq!(reloaded.title, "T");
    assert!(!reloaded.show_on_homepage);
    assert_eq!(reloaded.brand.as_deref(), Some("Acme"));
    assert_eq!(reloaded.categories, vec!["a", "a"]);
}

#[tokio::test]
async fn save_of_load_is_a_no_op() {
    let tmp = TempDir::new().unwrap();
    let service = service(&tmp);
    for i in 0..3 {
        service
            .create(ProductDraft::new(format!("p{i}"), "d", "/x.jpg"))
            .await
            .unwrap();
    }

    let store = JsonCatalogStore::new(tmp.path().join("data/products.json"));
    let before = std::fs::read(store.path()).unwrap();
    store.save_all(&store.load_all().await.unwrap()).await.unwrap();
    assert_eq!(std::fs::read(store.path()).unwrap(), before);
}

#[tokio::test]
async fn legacy_records_default_show_on_homepage() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("products.json");
    std::fs::write(
        &path,
        concat!(
            r#"[{"id":"1","title":"A","description":"d","image":"/x.jpg","#,
            r#""date":"2023","categories":["c"]}]"#,
        ),
    )
    .unwrap();

    let products = JsonCatalogStore::new(&path).load_all().await.unwrap();
    assert_eq!(products.len(), 1);
    assert!(products[0].show_on_homepage);
    assert_eq!(products[0].date.as_deref(), Some("2023"));
}

#[tokio::test]
async fn corrupt_file_fails_closed_by_default() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("products.json");
    std::fs::write(&path, b"[{\"id\": ").unwrap();

    let service = CatalogService::new(
        JsonCatalogStore::new(&path),
        FileSystemAssets::new(tmp.path()),
    );
    let err = service
        .create(ProductDraft::new("A", "d", "/x.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Store(StoreError::Corrupt(_))));
    assert_eq!(std::fs::read(&path).unwrap(), b"[{\"id\": ");
}

#[tokio::test]
async fn corrupt_file_can_be_treated_as_empty() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("products.json");
    std::fs::write(&path, b"not json").unwrap();

    let store =
        JsonCatalogStore::new(&path).with_corrupt_policy(CorruptCatalogPolicy::TreatAsEmpty);
    assert!(store.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_write_keeps_previous_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("products.json");
    let store = JsonCatalogStore::new(&path);

    let product = ProductDraft::new("A", "d", "/x.jpg").into_product("1".into());
    store.save_all(&[product.clone()]).await.unwrap();
    let before = std::fs::read(&path).unwrap();

    // Block the temp file so the next write cannot happen.
    std::fs::create_dir(tmp.path().join("products.json.tmp")).unwrap();
    assert!(store.save_all(&[]).await.is_err());

    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(store.load_all().await.unwrap(), vec![product]);
}
