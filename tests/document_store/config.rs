//! Construction through the configuration resolver

use super::*;
use refinire_rag_strata::config::keys;
use tempfile::TempDir;

#[test]
fn test_defaults_give_in_memory_cosine_store() {
    let store = memory_store();
    let config = store.config();
    assert!(config.is_in_memory());
    assert_eq!(config.collection_name, "refinire_documents");
    assert_eq!(store.metric(), DistanceMetric::Cosine);
}

#[test]
fn test_three_way_precedence_for_every_field() {
    let env_dir = TempDir::new().unwrap();
    let explicit_dir = TempDir::new().unwrap();
    let e = env(&[
        (keys::COLLECTION_NAME, "env_name"),
        (keys::PERSIST_DIRECTORY, env_dir.path().to_str().unwrap()),
        (keys::DISTANCE_METRIC, "l2"),
        (keys::BATCH_SIZE, "11"),
        (keys::MAX_RETRIES, "5"),
        (keys::AUTO_CREATE_COLLECTION, "false"),
        (keys::AUTO_CLEAR_ON_INIT, "true"),
    ]);

    let defaults = resolve(StoreOptions::new(), &no_env()).unwrap();
    assert_eq!(defaults, ResolvedConfig::default());

    let from_env = resolve(StoreOptions::new(), &e).unwrap();
    assert_eq!(from_env.collection_name, "env_name");
    assert_eq!(from_env.persist_directory.as_deref(), Some(env_dir.path()));
    assert_eq!(from_env.distance_metric, DistanceMetric::Euclidean);
    assert_eq!(from_env.batch_size, 11);
    assert_eq!(from_env.max_retries, 5);
    assert!(!from_env.auto_create_collection);
    assert!(from_env.auto_clear_on_init);

    let explicit = resolve(
        StoreOptions::new()
            .collection_name("explicit_name")
            .persist_directory(explicit_dir.path())
            .metric(DistanceMetric::InnerProduct)
            .batch_size(2)
            .max_retries(0)
            .auto_create_collection(true)
            .auto_clear_on_init(false),
        &e,
    )
    .unwrap();
    assert_eq!(explicit.collection_name, "explicit_name");
    assert_eq!(
        explicit.persist_directory.as_deref(),
        Some(explicit_dir.path())
    );
    assert_eq!(explicit.distance_metric, DistanceMetric::InnerProduct);
    assert_eq!(explicit.batch_size, 2);
    assert_eq!(explicit.max_retries, 0);
    assert!(explicit.auto_create_collection);
    assert!(!explicit.auto_clear_on_init);
}

#[test]
fn test_invalid_metric_fails_construction() {
    let err = resolve(StoreOptions::new().distance_metric("invalid"), &no_env()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn test_empty_collection_name_fails_construction() {
    let err = resolve(StoreOptions::new().collection_name(""), &no_env()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
    assert!(err.is_caller_error());
}

#[test]
fn test_metric_aliases_from_env() {
    for (raw, metric) in [
        ("COSINE", DistanceMetric::Cosine),
        ("euclidean", DistanceMetric::Euclidean),
        ("inner_product", DistanceMetric::InnerProduct),
    ] {
        let config = resolve(StoreOptions::new(), &env(&[(keys::DISTANCE_METRIC, raw)])).unwrap();
        assert_eq!(config.distance_metric, metric, "{raw}");
    }
}

#[test]
fn test_store_uses_configured_metric() {
    let store = open(StoreOptions::new().distance_metric("ip"));
    assert_eq!(store.metric(), DistanceMetric::InnerProduct);
}

#[test]
fn test_auto_create_disabled_fails_for_missing_collection() {
    init_tracing();
    let config = resolve(StoreOptions::new().auto_create_collection(false), &no_env()).unwrap();
    let err = DocumentStore::from_config(config).err().unwrap();
    assert!(err.is_storage());
    assert!(err.to_string().contains("refinire_documents"));
}

#[test]
fn test_auto_clear_on_init_wipes_existing_data() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(StoreOptions::new().persist_directory(dir.path()));
        seed_corpus(&store);
        assert_eq!(store.count_vectors(None).unwrap(), 5);
    }

    let kept = open(StoreOptions::new().persist_directory(dir.path()));
    assert_eq!(kept.count_vectors(None).unwrap(), 5);
    drop(kept);

    let cleared = open(
        StoreOptions::new()
            .persist_directory(dir.path())
            .auto_clear_on_init(true),
    );
    assert_eq!(cleared.count_vectors(None).unwrap(), 0);
}

#[test]
fn test_existing_collection_keeps_its_metric() {
    let dir = TempDir::new().unwrap();
    drop(open(
        StoreOptions::new()
            .persist_directory(dir.path())
            .distance_metric("l2"),
    ));

    let reopened = open(
        StoreOptions::new()
            .persist_directory(dir.path())
            .distance_metric("cosine"),
    );
    assert_eq!(reopened.metric(), DistanceMetric::Euclidean);
}
