//! Index cache round trips and invalidation.

mod common;

use std::fs;

use common::gop_index;
use framesource::{AddressingMode, IndexCache, IndexProvider};

#[test]
fn default_location_appends_extension() {
    let cache = IndexCache::for_source("videos/clip.mp4");
    assert_eq!(cache.path().to_str(), Some("videos/clip.mp4.fsindex"));
}

#[test]
fn missing_cache_loads_nothing() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = IndexCache::at(temporary_directory.path().join("absent.fsindex"));
    assert!(cache.load(1_000, None).expect("Failed to load").is_none());
}

#[test]
fn stored_index_is_reloaded_with_lookup() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = IndexCache::at(temporary_directory.path().join("clip.fsindex"));
    let index = gop_index(48, 12)
        .with_stream_index(2)
        .with_addressing(AddressingMode::ByteOffset)
        .with_max_dimensions(1920, 1088)
        .with_frame_rate(30_000, 1_001)
        .with_time_base(1, 90_000);

    cache.store(&index, 123_456).expect("Failed to store");
    let loaded = cache
        .load(123_456, Some(2))
        .expect("Failed to load")
        .expect("Cache was not reused");

    assert_eq!(loaded, index);
    assert_eq!(loaded.random_access_points(), &[1, 13, 25, 37]);
    assert_eq!(loaded.nearest_random_access_point(30), Some(25));
    assert_eq!(loaded.max_dimensions(), (1920, 1088));
    assert_eq!(loaded.addressing(), AddressingMode::ByteOffset);
}

#[test]
fn stale_cache_is_ignored() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = IndexCache::at(temporary_directory.path().join("clip.fsindex"));
    cache
        .store(&gop_index(10, 5).with_stream_index(1), 500)
        .expect("Failed to store");

    // Different file size.
    assert!(cache.load(501, Some(1)).expect("Failed to load").is_none());
    // Different stream.
    assert!(cache.load(500, Some(0)).expect("Failed to load").is_none());
    // Automatic stream selection accepts whatever was cached.
    assert!(cache.load(500, None).expect("Failed to load").is_some());
}

#[test]
fn unreadable_cache_is_ignored() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("clip.fsindex");
    fs::write(&path, b"{ not json").expect("Failed to write file");

    let cache = IndexCache::at(&path);
    assert!(cache.load(10, None).expect("Failed to load").is_none());
}

#[test]
fn cache_from_another_version_is_ignored() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("clip.fsindex");
    let cache = IndexCache::at(&path);
    cache.store(&gop_index(10, 5), 500).expect("Failed to store");

    let mut document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("Failed to read cache"))
            .expect("Cache is not JSON");
    document["version"] = serde_json::json!(999);
    fs::write(&path, document.to_string()).expect("Failed to write cache");

    assert!(cache.load(500, None).expect("Failed to load").is_none());
}

#[test]
fn remove_deletes_the_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = IndexCache::at(temporary_directory.path().join("clip.fsindex"));
    cache.store(&gop_index(5, 5), 1).expect("Failed to store");
    assert!(cache.path().exists());

    cache.remove().expect("Failed to remove");
    assert!(!cache.path().exists());
    cache.remove().expect("Removing twice should succeed");
}
