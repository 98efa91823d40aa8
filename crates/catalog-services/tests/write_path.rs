mod helpers;

use catalog_core::models::{fields, AttributeValue, Attributes, FileSlot, RelationKind};
use catalog_services::{Storage, WriteError, WritePhase};
use helpers::{key, mp4, png, sorted, video_attrs, Harness, StorageEvent};
use std::sync::atomic::Ordering;
use uuid::Uuid;

fn with_tags(attrs: Attributes, categories: Vec<Uuid>, genders: Vec<Uuid>) -> Attributes {
    attrs
        .with(fields::CATEGORIES_ID, categories)
        .with(fields::GENDERS_ID, genders)
}

#[tokio::test]
async fn create_with_covering_gender_persists_associations() {
    let h = Harness::new();
    let c1 = h.store.add_category("c1");
    let g1 = h.store.add_gender("g1", &[c1]);

    let video = h
        .writer
        .create(with_tags(video_attrs(), vec![c1], vec![g1]))
        .await
        .unwrap();

    assert!(h.stored(video.id).await.is_some());
    assert_eq!(h.related(video.id, RelationKind::Categories).await, vec![c1]);
    assert_eq!(h.related(video.id, RelationKind::Genders).await, vec![g1]);
}

#[tokio::test]
async fn create_with_uncovered_category_is_rejected() {
    let h = Harness::new();
    let c1 = h.store.add_category("c1");
    let c2 = h.store.add_category("c2");
    let g1 = h.store.add_gender("g1", &[c1]);

    let err = h
        .writer
        .create(with_tags(video_attrs(), vec![c1, c2], vec![g1]))
        .await
        .unwrap_err();

    match err {
        WriteError::Validation(errors) => {
            assert!(errors.field_errors().contains_key(fields::GENDERS_ID))
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(h.store.video_count(true), 0);
    assert!(h.events().is_empty());
}

#[tokio::test]
async fn update_replaces_categories() {
    let h = Harness::new();
    let c1 = h.store.add_category("c1");
    let c2 = h.store.add_category("c2");
    let c3 = h.store.add_category("c3");
    let g1 = h.store.add_gender("g1", &[c1, c2, c3]);
    let video = h
        .writer
        .create(with_tags(video_attrs(), vec![c1], vec![g1]))
        .await
        .unwrap();

    h.writer
        .update(
            video.id,
            Attributes::new().with(fields::CATEGORIES_ID, vec![c2, c3]),
        )
        .await
        .unwrap();

    assert_eq!(
        h.related(video.id, RelationKind::Categories).await,
        sorted(vec![c2, c3])
    );
    assert_eq!(h.related(video.id, RelationKind::Genders).await, vec![g1]);
}

#[tokio::test]
async fn replaced_file_is_deleted_only_after_new_file_is_stored() {
    let h = Harness::new();
    let old = mp4("old.mp4", b"old");
    let video = h
        .writer
        .create(video_attrs().with(fields::VIDEO_FILE, old.clone()))
        .await
        .unwrap();
    h.clear_events();

    let new = mp4("new.mp4", b"new");
    let updated = h
        .writer
        .update(
            video.id,
            Attributes::new().with(fields::VIDEO_FILE, new.clone()),
        )
        .await
        .unwrap();

    let old_key = key(video.id, old.hash_name());
    let new_key = key(video.id, new.hash_name());
    assert_eq!(updated.video_file.as_deref(), Some(new.hash_name()));
    assert_eq!(
        h.events(),
        vec![
            StorageEvent::Uploaded(new_key.clone()),
            StorageEvent::Deleted(old_key.clone()),
        ]
    );
    assert!(h.storage.has_file(&new_key));
    assert!(!h.storage.has_file(&old_key));
}

#[tokio::test]
async fn failed_commit_changes_nothing() {
    let h = Harness::new();
    let c1 = h.store.add_category("c1");
    let c2 = h.store.add_category("c2");
    let g1 = h.store.add_gender("g1", &[c1, c2]);
    let old = mp4("old.mp4", b"old");
    let video = h
        .writer
        .create(with_tags(video_attrs(), vec![c1], vec![g1]).with(fields::VIDEO_FILE, old.clone()))
        .await
        .unwrap();
    h.clear_events();

    h.faults.fail_commit.store(true, Ordering::SeqCst);
    let new = mp4("new.mp4", b"new");
    let err = h
        .writer
        .update(
            video.id,
            Attributes::new()
                .with(fields::TITLE, "Renamed")
                .with(fields::CATEGORIES_ID, vec![c2])
                .with(fields::VIDEO_FILE, new.clone()),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WriteError::Transaction {
            phase: WritePhase::Committing,
            ..
        }
    ));
    assert_eq!(h.related(video.id, RelationKind::Categories).await, vec![c1]);
    let stored = h.stored(video.id).await.unwrap();
    assert_eq!(stored.title, "The Movie");
    assert_eq!(stored.video_file.as_deref(), Some(old.hash_name()));
    assert!(h.storage.has_file(&key(video.id, old.hash_name())));
    assert!(!h.storage.has_file(&key(video.id, new.hash_name())));
    assert!(!h
        .events()
        .iter()
        .any(|event| matches!(event, StorageEvent::Uploaded(_))));
}

#[tokio::test]
async fn failed_attach_on_create_leaves_no_row_and_no_files() {
    let h = Harness::new();
    let c1 = h.store.add_category("c1");
    let g1 = h.store.add_gender("g1", &[c1]);
    h.faults.fail_attach(RelationKind::Genders);

    let err = h
        .writer
        .create(
            with_tags(video_attrs(), vec![c1], vec![g1])
                .with(fields::THUMB_FILE, png("thumb.png", b"thumb")),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WriteError::Transaction {
            phase: WritePhase::RelationSyncing,
            ..
        }
    ));
    assert_eq!(h.store.video_count(true), 0);
    assert!(h.storage.keys().is_empty());
}

#[tokio::test]
async fn failed_attach_on_update_keeps_scalar_fields() {
    let h = Harness::new();
    let c1 = h.store.add_category("c1");
    let c2 = h.store.add_category("c2");
    let video = h
        .writer
        .create(video_attrs().with(fields::CATEGORIES_ID, vec![c1]))
        .await
        .unwrap();
    h.faults.fail_attach(RelationKind::Categories);

    let err = h
        .writer
        .update(
            video.id,
            Attributes::new()
                .with(fields::TITLE, "Renamed")
                .with(fields::DURATION, 120)
                .with(fields::CATEGORIES_ID, vec![c2])
                .with(fields::BANNER_FILE, png("banner.png", b"banner")),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WriteError::Transaction { .. }));
    let stored = h.stored(video.id).await.unwrap();
    assert_eq!(stored, video);
    assert_eq!(h.related(video.id, RelationKind::Categories).await, vec![c1]);
    assert!(h.storage.keys().is_empty());
}

#[tokio::test]
async fn failed_row_update_rolls_back() {
    let h = Harness::new();
    let video = h.writer.create(video_attrs()).await.unwrap();
    h.faults.fail_update.store(true, Ordering::SeqCst);

    let err = h
        .writer
        .update(video.id, Attributes::new().with(fields::TITLE, "Renamed"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WriteError::Transaction {
            phase: WritePhase::Persisting,
            ..
        }
    ));
    assert_eq!(h.stored(video.id).await.unwrap().title, "The Movie");
}

#[tokio::test]
async fn storage_failure_after_commit_is_a_partial_write() {
    let h = Harness::new();
    h.storage.fail_uploads_ending_with(".png");

    let err = h
        .writer
        .create(
            video_attrs()
                .with(fields::VIDEO_FILE, mp4("movie.mp4", b"movie"))
                .with(fields::THUMB_FILE, png("thumb.png", b"thumb")),
        )
        .await
        .unwrap_err();

    let video = match &err {
        WriteError::PartialWrite { video, .. } => video.clone(),
        other => panic!("expected partial write, got {:?}", other),
    };
    assert_eq!(err.phase(), Some(WritePhase::FileCommitting));
    // The row stays committed and references the missing files.
    let stored = h.stored(video.id).await.unwrap();
    assert!(stored.video_file.is_some());
    assert!(stored.thumb_file.is_some());
    // No file of the failed batch is left behind.
    assert!(h.storage.keys().is_empty());
}

#[tokio::test]
async fn storage_failure_on_update_keeps_old_file() {
    let h = Harness::new();
    let old = mp4("old.mp4", b"old");
    let video = h
        .writer
        .create(video_attrs().with(fields::VIDEO_FILE, old.clone()))
        .await
        .unwrap();
    h.storage.fail_after_uploads(0);

    let err = h
        .writer
        .update(
            video.id,
            Attributes::new().with(fields::VIDEO_FILE, mp4("new.mp4", b"new")),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, WriteError::PartialWrite { .. }));
    assert!(h.storage.has_file(&key(video.id, old.hash_name())));
}

#[tokio::test]
async fn stored_files_round_trip() {
    let h = Harness::new();
    let trailer = mp4("trailer.mp4", b"trailer bytes");
    let banner = png("banner.png", b"banner bytes");

    let video = h
        .writer
        .create(
            video_attrs()
                .with(fields::TRAILER_FILE, trailer.clone())
                .with(fields::BANNER_FILE, banner.clone()),
        )
        .await
        .unwrap();

    assert_eq!(video.file_name(FileSlot::TrailerFile), Some(trailer.hash_name()));
    assert_eq!(video.file_name(FileSlot::BannerFile), Some(banner.hash_name()));
    let storage = h.writer.files().storage();
    assert_eq!(
        storage
            .download(&key(video.id, trailer.hash_name()))
            .await
            .unwrap(),
        b"trailer bytes"
    );
    assert_eq!(
        storage
            .download(&key(video.id, banner.hash_name()))
            .await
            .unwrap(),
        b"banner bytes"
    );
}

#[tokio::test]
async fn repeating_an_update_is_idempotent() {
    let h = Harness::new();
    let c1 = h.store.add_category("c1");
    let c2 = h.store.add_category("c2");
    let g1 = h.store.add_gender("g1", &[c1, c2]);
    let video = h.writer.create(video_attrs()).await.unwrap();
    let attrs = with_tags(Attributes::new(), vec![c1, c2, c1], vec![g1]);

    h.writer.update(video.id, attrs.clone()).await.unwrap();
    h.writer.update(video.id, attrs).await.unwrap();

    assert_eq!(
        h.related(video.id, RelationKind::Categories).await,
        sorted(vec![c1, c2])
    );
    assert_eq!(h.related(video.id, RelationKind::Genders).await, vec![g1]);
}

#[tokio::test]
async fn absent_relation_keys_are_left_alone_and_empty_lists_clear() {
    let h = Harness::new();
    let c1 = h.store.add_category("c1");
    let g1 = h.store.add_gender("g1", &[c1]);
    let video = h
        .writer
        .create(with_tags(video_attrs(), vec![c1], vec![g1]))
        .await
        .unwrap();

    h.writer
        .update(video.id, Attributes::new().with(fields::TITLE, "Renamed"))
        .await
        .unwrap();
    assert_eq!(h.related(video.id, RelationKind::Categories).await, vec![c1]);
    assert_eq!(h.related(video.id, RelationKind::Genders).await, vec![g1]);

    h.writer
        .update(
            video.id,
            Attributes::new().with(fields::CATEGORIES_ID, Vec::<Uuid>::new()),
        )
        .await
        .unwrap();
    assert!(h.related(video.id, RelationKind::Categories).await.is_empty());
    assert_eq!(h.related(video.id, RelationKind::Genders).await, vec![g1]);
}

#[tokio::test]
async fn clearing_a_slot_deletes_its_file() {
    let h = Harness::new();
    let thumb = png("thumb.png", b"thumb");
    let video = h
        .writer
        .create(video_attrs().with(fields::THUMB_FILE, thumb.clone()))
        .await
        .unwrap();

    let updated = h
        .writer
        .update(
            video.id,
            Attributes::new().with(fields::THUMB_FILE, AttributeValue::Null),
        )
        .await
        .unwrap();

    assert!(updated.thumb_file.is_none());
    assert!(!h.storage.has_file(&key(video.id, thumb.hash_name())));
}

#[tokio::test]
async fn unchanged_slots_keep_their_files() {
    let h = Harness::new();
    let movie = mp4("movie.mp4", b"movie");
    let video = h
        .writer
        .create(video_attrs().with(fields::VIDEO_FILE, movie.clone()))
        .await
        .unwrap();
    h.clear_events();

    h.writer
        .update(
            video.id,
            Attributes::new()
                .with(fields::VIDEO_FILE, movie.hash_name())
                .with(fields::THUMB_FILE, png("thumb.png", b"thumb")),
        )
        .await
        .unwrap();

    assert!(h.storage.has_file(&key(video.id, movie.hash_name())));
    assert!(!h
        .events()
        .iter()
        .any(|event| matches!(event, StorageEvent::Deleted(_))));
}

#[tokio::test]
async fn update_of_missing_video_is_not_found() {
    let h = Harness::new();
    let id = Uuid::new_v4();

    let err = h
        .writer
        .update(id, Attributes::new().with(fields::TITLE, "Renamed"))
        .await
        .unwrap_err();

    assert!(matches!(err, WriteError::NotFound(missing) if missing == id));
}

#[tokio::test]
async fn coverage_rule_holds_standalone() {
    let h = Harness::new();
    let c1 = h.store.add_category("c1");
    let c2 = h.store.add_category("c2");
    let c3 = h.store.add_category("c3");
    let g1 = h.store.add_gender("g1", &[c1, c3]);
    let g2 = h.store.add_gender("g2", &[c2]);
    let unrelated = h.store.add_gender("unrelated", &[c3]);

    // One gender may cover several categories.
    assert!(h.writer.validate_coverage(&[c1], &[g1]).await.unwrap());
    assert!(h.writer.validate_coverage(&[c1, c2], &[g1, g2]).await.unwrap());
    // Extra categories behind a gender do not matter.
    assert!(h.writer.validate_coverage(&[c3], &[g1]).await.unwrap());
    // A category no gender groups fails.
    assert!(!h.writer.validate_coverage(&[c1, c2], &[g1]).await.unwrap());
    // A gender grouping none of the categories fails the whole check.
    assert!(!h
        .writer
        .validate_coverage(&[c1, c2], &[g1, g2, unrelated])
        .await
        .unwrap());
    // Empty sets never cover.
    assert!(!h.writer.validate_coverage(&[], &[g1]).await.unwrap());
    assert!(!h.writer.validate_coverage(&[c1], &[]).await.unwrap());
}

#[tokio::test]
async fn create_rejects_a_file_name_in_a_slot() {
    let h = Harness::new();

    let err = h
        .writer
        .create(video_attrs().with(fields::VIDEO_FILE, "ghost.mp4"))
        .await
        .unwrap_err();

    match err {
        WriteError::Validation(errors) => {
            assert!(errors.field_errors().contains_key(fields::VIDEO_FILE))
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(h.store.video_count(true), 0);
    assert!(h.storage.keys().is_empty());
}

#[tokio::test]
async fn update_rejects_a_name_other_than_the_current_file() {
    let h = Harness::new();
    let movie = mp4("old.mp4", b"old frames");
    let video = h
        .writer
        .create(video_attrs().with(fields::VIDEO_FILE, movie.clone()))
        .await
        .unwrap();
    h.clear_events();

    let err = h
        .writer
        .update(
            video.id,
            Attributes::new()
                .with(fields::TITLE, "Renamed")
                .with(fields::VIDEO_FILE, "typo.mp4"),
        )
        .await
        .unwrap_err();

    match err {
        WriteError::Validation(errors) => {
            assert!(errors.field_errors().contains_key(fields::VIDEO_FILE))
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    let stored = h.stored(video.id).await.unwrap();
    assert_eq!(stored.title, "The Movie");
    assert_eq!(stored.video_file.as_deref(), Some(movie.hash_name()));
    assert!(h.storage.has_file(&key(video.id, movie.hash_name())));
    assert!(h.events().is_empty());
}

#[tokio::test]
async fn sequential_updates_replace_the_whole_association_set() {
    let h = Harness::new();
    let c1 = h.store.add_category("c1");
    let c2 = h.store.add_category("c2");
    let c3 = h.store.add_category("c3");
    let g1 = h.store.add_gender("g1", &[c1, c2]);
    let g2 = h.store.add_gender("g2", &[c3]);
    let video = h.writer.create(video_attrs()).await.unwrap();

    h.writer
        .update(video.id, with_tags(Attributes::new(), vec![c1, c2], vec![g1]))
        .await
        .unwrap();
    h.writer
        .update(video.id, with_tags(Attributes::new(), vec![c3], vec![g2]))
        .await
        .unwrap();

    assert_eq!(h.related(video.id, RelationKind::Categories).await, vec![c3]);
    assert_eq!(h.related(video.id, RelationKind::Genders).await, vec![g2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_on_distinct_videos_stay_separate() {
    let h = Harness::new();
    let shared_category = h.store.add_category("shared");
    let shared_gender = h.store.add_gender("shared", &[shared_category]);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let category = h.store.add_category(&format!("c{}", i));
        let gender = h.store.add_gender(&format!("g{}", i), &[category]);
        let writer = h.writer.clone();
        tasks.push(tokio::spawn(async move {
            let movie = mp4(&format!("movie{}.mp4", i), format!("movie {}", i).as_bytes());
            let thumb = png(&format!("thumb{}.png", i), format!("thumb {}", i).as_bytes());
            let video = writer
                .create(with_tags(
                    video_attrs().with(fields::VIDEO_FILE, movie.clone()),
                    vec![category],
                    vec![gender],
                ))
                .await
                .unwrap();
            writer
                .update(
                    video.id,
                    with_tags(
                        Attributes::new()
                            .with(fields::TITLE, format!("Movie {}", i))
                            .with(fields::THUMB_FILE, thumb.clone()),
                        vec![category, shared_category],
                        vec![gender, shared_gender],
                    ),
                )
                .await
                .unwrap();
            (i, video.id, category, gender, movie, thumb)
        }));
    }

    let mut ids = Vec::new();
    for task in tasks {
        let (i, id, category, gender, movie, thumb) = task.await.unwrap();
        ids.push(id);

        let stored = h.stored(id).await.unwrap();
        assert_eq!(stored.title, format!("Movie {}", i));
        assert_eq!(stored.video_file.as_deref(), Some(movie.hash_name()));
        assert_eq!(stored.thumb_file.as_deref(), Some(thumb.hash_name()));
        assert_eq!(
            h.related(id, RelationKind::Categories).await,
            sorted(vec![category, shared_category])
        );
        assert_eq!(
            h.related(id, RelationKind::Genders).await,
            sorted(vec![gender, shared_gender])
        );

        let prefix = format!("{}/", id);
        let mut own: Vec<String> = h
            .storage
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(&prefix))
            .collect();
        own.sort();
        let mut expected = vec![key(id, movie.hash_name()), key(id, thumb.hash_name())];
        expected.sort();
        assert_eq!(own, expected);
        assert_eq!(
            h.storage.download(&key(id, movie.hash_name())).await.unwrap(),
            format!("movie {}", i).into_bytes()
        );
    }

    assert_eq!(h.store.video_count(false), 8);
    assert_eq!(h.storage.keys().len(), 16);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}
