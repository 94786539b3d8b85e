use crate::{
    document::Document,
    store::{DocumentStore, Filter, MemoryStore, StoreError},
    test_fixtures::Blog,
    value::DocValue,
};
use ulid::Ulid;

fn article(title: &str) -> Document {
    let mut doc = Blog::article_schema().new_document();
    doc.set("title", DocValue::Text(title.to_string()));
    doc
}

fn seeded(titles: &[&str]) -> MemoryStore {
    let schema = Blog::article_schema();
    let mut store = MemoryStore::new();
    for title in titles {
        store.insert(&schema, &article(title)).expect("insert");
    }
    store
}

#[test]
fn insert_then_get_round_trips() {
    let schema = Blog::article_schema();
    let mut store = MemoryStore::new();
    let doc = article("one");
    let id = doc.id().expect("id");

    store.insert(&schema, &doc).expect("insert");
    assert_eq!(store.get(id).expect("get"), doc);

    let missing = Ulid::new();
    assert_eq!(store.get(missing), Err(StoreError::NotFound { id: missing }));
}

#[test]
fn save_upserts_and_replaces_whole_documents() {
    let schema = Blog::article_schema();
    let mut store = MemoryStore::new();
    let mut doc = article("one");
    let id = doc.id().expect("id");

    store.save(&schema, &doc).expect("first save");
    doc.set("text", DocValue::Text("body".to_string()));
    store.save(&schema, &doc).expect("second save");

    assert_eq!(store.len(), 1);
    assert_eq!(
        store.get(id).expect("get").get("text"),
        Some(&DocValue::Text("body".to_string()))
    );
}

#[test]
fn missing_required_field_fails_validation() {
    let schema = Blog::article_schema();
    let mut store = MemoryStore::new();
    let doc = schema.new_document();

    let err = store.insert(&schema, &doc).expect_err("no title");
    let StoreError::Validation { errors } = err else {
        panic!("expected validation error");
    };
    assert_eq!(errors[0].0, "title");
}

#[test]
fn duplicate_unique_field_is_rejected() {
    let schema = Blog::article_schema();
    let mut store = seeded(&["taken"]);

    let err = store.insert(&schema, &article("taken")).expect_err("dup");
    assert!(matches!(err, StoreError::NotUnique { .. }));

    // Re-saving the same document is not a collision with itself.
    let doc = store.select(&[], 0..1).remove(0);
    store.save(&schema, &doc).expect("self save");
}

#[test]
fn delete_removes_exactly_one() {
    let mut store = seeded(&["a", "b"]);
    let id = store.select(&[], 0..1).remove(0).id().expect("id");

    store.delete(id).expect("delete");
    assert_eq!(store.len(), 1);
    assert_eq!(store.delete(id), Err(StoreError::NotFound { id }));
}

#[test]
fn filters_apply_equality_at_dotted_paths() {
    let schema = Blog::article_schema();
    let mut store = seeded(&["plain"]);

    let mut with_comment = article("commented");
    let mut comment = Blog::comment_schema().new_document();
    comment.set("text", DocValue::Text("match me".to_string()));
    with_comment.set("comments", DocValue::List(vec![DocValue::Document(comment)]));
    store.insert(&schema, &with_comment).expect("insert");

    let by_title = Filter {
        path: vec!["title"],
        value: DocValue::Text("plain".to_string()),
    };
    assert_eq!(store.count(&[by_title]), 1);

    // An intermediate list matches when any element matches.
    let by_comment_text = Filter {
        path: vec!["comments", "text"],
        value: DocValue::Text("match me".to_string()),
    };
    let matched = store.select(&[by_comment_text], 0..10);
    assert_eq!(matched.len(), 1);
    assert_eq!(
        matched[0].get("title"),
        Some(&DocValue::Text("commented".to_string()))
    );

    let miss = Filter {
        path: vec!["comments", "text"],
        value: DocValue::Text("nothing".to_string()),
    };
    assert_eq!(store.count(&[miss]), 0);
}

#[test]
fn select_slices_in_insertion_order() {
    let store = seeded(&["a", "b", "c", "d"]);
    let page = store.select(&[], 1..3);
    let titles: Vec<&DocValue> = page.iter().filter_map(|doc| doc.get("title")).collect();
    assert_eq!(
        titles,
        [
            &DocValue::Text("b".to_string()),
            &DocValue::Text("c".to_string()),
        ]
    );
}
