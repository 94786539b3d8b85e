use crate::{
    document::Document,
    resolve::{ResolveError, Step, TargetKind, locate, resolve, segments},
    ser::Serializer,
    store::{DocumentStore, MemoryStore},
    test_fixtures::Blog,
    value::DocValue,
};
use ulid::Ulid;

struct Fixture {
    store: MemoryStore,
    serializer: Serializer,
    article_id: Ulid,
    comment_id: Ulid,
    vote_id: Ulid,
}

fn fixture() -> Fixture {
    let schema = Blog::article_schema();
    let mut store = MemoryStore::new();

    let mut vote = Blog::vote_schema().new_document();
    vote.set("name", DocValue::Text("alice".to_string()));
    let vote_id = vote.id().expect("vote id");

    let mut comment = Blog::comment_schema().new_document();
    comment.set("text", DocValue::Text("first".to_string()));
    comment.set("upvotes", DocValue::List(vec![DocValue::Document(vote)]));
    let comment_id = comment.id().expect("comment id");

    let mut article = schema.new_document();
    article.set("title", DocValue::Text("resolved".to_string()));
    article.set("comments", DocValue::List(vec![DocValue::Document(comment)]));
    article.set("tags", DocValue::List(vec![DocValue::Text("a".to_string())]));
    let article_id = article.id().expect("article id");

    store.insert(&schema, &article).expect("insert");

    Fixture {
        store,
        serializer: Blog::article_serializer(),
        article_id,
        comment_id,
        vote_id,
    }
}

#[test]
fn segments_drop_empty_parts() {
    assert_eq!(segments("/a//b/"), ["a", "b"]);
    assert!(segments("/").is_empty());
    assert!(segments("").is_empty());
}

#[test]
fn empty_path_is_the_root_collection() {
    let f = fixture();
    let target = resolve(&f.store, &f.serializer, "/", false).expect("resolve");
    assert_eq!(target.kind, TargetKind::List);
    assert!(target.is_base_document);
    assert!(target.base.is_none());
    assert!(target.steps.is_empty());
}

#[test]
fn root_id_resolves_to_the_stored_item() {
    let f = fixture();
    let path = format!("/{}/", f.article_id);
    let target = resolve(&f.store, &f.serializer, &path, false).expect("resolve");
    assert_eq!(target.kind, TargetKind::Item);
    assert!(target.is_base_document);
    assert!(target.steps.is_empty());
    assert_eq!(
        target.base.as_ref().and_then(Document::id),
        Some(f.article_id)
    );
}

#[test]
fn malformed_root_id_is_a_bad_identifier() {
    let f = fixture();
    let err = resolve(&f.store, &f.serializer, "/not-a-ulid", false).expect_err("bad id");
    assert_eq!(
        err,
        ResolveError::BadIdentifier {
            segment: "not-a-ulid".to_string()
        }
    );
}

#[test]
fn unknown_root_id_is_not_found_except_under_put() {
    let f = fixture();
    let missing = Ulid::new();
    let path = format!("/{missing}");

    let err = resolve(&f.store, &f.serializer, &path, false).expect_err("not found");
    assert!(matches!(err, ResolveError::NotFound { .. }));

    let target = resolve(&f.store, &f.serializer, &path, true).expect("pending create");
    assert_eq!(target.kind, TargetKind::Item);
    let pending = target.create_pending.expect("pending");
    assert_eq!(pending.identifier_field, "id");
    assert_eq!(pending.identifier, DocValue::Id(missing));

    // A deeper path under a missing root never creates.
    let deep = format!("/{missing}/comments");
    let err = resolve(&f.store, &f.serializer, &deep, true).expect_err("deep");
    assert!(matches!(err, ResolveError::NotFound { .. }));
}

#[test]
fn nested_list_and_element_resolve_with_steps() {
    let f = fixture();

    let path = format!("/{}/comments", f.article_id);
    let target = resolve(&f.store, &f.serializer, &path, false).expect("list");
    assert_eq!(target.kind, TargetKind::List);
    assert!(!target.is_base_document);
    assert_eq!(target.steps, [Step::Field("comments")]);

    let path = format!("/{}/comments/{}", f.article_id, f.comment_id);
    let target = resolve(&f.store, &f.serializer, &path, false).expect("element");
    assert_eq!(target.kind, TargetKind::Item);
    assert_eq!(target.serializer.name(), "comment");
    assert_eq!(target.steps, [Step::Field("comments"), Step::Item(0)]);
}

#[test]
fn scalar_at_full_depth_resolves() {
    let f = fixture();
    let path = format!(
        "/{}/comments/{}/upvotes/{}/name",
        f.article_id, f.comment_id, f.vote_id
    );
    let target = resolve(&f.store, &f.serializer, &path, false).expect("scalar");
    assert_eq!(target.kind, TargetKind::Scalar);
    assert_eq!(target.field.map(|field| field.name()), Some("name"));

    let base = target.base.as_ref().expect("base");
    assert_eq!(
        locate(base, &target.steps),
        Some(&DocValue::Text("alice".to_string()))
    );
}

#[test]
fn nothing_descends_below_a_scalar() {
    let f = fixture();
    let path = format!("/{}/title/deeper", f.article_id);
    let err = resolve(&f.store, &f.serializer, &path, false).expect_err("below scalar");
    assert!(matches!(err, ResolveError::NotFound { .. }));
}

#[test]
fn unknown_field_segment_is_not_found() {
    let f = fixture();
    let path = format!("/{}/bogus", f.article_id);
    let err = resolve(&f.store, &f.serializer, &path, false).expect_err("unknown field");
    assert_eq!(
        err.to_string(),
        "the resource specified with identifier 'bogus' could not be found"
    );
}

#[test]
fn scalar_list_elements_cannot_be_addressed() {
    let f = fixture();
    let path = format!("/{}/tags/a", f.article_id);
    let err = resolve(&f.store, &f.serializer, &path, false).expect_err("tags element");
    assert!(matches!(err, ResolveError::NotFound { .. }));
}

#[test]
fn unmatched_list_identifier_creates_only_under_put_in_final_position() {
    let f = fixture();
    let missing = Ulid::new();
    let path = format!("/{}/comments/{missing}", f.article_id);

    let err = resolve(&f.store, &f.serializer, &path, false).expect_err("get");
    assert!(matches!(err, ResolveError::NotFound { .. }));

    let target = resolve(&f.store, &f.serializer, &path, true).expect("put");
    assert_eq!(target.kind, TargetKind::Item);
    // Steps stay on the list so the engine knows where to append.
    assert_eq!(target.steps, [Step::Field("comments")]);
    let pending = target.create_pending.expect("pending");
    assert_eq!(pending.identifier, DocValue::Id(missing));

    // Not in final position: no creation.
    let deep = format!("/{}/comments/{missing}/text", f.article_id);
    let err = resolve(&f.store, &f.serializer, &deep, true).expect_err("deep put");
    assert!(matches!(err, ResolveError::NotFound { .. }));
}

#[test]
fn resolution_kind_is_deterministic() {
    let f = fixture();
    let path = format!("/{}/comments/{}", f.article_id, f.comment_id);
    let first = resolve(&f.store, &f.serializer, &path, false).expect("first");
    let second = resolve(&f.store, &f.serializer, &path, false).expect("second");
    assert_eq!(first.kind, second.kind);
    assert_eq!(first.steps, second.steps);
}
