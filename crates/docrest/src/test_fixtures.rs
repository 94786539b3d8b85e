use crate::{
    document::{DefaultValue, FieldSpec, Schema},
    engine::Resource,
    ser::{Field, Serializer},
};

/// Route test logs through the captured test writer. Safe to call from
/// every test; only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

///
/// Blog
///
/// The fixture resource shared across tests: articles holding embedded
/// comments, each comment holding embedded upvotes, with every visibility
/// flavor represented (readonly ids and dates, a writeonly email, an
/// identifier at each list level, a scalar list of tags).
///

pub struct Blog;

impl Blog {
    pub fn vote_serializer() -> Serializer {
        Serializer::builder("vote")
            .field("id", Field::object_id().identifier())
            .field("name", Field::text())
            .field("date", Field::datetime().readonly())
            .build()
    }

    pub fn comment_serializer() -> Serializer {
        Serializer::builder("comment")
            .field("id", Field::object_id().identifier())
            .field("text", Field::text())
            .field("email", Field::text().writeonly())
            .field("date", Field::datetime().readonly())
            .field("upvotes", Field::list(Field::document(Self::vote_serializer())))
            .build()
    }

    pub fn article_serializer() -> Serializer {
        Serializer::builder("article")
            .description("A blog article with embedded comments")
            .field("id", Field::object_id())
            .field("title", Field::text())
            .field("text", Field::text())
            .field("publish", Field::boolean())
            .field("publish_date", Field::datetime())
            .field("comments", Field::list(Field::document(Self::comment_serializer())))
            .field("top_comment", Field::document(Self::comment_serializer()))
            .field("tags", Field::list(Field::text()))
            .build()
    }

    pub fn vote_schema() -> Schema {
        Schema::new("vote")
            .field(FieldSpec::new("id").default_value(DefaultValue::NewId))
            .field(FieldSpec::new("date").default_value(DefaultValue::Now))
    }

    pub fn comment_schema() -> Schema {
        Schema::new("comment")
            .field(FieldSpec::new("id").default_value(DefaultValue::NewId))
            .field(FieldSpec::new("text").max_length(500))
            .field(FieldSpec::new("date").default_value(DefaultValue::Now))
            .field(FieldSpec::new("upvotes").embedded(Self::vote_schema()))
    }

    pub fn article_schema() -> Schema {
        Schema::new("article")
            .field(FieldSpec::new("id").default_value(DefaultValue::NewId))
            .field(FieldSpec::new("title").required().unique().max_length(100))
            .field(FieldSpec::new("comments").embedded(Self::comment_schema()))
            .field(FieldSpec::new("top_comment").embedded(Self::comment_schema()))
    }

    pub fn articles() -> Resource {
        Resource::new(
            "articles",
            Self::article_serializer(),
            Self::article_schema(),
        )
        .items_per_page(10)
    }
}
