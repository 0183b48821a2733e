#![allow(dead_code)]

use restless::{AttrType, Client, MockAdapter, Schema};
use std::rc::Rc;

/// A client wired to a scriptable mock transport, with a small blog-style
/// domain registered: posts, comments, people, and tags.
pub struct Fixture {
    pub client: Client,
    pub mock: MockAdapter,
}

pub fn blog_client() -> Fixture {
    let mock = MockAdapter::new();
    let client = Client::new(Rc::new(mock.clone()));

    client.register("tag", Schema::new().attr("name", AttrType::String));
    client.register(
        "person",
        Schema::new()
            .attr("name", AttrType::String)
            .attr("role", AttrType::String),
    );
    client.register(
        "comment",
        Schema::new()
            .attr("body", AttrType::String)
            .belongs_to("author", "person"),
    );
    client.register(
        "post",
        Schema::new()
            .attr("slug", AttrType::String)
            .attr("title", AttrType::String)
            .attr("body", AttrType::String)
            .attr("createdAt", AttrType::Date)
            .belongs_to("author", "person")
            .has_many("comments", "comment")
            .has_many("tags", "tag"),
    );

    Fixture { client, mock }
}
