use std::time::{SystemTime, UNIX_EPOCH};

use json_server_provider::{Id, JsonServerProvider, ListParams, SortOrder};
use serde_json::{json, Value as JsonValue};

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock must be after epoch")
        .as_millis()
}

fn created_id(record: &JsonValue) -> Id {
    match &record["id"] {
        JsonValue::Number(number) => Id::Integer(number.as_i64().expect("numeric id must fit i64")),
        JsonValue::String(text) => Id::Text(text.clone()),
        other => panic!("server returned unexpected id {other}"),
    }
}

/// Runs against a real json-server when `JSON_SERVER_URL` is set.
///
/// `JSON_SERVER_RESOURCE` names a writable collection (default `posts`).
#[tokio::test]
async fn live_crud_roundtrip() {
    let provider = match JsonServerProvider::from_env() {
        Ok(provider) => provider,
        Err(err) => {
            eprintln!("skipping live test: {err}");
            return;
        }
    };
    let resource = std::env::var("JSON_SERVER_RESOURCE").unwrap_or_else(|_| "posts".to_owned());
    let title = format!("live-{}", unique_suffix());

    let created = provider
        .create_one(&resource, &json!({"id": "ignored", "title": title}))
        .await
        .expect("create must succeed");
    let id = created_id(&created.data);
    assert_ne!(id, Id::from("ignored"));

    let fetched = provider
        .get_one(&resource, id.clone())
        .await
        .expect("get must succeed");
    assert_eq!(fetched.data["title"], json!(title));

    provider
        .update_one(&resource, id.clone(), &json!({"title": format!("{title}-renamed")}))
        .await
        .expect("update must succeed");

    let listed = provider
        .list_many(
            &resource,
            &ListParams::new()
                .filter("title", format!("{title}-renamed"))
                .sort("id")
                .order(SortOrder::Asc)
                .limit(10),
        )
        .await
        .expect("list must succeed");
    assert_eq!(listed.data.as_array().map(Vec::len), Some(1));

    let deleted = provider
        .delete_one(&resource, id.clone())
        .await
        .expect("delete must succeed");
    assert_eq!(deleted.data.id, id);

    let missing = provider
        .get_one(&resource, id)
        .await
        .expect_err("deleted record must be gone");
    assert_eq!(missing.status(), Some(404));
}
