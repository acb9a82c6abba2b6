//! Snapshot tests for generated sources.
//!
//! Run `cargo insta review` to update snapshots when making intentional changes.

use std::path::Path;

use trellis_codegen::{GenerateOptions, generate};
use trellis_config::Config;

const CONFIG: &str = r#"
[project]
namespace = "acme-blog"
version = 2

[capabilities.edit_posts]
capability = "edit_posts"

[schemas.post]
path = "schemas/post.json"

[resources.post]
route = "/posts"
schema = "post"
capability = "edit_posts"
cache_ttl = 300

[resources.comment]
route = "/comments"
schema = "post"
methods = ["list", "create"]
"#;

/// Generate into a temporary directory and read back one file.
async fn generated(path: &str) -> String {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    let config: Config = CONFIG.parse().expect("Failed to parse config");
    generate(config, GenerateOptions::new(temp.path()))
        .await
        .expect("Generation failed");
    std::fs::read_to_string(temp.path().join(Path::new(path))).expect("File not generated")
}

#[tokio::test]
async fn test_routes_file() {
    let routes = generated(".generated/php/Rest/Routes.php").await;
    insta::assert_snapshot!("routes", routes);
}

#[tokio::test]
async fn test_ts_index_file() {
    let index = generated(".generated/ts/index.ts").await;
    insta::assert_snapshot!("ts_index", index);
}

#[tokio::test]
async fn test_ts_fetcher_file() {
    let fetcher = generated(".generated/ts/fetcher.ts").await;
    insta::assert_snapshot!("ts_fetcher", fetcher);
}

#[tokio::test]
async fn test_comment_client_file() {
    let client = generated(".generated/ts/comment.ts").await;
    insta::assert_snapshot!("comment_client", client);
}
