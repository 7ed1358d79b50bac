//! Proptest generators for property-based testing.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use vbc_core::{AccountId, Post, PostId, PublishedRecord};

/// Generate any post ID, including negative ones.
pub fn post_id() -> impl Strategy<Value = PostId> {
    any::<i64>().prop_map(PostId)
}

/// Generate a realistic (positive) post ID.
pub fn status_id() -> impl Strategy<Value = PostId> {
    (1i64..=i64::MAX).prop_map(PostId)
}

/// Generate an account ID.
pub fn account_id() -> impl Strategy<Value = AccountId> {
    (1i64..=1_000_000_000i64).prop_map(AccountId)
}

/// Generate a creation time between 2016 and 2033.
pub fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (1_451_606_400i64..=2_000_000_000i64).prop_map(|secs| {
        Utc.timestamp_opt(secs, 0)
            .single()
            .expect("timestamp in range")
    })
}

/// Generate post HTML: one or more paragraphs of words.
pub fn content() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z0-9]{1,10}( [a-zA-Z0-9]{1,10}){0,8}", 1..4).prop_map(
        |paragraphs| {
            paragraphs
                .iter()
                .map(|p| format!("<p>{}</p>", p))
                .collect::<String>()
        },
    )
}

/// Generate a destination record descriptor.
pub fn published_record() -> impl Strategy<Value = PublishedRecord> {
    ("bafy[a-z2-7]{20}", "[a-z0-9]{13}").prop_map(|(cid, rkey)| {
        PublishedRecord::new(cid, format!("at://did:plc:test/app.bsky.feed.post/{}", rkey))
    })
}

/// Parameters for generating a post.
#[derive(Debug, Clone)]
pub struct PostParams {
    pub id: PostId,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub reply: bool,
    pub attachments: usize,
}

impl Arbitrary for PostParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            status_id(),
            timestamp(),
            content(),
            any::<bool>(),
            prop_oneof![3 => Just(0usize), 1 => 1usize..=4],
        )
            .prop_map(|(id, created_at, content, reply, attachments)| PostParams {
                id,
                created_at,
                content,
                reply,
                attachments,
            })
            .boxed()
    }
}

/// Build a post from parameters.
pub fn post_from_params(params: &PostParams) -> Post {
    Post {
        id: params.id,
        created_at: params.created_at,
        content: params.content.clone(),
        url: None,
        in_reply_to: params.reply.then(|| PostId(params.id.0.saturating_sub(1))),
        attachment_count: params.attachments,
    }
}
