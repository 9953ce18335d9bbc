//! Proptest generators for property-based testing.

use proptest::prelude::*;

use merklog_core::{ContentHash, Message, PeerId};

/// Generate a random ContentHash.
pub fn content_hash() -> impl Strategy<Value = ContentHash> {
    any::<[u8; 32]>().prop_map(ContentHash::from_bytes)
}

/// Generate a peer identity in the `connection {i}` form.
pub fn peer_id() -> impl Strategy<Value = PeerId> {
    (0usize..8).prop_map(PeerId::from_index)
}

/// Generate an RFC 3339 UTC timestamp with millisecond precision.
pub fn timestamp() -> impl Strategy<Value = String> {
    (2020u32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60, 0u32..1000).prop_map(
        |(y, mo, d, h, mi, s, ms)| {
            format!("{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z", y, mo, d, h, mi, s, ms)
        },
    )
}

/// Generate message text, including empty and non-ASCII bodies.
pub fn text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z ]{1,24}".prop_map(String::from),
        "\\PC{0,40}".prop_map(String::from),
    ]
}

/// Parameters for generating a message.
#[derive(Debug, Clone)]
pub struct MessageParams {
    pub author: PeerId,
    pub timestamp: String,
    pub text: String,
}

impl MessageParams {
    pub fn build(&self) -> Message {
        Message::with_timestamp(self.author.clone(), self.text.clone(), self.timestamp.clone())
    }
}

impl Arbitrary for MessageParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (peer_id(), timestamp(), text())
            .prop_map(|(author, timestamp, text)| MessageParams {
                author,
                timestamp,
                text,
            })
            .boxed()
    }
}

/// Generate a message.
pub fn message() -> impl Strategy<Value = Message> {
    any::<MessageParams>().prop_map(|params| params.build())
}

/// Generate up to `max` pairwise distinct messages.
pub fn message_set(max: usize) -> impl Strategy<Value = Vec<Message>> {
    prop::collection::hash_set(message(), 0..=max).prop_map(|set| set.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use merklog_core::{canonical_message_bytes, compute_root, decode_message};

    proptest! {
        #[test]
        fn canonical_bytes_decode_back(msg in message()) {
            let bytes = canonical_message_bytes(&msg);
            prop_assert_eq!(decode_message(&bytes).unwrap(), msg);
        }

        #[test]
        fn root_is_deterministic(messages in message_set(24)) {
            prop_assert_eq!(compute_root(&messages).root(), compute_root(&messages).root());
        }

        #[test]
        fn tree_holds_every_leaf(messages in message_set(24)) {
            let tree = compute_root(&messages);
            prop_assert_eq!(tree.leaf_count(), messages.len());
            for m in &messages {
                prop_assert!(tree.contains(&m.compute_hash()));
            }
        }
    }
}
