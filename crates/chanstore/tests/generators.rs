#![allow(dead_code)]

use chanstore::Message;
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::{BTreeSet, HashSet};

pub const CHANNELS: [&[u8]; 2] = [b"general", b"random"];

/// Content-addressed hash of a message's fields.
pub fn hash_of(channel: &[u8], height: u64, parents: &[Vec<u8>], content: &[u8]) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(channel.len() as u64).to_le_bytes());
    hasher.update(channel);
    hasher.update(&height.to_le_bytes());
    for parent in parents {
        hasher.update(&[u8::try_from(parent.len()).unwrap()]);
        hasher.update(parent);
    }
    hasher.update(content);
    hasher.finalize().as_bytes().to_vec()
}

/// Build a message whose height is one more than its tallest parent.
pub fn make_message(channel: &[u8], parents: &[&Message], content: &[u8]) -> Message {
    let height = parents.iter().map(|p| p.height + 1).max().unwrap_or(0);
    let parent_hashes: Vec<Vec<u8>> = parents.iter().map(|p| p.hash.clone()).collect();
    Message {
        channel_id: channel.to_vec(),
        hash: hash_of(channel, height, &parent_hashes, content),
        height,
        parents: parent_hashes,
        content: content.to_vec(),
    }
}

/// A linear chain of `len` messages in `channel`.
pub fn chain(channel: &[u8], len: usize) -> Vec<Message> {
    let mut out: Vec<Message> = Vec::with_capacity(len);
    for i in 0..len {
        let content = format!("msg-{i}").into_bytes();
        let msg = match out.last() {
            Some(prev) => make_message(channel, &[prev], &content),
            None => make_message(channel, &[], &content),
        };
        out.push(msg);
    }
    out
}

/// Leaves computed from scratch: hashes in `channel` cited by no message there.
pub fn naive_leaves(messages: &[Message], channel: &[u8]) -> BTreeSet<Vec<u8>> {
    let in_channel: Vec<&Message> = messages.iter().filter(|m| m.channel_id == channel).collect();
    let cited: HashSet<&Vec<u8>> = in_channel.iter().flat_map(|m| m.parents.iter()).collect();
    in_channel
        .iter()
        .filter(|m| !cited.contains(&m.hash))
        .map(|m| m.hash.clone())
        .collect()
}

/// Messages of `channel` sorted by the canonical `(height, hash)` key.
pub fn canonical_order(messages: &[Message], channel: &[u8]) -> Vec<Message> {
    let mut out: Vec<Message> = messages
        .iter()
        .filter(|m| m.channel_id == channel)
        .cloned()
        .collect();
    out.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    out
}

/// Random multi-channel DAG in causal order.
///
/// Each step picks a channel, up to three parents among earlier messages of
/// that channel, and a payload.
pub fn arb_dag(max_len: usize) -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec(
        (
            0..CHANNELS.len(),
            prop::collection::vec(any::<Index>(), 0..=3),
            prop::collection::vec(any::<u8>(), 0..16),
        ),
        1..max_len,
    )
    .prop_map(|steps| {
        let mut messages: Vec<Message> = Vec::new();
        for (step, (channel_idx, parent_picks, mut content)) in steps.into_iter().enumerate() {
            let channel = CHANNELS[channel_idx];
            // Keeps hashes unique when two steps draw identical fields.
            content.extend_from_slice(&(step as u64).to_le_bytes());

            let candidates: Vec<&Message> =
                messages.iter().filter(|m| m.channel_id == channel).collect();
            let mut parents: Vec<&Message> = Vec::new();
            if !candidates.is_empty() {
                for pick in &parent_picks {
                    let parent = *pick.get(&candidates);
                    if !parents.iter().any(|p| p.hash == parent.hash) {
                        parents.push(parent);
                    }
                }
            }
            let msg = make_message(channel, &parents, &content);
            messages.push(msg);
        }
        messages
    })
}

/// A random DAG together with a shuffled insertion order.
pub fn arb_dag_and_order(max_len: usize) -> impl Strategy<Value = (Vec<Message>, Vec<Message>)> {
    arb_dag(max_len).prop_flat_map(|dag| {
        let shuffled = Just(dag.clone()).prop_shuffle();
        (Just(dag), shuffled)
    })
}

/// Lists of hashes that fit the one-byte length prefix.
pub fn arb_hash_list() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..=255), 0..12)
}
