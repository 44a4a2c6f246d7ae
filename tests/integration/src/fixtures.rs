//! Test fixtures: signing material and interaction payloads

use ed25519_dalek::{Signer, SigningKey};
use serde_json::{json, Value};

/// Bot token whose first segment decodes to application id 2002
pub const TOKEN: &str = "MjAwMg.GxYzAb.signature-part";
pub const APPLICATION_ID: &str = "2002";
pub const INTERACTION_TOKEN: &str = "interaction-token";
pub const TIMESTAMP: &str = "1700000000";

pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[42; 32])
}

pub fn public_key_hex() -> String {
    hex::encode(signing_key().verifying_key().to_bytes())
}

/// Hex signature over `timestamp || body`
pub fn sign(timestamp: &str, body: &str) -> String {
    let mut message = timestamp.as_bytes().to_vec();
    message.extend_from_slice(body.as_bytes());
    hex::encode(signing_key().sign(&message).to_bytes())
}

fn interaction(id: u64, kind: u8, data: Value) -> Value {
    json!({
        "id": id.to_string(),
        "application_id": APPLICATION_ID,
        "type": kind,
        "token": INTERACTION_TOKEN,
        "guild_id": "3003",
        "channel_id": "3004",
        "member": {"user": {"id": "4004", "username": "ann"}, "roles": []},
        "data": data
    })
}

pub fn ping() -> Value {
    json!({"id": "1", "application_id": APPLICATION_ID, "type": 1, "token": INTERACTION_TOKEN})
}

pub fn command(id: u64, name: &str) -> Value {
    interaction(id, 2, json!({"id": "5005", "name": name, "type": 1}))
}

pub fn subcommand(id: u64, parent: &str, child: &str, options: Value) -> Value {
    interaction(
        id,
        2,
        json!({
            "id": "5005",
            "name": parent,
            "type": 1,
            "options": [{"name": child, "type": 1, "options": options}]
        }),
    )
}

pub fn component(id: u64, custom_id: &str) -> Value {
    interaction(id, 3, json!({"custom_id": custom_id, "component_type": 2}))
}

/// Message object as the platform returns it for a created follow-up
pub fn message(id: u64, content: &str) -> Value {
    json!({"id": id.to_string(), "channel_id": "3004", "content": content})
}
