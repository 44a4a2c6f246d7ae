//! Fakes shared by the dispatch tests

use async_trait::async_trait;
use itx_core::{Interaction, InteractionType};
use itx_rest::{Method, RestError, RestHandler};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub(crate) method: Method,
    pub(crate) route: String,
    pub(crate) body: Option<Value>,
}

/// Records every request and answers with canned bodies per route
#[derive(Default)]
pub(crate) struct RecordingRest {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<HashMap<String, Value>>,
}

impl RecordingRest {
    pub(crate) fn respond(&self, route: &str, body: Value) {
        self.responses.lock().insert(route.to_string(), body);
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Poll until at least `count` calls were recorded
    pub(crate) async fn wait_for_calls(&self, count: usize) -> Vec<RecordedCall> {
        for _ in 0..200 {
            let calls = self.calls();
            if calls.len() >= count {
                return calls;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} REST calls, got {:?}", self.calls());
    }
}

#[async_trait]
impl RestHandler for RecordingRest {
    async fn request(
        &self,
        method: Method,
        route: &str,
        body: Option<Value>,
    ) -> Result<Vec<u8>, RestError> {
        self.calls.lock().push(RecordedCall {
            method,
            route: route.to_string(),
            body,
        });

        match self.responses.lock().get(route) {
            Some(body) => Ok(serde_json::to_vec(body)?),
            None => Ok(Vec::new()),
        }
    }
}

/// Guild interaction with id 1001, application 2002 and token `tok`
pub(crate) fn interaction(kind: InteractionType, data: Value) -> Interaction {
    serde_json::from_value(json!({
        "id": "1001",
        "application_id": "2002",
        "type": kind.as_u8(),
        "token": "tok",
        "version": 1,
        "guild_id": "3003",
        "channel_id": "3004",
        "member": {
            "user": {"id": "4004", "username": "ann"},
            "roles": [],
            "permissions": "8"
        },
        "data": data
    }))
    .unwrap()
}

pub(crate) fn command_interaction(name: &str, options: Value) -> Interaction {
    interaction(
        InteractionType::ApplicationCommand,
        json!({"id": "5005", "name": name, "type": 1, "options": options}),
    )
}

pub(crate) fn component_interaction(custom_id: &str) -> Interaction {
    interaction(
        InteractionType::MessageComponent,
        json!({"custom_id": custom_id, "component_type": 2}),
    )
}

pub(crate) fn modal_interaction(custom_id: &str, input_id: &str, value: &str) -> Interaction {
    interaction(
        InteractionType::ModalSubmit,
        json!({
            "custom_id": custom_id,
            "components": [{
                "type": 1,
                "components": [{"type": 4, "custom_id": input_id, "value": value}]
            }]
        }),
    )
}
