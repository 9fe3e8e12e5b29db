use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ConnectionId = Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GameStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_winner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
    #[serde(rename = "finalAngle", skip_serializing_if = "Option::is_none")]
    pub final_angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_left: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    StartGame {
        duration: f64,
        #[serde(rename = "finalAngle")]
        final_angle: f64,
        winner: String,
    },
    GameStatus(GameStatus),
    UpdateWinner {
        winner: String,
    },
    PlayBeep,
    PlayFanfare,
    Error {
        message: String,
    },
    GameResetComplete,
    UpdateCurrentTime {
        current_time: String,
    },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    StartRotation { time: String },
    ConfirmWinner,
    RequestGameStatus,
    ResetGame,
}

/// An event plus who should see it. `None` means every connected client.
#[derive(Clone, Debug)]
pub struct Envelope {
    pub target: Option<ConnectionId>,
    pub event: ServerEvent,
}

impl Envelope {
    pub fn is_for(&self, connection: ConnectionId) -> bool {
        self.target.map_or(true, |target| target == connection)
    }
}

#[derive(Clone)]
pub struct BroadcastChannel {
    tx: broadcast::Sender<Envelope>,
}

impl BroadcastChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    // Sending with no subscribers is not an error for us.
    pub fn publish_all(&self, event: ServerEvent) {
        let _ = self.tx.send(Envelope {
            target: None,
            event,
        });
    }

    pub fn publish_to(&self, connection: ConnectionId, event: ServerEvent) {
        let _ = self.tx.send(Envelope {
            target: Some(connection),
            event,
        });
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_use_wire_names() {
        let start = ServerEvent::StartGame {
            duration: 12.5,
            final_angle: 800.0,
            winner: "kim".into(),
        };
        assert_eq!(
            serde_json::to_value(&start).unwrap(),
            json!({ "type": "start_game", "duration": 12.5, "finalAngle": 800.0, "winner": "kim" })
        );
        assert_eq!(
            serde_json::to_value(ServerEvent::PlayFanfare).unwrap(),
            json!({ "type": "play_fanfare" })
        );
        assert_eq!(
            serde_json::to_value(ServerEvent::GameStatus(GameStatus::default())).unwrap(),
            json!({ "type": "game_status" })
        );
    }

    #[test]
    fn client_events_parse() {
        let parsed: ClientEvent =
            serde_json::from_str(r#"{"type":"start_rotation","time":"12:30:00"}"#).unwrap();
        assert_eq!(
            parsed,
            ClientEvent::StartRotation {
                time: "12:30:00".into()
            }
        );
        let parsed: ClientEvent = serde_json::from_str(r#"{"type":"confirm_winner"}"#).unwrap();
        assert_eq!(parsed, ClientEvent::ConfirmWinner);
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"start_rotation"}"#).is_err());
    }

    #[tokio::test]
    async fn targeted_envelopes_only_match_their_connection() {
        let channel = BroadcastChannel::new(8);
        let mut rx = channel.subscribe();
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        channel.publish_to(other, ServerEvent::PlayBeep);
        channel.publish_all(ServerEvent::GameResetComplete);

        let first = rx.recv().await.unwrap();
        assert!(!first.is_for(me));
        assert!(first.is_for(other));
        let second = rx.recv().await.unwrap();
        assert!(second.is_for(me));
        assert_eq!(channel.receiver_count(), 1);
    }
}
