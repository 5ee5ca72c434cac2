use dashmap::DashMap;
use huddle_db::models::{ChatMessage, Room};
use tokio::sync::broadcast;

/// Room lifecycle notifications backing the "all active rooms" live view.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    Created(Room),
    Updated(Room),
    Deleted { room_id: String },
}

/// In-process fan-out hub: one broadcast feed for room lifecycle events and
/// one lazily-created channel per room for chat messages. Slow subscribers
/// simply lag (broadcast semantics); no delivery guarantees beyond what
/// the store already persists.
pub struct EventBus {
    rooms: broadcast::Sender<RoomEvent>,
    chats: DashMap<String, broadcast::Sender<ChatMessage>>,
    channel_capacity: usize,
}

impl EventBus {
    pub fn new(channel_capacity: usize) -> Self {
        let (rooms, _) = broadcast::channel(channel_capacity);
        Self {
            rooms,
            chats: DashMap::new(),
            channel_capacity,
        }
    }

    pub fn subscribe_rooms(&self) -> broadcast::Receiver<RoomEvent> {
        self.rooms.subscribe()
    }

    pub fn publish_room(&self, event: RoomEvent) {
        // Err just means nobody is listening right now.
        let _ = self.rooms.send(event);
    }

    pub fn subscribe_chat(&self, room_id: &str) -> broadcast::Receiver<ChatMessage> {
        self.chat_sender(room_id).subscribe()
    }

    pub fn publish_chat(&self, message: ChatMessage) {
        if let Some(sender) = self.chats.get(&message.room_id) {
            let _ = sender.send(message);
        }
    }

    /// Drops the room's chat channel; live receivers observe a close.
    pub fn remove_room(&self, room_id: &str) {
        self.chats.remove(room_id);
    }

    fn chat_sender(&self, room_id: &str) -> broadcast::Sender<ChatMessage> {
        self.chats
            .entry(room_id.to_string())
            .or_insert_with(|| broadcast::channel(self.channel_capacity).0)
            .clone()
    }
}
