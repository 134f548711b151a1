// Chat state, backend client and auth for the palaver terminal client
pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod fixtures;
pub mod models;

// Re-export main types for convenience
pub use models::*;
pub use auth::AuthGateway;
pub use chat::{ChatEvent, ChatSession, MessageDispatcher};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        let mut status = DeliveryStatus::Sending;
        status.advance(DeliveryStatus::Sent).unwrap();
        status.advance(DeliveryStatus::Delivered).unwrap();
        status.advance(DeliveryStatus::Read).unwrap();
        assert_eq!(status, DeliveryStatus::Read);

        // No way back from read
        assert!(status.advance(DeliveryStatus::Sending).is_err());
        assert!(status.advance(DeliveryStatus::Error).is_err());
        assert_eq!(status, DeliveryStatus::Read);
    }

    #[test]
    fn test_error_is_terminal() {
        let mut status = DeliveryStatus::Sent;
        status.advance(DeliveryStatus::Error).unwrap();
        for next in [
            DeliveryStatus::Sending,
            DeliveryStatus::Sent,
            DeliveryStatus::Delivered,
            DeliveryStatus::Read,
            DeliveryStatus::Error,
        ] {
            assert!(!status.can_advance_to(next), "error moved to {:?}", next);
        }
    }

    #[test]
    fn test_same_status_is_not_an_advance() {
        let mut status = DeliveryStatus::Delivered;
        let err = status.advance(DeliveryStatus::Delivered).unwrap_err();
        assert_eq!(err.from, DeliveryStatus::Delivered);
        assert!(!DeliveryStatus::Delivered.can_advance_to(DeliveryStatus::Error));
    }

    #[test]
    fn test_sender_tags() {
        assert_eq!(Sender::Me.as_str(), "me");
        assert_eq!(Sender::Contact.as_str(), "contact");
        assert_eq!(Sender::Ai.as_str(), "ai");

        let msg = Message {
            id: 1,
            text: "Hello, world!".to_string(),
            sender: Sender::Me,
            timestamp: "09:00".to_string(),
            status: DeliveryStatus::Sending,
        };
        assert!(msg.is_outgoing());
    }

    #[test]
    fn test_user_id_accepts_strings_and_numbers() {
        let user: User =
            serde_json::from_str(r#"{"id": 42, "name": "Ana", "email": "a@b.c"}"#).unwrap();
        assert_eq!(user.id, "42");
        let user: User = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(user.id, "abc");
        assert!(user.name.is_empty());
        assert!(serde_json::from_str::<User>(r#"{"id": null}"#).is_err());
    }
}
