//! Integration tests for the URL confirmation flow (validation, registry,
//! conversation state, callback routing)
//!
//! Run with: cargo test --test flow_test

use std::time::Duration;

// ============================================================================
// Validation -> Registry -> Callback Flow
// ============================================================================

mod confirmation_flow_tests {
    use super::*;
    use teloxide::types::ChatId;
    use vidrelay::registry::LinkRegistry;
    use vidrelay::state::{ConversationState, ConversationStore};
    use vidrelay::telegram::handlers::{parse_callback, CallbackAction};

    /// A valid incoming URL walks the whole happy path: the resolved link
    /// gets stored, the chat moves to awaiting-confirmation, and the
    /// callback id round-trips back to the stored link.
    #[tokio::test]
    async fn test_confirm_flow_roundtrip() {
        let registry = LinkRegistry::new(Duration::from_secs(60), 16);
        let states = ConversationStore::new();
        let chat = ChatId(100);

        let resolved = "https://cdn.example.com/video/abcd.mp4";
        let id = registry.store(resolved).await;
        states.set_awaiting(chat, id.clone()).await;

        assert!(states.get(chat).await.is_awaiting_confirmation());

        // The button payload is what would arrive in the callback query.
        let payload = format!("confirm:{}", id);
        match parse_callback(&payload) {
            CallbackAction::Download(link_id) => {
                assert_eq!(registry.lookup(&link_id).await.as_deref(), Some(resolved));
            }
            other => panic!("expected Download action, got {:?}", other),
        }

        states.clear(chat).await;
        assert_eq!(states.get(chat).await, ConversationState::Idle);
    }

    /// Cancelling clears the chat state but leaves the registry entry in
    /// place until its TTL runs out, so a re-sent URL reuses the same id.
    #[tokio::test]
    async fn test_cancel_keeps_registry_entry() {
        let registry = LinkRegistry::new(Duration::from_secs(60), 16);
        let states = ConversationStore::new();
        let chat = ChatId(200);

        let id = registry.store("https://cdn.example.com/v.mp4").await;
        states.set_awaiting(chat, id.clone()).await;

        assert_eq!(parse_callback("cancel"), CallbackAction::Cancel);
        states.clear(chat).await;

        assert_eq!(states.get(chat).await, ConversationState::Idle);
        assert!(registry.lookup(&id).await.is_some());

        // Storing the same link again hands back the same id.
        let id2 = registry.store("https://cdn.example.com/v.mp4").await;
        assert_eq!(id, id2);
    }

    /// A second URL while a confirmation is pending supersedes the first:
    /// the new pending link replaces the old one, never stacks on it.
    #[tokio::test]
    async fn test_new_url_supersedes_pending_confirmation() {
        let registry = LinkRegistry::new(Duration::from_secs(60), 16);
        let states = ConversationStore::new();
        let chat = ChatId(300);

        let first = registry.store("https://cdn.example.com/first.mp4").await;
        states.set_awaiting(chat, first.clone()).await;

        let second = registry.store("https://cdn.example.com/second.mp4").await;
        states.set_awaiting(chat, second.clone()).await;

        match states.get(chat).await {
            ConversationState::AwaitingConfirmation { pending_link_id } => {
                assert_eq!(pending_link_id, second);
                assert_ne!(pending_link_id, first);
            }
            ConversationState::Idle => panic!("expected a pending confirmation"),
        }
    }

    /// Confirming after the entry expired behaves like an unknown id.
    #[tokio::test]
    async fn test_expired_entry_lookup_misses() {
        let registry = LinkRegistry::new(Duration::from_millis(10), 16);
        let id = registry.store("https://cdn.example.com/old.mp4").await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(registry.lookup(&id).await.is_none());
    }

    /// Stale or malformed callback payloads never turn into downloads.
    #[test]
    fn test_malformed_callback_payloads_rejected() {
        for payload in ["confirm:", "confirm:not-hex!", "download:abc123", "", "confirm"] {
            assert_eq!(
                parse_callback(payload),
                CallbackAction::Unknown,
                "payload {:?} should be rejected",
                payload
            );
        }
    }
}

// ============================================================================
// Validation + Resolver Response Scenarios
// ============================================================================

mod resolver_scenario_tests {
    use reqwest::StatusCode;
    use vidrelay::core::validation::{SupportedDomains, ValidationError};
    use vidrelay::resolver::{parse_response, ExtractionResult};

    fn test_domains() -> SupportedDomains {
        SupportedDomains::new(vec![
            ("youtube.com".to_string(), "YouTube".to_string()),
            ("tiktok.com".to_string(), "TikTok".to_string()),
        ])
    }

    /// The full reject-before-resolve gate: only allow-listed hosts make
    /// it to the resolver at all.
    #[test]
    fn test_only_allowed_hosts_reach_resolver() {
        let domains = test_domains();

        assert!(domains.validate("https://www.youtube.com/watch?v=abc").is_ok());
        assert!(domains.validate("https://tiktok.com/@user/video/1").is_ok());

        assert!(matches!(
            domains.validate("https://vimeo.com/12345"),
            Err(ValidationError::UnsupportedDomain(_))
        ));
        assert!(matches!(
            domains.validate("not a url"),
            Err(ValidationError::InvalidUrl(_))
        ));
    }

    /// A successful resolver answer carries the direct link through.
    #[test]
    fn test_success_response_yields_link() {
        let body = r#"{"status":"success","url":"https://cdn.example.com/v.mp4"}"#;
        assert_eq!(
            parse_response(StatusCode::OK, body),
            ExtractionResult::Success("https://cdn.example.com/v.mp4".to_string())
        );
    }

    /// Scenario: the resolver is down. The failure message keeps the
    /// status code so the reply to the user is diagnosable.
    #[test]
    fn test_resolver_outage_reports_status() {
        let result = parse_response(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded");
        match result {
            ExtractionResult::Failure(msg) => assert!(msg.contains("500")),
            other => panic!("expected Failure, got {:?}", other),
        }
    }
}
