//! Scenario tests for chat failover routing.

mod common;

use common::{ScriptedBackend, Step, init_tracing};
use std::sync::Arc;
use std::time::{Duration, Instant};
use vega_core::{Clock, MockClock};
use vega_models::BackendRegistry;
use vega_models::backend::{
    BackendRequest, ChatMessage, FnBackend, ImageAttachment, ImageMediaType, MessageContent,
};
use vega_router::{ChatService, CompletionRequest, ProviderCatalog, RouteError, RouterConfig};

fn service(backends: BackendRegistry, config: RouterConfig) -> ChatService {
    init_tracing();
    ChatService::new(ProviderCatalog::default(), backends, config)
}

fn image() -> ImageAttachment {
    ImageAttachment::from_base64("iVBORw0KGgo=", ImageMediaType::PNG)
}

#[tokio::test]
async fn third_working_candidate_answers() {
    let (backend, registry) = ScriptedBackend::new(Step::text("RESULT: test ```python\nprint(1)\n```"))
        .script("Chatai", vec![Step::fail("internal server error")])
        .script("AnyProvider", vec![Step::fail("bad gateway")])
        .into_registry();
    let service = service(registry, RouterConfig::default());

    let completion = service
        .route_chat(CompletionRequest::new("run it"))
        .await
        .unwrap();

    assert_eq!(completion.provider, "Blackbox");
    assert_eq!(completion.attempt_number, 3);
    assert_eq!(completion.model, "gpt-4");
    assert_eq!(completion.text, "**RESULT:**\ntest\n```python\nprint(1)\n```");
    assert_eq!(completion.raw_text, "RESULT: test ```python\nprint(1)\n```");
    assert_eq!(completion.message_length, 6);
    assert_eq!(
        backend.providers_called(),
        vec!["Chatai", "AnyProvider", "Blackbox"]
    );

    assert_eq!(service.state().preferred_provider(), "Blackbox");
    assert_eq!(service.state().success_count("Blackbox"), 1);
}

#[tokio::test]
async fn next_request_starts_at_last_successful_provider() {
    let (backend, registry) = ScriptedBackend::new(Step::text("ok"))
        .script("Chatai", vec![Step::fail("down")])
        .into_registry();
    let service = service(registry, RouterConfig::default());

    service.route_chat(CompletionRequest::new("one")).await.unwrap();
    let second = service.route_chat(CompletionRequest::new("two")).await.unwrap();

    assert_eq!(second.provider, "AnyProvider");
    assert_eq!(second.attempt_number, 1);
    assert_eq!(
        backend.providers_called(),
        vec!["Chatai", "AnyProvider", "AnyProvider"]
    );
}

#[tokio::test]
async fn everything_rate_limited_exhausts_the_capped_plan() {
    let (backend, registry) = ScriptedBackend::new(Step::RateLimited).into_registry();
    let service = service(registry, RouterConfig::default());

    let err = service
        .route_chat(CompletionRequest::new("hello"))
        .await
        .unwrap_err();

    match &err {
        RouteError::Exhausted {
            attempts,
            invocations,
            quarantined,
            image_request,
            usage,
        } => {
            assert_eq!(*attempts, 30);
            assert_eq!(*invocations, 30);
            assert_eq!(*quarantined, 11);
            assert!(!image_request);
            assert!(usage.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.call_count(), 30);
    assert_eq!(
        err.user_message(),
        "Sorry, all AI providers are currently unavailable. Please try again later."
    );
}

#[tokio::test]
async fn rate_limit_keywords_in_messages_quarantine_too() {
    let (backend, registry) =
        ScriptedBackend::new(Step::fail("Error 429: too many requests")).into_registry();
    let service = service(registry, RouterConfig::default().with_cycle_count(1));

    let err = service
        .route_chat(CompletionRequest::new("hello"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RouteError::Exhausted {
            attempts: 11,
            quarantined: 11,
            ..
        }
    ));
    assert_eq!(backend.call_count(), 11);
}

fn repeated_pair() -> CompletionRequest {
    CompletionRequest::new("hello").with_providers(vec!["A".into(), "B".into(), "A".into()])
}

#[tokio::test]
async fn rate_limited_provider_is_skipped_until_the_cycle_ends() {
    let (backend, registry) = ScriptedBackend::new(Step::fail("down"))
        .script("A", vec![Step::RateLimited, Step::RateLimited])
        .into_registry();
    let service = service(registry, RouterConfig::default().with_cycle_count(2));

    let err = service.route_chat(repeated_pair()).await.unwrap_err();

    assert!(matches!(
        err,
        RouteError::Exhausted {
            attempts: 4,
            invocations: 3,
            quarantined: 1,
            ..
        }
    ));
    assert_eq!(backend.providers_called(), vec!["A", "B", "B"]);
}

#[tokio::test]
async fn rate_limited_provider_returns_after_the_cycle_boundary() {
    let (backend, registry) = ScriptedBackend::new(Step::fail("down"))
        .script("A", vec![Step::RateLimited, Step::text("back")])
        .into_registry();
    let service = service(registry, RouterConfig::default().with_cycle_count(3));

    let completion = service.route_chat(repeated_pair()).await.unwrap();

    assert_eq!(completion.provider, "A");
    assert_eq!(completion.attempt_number, 5);
    assert_eq!(backend.providers_called(), vec!["A", "B", "B", "A"]);
}

#[tokio::test]
async fn explicit_model_routes_across_every_tier() {
    let (backend, registry) = ScriptedBackend::new(Step::fail("nope")).into_registry();
    let service = service(registry, RouterConfig::default());

    let err = service
        .route_chat(CompletionRequest::new("hello").with_model("qwen-3"))
        .await
        .unwrap_err();

    assert!(matches!(err, RouteError::Exhausted { attempts: 30, .. }));
    let calls = backend.calls();
    assert!(calls.iter().all(|call| call.model == "qwen-3"));
    assert!(calls.iter().any(|call| call.provider == "LambdaChat"));
}

#[tokio::test]
async fn explicit_providers_skip_unknown_backends() {
    let mut registry = BackendRegistry::new();
    registry.register(
        "Blackbox",
        Arc::new(FnBackend::new(|request: BackendRequest| async move {
            Ok(format!("model {}", request.model))
        })),
    );
    let service = service(registry, RouterConfig::default());

    let request = CompletionRequest::new("hello")
        .with_providers(vec!["Ghost".to_string(), "Blackbox".to_string()])
        .with_model("gpt-4o-mini");
    let completion = service.route_chat(request).await.unwrap();

    assert_eq!(completion.provider, "Blackbox");
    assert_eq!(completion.attempt_number, 2);
    assert_eq!(completion.raw_text, "model gpt-4o-mini");
}

#[tokio::test]
async fn image_requests_only_reach_vision_providers() {
    let (backend, registry) = ScriptedBackend::new(Step::text("A red square.")).into_registry();
    let service = service(registry, RouterConfig::default());

    let completion = service
        .route_chat(CompletionRequest::new("").with_image(image()))
        .await
        .unwrap();

    assert_eq!(completion.provider, "PollinationsAI");
    assert_eq!(completion.model, "gpt-4o");

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    let last = calls[0].messages.last().unwrap();
    assert!(last.has_image());
    assert!(matches!(last.content, MessageContent::Parts(_)));
    assert_eq!(last.text(), "Describe in detail what you see in the image");
}

#[tokio::test]
async fn failed_image_request_uses_vision_wording() {
    let (backend, registry) = ScriptedBackend::new(Step::fail("image input unsupported")).into_registry();
    let service = service(registry, RouterConfig::default());

    let err = service
        .route_chat(CompletionRequest::new("what is this?").with_image(image()))
        .await
        .unwrap_err();

    assert!(err.is_image_request());
    assert!(matches!(err, RouteError::Exhausted { attempts: 3, .. }));
    assert!(err.user_message().contains("vision providers"));
    assert!(
        backend
            .providers_called()
            .iter()
            .all(|provider| provider == "PollinationsAI")
    );
}

#[tokio::test(start_paused = true)]
async fn timed_out_attempt_moves_on() {
    let (_backend, registry) = ScriptedBackend::new(Step::text("ok"))
        .script("Chatai", vec![Step::Hang])
        .into_registry();
    let service = service(
        registry,
        RouterConfig::default().with_request_timeout(Duration::from_secs(5)),
    );

    let started = tokio::time::Instant::now();
    let completion = service.route_chat(CompletionRequest::new("hi")).await.unwrap();

    assert_eq!(completion.provider, "AnyProvider");
    assert_eq!(completion.attempt_number, 2);
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn network_failures_pause_before_next_attempt() {
    let (_backend, registry) = ScriptedBackend::new(Step::text("ok"))
        .script("Chatai", vec![Step::Network])
        .into_registry();
    let service = service(registry, RouterConfig::default());

    let started = tokio::time::Instant::now();
    let completion = service.route_chat(CompletionRequest::new("hi")).await.unwrap();

    assert_eq!(completion.attempt_number, 2);
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn rate_limits_do_not_pause() {
    let (_backend, registry) = ScriptedBackend::new(Step::text("ok"))
        .script("Chatai", vec![Step::RateLimited])
        .into_registry();
    let service = service(registry, RouterConfig::default());

    let started = tokio::time::Instant::now();
    service.route_chat(CompletionRequest::new("hi")).await.unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn proxy_is_attached_after_repeated_failures() {
    let (backend, registry) = ScriptedBackend::new(Step::text("ok"))
        .script("Chatai", vec![Step::fail("down")])
        .script("AnyProvider", vec![Step::fail("down")])
        .script("Blackbox", vec![Step::fail("down")])
        .into_registry();
    let service = service(
        registry,
        RouterConfig::default().with_proxy("http://127.0.0.1:3128"),
    );
    service.set_proxy_enabled(true);

    let completion = service.route_chat(CompletionRequest::new("hi")).await.unwrap();

    assert_eq!(completion.attempt_number, 4);
    assert!(completion.proxy_used);
    let proxies: Vec<_> = backend.calls().into_iter().map(|call| call.proxy).collect();
    assert_eq!(
        proxies,
        vec![None, None, None, Some("http://127.0.0.1:3128".to_string())]
    );
}

#[tokio::test]
async fn proxy_stays_off_while_switch_is_off() {
    let (backend, registry) = ScriptedBackend::new(Step::fail("down")).into_registry();
    let service = service(
        registry,
        RouterConfig::default()
            .with_proxy("http://127.0.0.1:3128")
            .with_cycle_count(1),
    );

    service.route_chat(CompletionRequest::new("hi")).await.unwrap_err();

    assert!(backend.calls().iter().all(|call| call.proxy.is_none()));
}

#[tokio::test]
async fn history_is_trimmed_before_routing() {
    let (backend, registry) = ScriptedBackend::new(Step::text("ok")).into_registry();
    let service = service(registry, RouterConfig::default().with_history_limits(2, 1_000));

    let history = (0..5)
        .map(|i| ChatMessage::user(format!("message {i}")))
        .collect();
    let completion = service
        .route_chat(CompletionRequest::new("latest").with_history(history))
        .await
        .unwrap();

    assert_eq!(completion.history_length, 2);
    let messages = &backend.calls()[0].messages;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].text(), "message 3");
    assert_eq!(messages[2].text(), "latest");
}

#[tokio::test]
async fn elapsed_time_comes_from_the_clock() {
    let mock = Arc::new(MockClock::new(Instant::now()));
    let ticking = Arc::clone(&mock);
    let registry = BackendRegistry::new().with_fallback(Arc::new(FnBackend::new(
        move |_request: BackendRequest| {
            ticking.advance(Duration::from_millis(250));
            async { Ok("ok".to_string()) }
        },
    )));
    let service = service(registry, RouterConfig::default())
        .with_clock(Clock::with_provider(mock));

    let completion = service.route_chat(CompletionRequest::new("hi")).await.unwrap();

    assert_eq!(completion.elapsed, Duration::from_millis(250));
}

#[tokio::test]
async fn concurrent_requests_share_counters() {
    let (backend, registry) = ScriptedBackend::new(Step::text("ok")).into_registry();
    let service = Arc::new(service(registry, RouterConfig::default()));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .route_chat(CompletionRequest::new(format!("request {i}")))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let usage = service.provider_info().usage;
    assert_eq!(usage.values().sum::<u64>(), 16);
    assert_eq!(backend.call_count(), 16);
}
