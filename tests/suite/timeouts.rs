use std::time::{Duration, Instant};

use tandem::{
    CallEnvelope, CallPattern, Coordinator, CoordinatorConfig, CoordinatorError,
    DEFAULT_DEADLINE_ENV, Expectation, args, eq,
};

#[tokio::test]
async fn deadline_fires_after_roughly_its_duration() {
    let coordinator = Coordinator::new();
    let _unrelated = coordinator.submit(CallEnvelope::new("Register", args!["Pong"]));

    let started = Instant::now();
    let err = coordinator
        .expect(
            Expectation::eventual(CallPattern::new("Register").arg(eq("Ping")))
                .within(Duration::from_millis(50)),
        )
        .returns_nothing()
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(50), "fired early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "fired late: {elapsed:?}");

    let message = err.to_string();
    assert!(
        message.starts_with(r#"timed out after "#),
        "unexpected message: {message}"
    );
    assert!(message.contains(r#"waiting for Register("Ping") [eventual, within 50ms]"#));
    assert!(message.contains(r#"pending calls: #1 Register("Pong")"#));
}

#[tokio::test]
async fn sequential_deadline_fires_on_an_empty_queue() {
    let coordinator = Coordinator::new();
    let err = coordinator
        .expect(CallPattern::new("Hit"))
        .within(Duration::from_millis(20))
        .claim()
        .await
        .unwrap_err();
    match err {
        CoordinatorError::Timeout {
            waited, pending, ..
        } => {
            assert!(waited >= Duration::from_millis(20));
            assert!(pending.is_empty());
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    coordinator.close().unwrap();
}

#[tokio::test]
async fn a_match_arriving_before_the_deadline_wins() -> anyhow::Result<()> {
    let coordinator = Coordinator::new();
    let producer = coordinator.clone();
    let player = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        producer.invoke("Hit", args!["Ping"]).await
    });

    coordinator
        .expect(CallPattern::new("Hit"))
        .within(Duration::from_secs(5))
        .returns(args![true])
        .await?;
    assert_eq!(player.await?, args![true]);
    coordinator.close()?;
    Ok(())
}

#[tokio::test]
async fn producer_gives_up_after_response_timeout() {
    let coordinator = Coordinator::with_config(
        CoordinatorConfig::default().with_response_timeout(Duration::from_millis(20)),
    );
    let pending = coordinator.submit(CallEnvelope::new("Flip", Vec::new()));

    match pending.await_response().await {
        Err(CoordinatorError::ResponseTimeout { call, waited }) => {
            assert_eq!(call.identity(), "Flip");
            assert_eq!(waited, Duration::from_millis(20));
        }
        other => panic!("expected ResponseTimeout, got {other:?}"),
    }

    // The unanswered call is still a test bug at close.
    assert!(matches!(
        coordinator.close(),
        Err(CoordinatorError::Stranded { .. })
    ));
}

#[tokio::test]
async fn env_style_overrides_feed_the_default_deadline() -> anyhow::Result<()> {
    let config = CoordinatorConfig::from_toml_str("default_deadline_ms = 5000")?.with_overrides(
        |var| (var == DEFAULT_DEADLINE_ENV).then(|| "15".to_string()),
    )?;
    let coordinator = Coordinator::with_config(config);

    let err = coordinator
        .expect(CallPattern::new("Hit"))
        .claim()
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Timeout { .. }));
    Ok(())
}

