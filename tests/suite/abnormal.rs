//! Abnormal responses travel back into the target and out through its outcome.

use tandem::{
    CallEnvelope, CallPattern, Coordinator, CoordinatorError, Outcome, Response, TargetError,
    TargetState, Value, args, eq,
};

#[tokio::test]
async fn abnormal_response_aborts_the_target_with_the_same_payload() -> anyhow::Result<()> {
    let coordinator = Coordinator::new();
    let producer = coordinator.clone();
    let mut player = coordinator.target("player");
    player.start(async move {
        let served = producer.invoke("IsServing", args!["Ping"]).await;
        producer.invoke("Hit", args!["Ping"]).await;
        served
    })?;

    coordinator
        .expect(CallPattern::new("IsServing").arg(eq("Ping")))
        .aborts("boom")
        .await?;

    player.expect_abnormal_equals("boom").await?;
    assert_eq!(player.state(), TargetState::Aborted);
    // The target never reached its second call.
    assert!(coordinator.pending_calls().is_empty());
    coordinator.close()?;
    Ok(())
}

#[tokio::test]
async fn expecting_a_return_from_an_aborted_target_fails() -> anyhow::Result<()> {
    let coordinator = Coordinator::new();
    let producer = coordinator.clone();
    let mut player = coordinator.target("player");
    player.start(async move { producer.invoke("Flip", Vec::new()).await })?;

    coordinator
        .expect(CallPattern::new("Flip"))
        .aborts(serde_json::json!({"error": "net"}))
        .await?;

    let err = player
        .expect_returns_equal(args![true])
        .await
        .unwrap_err();
    assert!(matches!(err, TargetError::AbortedInstead { .. }));
    assert!(err.to_string().contains("aborted instead"), "{err}");
    assert_eq!(
        player.await_outcome().await?,
        &Outcome::Aborted(serde_json::json!({"error": "net"}))
    );
    coordinator.close()?;
    Ok(())
}

#[tokio::test]
async fn expecting_an_abort_from_a_returning_target_fails() -> anyhow::Result<()> {
    let coordinator = Coordinator::new();
    let producer = coordinator.clone();
    let mut player = coordinator.target("player");
    player.start(async move { producer.invoke("Flip", Vec::new()).await })?;

    coordinator
        .expect(CallPattern::new("Flip"))
        .returns(args![false])
        .await?;

    let err = player.expect_abnormal_equals("boom").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"target player was expected to abort with "boom" but it returned (false) instead"#
    );
    coordinator.close()?;
    Ok(())
}

#[tokio::test]
async fn ordinary_panics_are_abnormal_terminations_too() -> anyhow::Result<()> {
    let coordinator = Coordinator::new();
    let mut player = coordinator.target("player");
    player.start(refuse_to_play())?;

    player.expect_abnormal_equals("no table").await?;
    coordinator.close()?;
    Ok(())
}

async fn refuse_to_play() -> Vec<Value> {
    panic!("no table")
}

#[tokio::test]
async fn abnormal_response_reaches_a_bare_producer() -> anyhow::Result<()> {
    let coordinator = Coordinator::new();
    let pending = coordinator.submit(CallEnvelope::new("Miss", args!["Pong"]));

    let call = coordinator.expect(CallPattern::new("Miss")).claim().await?;
    coordinator.resolve(&call, Response::abnormal("out of bounds"))?;

    let response = pending.await_response().await?;
    assert!(response.is_abnormal());
    assert_eq!(response, Response::abnormal("out of bounds"));
    coordinator.close()?;
    Ok(())
}

#[tokio::test]
async fn resolving_twice_is_rejected() -> anyhow::Result<()> {
    let coordinator = Coordinator::new();
    let pending = coordinator.submit(CallEnvelope::new("Hit", args!["Ping"]));

    let call = coordinator.expect(CallPattern::new("Hit")).claim().await?;
    coordinator.resolve(&call, Response::nothing())?;
    let err = coordinator
        .resolve(&call, Response::abnormal("again"))
        .unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::DoubleResolution { ref call } if call.identity() == "Hit"
    ));

    // The first response is the one delivered.
    assert_eq!(pending.await_response().await?, Response::nothing());
    coordinator.close()?;
    Ok(())
}
