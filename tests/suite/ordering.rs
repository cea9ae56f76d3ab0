//! Sequential FIFO matching, eventual order independence, argument round-trips.

use tandem::{
    CallEnvelope, CallPattern, Coordinator, CoordinatorError, Expectation, Response, Value, args,
    eq,
};

fn register(name: &str) -> CallEnvelope {
    CallEnvelope::new("Register", args![name])
}

#[tokio::test]
async fn sequential_delivers_in_submission_order() -> anyhow::Result<()> {
    let coordinator = Coordinator::new();
    let first = coordinator.submit(CallEnvelope::new("C1", Vec::new()));
    let second = coordinator.submit(CallEnvelope::new("C2", Vec::new()));

    let producers = tokio::spawn(async move {
        let first = first.await_response().await?;
        let second = second.await_response().await?;
        Ok::<_, CoordinatorError>((first, second))
    });

    coordinator
        .expect(CallPattern::new("C1"))
        .returns(args![1])
        .await?;
    coordinator
        .expect(CallPattern::new("C2"))
        .returns(args![2])
        .await?;

    let (first, second) = producers.await??;
    assert_eq!(first, Response::returning(args![1]));
    assert_eq!(second, Response::returning(args![2]));
    coordinator.close()?;
    Ok(())
}

#[tokio::test]
async fn sequential_swapped_order_is_a_mismatch() {
    let coordinator = Coordinator::new();
    let _first = coordinator.submit(CallEnvelope::new("C1", Vec::new()));
    let _second = coordinator.submit(CallEnvelope::new("C2", Vec::new()));

    let err = coordinator
        .expect(CallPattern::new("C2"))
        .returns_nothing()
        .await
        .unwrap_err();
    match err {
        CoordinatorError::Mismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, "C2(..) [sequential]");
            assert_eq!(actual.identity(), "C1");
        }
        other => panic!("expected Mismatch, got {other:?}"),
    }

    // Both calls are still outstanding.
    assert!(matches!(
        coordinator.close(),
        Err(CoordinatorError::Stranded { calls }) if calls.len() == 2
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn eventual_matching_ignores_arrival_and_registration_order() -> anyhow::Result<()> {
    let orders = [("Ping", "Pong"), ("Pong", "Ping")];
    for (first_arrival, second_arrival) in orders {
        for (first_expected, second_expected) in orders {
            let coordinator = Coordinator::new();
            let a = coordinator.submit(register(first_arrival));
            let b = coordinator.submit(register(second_arrival));

            for name in [first_expected, second_expected] {
                let claimed = coordinator
                    .expect(Expectation::eventual(
                        CallPattern::new("Register").arg(eq(name)),
                    ))
                    .returns(args![name])
                    .await?;
                assert_eq!(claimed.arguments(), args![name].as_slice());
            }

            // Each call was claimed exactly once, by the expectation for its name.
            assert_eq!(
                a.await_response().await?,
                Response::returning(args![first_arrival])
            );
            assert_eq!(
                b.await_response().await?,
                Response::returning(args![second_arrival])
            );
            coordinator.close()?;
        }
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn eventual_matching_with_racing_producers() -> anyhow::Result<()> {
    let coordinator = Coordinator::new();
    let mut players = Vec::new();
    for name in ["Ping", "Pong"] {
        let producer = coordinator.clone();
        players.push(tokio::spawn(async move {
            producer.invoke("Register", args![name]).await
        }));
    }

    for name in ["Pong", "Ping"] {
        coordinator
            .expect(Expectation::eventual(
                CallPattern::new("Register").arg(eq(name)),
            ))
            .returns(args![format!("welcome {name}")])
            .await?;
    }

    let mut greetings = Vec::new();
    for player in players {
        greetings.push(player.await?);
    }
    assert_eq!(
        greetings,
        vec![args!["welcome Ping"], args!["welcome Pong"]]
    );
    coordinator.close()?;
    Ok(())
}

#[tokio::test]
async fn eventual_leaves_skipped_calls_for_later_expectations() -> anyhow::Result<()> {
    let coordinator = Coordinator::new();
    let _hit = coordinator.submit(CallEnvelope::new("Hit", args!["Ping"]));
    let _miss = coordinator.submit(CallEnvelope::new("Miss", args!["Pong"]));

    coordinator
        .expect(Expectation::eventual(CallPattern::new("Miss")))
        .returns_nothing()
        .await?;
    // The skipped call is now the head, so sequential matching sees it.
    coordinator
        .expect(CallPattern::new("Hit").arg(eq("Ping")))
        .returns_nothing()
        .await?;
    coordinator.close()?;
    Ok(())
}

#[tokio::test]
async fn arguments_round_trip_element_for_element() -> anyhow::Result<()> {
    let coordinator = Coordinator::new();
    let sent = args![
        "Ping",
        -3,
        2.5,
        Value::Null,
        serde_json::json!({"score": [11, 9], "deuce": false}),
        vec!["a", "b"]
    ];
    let _pending = coordinator.submit(CallEnvelope::new("Receive", sent.clone()));

    let call = coordinator.expect(CallPattern::new("Receive")).claim().await?;
    assert_eq!(call.arguments(), sent.as_slice());
    assert_eq!(call.argument::<Vec<String>>(5)?, vec!["a", "b"]);

    coordinator.resolve(&call, Response::nothing())?;
    coordinator.close()?;
    Ok(())
}
