//! Shared test utilities and fixtures
//!
//! `Table` is hand-written in the shape a code generator would emit for a
//! ping-pong table dependency: every method submits a call and decodes the
//! values the test answers with. `play` is the code under test.

#![allow(dead_code)]

use tandem::{Coordinator, Value, args, decode_at};

pub const REGISTER: &str = "Register";
pub const IS_SERVING: &str = "IsServing";
pub const HIT: &str = "Hit";
pub const RECEIVE: &str = "Receive";
pub const FLIP: &str = "Flip";
pub const MISS: &str = "Miss";

/// Test double for the table both players share.
#[derive(Clone)]
pub struct Table {
    coordinator: Coordinator,
}

impl Table {
    pub fn new(coordinator: &Coordinator) -> Self {
        Self {
            coordinator: coordinator.clone(),
        }
    }

    pub async fn register(&self, name: &str) {
        self.coordinator.invoke(REGISTER, args![name]).await;
    }

    pub async fn is_serving(&self, name: &str) -> bool {
        decode_bool(&self.coordinator.invoke(IS_SERVING, args![name]).await)
    }

    pub async fn hit(&self, name: &str) {
        self.coordinator.invoke(HIT, args![name]).await;
    }

    /// Whether the ball came back; `false` means the opponent missed.
    pub async fn receive(&self, name: &str) -> bool {
        decode_bool(&self.coordinator.invoke(RECEIVE, args![name]).await)
    }

    /// Whether the player manages to return the ball.
    pub async fn flip(&self, name: &str) -> bool {
        decode_bool(&self.coordinator.invoke(FLIP, args![name]).await)
    }

    pub async fn miss(&self, name: &str) {
        self.coordinator.invoke(MISS, args![name]).await;
    }
}

fn decode_bool(values: &[Value]) -> bool {
    decode_at(values, 0).expect("table answers carry one bool")
}

/// A player: register, serve if asked to, then rally until someone misses.
///
/// Returns the player's name, how many times it hit the ball, and whether it won.
pub async fn play(table: Table, name: &'static str) -> (&'static str, u32, bool) {
    table.register(name).await;

    let mut hits = 0;
    if table.is_serving(name).await {
        table.hit(name).await;
        hits += 1;
    }

    loop {
        if !table.receive(name).await {
            return (name, hits, true);
        }
        if !table.flip(name).await {
            table.miss(name).await;
            return (name, hits, false);
        }
        table.hit(name).await;
        hits += 1;
    }
}
