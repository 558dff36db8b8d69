use chrono::{DateTime, TimeDelta, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use reflex::brain::MemoryBrain;
use reflex::config::ReactConfig;
use reflex::reactor::Reactor;
use reflex::stem::PorterStemmer;
use reflex::types::UndoOutcome;
use std::sync::Arc;

fn make_reactor(cooldown_secs: u64) -> Reactor {
    let config = ReactConfig {
        throttle_cooldown_secs: cooldown_secs,
        ..ReactConfig::default()
    };
    Reactor::with_parts(
        &config,
        Arc::new(MemoryBrain::new()),
        Arc::new(PorterStemmer::new()),
        Box::new(StdRng::seed_from_u64(11)),
    )
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn fired_key_is_throttled_for_the_cooldown() {
    let reactor = make_reactor(300);
    let record = reactor.teach("pizza", "I love pizza!").await;
    let text = "I had pizza today";

    let candidates = reactor.candidates_at(text, t0()).await;
    assert_eq!(candidates, vec![record.clone()]);
    reactor.fire_at(&record, t0()).await;

    assert!(reactor.candidates_at(text, t0()).await.is_empty());
    assert!(
        reactor
            .candidates_at(text, t0() + TimeDelta::seconds(299))
            .await
            .is_empty()
    );
    assert_eq!(
        reactor
            .candidates_at(text, t0() + TimeDelta::seconds(301))
            .await,
        vec![record]
    );
}

#[tokio::test]
async fn throttle_covers_every_response_under_the_key() {
    let reactor = make_reactor(60);
    let yum = reactor.teach("pizza", "yum").await;
    reactor.teach("pizza", "again?").await;
    let tacos = reactor.teach("tacos", "tuesday").await;

    reactor.fire_at(&yum, t0()).await;

    let candidates = reactor
        .candidates_at("pizza and tacos", t0() + TimeDelta::seconds(30))
        .await;
    assert_eq!(candidates, vec![tacos]);
}

#[tokio::test]
async fn literal_terms_are_throttled_too() {
    let reactor = make_reactor(60);
    let smile = reactor.teach(":-)", "smile back").await;
    reactor.fire_at(&smile, t0()).await;

    assert!(
        reactor
            .candidates_at("hi :-)", t0() + TimeDelta::seconds(59))
            .await
            .is_empty()
    );
    assert_eq!(
        reactor
            .candidates_at("hi :-)", t0() + TimeDelta::seconds(61))
            .await,
        vec![smile]
    );
}

#[tokio::test]
async fn undo_without_firing_has_nothing_to_undo() {
    let reactor = make_reactor(300);
    reactor.teach("pizza", "yum").await;
    assert_eq!(reactor.undo_last().await, UndoOutcome::NothingToUndo);
}

#[tokio::test]
async fn undo_removes_the_fired_record_once() {
    let reactor = make_reactor(300);
    let record = reactor.teach("pizza", "yum").await;
    reactor.teach("pizza", "again?").await;

    reactor.fire_at(&record, t0()).await;
    assert_eq!(reactor.last_fired().await, Some(record.clone()));

    assert_eq!(
        reactor.undo_last().await,
        UndoOutcome::Forgotten(record.clone())
    );
    assert_eq!(reactor.undo_last().await, UndoOutcome::NothingToUndo);
    assert!(reactor.last_fired().await.is_none());

    let remaining = reactor
        .candidates_at("pizza", t0() + TimeDelta::seconds(301))
        .await;
    assert!(!remaining.contains(&record));
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn undo_of_evicted_record_reports_already_gone() {
    let reactor = make_reactor(300);
    let record = reactor.teach("pizza", "yum").await;
    reactor.fire_at(&record, t0()).await;
    assert!(reactor.forget(&record).await);

    assert_eq!(
        reactor.undo_last().await,
        UndoOutcome::AlreadyGone(record)
    );
    assert_eq!(reactor.undo_last().await, UndoOutcome::NothingToUndo);
}

#[tokio::test]
async fn try_fire_refuses_a_key_that_fired_since_it_was_picked() {
    let reactor = make_reactor(300);
    let record = reactor.teach("pizza", "yum").await;
    let also = reactor.teach("pizzas", "again").await;

    // Both picked while nothing was throttled.
    assert!(reactor.try_fire_at(&record, t0()).await);
    assert!(
        !reactor
            .try_fire_at(&also, t0() + TimeDelta::seconds(1))
            .await
    );
    assert_eq!(reactor.last_fired().await, Some(record.clone()));

    assert!(
        reactor
            .try_fire_at(&also, t0() + TimeDelta::seconds(301))
            .await
    );
    assert_eq!(reactor.last_fired().await, Some(also));
}
