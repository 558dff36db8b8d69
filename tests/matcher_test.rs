use rand::SeedableRng;
use rand::rngs::StdRng;
use reflex::brain::MemoryBrain;
use reflex::config::ReactConfig;
use reflex::reactor::Reactor;
use reflex::stem::PorterStemmer;
use reflex::types::Response;
use std::sync::Arc;

fn make_reactor() -> Reactor {
    Reactor::with_parts(
        &ReactConfig::default(),
        Arc::new(MemoryBrain::new()),
        Arc::new(PorterStemmer::new()),
        Box::new(StdRng::seed_from_u64(5)),
    )
}

fn responses(candidates: &[Response]) -> Vec<&str> {
    let mut out: Vec<&str> = candidates.iter().map(|c| c.response.as_str()).collect();
    out.sort();
    out
}

#[tokio::test]
async fn single_word_term_matches_inside_sentence() {
    let reactor = make_reactor();
    reactor.teach("pizza", "I love pizza!").await;

    let candidates = reactor.candidates("I had pizza today").await;
    assert_eq!(responses(&candidates), vec!["I love pizza!"]);
}

#[tokio::test]
async fn stemming_matches_inflections() {
    let reactor = make_reactor();
    reactor.teach("cat", "meow").await;

    assert_eq!(responses(&reactor.candidates("so many CATS here").await), vec!["meow"]);
}

#[tokio::test]
async fn quoted_phrase_matches_in_any_order() {
    let reactor = make_reactor();
    reactor.teach("good morning", "Good morning!").await;

    assert_eq!(
        responses(&reactor.candidates("well, good morning to you").await),
        vec!["Good morning!"]
    );
    assert_eq!(
        responses(&reactor.candidates("morning good").await),
        vec!["Good morning!"]
    );
    assert!(reactor.candidates("good evening").await.is_empty());
    assert!(reactor.candidates("morning").await.is_empty());
}

#[tokio::test]
async fn all_responses_under_a_key_are_candidates() {
    let reactor = make_reactor();
    reactor.teach("pizza", "yum").await;
    reactor.teach("pizza", "again?").await;
    reactor.teach("tacos", "tuesday").await;

    assert_eq!(
        responses(&reactor.candidates("pizza and tacos").await),
        vec!["again?", "tuesday", "yum"]
    );
}

#[tokio::test]
async fn terms_of_different_sizes_match_together() {
    let reactor = make_reactor();
    reactor.teach("pizza", "one").await;
    reactor.teach("cheese pizza", "two").await;

    assert_eq!(
        responses(&reactor.candidates("cheese pizza please").await),
        vec!["one", "two"]
    );
}

#[tokio::test]
async fn literal_terms_match_by_substring() {
    let reactor = make_reactor();
    let record = reactor.teach(":-)", "smile back").await;
    assert_eq!(record.key, "=:-)");
    assert!(record.stems.is_empty());

    assert_eq!(
        responses(&reactor.candidates("nice one :-))").await),
        vec!["smile back"]
    );
    assert!(reactor.candidates("nice one :-(").await.is_empty());
}

#[tokio::test]
async fn literal_term_does_not_answer_for_a_word_with_the_same_text() {
    let reactor = make_reactor();
    // "ons" stems to "on"; "on" alone is a stop word and taught literally.
    reactor.teach("ons", "plural").await;
    reactor.teach("on", "literal").await;

    assert_eq!(
        responses(&reactor.candidates("lights on").await),
        vec!["literal"]
    );
    assert_eq!(
        responses(&reactor.candidates("add-ons").await),
        vec!["literal", "plural"]
    );
}

#[tokio::test]
async fn no_match_is_empty_not_error() {
    let reactor = make_reactor();
    assert!(reactor.candidates("anything at all").await.is_empty());

    reactor.teach("pizza", "yum").await;
    assert!(reactor.candidates("").await.is_empty());
    assert!(reactor.candidates("burgers").await.is_empty());
}

#[tokio::test]
async fn forgotten_record_never_matches() {
    let reactor = make_reactor();
    let record = reactor.teach("pizza", "I love pizza!").await;
    reactor.teach("pizza", "other").await;

    assert!(reactor.forget(&record).await);
    let candidates = reactor.candidates("I had pizza today").await;
    assert!(!candidates.contains(&record));
    assert_eq!(responses(&candidates), vec!["other"]);
}
