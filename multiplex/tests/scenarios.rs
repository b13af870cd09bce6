//! End-to-end behaviour of the observer loop against real children.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use multiplex::{Channel, CommandSpec, Observer};

type Events = Arc<Mutex<Vec<(usize, Channel, Vec<u8>)>>>;

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new(["sh", "-c", script])
}

fn recorder(events: &Events, label: usize) -> impl FnMut(Channel, &[u8]) + Send + 'static {
    let events = Arc::clone(events);
    move |channel, chunk| {
        events
            .lock()
            .unwrap()
            .push((label, channel, chunk.to_vec()));
    }
}

/// Run the observer for `duration`; it must still be running when stopped.
async fn run_for(observer: &mut Observer, duration: Duration) {
    let outcome = tokio::time::timeout(duration, observer.run()).await;
    assert!(outcome.is_err(), "observer loop ended early: {outcome:?}");
}

/// Concatenated payload for one label and channel.
fn payload(events: &Events, label: usize, channel: Channel) -> Vec<u8> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter(|(l, c, _)| *l == label && *c == channel)
        .flat_map(|(_, _, chunk)| chunk.iter().copied())
        .collect()
}

#[tokio::test]
async fn unsupervised_output_is_delivered_once() {
    let events: Events = Arc::default();
    let mut observer = Observer::new();
    observer.listen(sh("printf hello"), recorder(&events, 0));

    run_for(&mut observer, Duration::from_millis(1500)).await;

    assert_eq!(payload(&events, 0, Channel::Stdout), b"hello");
    assert!(payload(&events, 0, Channel::Stderr).is_empty());

    // Only end-of-stream markers may accompany the single data chunk.
    let events = events.lock().unwrap();
    let data_calls: Vec<_> = events.iter().filter(|(_, _, chunk)| !chunk.is_empty()).collect();
    assert_eq!(data_calls.len(), 1);
    assert_eq!(data_calls[0].1, Channel::Stdout);
}

#[tokio::test]
async fn supervised_command_is_respawned_with_new_pids() {
    let events: Events = Arc::default();
    let mut observer = Observer::new();
    observer.listen(sh("printf \"$$ \"").supervise(true), recorder(&events, 0));

    run_for(&mut observer, Duration::from_millis(1500)).await;

    let out = String::from_utf8(payload(&events, 0, Channel::Stdout)).unwrap();
    let pids: Vec<&str> = out.split_whitespace().collect();
    let distinct: HashSet<&str> = pids.iter().copied().collect();

    assert!(pids.len() >= 2, "expected several respawn cycles, got {out:?}");
    assert_eq!(distinct.len(), pids.len(), "a pid was reported twice: {out:?}");
}

#[tokio::test]
async fn stderr_only_command_never_reports_stdout_data() {
    let events: Events = Arc::default();
    let mut observer = Observer::new();
    observer.listen(sh("printf oops >&2"), recorder(&events, 0));

    run_for(&mut observer, Duration::from_millis(1000)).await;

    assert_eq!(payload(&events, 0, Channel::Stderr), b"oops");
    assert!(payload(&events, 0, Channel::Stdout).is_empty());
}

#[tokio::test]
async fn registrations_do_not_cross_talk() {
    let events: Events = Arc::default();
    let mut observer = Observer::new();
    observer
        .listen(sh("printf first"), recorder(&events, 0))
        .listen(sh("printf second >&2; sleep 0.3; printf more >&2"), recorder(&events, 1))
        .listen(sh("printf third"), recorder(&events, 2));

    run_for(&mut observer, Duration::from_millis(1500)).await;

    assert_eq!(payload(&events, 0, Channel::Stdout), b"first");
    assert_eq!(payload(&events, 1, Channel::Stderr), b"secondmore");
    assert_eq!(payload(&events, 2, Channel::Stdout), b"third");
    assert!(payload(&events, 1, Channel::Stdout).is_empty());
}

#[tokio::test]
async fn large_output_arrives_in_bounded_chunks_and_in_order() {
    let events: Events = Arc::default();
    let mut observer = Observer::new();
    // 20000 bytes of 'x' followed by an 'end' marker. The trailing sleep keeps
    // stderr open until stdout has been drained, since EOF on either channel
    // ends the registration.
    observer.listen(
        sh("i=0; while [ $i -lt 2000 ]; do printf xxxxxxxxxx; i=$((i+1)); done; printf end; sleep 0.5"),
        recorder(&events, 0),
    );

    run_for(&mut observer, Duration::from_millis(3000)).await;

    let out = payload(&events, 0, Channel::Stdout);
    assert_eq!(out.len(), 20_003);
    assert!(out.ends_with(b"end"));
    assert!(out[..20_000].iter().all(|b| *b == b'x'));
    assert!(events
        .lock()
        .unwrap()
        .iter()
        .all(|(_, _, chunk)| chunk.len() <= multiplex::READ_CHUNK_SIZE));
}

#[tokio::test]
async fn dropping_the_loop_terminates_children() {
    let events: Events = Arc::default();
    let mut observer = Observer::new();
    observer.listen(sh("printf \"$$\"; sleep 30"), recorder(&events, 0));

    run_for(&mut observer, Duration::from_millis(800)).await;

    let pid = String::from_utf8(payload(&events, 0, Channel::Stdout)).unwrap();
    assert!(!pid.is_empty());
    if cfg!(target_os = "linux") {
        // Killed on drop; the runtime reaps it shortly after.
        let proc_dir = format!("/proc/{pid}");
        let mut gone = false;
        for _ in 0..200 {
            if !std::path::Path::new(&proc_dir).exists() {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(gone, "child {pid} outlived the loop");
    }
}
