mod common;

use common::Sandbox;
use pdf_squeeze::{cli::prepare_jobs, request::Mode};

#[test]
fn bad_inputs_do_not_stop_the_batch() {
    let sb = Sandbox::new();
    let good = sb.source("good.pdf", 2_000);
    let other = sb.source("other.pdf", 3_000);
    let missing = sb.dir.path().join("missing.pdf");
    let notes = sb.dir.path().join("notes.txt");
    std::fs::write(&notes, b"not a pdf").unwrap();
    let inputs = vec![
        good.clone(),
        missing.clone(),
        "https://example.com/a.pdf".into(),
        notes.clone(),
        other.clone(),
    ];

    let (jobs, rejected) = prepare_jobs(&sb.cfg, &inputs, Mode::Reduce, Some(1_000), None);

    let sources: Vec<_> = jobs.iter().map(|j| j.request.source.clone()).collect();
    assert_eq!(sources, vec![good, other]);
    assert_ne!(jobs[0].id, jobs[1].id);
    assert_eq!(jobs[0].id.len(), 16);

    let bad: Vec<_> = rejected.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(bad, vec![missing, "https://example.com/a.pdf".into(), notes]);
    assert!(rejected[0].1.to_string().contains("does not exist"));
}

#[test]
fn invalid_request_is_rejected_per_input() {
    let sb = Sandbox::new();
    let src = sb.source("in.pdf", 2_000);

    let (jobs, rejected) = prepare_jobs(&sb.cfg, &[src.clone()], Mode::Increase, None, None);
    assert!(jobs.is_empty());
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].0, src);
}
