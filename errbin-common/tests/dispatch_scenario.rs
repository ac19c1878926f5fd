//! End-to-end dispatch through a hierarchy built the way an application would
//! build it at startup.

use errbin_common::{Dispatcher, ErrorId, Handler, Middleware, ResponseSink};
use std::sync::Arc;

#[ctor::ctor]
fn setup() {
    errbin_common::testing::init_global_test_logging();
}

#[derive(Debug, Default)]
struct Response {
    status: Option<u16>,
    body: Option<serde_json::Value>,
    calls: Vec<&'static str>,
}

impl ResponseSink for Response {
    fn write_error(&mut self, status: u16, body: serde_json::Value) {
        self.status = Some(status);
        self.body = Some(body);
    }
}

fn respond(name: &'static str, status: u16) -> Handler<Response> {
    Handler::new(move |_err, resp: &mut Response| {
        resp.calls.push(name);
        resp.write_error(status, serde_json::json!({ "msg": name }));
    })
}

#[derive(Debug, thiserror::Error)]
#[error("lookup failed for {key}")]
struct LookupError {
    key: String,
    #[source]
    cause: ErrorId,
}

#[test]
fn wrapped_identity_becomes_child_and_wins_dispatch() {
    let a = ErrorId::new("record missing");
    let b = ErrorId::wrap("user record", &a);

    let mut dispatcher = Dispatcher::new();
    let a_nodes = dispatcher.register(respond("HA", 404), [a.clone()]).unwrap();
    let b_nodes = dispatcher.register(respond("HB", 410), [b.clone()]).unwrap();

    let hierarchy = dispatcher.hierarchy();
    assert_eq!(hierarchy.roots(), a_nodes.as_slice());
    assert_eq!(hierarchy.node(b_nodes[0]).unwrap().parent(), Some(a_nodes[0]));

    let mut resp = Response::default();
    let err = ErrorId::wrap("handler", &b);
    dispatcher.dispatch(Some(&err), &mut resp);
    assert_eq!(resp.calls, vec!["HB"]);
    assert_eq!(resp.status, Some(410));

    let mut resp = Response::default();
    let plain = std::io::Error::other("plain failure");
    dispatcher.dispatch(Some(&plain), &mut resp);
    assert!(resp.calls.is_empty());
    assert_eq!(resp.status, Some(500));
    assert_eq!(resp.body.unwrap()["error"], "plain failure");
}

#[test]
fn three_level_chain_resolves_most_specific() {
    let base = ErrorId::new("base error");
    let specific = ErrorId::wrap("specific", &base);
    let more = ErrorId::wrap("more specific", &specific);

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(respond("base", 400), [base.clone()]).unwrap();
    dispatcher.register(respond("specific", 400), [specific.clone()]).unwrap();
    dispatcher.register(respond("more specific", 400), [more.clone()]).unwrap();
    assert_eq!(dispatcher.hierarchy().roots().len(), 1);

    let cases: Vec<(Box<dyn std::error::Error + 'static>, Option<&str>)> = vec![
        (Box::new(more.clone()), Some("more specific")),
        (
            Box::new(LookupError {
                key: "42".to_string(),
                cause: ErrorId::wrap("wrapped", &specific),
            }),
            Some("specific"),
        ),
        (Box::new(ErrorId::wrap("wrapped", &base)), Some("base")),
        (Box::new(ErrorId::new("unknown error")), None),
    ];

    for (err, expected) in cases {
        let mut resp = Response::default();
        dispatcher.dispatch(Some(&*err), &mut resp);
        match expected {
            Some(name) => assert_eq!(resp.body.unwrap()["msg"], name, "error: {err}"),
            None => assert_eq!(resp.status, Some(500), "error: {err}"),
        }
    }
}

#[test]
fn duplicate_registration_reports_identity() {
    let base = ErrorId::new("base error");
    let mut dispatcher: Dispatcher<Response> = Dispatcher::new();
    dispatcher.register(respond("base", 400), [base.clone()]).unwrap();

    let err = dispatcher
        .register(respond("duplicate", 400), [base.clone()])
        .unwrap_err();
    assert!(err.to_string().contains("duplicate registration"));
    assert_eq!(dispatcher.hierarchy().len(), 1);
}

#[test]
fn custom_fallback_and_none_replacement() {
    let mut dispatcher: Dispatcher<Response> = Dispatcher::new();
    dispatcher.set_fallback(respond("custom fallback", 503));
    dispatcher.set_fallback(None);

    let mut resp = Response::default();
    dispatcher.dispatch(Some(&ErrorId::new("unregistered")), &mut resp);
    assert_eq!(resp.calls, vec!["custom fallback"]);
    assert_eq!(resp.status, Some(503));
}

#[test]
fn global_middleware_order_across_dispatch() {
    let known = ErrorId::new("known");
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(respond("known", 409), [known.clone()]).unwrap();

    let layer = |name: &'static str| {
        Middleware::new(move |next: Handler<Response>| {
            Handler::new(move |err, resp: &mut Response| {
                resp.calls.push(name);
                next.call(err, resp);
                resp.calls.push(name);
            })
        })
    };
    dispatcher.use_global([layer("outer"), layer("inner")]);

    let mut resp = Response::default();
    dispatcher.dispatch(Some(&known), &mut resp);
    assert_eq!(resp.calls, vec!["outer", "inner", "known", "inner", "outer"]);
}

#[test]
fn shared_dispatcher_is_usable_across_threads() {
    let known = ErrorId::new("known");
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(respond("known", 409), [known.clone()]).unwrap();
    let dispatcher = Arc::new(dispatcher);

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            let err = ErrorId::wrap(format!("worker {i}"), &known);
            std::thread::spawn(move || {
                let mut resp = Response::default();
                dispatcher.dispatch(Some(&err), &mut resp);
                resp.status
            })
        })
        .collect();

    for worker in workers {
        assert_eq!(worker.join().unwrap(), Some(409));
    }
}
